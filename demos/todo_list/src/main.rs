use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use futures::executor::LocalPool;
use futures::task::LocalSpawn;
use repose_bind::*;
use repose_core::*;

#[derive(Clone, Debug, PartialEq)]
struct Todo {
    title: String,
    done: bool,
}

impl Todo {
    fn new(title: &str) -> Self {
        Self {
            title: title.into(),
            done: false,
        }
    }
}

fn todo_row(todo: &Todo, _index: usize) -> Result<Built> {
    if todo.title.trim().is_empty() {
        return Err(Error::factory("todo without a title"));
    }
    let mark = if todo.done { "x" } else { " " };
    Ok(Label::new(format!("[{mark}] {}", todo.title)).into())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let host = Rc::new(MemoryHost::new());
    let dyn_host: Rc<dyn VisualHost> = host.clone();
    let clock = Rc::new(ManualClock::new());
    let slides = Rc::new(
        SlideTransitions::new()
            .with_clock(clock.clone())
            .with_spec(AnimationSpec::fast()),
    );
    let mut pool = LocalPool::new();
    let spawner: Rc<dyn LocalSpawn> = Rc::new(pool.spawner());

    let frame = |label: &str| {
        while slides.tick() {
            clock.advance(Duration::from_millis(16));
        }
        log::info!("{label}: {}", host.dump(host.root()));
    };

    // Header: open count, kept up to date from a signal.
    let open = Rc::new(signal(0usize));
    let header = host.create_node("h1");
    host.insert_before(host.root(), header, None);
    let mut title = BoundText::new(Some(open.clone()), Events::CHANGE, |open| {
        format!("{} open", open.map(Signal::get).unwrap_or_default())
    });
    title.render(&dyn_host, header)?;

    let todos = Rc::new(ObservableList::new([Todo::new("milk"), Todo::new("eggs")]));
    let source: Rc<dyn Collection<Todo>> = todos.clone();
    let mut list = CollectionView::new(
        Some(source),
        todo_row,
        CollectionViewOptions::default().with_reconciler(
            ReconcilerOptions::default()
                .with_child_tag("li")
                .with_transition(slides.clone())
                .with_spawner(spawner.clone()),
        ),
    );
    list.render(&dyn_host, host.root())?;
    open.set(todos.len())?;
    frame("initial");

    todos.insert(1, Todo::new("bread"))?;
    todos.push(Todo::new("coffee"))?;
    open.set(todos.len())?;
    frame("added");

    let settled = Rc::new(Cell::new(false));
    let flag = settled.clone();
    todos.remove(0)?;
    open.set(todos.len())?;
    list.sync(move || flag.set(true));
    log::info!("mid-exit: {}", host.dump(host.root()));
    frame("removed");
    log::info!("in sync after removal: {}", settled.get());

    if let Err(err) = todos.push(Todo::new("  ")) {
        log::warn!("rejected: {err}");
    }

    // Per-todo details, keyed by field name.
    let details = Rc::new(ObservableRecord::new([
        ("owner", "sam".to_string()),
        ("due", "friday".to_string()),
    ]));
    let details_source: Rc<dyn Record<String>> = details.clone();
    let mut card = RecordView::new(
        Some(details_source),
        |key: &str, value: &String, _| Ok(Label::new(format!("{key}: {value}")).into()),
        RecordViewOptions::default()
            .with_tag("dl")
            .with_reconciler(ReconcilerOptions::default().with_transition(slides.clone())),
    );
    card.render(&dyn_host, host.root())?;
    details.set("due", "monday".to_string())?;
    details.remove("owner")?;
    frame("details");

    pool.run_until_stalled();
    card.unrender();
    list.unrender();
    title.unrender();
    log::info!(
        "unrendered: {} ({} nodes left)",
        host.dump(host.root()),
        host.node_count()
    );
    Ok(())
}
