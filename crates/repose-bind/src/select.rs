use std::rc::Rc;

use repose_core::{Collection, Component, NodeId, Result, VisualHost};

use crate::collection_view::{CollectionView, CollectionViewOptions};
use crate::reconciler::ReconcilerOptions;

/// Text and value of one `option` node.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SelectOption {
    pub text: String,
    pub value: Option<String>,
}

impl SelectOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    fn write(&self, host: &Rc<dyn VisualHost>, node: NodeId) {
        host.set_text(node, &self.text);
        host.set_property(node, "value", self.value.as_deref());
    }
}

/// Child component of a [`CollectionSelect`].
pub struct OptionItem(SelectOption);

impl OptionItem {
    pub fn option(&self) -> &SelectOption {
        &self.0
    }
}

impl Component for OptionItem {
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()> {
        self.0.write(host, node);
        Ok(())
    }

    fn unrender(&mut self) {}
}

#[derive(Clone, Debug)]
pub struct CollectionSelectOptions {
    /// Rendered as the first option, ahead of the collection's.
    pub placeholder: Option<SelectOption>,
    /// Value selected when first rendered.
    pub selected: Option<String>,
    pub reconciler: ReconcilerOptions,
}

impl Default for CollectionSelectOptions {
    fn default() -> Self {
        Self {
            placeholder: None,
            selected: None,
            reconciler: ReconcilerOptions::default().with_child_tag("option"),
        }
    }
}

impl CollectionSelectOptions {
    pub fn with_placeholder(mut self, placeholder: SelectOption) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    pub fn with_selected(mut self, value: impl Into<String>) -> Self {
        self.selected = Some(value.into());
        self
    }

    pub fn with_reconciler(mut self, reconciler: ReconcilerOptions) -> Self {
        self.reconciler = reconciler;
        self
    }
}

/// A `select` whose options follow a collection.
///
/// The selection is the `value` property of the `select` node. Options are
/// reconciled in place, so whatever is selected survives items being added
/// and removed, and it is remembered across an unrender.
pub struct CollectionSelect<T: Clone + PartialEq + 'static> {
    view: CollectionView<T>,
    placeholder: Option<SelectOption>,
    option_tag: String,
    selected: Option<String>,
    placeholder_node: Option<NodeId>,
    target: Option<(Rc<dyn VisualHost>, NodeId)>,
}

impl<T: Clone + PartialEq + 'static> CollectionSelect<T> {
    pub fn new(
        source: Option<Rc<dyn Collection<T>>>,
        option_map: impl Fn(&T) -> SelectOption + 'static,
        options: CollectionSelectOptions,
    ) -> Self {
        let option_tag = options.reconciler.child_tag.clone();
        let view = CollectionView::new(
            source,
            move |item: &T, _| Ok(OptionItem(option_map(item)).into()),
            CollectionViewOptions::default()
                .with_tag("select")
                .with_reconciler(options.reconciler),
        );
        Self {
            view,
            placeholder: options.placeholder,
            option_tag,
            selected: options.selected,
            placeholder_node: None,
            target: None,
        }
    }

    pub fn render(&mut self, host: &Rc<dyn VisualHost>, parent: NodeId) -> Result<NodeId> {
        if self.target.is_some() {
            self.unrender();
        }

        let select = self.view.render(host, parent)?;
        if let Some(placeholder) = &self.placeholder {
            let node = host.create_node(&self.option_tag);
            placeholder.write(host, node);
            host.insert_before(select, node, self.view.child_node(0));
            self.placeholder_node = Some(node);
        }
        host.set_property(select, "value", self.selected.as_deref());
        self.target = Some((host.clone(), select));
        Ok(select)
    }

    pub fn unrender(&mut self) {
        if let Some((host, select)) = self.target.take() {
            self.selected = host.property(select, "value");
            if let Some(node) = self.placeholder_node.take() {
                host.remove_child(select, node);
                host.release(node);
            }
        }
        self.view.unrender();
    }

    pub fn selected(&self) -> Option<String> {
        match &self.target {
            Some((host, select)) => host.property(*select, "value"),
            None => self.selected.clone(),
        }
    }

    pub fn set_selected(&mut self, value: Option<String>) {
        if let Some((host, select)) = &self.target {
            host.set_property(*select, "value", value.as_deref());
        }
        self.selected = value;
    }

    pub fn set_source(&mut self, source: Option<Rc<dyn Collection<T>>>) -> Result<()> {
        self.view.set_source(source)
    }

    pub fn source(&self) -> Option<Rc<dyn Collection<T>>> {
        self.view.source()
    }

    pub fn sync(&self, callback: impl FnOnce() + 'static) -> bool {
        self.view.sync(callback)
    }

    /// Node of the collection's option at `index`; the placeholder is not counted.
    pub fn option_node(&self, index: usize) -> Option<NodeId> {
        self.view.child_node(index)
    }

    pub fn placeholder_node(&self) -> Option<NodeId> {
        self.placeholder_node
    }

    pub fn items(&self) -> Vec<T> {
        self.view.items()
    }

    pub fn len(&self) -> usize {
        self.view.len()
    }

    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }

    pub fn is_rendered(&self) -> bool {
        self.view.is_rendered()
    }
}

impl<T: Clone + PartialEq + 'static> Component for CollectionSelect<T> {
    fn render(&mut self, host: &Rc<dyn VisualHost>, node: NodeId) -> Result<()> {
        CollectionSelect::render(self, host, node).map(|_| ())
    }

    fn unrender(&mut self) {
        CollectionSelect::unrender(self);
    }
}
