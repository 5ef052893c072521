#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    use web_time::Instant;

    use crate::animation::*;
    use crate::*;

    fn counter() -> (Rc<Cell<u32>>, impl Fn() + 'static) {
        let n = Rc::new(Cell::new(0));
        let n2 = n.clone();
        (n, move || n2.set(n2.get() + 1))
    }

    #[test]
    fn test_dispose_runs_once() {
        let (n, bump) = counter();
        let d = Dispose::new(bump);
        let d2 = d.clone();
        d.run();
        d2.run();
        assert_eq!(n.get(), 1);
        assert!(!d.is_armed());
    }

    #[test]
    fn test_dispose_cancel_never_runs() {
        let (n, bump) = counter();
        let d = Dispose::new(bump);
        assert!(d.cancel());
        assert!(!d.cancel());
        d.run();
        assert_eq!(n.get(), 0);
    }

    #[test]
    fn test_emitter_filters_by_event_kind() {
        let emitter: Emitter<u32> = Emitter::new();
        let adds = Rc::new(RefCell::new(Vec::new()));
        let a = adds.clone();
        emitter.subscribe(
            Events::ADD,
            Rc::new(move |v: &u32| -> Result<()> {
                a.borrow_mut().push(*v);
                Ok(())
            }),
        );

        emitter.emit(Events::ADD, &1).unwrap();
        emitter.emit(Events::REMOVE, &2).unwrap();
        emitter.emit(Events::ADD | Events::CHANGE, &3).unwrap();
        assert_eq!(*adds.borrow(), vec![1, 3]);
    }

    #[test]
    fn test_emitter_skips_handler_unsubscribed_mid_emit() {
        let emitter: Rc<Emitter<()>> = Rc::new(Emitter::new());
        let second_called = Rc::new(Cell::new(false));
        let second_id = Rc::new(Cell::new(None));

        let e = emitter.clone();
        let sid = second_id.clone();
        emitter.subscribe(
            Events::CHANGE,
            Rc::new(move |_: &()| -> Result<()> {
                if let Some(id) = sid.get() {
                    e.unsubscribe(id);
                }
                Ok(())
            }),
        );
        let called = second_called.clone();
        let id = emitter.subscribe(
            Events::CHANGE,
            Rc::new(move |_: &()| -> Result<()> {
                called.set(true);
                Ok(())
            }),
        );
        second_id.set(Some(id));

        emitter.emit(Events::CHANGE, &()).unwrap();
        assert!(!second_called.get());
        assert_eq!(emitter.len(), 1);
    }

    #[test]
    fn test_emitter_reports_first_error_after_delivering_to_all() {
        let emitter: Emitter<()> = Emitter::new();
        let (n, bump) = counter();
        emitter.subscribe(
            Events::CHANGE,
            Rc::new(|_: &()| -> Result<()> { Err(Error::factory("boom")) }),
        );
        emitter.subscribe(
            Events::CHANGE,
            Rc::new(move |_: &()| -> Result<()> {
                bump();
                Ok(())
            }),
        );

        let err = emitter.emit(Events::CHANGE, &()).unwrap_err();
        assert!(matches!(err, Error::Factory(ref m) if m == "boom"));
        assert_eq!(n.get(), 1);
    }

    #[test]
    fn test_signal_basic() {
        let sig = signal(42);
        assert_eq!(sig.get(), 42);

        sig.set(100).unwrap();
        assert_eq!(sig.get(), 100);

        sig.update(|v| *v += 1).unwrap();
        assert_eq!(sig.get(), 101);
    }

    #[test]
    fn test_signal_subscription() {
        let sig = signal(0);
        let seen = Rc::new(Cell::new(0));

        let s = seen.clone();
        let id = sig
            .subscribe(
                Events::CHANGE,
                Rc::new(move |v: &i32| -> Result<()> {
                    s.set(*v);
                    Ok(())
                }),
            )
            .unwrap();

        sig.set(42).unwrap();
        assert_eq!(seen.get(), 42);

        sig.unsubscribe(id);
        sig.set(7).unwrap();
        assert_eq!(seen.get(), 42);
    }

    #[test]
    fn test_memory_host_insert_before_and_dump() {
        let host = MemoryHost::new();
        let ul = host.create_node("ul");
        host.insert_before(host.root(), ul, None);

        let a = host.create_node("li");
        let b = host.create_node("li");
        let c = host.create_node("li");
        host.set_text(a, "A");
        host.set_text(b, "B");
        host.set_text(c, "C");
        host.insert_before(ul, a, None);
        host.insert_before(ul, c, None);
        host.insert_before(ul, b, Some(c));
        host.set_hidden(b, true);

        assert_eq!(host.dump(ul), "ul[li(A) li!(B) li(C)]");
        assert_eq!(host.parent(b), Some(ul));
    }

    #[test]
    fn test_memory_host_release_frees_subtree() {
        let host = MemoryHost::new();
        let ul = host.create_node("ul");
        host.insert_before(host.root(), ul, None);
        let li = host.create_node("li");
        host.insert_before(ul, li, None);
        assert_eq!(host.node_count(), 3);

        host.remove_child(host.root(), ul);
        host.release(ul);
        assert_eq!(host.node_count(), 1);
        assert!(!host.contains(li));
        assert_eq!(host.dump(host.root()), "root");
    }

    #[test]
    fn test_memory_host_properties() {
        let host = MemoryHost::new();
        let input = host.create_node("input");
        assert_eq!(host.property(input, "value"), None);

        host.set_property(input, "value", Some("hi"));
        host.set_property(input, "checked", Some("true"));
        assert_eq!(host.property(input, "value").as_deref(), Some("hi"));

        host.set_property(input, "checked", None);
        assert_eq!(host.property(input, "checked"), None);
        // Properties stay out of dumps.
        assert_eq!(host.dump(input), "input");

        host.release(input);
        assert_eq!(host.property(input, "value"), None);
    }

    #[test]
    fn test_easing_bounds() {
        for easing in [Easing::Linear, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            assert_eq!(easing.interpolate(0.0), 0.0);
            assert!((easing.interpolate(1.0) - 1.0).abs() < 1e-6);
        }
        assert!((Easing::EaseOut.interpolate(0.5) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_animation_deterministic() {
        let t0 = Instant::now();
        let mut a = AnimatedValue::new(
            0.0f32,
            AnimationSpec::tween(Duration::from_millis(1000), Easing::Linear),
        );
        a.set_target(10.0, t0);

        assert!(a.update(t0 + Duration::from_millis(250)));
        assert!((*a.get() - 2.5).abs() < 0.01);

        let cont = a.update(t0 + Duration::from_millis(1000));
        assert!(!cont);
        assert!((*a.get() - 10.0).abs() < 0.001);
        assert!(!a.is_animating());
    }

    #[test]
    fn test_animation_delay_holds_start_value() {
        let t0 = Instant::now();
        let spec = AnimationSpec::tween(Duration::from_millis(100), Easing::Linear)
            .with_delay(Duration::from_millis(50));
        let mut a = AnimatedValue::new(1.0f32, spec);
        a.set_target(0.0, t0);

        assert!(a.update(t0 + Duration::from_millis(40)));
        assert_eq!(*a.get(), 1.0);
        assert!(a.update(t0 + Duration::from_millis(100)));
        assert!((*a.get() - 0.5).abs() < 0.01);
    }

    fn slide_fixture() -> (Rc<MemoryHost>, Rc<dyn VisualHost>, Rc<ManualClock>, SlideTransitions) {
        let host = Rc::new(MemoryHost::new());
        let dyn_host: Rc<dyn VisualHost> = host.clone();
        let clock = Rc::new(ManualClock::new());
        let slides = SlideTransitions::new()
            .with_clock(clock.clone())
            .with_spec(AnimationSpec::tween(Duration::from_millis(100), Easing::Linear));
        (host, dyn_host, clock, slides)
    }

    #[test]
    fn test_slide_completes_on_tick() {
        let (host, dyn_host, clock, slides) = slide_fixture();
        let node = host.create_node("li");
        let (n, bump) = counter();

        let token = slides.start(
            &dyn_host,
            node,
            Phase::Enter,
            &TransitionOptions::reset(),
            Box::new(bump),
        );
        assert_eq!(host.reveal(node), 0.0);
        assert_eq!(n.get(), 0);

        clock.advance(Duration::from_millis(50));
        assert!(slides.tick());
        assert!((host.reveal(node) - 0.5).abs() < 0.01);

        clock.advance(Duration::from_millis(50));
        assert!(!slides.tick());
        assert_eq!(host.reveal(node), 1.0);
        assert_eq!(n.get(), 1);
        assert!(!token.is_active());
    }

    #[test]
    fn test_slide_exit_continues_from_current_reveal() {
        let (host, dyn_host, _clock, slides) = slide_fixture();
        let node = host.create_node("li");
        host.set_reveal(node, 0.4);

        slides.start(
            &dyn_host,
            node,
            Phase::Exit,
            &TransitionOptions::default(),
            Box::new(|| {}),
        );
        assert!((host.reveal(node) - 0.4).abs() < 1e-6);
        assert_eq!(slides.active(), 1);
    }

    #[test]
    fn test_slide_stop_never_invokes_completion() {
        let (host, dyn_host, clock, slides) = slide_fixture();
        let node = host.create_node("li");
        let (n, bump) = counter();

        let token = slides.start(
            &dyn_host,
            node,
            Phase::Exit,
            &TransitionOptions::default(),
            Box::new(bump),
        );
        slides.stop(&token);
        slides.stop(&token);
        assert_eq!(slides.active(), 0);

        clock.advance(Duration::from_secs(1));
        slides.tick();
        token.complete();
        assert_eq!(n.get(), 0);
    }

    #[test]
    fn test_manual_clock_as_global_clock() {
        use std::sync::Arc;

        let t0 = Instant::now();
        let clock = Arc::new(ManualClock::starting_at(t0));
        set_clock(clock.clone());
        clock.advance(Duration::from_millis(5));
        assert_eq!(GlobalClock.now(), t0 + Duration::from_millis(5));
        reset_clock();
    }

    #[test]
    fn test_observable_list_rejects_out_of_range_without_emitting() {
        let list = ObservableList::new([10, 20]);
        let (n, bump) = counter();
        list.subscribe(
            Events::ADD | Events::REMOVE,
            Rc::new(move |_: &CollectionEvent<i32>| -> Result<()> {
                bump();
                Ok(())
            }),
        );

        assert!(matches!(
            list.insert(5, 0),
            Err(Error::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert!(matches!(
            list.remove(2),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        ));
        assert_eq!(n.get(), 0);

        assert_eq!(list.remove(0).unwrap(), 10);
        list.push(30).unwrap();
        assert_eq!(list.snapshot(), vec![20, 30]);
        assert_eq!(n.get(), 2);
    }

    #[test]
    fn test_observable_record_reports_only_real_changes() {
        let record = ObservableRecord::new([("x", 1), ("y", 2)]);
        let changes = Rc::new(RefCell::new(Vec::new()));
        let c = changes.clone();
        record.subscribe(
            Events::CHANGE,
            Rc::new(move |change: &RecordChange<i32>| -> Result<()> {
                c.borrow_mut().push(change.changed.clone());
                Ok(())
            }),
        );

        record.set("x", 1).unwrap();
        record.remove("missing").unwrap();
        assert!(changes.borrow().is_empty());

        record
            .update([
                ("x".to_string(), Some(5)),
                ("x".to_string(), Some(6)),
                ("y".to_string(), None),
                ("z".to_string(), Some(0)),
            ])
            .unwrap();
        assert_eq!(
            *changes.borrow(),
            vec![vec![
                ("x".to_string(), Some(1)),
                ("y".to_string(), Some(2)),
                ("z".to_string(), None),
            ]]
        );
        assert_eq!(record.keys(), vec!["x", "z"]);
        assert_eq!(Record::get(&record, "x"), Some(6));
    }

    #[test]
    fn test_static_sources_never_subscribe() {
        let items = vec![1, 2, 3];
        let handler: Handler<CollectionEvent<i32>> = Rc::new(|_: &CollectionEvent<i32>| -> Result<()> { Ok(()) });
        assert!(items.subscribe(Events::ADD, handler).is_none());
        assert_eq!(Collection::snapshot(&items), vec![1, 2, 3]);
    }
}
