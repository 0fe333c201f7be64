//! End-to-end use through the facade prelude.

use std::cell::RefCell;
use std::rc::Rc;

use fxprop::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn form_model_round_trip() {
    init_tracing();
    let items: ObservableList<String> = ObservableList::new();
    let count = SimpleProperty::named("count", 0usize);
    let submit_enabled = Binding::map(&count, |n: usize| n > 0);
    let log = Rc::new(RefCell::new(Vec::new()));

    {
        let count = count.clone();
        let log = Rc::clone(&log);
        items.add_list_listener(change_listener(move |c: &ListChange<String>| {
            let delta: isize = c
                .edits()
                .iter()
                .map(|e| e.added.len() as isize - e.removed.len() as isize)
                .sum();
            let next = count.get().saturating_add_signed(delta);
            log.borrow_mut().push(next);
            if let Err(err) = count.set(next) {
                panic!("count is never bound: {err}");
            }
        }));
    }

    assert!(!submit_enabled.get());
    items.push("a".into());
    items.push("b".into());
    assert!(submit_enabled.get());
    items.clear();
    assert!(!submit_enabled.get());
    assert_eq!(*log.borrow(), vec![1, 2, 0]);
}

#[test]
fn facade_reexports_are_usable() {
    let array = fxprop::ObservableArray::from_slice(&[1u8, 2, 3]);
    let seen = Rc::new(RefCell::new(Vec::new()));
    let seen_clone = Rc::clone(&seen);
    array.add_array_listener(change_listener(move |c: &ArrayChange| {
        seen_clone.borrow_mut().push(c.range());
    }));
    array.set(1, 9).unwrap();
    assert_eq!(*seen.borrow(), vec![1..2]);

    let config = fxprop::RegistryConfig::default();
    assert!(config.reap_expired);
    assert_eq!(
        fxprop::registry::ListenerHelper::<(), ValueChange<u8>>::new().shape(),
        fxprop::registry::HelperShape::Empty
    );
}
