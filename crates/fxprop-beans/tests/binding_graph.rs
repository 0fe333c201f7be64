//! Bindings and properties wired into small dependency graphs.
//!
//! Covers chains, diamonds, bidirectional rings and listeners that mutate
//! the graph while it is notifying.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use fxprop_beans::{
    Binding, Observable, ObservableValue, SimpleProperty, ValueListener, and, not, observer,
    shared,
};
use fxprop_core::{ValueChange, change_listener};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn change_log<T: Clone + 'static>() -> (Rc<RefCell<Vec<(T, T)>>>, ValueListener<T>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let log_clone = Rc::clone(&log);
    let listener = change_listener(move |e: &ValueChange<T>| {
        log_clone.borrow_mut().push((e.old.clone(), e.new.clone()));
    });
    (log, listener)
}

#[test]
fn chain_of_bindings_propagates() {
    init_tracing();
    let base = SimpleProperty::named("base", 1);
    let doubled = Binding::map(&base, |v: i32| v * 2);
    let label = Binding::map(&doubled, |v: i32| format!("value={v}"));
    let (log, listener) = change_log::<String>();
    label.add_change_listener(listener);

    base.set(2).unwrap();
    base.set(3).unwrap();
    assert_eq!(label.get(), "value=6");
    assert_eq!(
        *log.borrow(),
        vec![
            ("value=2".to_string(), "value=4".to_string()),
            ("value=4".to_string(), "value=6".to_string()),
        ]
    );
}

#[test]
fn diamond_recomputes_once_per_read() {
    init_tracing();
    let source = SimpleProperty::new(1);
    let left = Binding::map(&source, |v: i32| v + 1);
    let right = Binding::map(&source, |v: i32| v * 10);
    let computations = Rc::new(Cell::new(0u32));
    let computations_clone = Rc::clone(&computations);
    let (l, r) = (left.clone(), right.clone());
    let joined = Binding::new(vec![shared(&left), shared(&right)], move || {
        computations_clone.set(computations_clone.get() + 1);
        l.get() + r.get()
    });

    assert_eq!(joined.get(), 12);
    source.set(2).unwrap();
    assert_eq!(joined.get(), 23);
    assert_eq!(computations.get(), 2);
}

#[test]
fn guard_flags_combine() {
    init_tracing();
    let enabled = SimpleProperty::new(true);
    let busy = SimpleProperty::new(false);
    let idle = not(&busy);
    let clickable = and(&enabled, &idle);
    let shown = SimpleProperty::new(false);
    shown.bind(&clickable).unwrap();

    assert!(shown.get());
    busy.set(true).unwrap();
    assert!(!shown.get());
    busy.set(false).unwrap();
    enabled.set(false).unwrap();
    assert!(!shown.get());
}

#[test]
fn bidirectional_ring_settles() {
    init_tracing();
    let a = SimpleProperty::named("a", 0);
    let b = SimpleProperty::named("b", 0);
    let c = SimpleProperty::named("c", 0);
    a.bind_bidirectional(&b).unwrap();
    b.bind_bidirectional(&c).unwrap();
    c.bind_bidirectional(&a).unwrap();

    a.set(5).unwrap();
    assert_eq!((a.get(), b.get(), c.get()), (5, 5, 5));
    c.set(9).unwrap();
    assert_eq!((a.get(), b.get(), c.get()), (9, 9, 9));
}

#[test]
fn bidirectional_update_to_bound_peer_is_rejected() {
    init_tracing();
    let driver = SimpleProperty::new(1);
    let a = SimpleProperty::new(0);
    let b = SimpleProperty::new(0);
    a.bind_bidirectional(&b).unwrap();
    b.bind(&driver).unwrap();

    // b follows driver, so a's update cannot be pushed into b.
    a.set(7).unwrap();
    assert_eq!(a.get(), 7);
    assert_eq!(b.get(), 1);
}

#[test]
fn listener_unbinding_mid_notification() {
    init_tracing();
    let source = SimpleProperty::new(0);
    let follower = SimpleProperty::new(0);
    follower.bind(&source).unwrap();
    let _ = follower.get();

    let follower_clone = follower.clone();
    source.add_listener(observer(move |_| follower_clone.unbind()));

    source.set(1).unwrap();
    assert!(!follower.is_bound());
    assert_eq!(follower.get(), 1);

    source.set(2).unwrap();
    assert_eq!(follower.get(), 1);
}

#[test]
fn dropped_bindings_are_reaped_from_dependency() {
    init_tracing();
    let source = SimpleProperty::new(0);
    for _ in 0..16 {
        let transient = Binding::map(&source, |v: i32| v);
        let _ = transient.get();
    }
    let keeper = Binding::map(&source, |v: i32| v + 100);
    // Every add that finds the array full reclaims expired registrations.
    assert!(source.listener_count() < 17);
    source.set(1).unwrap();
    assert_eq!(keeper.get(), 101);
}
