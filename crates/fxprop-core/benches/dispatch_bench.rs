//! Benchmarks for listener registration and dispatch.
//!
//! The 0/1/2-listener shapes are the common case and should stay
//! allocation-free on dispatch.
//!
//! Run with: cargo bench -p fxprop-core --bench dispatch_bench

use std::cell::{Cell, RefCell};
use std::hint::black_box;
use std::rc::Rc;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fxprop_core::{
    ArrayChange, ChangeRef, InvalidationRef, ListenerHelper, change_listener,
    invalidation_listener,
};

type Helper = ListenerHelper<(), ArrayChange>;

fn populated(count: usize, hits: &Rc<Cell<u64>>) -> RefCell<Helper> {
    let cell = RefCell::new(ListenerHelper::new());
    for i in 0..count {
        let hits = Rc::clone(hits);
        if i % 2 == 0 {
            let l: InvalidationRef<()> =
                invalidation_listener(move |_: &()| hits.set(hits.get() + 1));
            ListenerHelper::update(&cell, |h| h.register_invalidation_listener(l));
        } else {
            let l: ChangeRef<ArrayChange> =
                change_listener(move |_: &ArrayChange| hits.set(hits.get() + 1));
            ListenerHelper::update(&cell, |h| h.register_change_listener(l));
        }
    }
    cell
}

// =============================================================================
// Dispatch
// =============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("helper/dispatch");
    let event = ArrayChange::new(false, 0, 1);

    for count in [0usize, 1, 2, 3, 50] {
        let hits = Rc::new(Cell::new(0u64));
        let cell = populated(count, &hits);
        group.throughput(Throughput::Elements(count.max(1) as u64));
        group.bench_with_input(BenchmarkId::new("fire", count), &cell, |b, cell| {
            b.iter(|| ListenerHelper::fire(black_box(cell), &(), black_box(&event)));
        });
    }

    group.finish();
}

// =============================================================================
// Registration churn
// =============================================================================

fn bench_add_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("helper/churn");

    for count in [1usize, 2, 50] {
        let listeners: Vec<InvalidationRef<()>> = (0..count)
            .map(|_| invalidation_listener(|_: &()| {}))
            .collect();
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(
            BenchmarkId::new("add_then_remove", count),
            &listeners,
            |b, listeners| {
                b.iter(|| {
                    let mut helper: Helper = ListenerHelper::new();
                    for l in listeners {
                        helper = helper.add_invalidation_listener(Rc::clone(l));
                    }
                    for l in listeners {
                        helper = helper.remove_invalidation_listener(l);
                    }
                    black_box(helper)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_dispatch, bench_add_remove);
criterion_main!(benches);
