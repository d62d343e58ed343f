use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use signal_store::reactive::{Memo, Signal};
use signal_store::Store;

fn signal_write_benchmark(c: &mut Criterion) {
    let signal: Signal<i64> = Signal::new(0);

    c.bench_function("signal_write", |b| {
        let mut i = 0;
        b.iter(|| {
            signal.set(black_box(i));
            i += 1;
        });
    });
}

fn memo_read_after_write_benchmark(c: &mut Criterion) {
    let a: Signal<i64> = Signal::new(5);
    let sum = Memo::new({
        let a = a.clone();
        move || a.get() + 1
    });

    c.bench_function("memo_read_after_write", |b| {
        let mut i = 0;
        b.iter(|| {
            a.set(i);
            black_box(sum.get());
            i += 1;
        });
    });
}

fn dispatch_benchmark(c: &mut Criterion) {
    let store = Store::with_state([("counter", json!(0))]);
    store
        .add_action("INC", |store, _payload| {
            let next = store.get("counter")?.as_i64().unwrap_or(0) + 1;
            store.set("counter", json!(next));
            Ok(Value::Null)
        })
        .unwrap();

    c.bench_function("store_dispatch", |b| {
        b.iter(|| {
            black_box(store.dispatch("INC", Value::Null).unwrap());
        });
    });
}

fn batch_update_benchmark(c: &mut Criterion) {
    let store = Store::with_state((0..16).map(|i| (format!("key{i}"), json!(0))));
    let _total = store
        .compute(&["key0", "key1", "key2", "key3"], |values| {
            values.iter().filter_map(Value::as_i64).sum::<i64>()
        })
        .unwrap();

    c.bench_function("store_batch_update_16", |b| {
        let mut i = 0;
        b.iter(|| {
            store.batch_update((0..16).map(|k| (format!("key{k}"), json!(i))));
            i += 1;
        });
    });
}

criterion_group!(
    benches,
    signal_write_benchmark,
    memo_read_after_write_benchmark,
    dispatch_benchmark,
    batch_update_benchmark
);
criterion_main!(benches);
