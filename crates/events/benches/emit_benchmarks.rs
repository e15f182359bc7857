use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use nsbus_events::{Emitter, JsonArgs};
use serde_json::json;

/// Emitter with one listener on every prefix of `depth` nested segments.
fn nested_emitter(depth: usize) -> (Emitter<JsonArgs>, String) {
    let mut emitter = Emitter::new();
    let mut path = Vec::new();
    emitter.on("", |_: &JsonArgs| ());
    for level in 0..depth {
        path.push(format!("seg{level}"));
        emitter.on(path.join("."), |args: &JsonArgs| {
            black_box(args.len());
        });
    }
    (emitter, path.join("."))
}

fn bench_emit_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit_by_depth");
    group.throughput(Throughput::Elements(1));

    for depth in [1usize, 4, 16].iter() {
        group.bench_with_input(BenchmarkId::new("ancestor_chain", depth), depth, |b, &depth| {
            let (mut emitter, name) = nested_emitter(depth);
            let args = vec![json!({ "id": 1 })];
            b.iter(|| black_box(emitter.emit(name.as_str(), args.clone())));
        });
    }

    group.finish();
}

fn bench_wide_trie(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit_wide_trie");

    for width in [10usize, 1_000].iter() {
        group.bench_with_input(BenchmarkId::new("siblings", width), width, |b, &width| {
            let mut emitter: Emitter<JsonArgs> = Emitter::new();
            for n in 0..width {
                emitter.on(format!("tenant.{n}.created"), |_: &JsonArgs| ());
            }
            let name = format!("tenant.{}.created", width / 2);
            b.iter(|| black_box(emitter.emit(name.as_str(), Vec::new())));
        });
    }

    group.finish();
}

fn bench_register_and_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("subscribe_then_off", |b| {
        let mut emitter: Emitter<JsonArgs> = Emitter::new();
        b.iter(|| {
            let id = emitter.subscribe("a.b.c", |_: &JsonArgs| ());
            black_box(emitter.off("a.b.c", id))
        });
    });

    group.bench_function("replay_pending_backlog", |b| {
        b.iter_batched(
            || {
                let mut emitter: Emitter<JsonArgs> = Emitter::new();
                emitter.queue_unhandled_events(true);
                for n in 0..100 {
                    emitter.emit("late", vec![json!(n)]);
                }
                emitter
            },
            |mut emitter| {
                emitter.on("late", |_: &JsonArgs| ());
                black_box(emitter.pending_len())
            },
            criterion::BatchSize::SmallInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_emit_depth,
    bench_wide_trie,
    bench_register_and_remove
);
criterion_main!(benches);
