//! Benchmarks for the pipeline hot paths
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framecipher::cipher::{LogisticXor, RandomXor};
use framecipher::pipeline::{
    transform_fn, CancelToken, HandoffQueue, IndexRange, Item, ItemSink, IterSource, Pipeline,
    Popped, Transform,
};
use framecipher::Frame;
use std::sync::Arc;

/// Sink that drops everything it is given.
struct NullSink;

impl<P: Send> ItemSink<P> for NullSink {
    fn consume(&mut self, item: Item<P>) -> Result<(), framecipher::pipeline::BoxError> {
        black_box(item);
        Ok(())
    }
}

fn bench_queue_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_handoff");

    for count in [1_000u64, 10_000].iter() {
        group.throughput(Throughput::Elements(*count));
        group.bench_with_input(BenchmarkId::new("spsc", count), count, |b, &count| {
            b.iter(|| {
                let queue = Arc::new(HandoffQueue::new());
                let producer = {
                    let queue = queue.clone();
                    std::thread::spawn(move || {
                        let _finish = HandoffQueue::finish_on_drop(queue.clone());
                        for i in 0..count {
                            queue.push(i);
                        }
                    })
                };
                let token = CancelToken::new();
                let mut sum = 0u64;
                while let Popped::Item(v) = queue.pop_cancellable(&token) {
                    sum = sum.wrapping_add(v);
                }
                let _ = producer.join();
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_ciphers(c: &mut Criterion) {
    let mut group = c.benchmark_group("cipher");

    for (width, height) in [(320u32, 240u32), (1280, 720)].iter() {
        let frame = Frame::zeroed(*width, *height).unwrap_or_else(|e| panic!("{}", e));
        let label = format!("{}x{}", width, height);
        group.throughput(Throughput::Bytes(frame.byte_len() as u64));

        group.bench_with_input(BenchmarkId::new("logistic", &label), &frame, |b, frame| {
            let mut cipher = LogisticXor::default();
            let mut frame = frame.clone();
            b.iter(|| cipher.apply(black_box(&mut frame)));
        });

        group.bench_with_input(BenchmarkId::new("random", &label), &frame, |b, frame| {
            let mut cipher = RandomXor::from_seed(1);
            let mut frame = frame.clone();
            b.iter(|| cipher.apply(black_box(&mut frame)));
        });
    }

    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let mut group = c.benchmark_group("end_to_end");
    group.sample_size(20);

    for count in [100u64, 1_000].iter() {
        group.throughput(Throughput::Elements(*count));
        group.bench_with_input(BenchmarkId::new("u64_items", count), count, |b, &count| {
            b.iter(|| {
                Pipeline::builder(IndexRange::new(count / 4, count / 2))
                    .build()
                    .run(
                        IterSource::new(0..count),
                        transform_fn("mix", |v: &mut u64| *v = v.rotate_left(7) ^ 0x5a5a),
                        NullSink,
                    )
                    .map(|report| black_box(report.frames_written))
            });
        });

        group.bench_with_input(BenchmarkId::new("frames_64x64", count), count, |b, &count| {
            b.iter(|| {
                let frames = (0..count).map(|_| Frame::zeroed(64, 64));
                Pipeline::builder(IndexRange::all())
                    .build()
                    .run(
                        IterSource::new(frames.filter_map(Result::ok)),
                        LogisticXor::default(),
                        NullSink,
                    )
                    .map(|report| black_box(report.frames_written))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_queue_handoff, bench_ciphers, bench_end_to_end);
criterion_main!(benches);
