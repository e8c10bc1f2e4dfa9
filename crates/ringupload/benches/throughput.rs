use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ringupload_rs::{BufferId, RingAllocator, Timeline, Uploader, UploaderConfig};

const CAPACITY: usize = 1 << 20;
const BATCHES: u64 = 10_000;

fn bench_allocator_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocator");

    for reservations in [1usize, 16, 256].iter() {
        group.throughput(Throughput::Elements(BATCHES * *reservations as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_per_batch", reservations)),
            reservations,
            |b, &n| {
                b.iter(|| {
                    let mut ring = RingAllocator::new(CAPACITY).unwrap();
                    let mut completed = 0;
                    for _ in 0..BATCHES {
                        for _ in 0..n {
                            black_box(ring.reserve(64).unwrap());
                        }
                        // Consumer lags two batches behind
                        let batch = ring.close_batch(completed);
                        completed = batch.token.saturating_sub(2);
                    }
                    black_box(ring.claimed_size());
                });
            },
        );
    }

    group.finish();
}

fn bench_uploader_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("uploader");
    let payload = vec![0xA5u8; 4096];
    group.throughput(Throughput::Bytes(BATCHES * payload.len() as u64));

    group.bench_function("4k_upload_per_batch", |b| {
        b.iter(|| {
            let timeline = Timeline::new(0);
            let config = UploaderConfig::default().with_capacity(CAPACITY);
            let mut uploader = Uploader::new(config, &timeline).unwrap();
            for i in 0..BATCHES {
                uploader.upload(BufferId(i), 0, &payload).unwrap();
                let submission = uploader.submit();
                timeline.signal(submission.token().saturating_sub(4));
                black_box(submission);
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_allocator_cycle, bench_uploader_stream);
criterion_main!(benches);
