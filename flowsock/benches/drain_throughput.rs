//! Drain loop throughput over the in-process transport.
//!
//! Measures how fast the send drain moves queued messages into a peer and
//! how fast the receive drain turns them back into `message` events,
//! with and without high water mark pressure.

use std::cell::Cell;
use std::rc::Rc;

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flowsock::prelude::*;

const MESSAGE_SIZES: &[usize] = &[64, 1024, 16384];
const MESSAGE_COUNT: usize = 10_000;

fn pipeline(ctx: &Context, endpoint: &str, hwm: usize) -> (Socket, Socket) {
    let pull = flowsock::socket_in(ctx, SocketType::Pull).unwrap();
    let push = flowsock::socket_in(ctx, SocketType::Push).unwrap();
    pull.set_option(SocketOption::RcvHwm, hwm).unwrap();
    push.set_option(SocketOption::SndHwm, hwm).unwrap();
    pull.bind(endpoint).unwrap();
    push.connect(endpoint).unwrap();
    (pull, push)
}

/// Unlimited high water mark: every send drains straight through.
fn push_pull_unbounded(c: &mut Criterion) {
    flowsock::dev_tracing::init_tracing();
    let mut group = c.benchmark_group("drain/push_pull/unbounded");
    let ctx = Context::new();

    for &size in MESSAGE_SIZES {
        group.throughput(Throughput::Bytes((size * MESSAGE_COUNT) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let payload = Bytes::from(vec![0u8; size]);
            let (pull, push) = pipeline(&ctx, &format!("inproc://unbounded-{size}"), 0);
            let received = Rc::new(Cell::new(0usize));
            let counter = Rc::clone(&received);
            pull.on_message(move |_, msg| {
                black_box(msg);
                counter.set(counter.get() + 1);
            });

            b.iter(|| {
                received.set(0);
                for _ in 0..MESSAGE_COUNT {
                    push.send(payload.clone()).unwrap();
                }
                while received.get() < MESSAGE_COUNT {
                    pull.process_ready().unwrap();
                }
            });
        });
    }
    group.finish();
}

/// Small high water mark: the send drain keeps hitting "would block" and
/// resumes on writable edges.
fn push_pull_backpressure(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain/push_pull/hwm_16");
    let ctx = Context::new();

    for &size in MESSAGE_SIZES {
        group.throughput(Throughput::Elements(MESSAGE_COUNT as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let payload = Bytes::from(vec![0u8; size]);
            let (pull, push) = pipeline(&ctx, &format!("inproc://hwm-{size}"), 16);

            b.iter(|| {
                let mut received = 0;
                for _ in 0..MESSAGE_COUNT {
                    push.send(payload.clone()).unwrap();
                    while let Some(msg) = pull.read().unwrap() {
                        black_box(msg);
                        received += 1;
                    }
                    push.process_ready().unwrap();
                }
                while received < MESSAGE_COUNT {
                    push.process_ready().unwrap();
                    while let Some(msg) = pull.read().unwrap() {
                        black_box(msg);
                        received += 1;
                    }
                }
                pull.process_ready().unwrap();
            });
        });
    }
    group.finish();
}

/// Multipart batches: frames of one message travel as a unit.
fn multipart_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("drain/multipart");
    let ctx = Context::new();
    let (pull, push) = pipeline(&ctx, "inproc://multipart", 0);

    for parts in [2usize, 5, 10] {
        group.throughput(Throughput::Elements(MESSAGE_COUNT as u64));
        group.bench_with_input(BenchmarkId::new("frames", parts), &parts, |b, &parts| {
            let frames: Vec<Bytes> = (0..parts).map(|i| Bytes::from(format!("part-{i}"))).collect();
            b.iter(|| {
                for _ in 0..MESSAGE_COUNT {
                    push.send(frames.as_slice()).unwrap();
                }
                for _ in 0..MESSAGE_COUNT {
                    black_box(pull.read().unwrap());
                }
                pull.process_ready().unwrap();
            });
        });
    }
    group.finish();
}

criterion_group!(benches, push_pull_unbounded, push_pull_backpressure, multipart_batches);
criterion_main!(benches);
