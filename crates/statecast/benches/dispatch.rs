// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dispatch Benchmark
//!
//! Measures the cost of Dispatcher::dispatch() for:
//! - Creates into containers of growing size
//! - Partial updates of an existing entry
//! - Fan-out to 0, 1, 8 and 32 event handlers
//!
//! No transport involved; transmissions are built in memory.

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::cast_possible_truncation)]

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use statecast::{
    Dispatcher, DynamicRecord, Header, PrimitiveKind, PropertySet, StructDescriptor,
    StructDescriptorBuilder, Transmission,
};
use std::hint::black_box as bb;
use std::sync::Arc;

fn descriptor() -> Arc<StructDescriptor> {
    StructDescriptorBuilder::new("BenchSample")
        .key_field(1, "id", PrimitiveKind::U32)
        .field(2, "seq", PrimitiveKind::U64)
        .field(3, "value", PrimitiveKind::F64)
        .string_field(4, "label")
        .build_arc()
        .expect("descriptor")
}

fn sample(desc: &Arc<StructDescriptor>, id: u32, seq: u64) -> Transmission {
    let record = DynamicRecord::new(desc)
        .with(1, id)
        .with(2, seq)
        .with(3, seq as f64 * 0.5)
        .with(4, "bench");
    Transmission::publish(1, record)
}

/// Create throughput while the container grows
fn bench_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_create");
    let desc = descriptor();

    for size in [1_000u32, 10_000, 100_000] {
        let batch: Vec<Transmission> = (0..size).map(|id| sample(&desc, id, 0)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| {
                let mut dispatcher = Dispatcher::new();
                for t in batch {
                    dispatcher.dispatch(bb(t)).expect("dispatch");
                }
                bb(dispatcher.container(&desc).map(|c| c.len()))
            });
        });
    }

    group.finish();
}

/// Partial update of one field on a populated container
fn bench_partial_update(c: &mut Criterion) {
    let desc = descriptor();
    let mut dispatcher = Dispatcher::new();
    for id in 0..1_000 {
        dispatcher.dispatch(&sample(&desc, id, 0)).expect("seed");
    }

    let attributes = PropertySet::from_tag(1) + PropertySet::from_tag(2);
    let update = Transmission::new(
        Header::new("BenchSample", 2, attributes),
        DynamicRecord::new(&desc).with(1, 500u32).with(2, 7u64),
    );

    c.bench_function("dispatch_partial_update", |b| {
        b.iter(|| dispatcher.dispatch(bb(&update)).expect("update"));
    });
}

/// Update fan-out to a growing number of event handlers
fn bench_event_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch_event_fanout");
    let desc = descriptor();

    for handlers in [0usize, 1, 8, 32] {
        let mut dispatcher = Dispatcher::new();
        dispatcher.dispatch(&sample(&desc, 1, 0)).expect("seed");
        for _ in 0..handlers {
            dispatcher.add_event_handler(&desc, |_, event| {
                bb(event.updated_properties());
                Ok(())
            });
        }

        let update = sample(&desc, 1, 1);
        group.bench_with_input(BenchmarkId::from_parameter(handlers), &update, |b, update| {
            b.iter(|| dispatcher.dispatch(bb(update)).expect("update"));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_create, bench_partial_update, bench_event_fanout);
criterion_main!(benches);
