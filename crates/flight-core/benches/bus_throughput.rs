// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

//! Throughput benchmarks for the software bus (C4).
//!
//! Measures publisher-side admission/enqueue cost and end-to-end dispatch
//! throughput through a running worker thread with registered channels.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flight_core::bus::{RangeFilter, SoftwareBus, SubscriptionFilter};
use flight_core::config::DEFAULT_HEARTBEAT_TOLERANCE;
use flight_core::pool::Pool;
use flight_core::rtos::SystemClock;
use std::time::Duration;

fn bench_send_message_admission(c: &mut Criterion) {
    let pool = Pool::new(64, 4096);
    let bus = SoftwareBus::start(
        Box::new(RangeFilter { min: 0, max: u32::MAX }),
        4096,
        Duration::from_millis(1),
        Duration::from_secs(1),
        0,
        DEFAULT_HEARTBEAT_TOLERANCE,
        SystemClock,
        |_| {},
    );

    let mut group = c.benchmark_group("bus_send_message");
    group.throughput(Throughput::Elements(1));
    group.bench_function("admit_and_enqueue", |b| {
        let mut next_id = 0u32;
        b.iter(|| {
            let handle = pool.allocate();
            if let Some(handle) = handle {
                let msg = flight_core::bus::Message::new(next_id, handle);
                black_box(bus.send_message(msg));
            }
            next_id = next_id.wrapping_add(1);
        });
    });
    group.finish();
    bus.stop();
}

fn bench_end_to_end_dispatch(c: &mut Criterion) {
    let pool = Pool::new(64, 4096);
    let bus = SoftwareBus::start(
        Box::new(RangeFilter { min: 0, max: u32::MAX }),
        4096,
        Duration::from_millis(1),
        Duration::from_secs(1),
        0,
        DEFAULT_HEARTBEAT_TOLERANCE,
        SystemClock,
        |_| {},
    );
    let channel = bus.register_channel(SubscriptionFilter::accept_all(), 4096);

    let mut group = c.benchmark_group("bus_dispatch");
    group.throughput(Throughput::Elements(1));
    group.bench_function("publish_then_drain", |b| {
        b.iter(|| {
            if let Some(handle) = pool.allocate() {
                let msg = flight_core::bus::Message::new(7, handle);
                bus.send_message(msg);
            }
            while channel.receive_message().is_none() {
                std::hint::spin_loop();
            }
        });
    });
    group.finish();
    bus.stop();
}

criterion_group!(bus_benches, bench_send_message_admission, bench_end_to_end_dispatch);
criterion_main!(bus_benches);
