// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

//! Throughput benchmarks for the data processor thread (C6): the wavelet
//! transform + NLS encode pipeline applied per `DataBlock`.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flight_core::config::DEFAULT_RETRY_COUNT;
use flight_core::datablock::{Blocksize, DataBlock, SamplingRate};
use flight_core::fixpoint::Fixpoint;
use flight_core::pool::Pool;
use flight_core::queue::ReferenceQueue;
use flight_core::DataProcessor;
use std::sync::Arc;
use std::time::Duration;

fn ramp_block(pool: &Pool, blocksize: Blocksize) -> DataBlock {
    let handle = pool.allocate().expect("benchmark pool is sized generously");
    let mut block = DataBlock::new(handle, 1, 0, SamplingRate::Hz1, blocksize);
    for i in 0..blocksize.to_uint() as i16 {
        block.push(Fixpoint::from(i));
    }
    block
}

fn bench_process_single_block(c: &mut Criterion) {
    let pool = Pool::new(8192, 256);
    let input: Arc<ReferenceQueue<DataBlock>> = Arc::new(ReferenceQueue::new(256));
    let output: Arc<ReferenceQueue<DataBlock>> = Arc::new(ReferenceQueue::new(256));
    let processor =
        DataProcessor::new(pool.clone(), input.clone(), output.clone(), DEFAULT_RETRY_COUNT, Duration::ZERO);

    let mut group = c.benchmark_group("processor_pipeline");
    group.throughput(Throughput::Elements(1));
    group.bench_function("bs256_ramp_block", |b| {
        b.iter(|| {
            input.send(ramp_block(&pool, Blocksize::Bs256));
            black_box(processor.process_single_block(Duration::ZERO));
            output.receive(Some(Duration::ZERO));
        });
    });
    group.finish();
}

criterion_group!(processor_benches, bench_process_single_block);
criterion_main!(processor_benches);
