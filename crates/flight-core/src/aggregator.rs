// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C5: per-parameter fixpoint sample aggregator.
//!
//! Grounded on `outpost::compression::DataAggregatorBase`/`DataAggregator`
//! (`data_aggregator.h`, `data_aggregator_impl.h`): the enable state machine,
//! the staged sampling-rate/blocksize adoption, and the `push` control flow
//! are ported term for term. The source's self-registering intrusive list
//! (`ImplicitList<DataAggregatorBase>`) is replaced by [`Registry`], per
//! SPEC §9's "process-wide intrusive lists" redesign note: the composition
//! root wraps an aggregator in `Arc<Mutex<_>>` and registers it explicitly
//! rather than the aggregator registering itself in its own constructor.
use crate::datablock::{Blocksize, DataBlock, SamplingRate};
use crate::fixpoint::Fixpoint;
use crate::pool::Pool;
use crate::rtos::Clock;
use std::time::Instant;

/// Pluggable policy an aggregator hands a completed block to (SPEC §4.5
/// "Sender policy"), decoupling block production from transmission
/// mechanism. Grounded on `DataBlockSender` (`data_block_sender.h`).
pub trait Sender: Send + Sync {
    /// Attempts to hand off `block`. Returns whether it was accepted.
    fn send(&self, block: DataBlock) -> bool;
}

/// Makes exactly one attempt to enqueue onto a `ReferenceQueue`, the
/// baseline policy ported from `OneTimeSender`. Retry-with-backoff is the
/// processor's concern, not the aggregator's (SPEC §4.5).
pub struct OneTimeSender {
    output_queue: std::sync::Arc<crate::queue::ReferenceQueue<DataBlock>>,
}

impl OneTimeSender {
    pub fn new(output_queue: std::sync::Arc<crate::queue::ReferenceQueue<DataBlock>>) -> Self {
        Self { output_queue }
    }
}

impl Sender for OneTimeSender {
    fn send(&self, block: DataBlock) -> bool {
        self.output_queue.send(block)
    }
}

impl<T: Sender + ?Sized> Sender for std::sync::Arc<T> {
    fn send(&self, block: DataBlock) -> bool {
        (**self).send(block)
    }
}

/// Per-parameter sink for fixpoint samples. Buffers into a current
/// [`DataBlock`], handing completed blocks to a [`Sender`].
pub struct DataAggregator<C: Clock, S: Sender> {
    parameter_id: u16,
    sampling_rate: SamplingRate,
    next_sampling_rate: SamplingRate,
    blocksize: Blocksize,
    next_blocksize: Blocksize,
    enabled: bool,
    disable_after_current_block: bool,
    current: Option<DataBlock>,
    pool: Pool,
    sender: S,
    clock: C,
    // `Instant` carries no wall-clock epoch on a host build; block start
    // times are modeled as microseconds elapsed since construction rather
    // than true GPS epoch microseconds (SPEC §3's `startTime`).
    epoch: Instant,
}

impl<C: Clock, S: Sender> DataAggregator<C, S> {
    pub fn new(
        parameter_id: u16,
        sampling_rate: SamplingRate,
        blocksize: Blocksize,
        pool: Pool,
        sender: S,
        clock: C,
    ) -> Self {
        let epoch = clock.now();
        Self {
            parameter_id,
            sampling_rate,
            next_sampling_rate: sampling_rate,
            blocksize,
            next_blocksize: blocksize,
            enabled: false,
            disable_after_current_block: false,
            current: None,
            pool,
            sender,
            clock,
            epoch,
        }
    }

    pub fn parameter_id(&self) -> u16 {
        self.parameter_id
    }

    pub fn is_block_empty(&self) -> bool {
        self.current.is_none()
    }

    pub fn sampling_rate(&self) -> SamplingRate {
        self.sampling_rate
    }

    pub fn next_sampling_rate(&self) -> SamplingRate {
        self.next_sampling_rate
    }

    pub fn has_sampling_rate_changed(&self) -> bool {
        self.sampling_rate != self.next_sampling_rate
    }

    /// Stages a new sampling rate, adopted at the start of the next block.
    pub fn set_sampling_rate(&mut self, sr: SamplingRate) {
        self.next_sampling_rate = sr;
    }

    pub fn blocksize(&self) -> Blocksize {
        self.blocksize
    }

    pub fn next_blocksize(&self) -> Blocksize {
        self.next_blocksize
    }

    pub fn has_blocksize_changed(&self) -> bool {
        self.blocksize != self.next_blocksize
    }

    /// Stages a new block size, adopted at the start of the next block.
    pub fn set_blocksize(&mut self, bs: Blocksize) {
        self.next_blocksize = bs;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enable(&mut self) {
        self.enabled = true;
        self.disable_after_current_block = false;
    }

    pub fn enable_for_one_block(&mut self) {
        self.enabled = true;
        self.disable_after_current_block = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn disable_after_current_block(&mut self) {
        self.disable_after_current_block = true;
    }

    fn start_time_micros(&self) -> u64 {
        self.clock.now().duration_since(self.epoch).as_micros() as u64
    }

    /// Appends one sample (SPEC §4.5 `push`). Returns whether the push
    /// itself succeeded; a block reaching capacity is handed to the
    /// `Sender` as a side effect, independent of this return value.
    pub fn push(&mut self, sample: Fixpoint) -> bool {
        if !self.enabled {
            return false;
        }

        if self.current.is_none() {
            let Some(handle) = self.pool.allocate() else {
                return false;
            };
            self.sampling_rate = self.next_sampling_rate;
            self.blocksize = self.next_blocksize;
            self.current = Some(DataBlock::new(
                handle,
                self.parameter_id,
                self.start_time_micros(),
                self.sampling_rate,
                self.blocksize,
            ));
        }

        let Some(block) = self.current.as_mut() else {
            return false;
        };
        let mut res = block.push(sample);

        if block.is_complete() {
            let completed = self.current.take().unwrap();
            res = self.sender.send(completed);
            if self.disable_after_current_block {
                self.disable();
                self.disable_after_current_block = false;
            }
        }

        res
    }
}
