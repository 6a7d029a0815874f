// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! C5/C6: the fixed-size data carrier that moves between the aggregator, the
//! processor thread, and the wire.
//!
//! Grounded on `outpost::compression::DataAggregatorBase`/`DataBlock` (the
//! header fields, the one-way state machine, and the `SamplingRate`/
//! `Blocksize` enumerations come straight from `data_aggregator.h` and
//! `data_aggregator_impl.h`; `data_block.h` itself never shipped in the
//! retrieved source, so the exact on-wire byte layout below is this port's
//! own design, resolved from the header-field list in SPEC §6). A `DataBlock`
//! owns a [`Handle`](crate::pool::Handle) proving it holds a pool frame, but
//! represents its typed payload as an owned `Payload` enum rather than a
//! byte-cursor view into the frame: this is a host-`std` build, not the
//! no-heap embedded target the original C++ compiles to, so typed
//! `Vec<Fixpoint>`/`Vec<i16>` manipulation is the idiomatic choice here. The
//! `encode` step below is what produces the actual on-wire bytes.
use crate::fixpoint::Fixpoint;
use crate::pool::Handle;

/// Fixed header size in bytes: 16-bit parameterId, 64-bit startTime, 8-bit
/// samplingRate tag, 8-bit blocksize tag, 8-bit state flag, padded to an
/// 8-byte boundary.
pub const HEADER_SIZE: usize = 16;

/// Size of the bitstream section's own length-in-bits prefix.
pub const BITSTREAM_HEADER_SIZE: usize = 2;

/// Sample rate a parameter is aggregated at. `Disabled` marks an aggregator
/// with no active rate (never emits).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SamplingRate {
    Disabled = 0,
    Hz05 = 1,
    Hz1 = 2,
    Hz2 = 3,
    Hz4 = 4,
    Hz8 = 5,
    Hz16 = 6,
    Hz32 = 7,
}

impl SamplingRate {
    /// The rate in tenths of a hertz (so `Hz05` -> 5), mirroring the
    /// source's `toUInt(SamplingRate)` free function.
    pub fn to_uint(self) -> u32 {
        match self {
            Self::Disabled => 0,
            Self::Hz05 => 5,
            Self::Hz1 => 10,
            Self::Hz2 => 20,
            Self::Hz4 => 40,
            Self::Hz8 => 80,
            Self::Hz16 => 160,
            Self::Hz32 => 320,
        }
    }

    /// Recovers a `SamplingRate` from its 8-bit wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Disabled),
            1 => Some(Self::Hz05),
            2 => Some(Self::Hz1),
            3 => Some(Self::Hz2),
            4 => Some(Self::Hz4),
            5 => Some(Self::Hz8),
            6 => Some(Self::Hz16),
            7 => Some(Self::Hz32),
            _ => None,
        }
    }
}

/// Block size a DataBlock is aggregated to. Values are restricted to powers
/// of two in `{16,128,256,512,1024,2048,4096}` (SPEC §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Blocksize {
    Disabled = 0,
    Bs16 = 1,
    Bs128 = 2,
    Bs256 = 3,
    Bs512 = 4,
    Bs1024 = 5,
    Bs2048 = 6,
    Bs4096 = 7,
}

impl Blocksize {
    /// The numeric block size (so `Bs16` -> 16), mirroring `toUInt(Blocksize)`.
    pub fn to_uint(self) -> u32 {
        match self {
            Self::Disabled => 0,
            Self::Bs16 => 16,
            Self::Bs128 => 128,
            Self::Bs256 => 256,
            Self::Bs512 => 512,
            Self::Bs1024 => 1024,
            Self::Bs2048 => 2048,
            Self::Bs4096 => 4096,
        }
    }

    /// Recovers a `Blocksize` from its 8-bit wire tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Disabled),
            1 => Some(Self::Bs16),
            2 => Some(Self::Bs128),
            3 => Some(Self::Bs256),
            4 => Some(Self::Bs512),
            5 => Some(Self::Bs1024),
            6 => Some(Self::Bs2048),
            7 => Some(Self::Bs4096),
            _ => None,
        }
    }
}

/// The one-way state machine a DataBlock moves through: `Empty` (just
/// allocated) -> `Filling` (receiving samples) -> `Transformed` (wavelet
/// applied) -> `Encoded` (NLS bitstream written). Transitions never reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    Empty,
    Filling,
    Transformed,
    Encoded,
}

impl BlockState {
    /// The wire state flag: samples (untransformed) collapse to 0, since the
    /// wire format only distinguishes samples/transformed/encoded.
    fn wire_tag(self) -> u8 {
        match self {
            Self::Empty | Self::Filling => 0,
            Self::Transformed => 1,
            Self::Encoded => 2,
        }
    }
}

/// The block's typed payload, one variant per state after `Empty`.
#[derive(Debug, Clone)]
pub enum Payload {
    Samples(Vec<Fixpoint>),
    Coefficients(Vec<i16>),
    /// `bit_len` is the exact number of meaningful bits in `bytes` (the last
    /// byte may be partially padded); the wire length prefix carries this,
    /// not `bytes.len() * 8`, so the decoder stops precisely mid-byte.
    Encoded { bytes: Vec<u8>, bit_len: u16 },
}

/// A fixed-size carrier moving fixpoint samples, then wavelet coefficients,
/// then an encoded bitstream, between the aggregator and the processor.
pub struct DataBlock {
    handle: Handle,
    parameter_id: u16,
    start_time: u64,
    sampling_rate: SamplingRate,
    blocksize: Blocksize,
    state: BlockState,
    payload: Payload,
}

impl DataBlock {
    /// Creates an empty block backed by `handle`, stamped with the
    /// parameter id, start time (GPS microseconds), sampling rate, and block
    /// size at allocation time (aggregator step 2, SPEC §4.5).
    pub fn new(
        handle: Handle,
        parameter_id: u16,
        start_time: u64,
        sampling_rate: SamplingRate,
        blocksize: Blocksize,
    ) -> Self {
        Self {
            handle,
            parameter_id,
            start_time,
            sampling_rate,
            blocksize,
            state: BlockState::Empty,
            payload: Payload::Samples(Vec::new()),
        }
    }

    pub fn parameter_id(&self) -> u16 {
        self.parameter_id
    }

    pub fn start_time(&self) -> u64 {
        self.start_time
    }

    pub fn sampling_rate(&self) -> SamplingRate {
        self.sampling_rate
    }

    pub fn blocksize(&self) -> Blocksize {
        self.blocksize
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Swaps in a freshly allocated output frame (processor step 5, SPEC
    /// §4.6), releasing this block's previous handle back to its pool as
    /// soon as the old `Handle` is dropped.
    pub fn replace_handle(&mut self, handle: Handle) {
        self.handle = handle;
    }

    /// Number of samples/coefficients currently held.
    pub fn sample_count(&self) -> usize {
        match &self.payload {
            Payload::Samples(v) => v.len(),
            Payload::Coefficients(v) => v.len(),
            Payload::Encoded { .. } => self.blocksize.to_uint() as usize,
        }
    }

    /// Whether the block has accumulated exactly `blocksize` samples and is
    /// ready to be handed to a `Sender` (SPEC §4.5 step 3).
    pub fn is_complete(&self) -> bool {
        self.state == BlockState::Filling && self.sample_count() == self.blocksize.to_uint() as usize
    }

    /// Appends one fixpoint sample. Returns `false` if the block is full or
    /// already past the filling stage.
    pub fn push(&mut self, sample: Fixpoint) -> bool {
        if !matches!(self.state, BlockState::Empty | BlockState::Filling) {
            return false;
        }
        let Payload::Samples(samples) = &mut self.payload else {
            return false;
        };
        if samples.len() >= self.blocksize.to_uint() as usize {
            return false;
        }
        samples.push(sample);
        self.state = BlockState::Filling;
        true
    }

    /// Borrows the samples, for the wavelet transform to consume in place.
    /// `None` unless the block is still in `Filling` state.
    pub fn samples(&self) -> Option<&[Fixpoint]> {
        match (&self.state, &self.payload) {
            (BlockState::Filling, Payload::Samples(v)) => Some(v),
            _ => None,
        }
    }

    /// Replaces the sample payload with wavelet coefficients, transitioning
    /// `Filling -> Transformed`. Returns `false` if the block was not in
    /// `Filling` state.
    pub fn set_transformed(&mut self, coefficients: Vec<i16>) -> bool {
        if self.state != BlockState::Filling {
            return false;
        }
        self.payload = Payload::Coefficients(coefficients);
        self.state = BlockState::Transformed;
        true
    }

    /// Borrows the wavelet coefficients. `None` unless `Transformed`.
    pub fn coefficients(&self) -> Option<&[i16]> {
        match (&self.state, &self.payload) {
            (BlockState::Transformed, Payload::Coefficients(v)) => Some(v),
            _ => None,
        }
    }

    /// Replaces the payload with an encoded bitstream, transitioning
    /// `Transformed -> Encoded`. Returns `false` if not `Transformed`.
    pub fn set_encoded(&mut self, bytes: Vec<u8>, bit_len: u16) -> bool {
        if self.state != BlockState::Transformed {
            return false;
        }
        self.payload = Payload::Encoded { bytes, bit_len };
        self.state = BlockState::Encoded;
        true
    }

    /// Produces the full on-wire representation: fixed header, bitstream
    /// length prefix, then bitstream bytes. `None` unless `Encoded`.
    pub fn to_wire_bytes(&self) -> Option<Vec<u8>> {
        let Payload::Encoded { bytes, bit_len } = &self.payload else {
            return None;
        };
        let mut out = Vec::with_capacity(HEADER_SIZE + BITSTREAM_HEADER_SIZE + bytes.len());
        out.extend_from_slice(&self.parameter_id.to_be_bytes());
        out.extend_from_slice(&self.start_time.to_be_bytes());
        out.push(self.sampling_rate as u8);
        out.push(self.blocksize as u8);
        out.push(self.state.wire_tag());
        out.extend(std::iter::repeat(0u8).take(HEADER_SIZE - out.len()));
        out.extend_from_slice(&bit_len.to_be_bytes());
        out.extend_from_slice(bytes);
        Some(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Pool;

    fn alloc_handle() -> Handle {
        Pool::new(64, 1).allocate().unwrap()
    }

    #[test]
    fn blocksize_to_uint_matches_source_table() {
        assert_eq!(Blocksize::Disabled.to_uint(), 0);
        assert_eq!(Blocksize::Bs16.to_uint(), 16);
        assert_eq!(Blocksize::Bs128.to_uint(), 128);
        assert_eq!(Blocksize::Bs256.to_uint(), 256);
        assert_eq!(Blocksize::Bs512.to_uint(), 512);
        assert_eq!(Blocksize::Bs1024.to_uint(), 1024);
        assert_eq!(Blocksize::Bs2048.to_uint(), 2048);
        assert_eq!(Blocksize::Bs4096.to_uint(), 4096);
    }

    #[test]
    fn new_block_starts_empty() {
        let block = DataBlock::new(alloc_handle(), 7, 0, SamplingRate::Hz05, Blocksize::Bs16);
        assert_eq!(block.state(), BlockState::Empty);
        assert_eq!(block.sample_count(), 0);
    }

    #[test]
    fn push_until_complete_then_refuses() {
        // Seed scenario 4, SPEC §8: blocksize=16, push 16 ramp samples.
        let mut block = DataBlock::new(alloc_handle(), 1, 1000, SamplingRate::Hz05, Blocksize::Bs16);
        for i in 0..16i16 {
            assert!(block.push(Fixpoint::from(i)));
        }
        assert!(block.is_complete());
        assert_eq!(block.state(), BlockState::Filling);
        assert!(!block.push(Fixpoint::from(99i16)), "block is already full");
    }

    #[test]
    fn transitions_are_one_way() {
        let mut block = DataBlock::new(alloc_handle(), 1, 0, SamplingRate::Hz1, Blocksize::Bs16);
        block.push(Fixpoint::from(1i16));
        assert!(block.set_transformed(vec![1, 2, 3]));
        assert_eq!(block.state(), BlockState::Transformed);
        assert!(
            !block.push(Fixpoint::from(2i16)),
            "cannot push after transform"
        );
        assert!(block.set_encoded(vec![0xAB], 8));
        assert_eq!(block.state(), BlockState::Encoded);
        assert!(
            !block.set_transformed(vec![4, 5]),
            "cannot re-enter transformed from encoded"
        );
    }

    #[test]
    fn wire_bytes_have_expected_structural_shape() {
        let mut block = DataBlock::new(alloc_handle(), 42, 123456, SamplingRate::Hz05, Blocksize::Bs16);
        block.set_transformed(vec![1, -2, 3]);
        block.set_encoded(vec![0xAA, 0xBB, 0xCC], 24);
        let wire = block.to_wire_bytes().unwrap();
        assert_eq!(
            wire.len(),
            HEADER_SIZE + BITSTREAM_HEADER_SIZE + 3,
            "total size must match header + bitstream-length-prefix + payload bytes"
        );
        assert_eq!(u16::from_be_bytes([wire[0], wire[1]]), 42);
        assert_eq!(wire[12], BlockState::Encoded.wire_tag(), "encoded state flag");
    }
}
