// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Near-lossless (NLS) bitstream codec for wavelet coefficients.
//!
//! The original NLS encoder/decoder pair never shipped in the retrieved
//! source (only its callers and regression test names did), so this is this
//! port's own design, resolved into SPEC §4.6's "wire-level bitstream shape"
//! paragraph: each coefficient is a sign bit, then a unary run of set bits
//! terminated by a zero bit whose length is the magnitude, with an escape to
//! a fixed-width field once the run hits a ceiling (bounding worst-case
//! expansion for large coefficients). Bits are packed MSB-first within each
//! byte.

/// Unary runs longer than this escape to a fixed-width magnitude field.
const RUN_CEILING: u32 = 16;

/// Width, in bits, of the escaped magnitude field. Wide enough for the full
/// `u16` magnitude range (`i16::MIN.unsigned_abs() == 32768`).
const ESCAPE_WIDTH: u32 = 16;

struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    filled: u32,
    total_bits: u32,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            current: 0,
            filled: 0,
            total_bits: 0,
        }
    }

    fn write_bit(&mut self, bit: bool) {
        self.current = (self.current << 1) | u8::from(bit);
        self.filled += 1;
        self.total_bits += 1;
        if self.filled == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.filled = 0;
        }
    }

    fn write_bits(&mut self, value: u32, width: u32) {
        for i in (0..width).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Pads the final partial byte with zero bits and returns the packed
    /// bytes alongside the exact meaningful bit count.
    fn finish(mut self) -> (Vec<u8>, u16) {
        if self.filled > 0 {
            self.current <<= 8 - self.filled;
            self.bytes.push(self.current);
        }
        (self.bytes, self.total_bits as u16)
    }
}

struct BitReader<'a> {
    bytes: &'a [u8],
    total_bits: usize,
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8], total_bits: usize) -> Self {
        Self {
            bytes,
            total_bits,
            pos: 0,
        }
    }

    fn read_bit(&mut self) -> Option<bool> {
        if self.pos >= self.total_bits {
            return None;
        }
        let byte = self.bytes[self.pos / 8];
        let bit = (byte >> (7 - (self.pos % 8))) & 1;
        self.pos += 1;
        Some(bit == 1)
    }

    fn read_bits(&mut self, width: u32) -> Option<u32> {
        let mut value = 0u32;
        for _ in 0..width {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Some(value)
    }
}

fn build_signed(sign_negative: bool, magnitude: u32) -> i16 {
    if sign_negative {
        -(magnitude as i32) as i16
    } else {
        magnitude as i16
    }
}

/// Encodes `coefficients` into a packed bitstream, returning the bytes
/// alongside the exact meaningful bit count (the last byte may be padded).
pub fn encode(coefficients: &[i16]) -> (Vec<u8>, u16) {
    let mut writer = BitWriter::new();
    for &c in coefficients {
        let sign_negative = c < 0;
        let magnitude = c.unsigned_abs() as u32;
        writer.write_bit(sign_negative);
        if magnitude < RUN_CEILING {
            for _ in 0..magnitude {
                writer.write_bit(true);
            }
            writer.write_bit(false);
        } else {
            for _ in 0..RUN_CEILING {
                writer.write_bit(true);
            }
            writer.write_bit(true); // escape marker
            writer.write_bits(magnitude, ESCAPE_WIDTH);
        }
    }
    writer.finish()
}

fn decode_one(reader: &mut BitReader) -> Option<i16> {
    let sign_negative = reader.read_bit()?;
    let mut run = 0u32;
    loop {
        if run == RUN_CEILING {
            let escape_marker = reader.read_bit()?;
            debug_assert!(escape_marker, "encoder always sets the escape marker at the ceiling");
            let magnitude = reader.read_bits(ESCAPE_WIDTH)?;
            return Some(build_signed(sign_negative, magnitude));
        }
        if reader.read_bit()? {
            run += 1;
        } else {
            return Some(build_signed(sign_negative, run));
        }
    }
}

/// Decodes up to `max_count` coefficients from `bytes`/`bit_len`. Stops
/// early (yielding a correct prefix) if the bitstream is exhausted before
/// `max_count` values have been produced.
pub fn decode(bytes: &[u8], bit_len: u16, max_count: usize) -> Vec<i16> {
    let mut reader = BitReader::new(bytes, bit_len as usize);
    let mut out = Vec::with_capacity(max_count);
    while out.len() < max_count {
        match decode_one(&mut reader) {
            Some(v) => out.push(v),
            None => break,
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_small_mixed_values() {
        let values = [0i16, 1, -1, 5, -5, 15, -15];
        let (bytes, bit_len) = encode(&values);
        let decoded = decode(&bytes, bit_len, values.len());
        assert_eq!(decoded, values);
    }

    #[test]
    fn round_trips_values_past_the_escape_ceiling() {
        let values = [16i16, -16, 1000, -1000, i16::MAX, i16::MIN];
        let (bytes, bit_len) = encode(&values);
        let decoded = decode(&bytes, bit_len, values.len());
        assert_eq!(decoded, values);
    }

    #[test]
    fn round_trips_ramp_block() {
        // Seed scenario 5, SPEC §8: a ramp-sample block.
        let values: Vec<i16> = (0..16).collect();
        let (bytes, bit_len) = encode(&values);
        let decoded = decode(&bytes, bit_len, values.len());
        assert_eq!(decoded, values);
    }

    #[test]
    fn truncated_request_yields_correct_prefix() {
        let values = [3i16, -4, 100, -200, 7];
        let (bytes, bit_len) = encode(&values);
        let decoded = decode(&bytes, bit_len, 2);
        assert_eq!(decoded, &values[..2]);
    }

    #[test]
    fn empty_input_encodes_to_empty_output() {
        let (bytes, bit_len) = encode(&[]);
        assert_eq!(bit_len, 0);
        assert_eq!(decode(&bytes, bit_len, 10), Vec::<i16>::new());
    }

    #[test]
    fn random_arrays_round_trip_exactly() {
        let rng = fastrand::Rng::with_seed(0xC0FFEE);
        for _ in 0..64 {
            let len = rng.usize(1..64);
            let values: Vec<i16> = (0..len).map(|_| rng.i16(..)).collect();
            let (bytes, bit_len) = encode(&values);
            let decoded = decode(&bytes, bit_len, values.len());
            assert_eq!(decoded, values, "round-trip mismatch for {:?}", values);
        }
    }
}
