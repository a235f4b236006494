//! Run-length encoding with group-byte framing.
//!
//! The stream starts with a one-byte settings field, the image dimensions,
//! and then the framed runs:
//!
//! ```text
//! settings   bit 7: scan direction (1 = row-major, 0 = column-major)
//!            bit 6: pixel differencing was applied before encoding
//!            bits 3-5: width byte count - 1
//!            bits 0-2: height byte count - 1
//! width      big-endian, minimum length (1-8 bytes)
//! height     big-endian, minimum length (1-8 bytes)
//! runs       groups of one classifier byte + up to 8 data bytes
//! ```
//!
//! Within a group, classifier bit `i` (LSB first) tags the `i`-th data byte:
//! `0` marks a literal pixel value, `1` marks part of a big-endian run
//! counter. A run of length 1 is a bare value byte; a run of length `n >= 2`
//! stores `n - 2` in the minimum number of counter bytes before its value
//! byte, with the single counter byte `0x00` meaning exactly 2. Counter
//! values 0 and 1 would be ambiguous as real lengths, which is why the
//! stored count is offset by two.
//!
//! A counter and its value byte may straddle a group boundary; the final
//! partial group is flushed with its unused classifier bits left zero.

use crate::{GrzError, GrzResult};

/// Scan-direction bit of the settings byte (set = row-major).
const SCAN_HORIZONTAL: u8 = 0b1000_0000;

/// Differencing bit of the settings byte.
const MODEL_BIT: u8 = 0b0100_0000;

/// Settings bits 3-5: number of width bytes that follow, minus one.
const WIDTH_COUNT_MASK: u8 = 0b0011_1000;

/// Settings bits 0-2: number of height bytes that follow, minus one.
const HEIGHT_COUNT_MASK: u8 = 0b0000_0111;

/// Data bytes carried per group byte.
const GROUP_SIZE: usize = 8;

/// A decoded RLE stream: the pixels plus the geometry and flags carried in
/// the stream prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RleImage {
    pub pixels: Vec<u8>,
    pub width: u64,
    pub height: u64,
    /// Set when the encoder recorded that the pixels were differenced and
    /// the inverse transform must run after decoding.
    pub differenced: bool,
}

/// Encode pixels with a row-major scan.
///
/// Writes the settings/size prefix with the scan bit set, then the framed
/// runs of the row-major traversal.
pub fn encode_sequence(pixels: &[u8], width: u64, height: u64, differenced: bool) -> Vec<u8> {
    debug_assert_eq!(pixels.len() as u64, width.saturating_mul(height));

    let mut flags = SCAN_HORIZONTAL;
    if differenced {
        flags |= MODEL_BIT;
    }

    let mut out = Vec::with_capacity(worst_case(pixels.len()));
    write_prefix(&mut out, flags, width, height);

    let mut groups = GroupWriter::new(out);
    emit_runs(pixels.iter().copied(), &mut groups);
    groups.finish()
}

/// Encode pixels with whichever scan direction produces the smaller stream.
///
/// Both scans are run to completion, each with its own settings/size prefix,
/// and the smaller stream is kept; a tie goes to the column-major scan. The
/// winner is self-describing through the scan bit, so the decoder needs no
/// other signal.
pub fn encode_adaptive(pixels: &[u8], width: u64, height: u64, differenced: bool) -> Vec<u8> {
    let horizontal = encode_sequence(pixels, width, height, differenced);

    let flags = if differenced { MODEL_BIT } else { 0 };
    let mut out = Vec::with_capacity(worst_case(pixels.len()));
    write_prefix(&mut out, flags, width, height);

    let mut groups = GroupWriter::new(out);
    let (w, h) = (width as usize, height as usize);
    emit_runs(
        (0..w).flat_map(|x| (0..h).map(move |y| pixels[y * w + x])),
        &mut groups,
    );
    let vertical = groups.finish();

    if vertical.len() <= horizontal.len() {
        vertical
    } else {
        horizontal
    }
}

/// Decode an RLE stream back into its pixel buffer.
///
/// The row-major decoder must fill the declared pixel count exactly; the
/// column-major decoder must additionally finish on the last cell of the
/// last column. Anything else means the stream disagrees with its declared
/// geometry.
pub fn decode(input: &[u8]) -> GrzResult<RleImage> {
    let (&settings, rest) = input.split_first().ok_or(GrzError::TruncatedInput)?;

    let horizontal = settings & SCAN_HORIZONTAL != 0;
    let differenced = settings & MODEL_BIT != 0;
    let width_bytes = usize::from((settings & WIDTH_COUNT_MASK) >> 3) + 1;
    let height_bytes = usize::from(settings & HEIGHT_COUNT_MASK) + 1;

    if rest.len() < width_bytes + height_bytes {
        return Err(GrzError::TruncatedInput);
    }
    let width = read_be(&rest[..width_bytes]);
    let height = read_be(&rest[width_bytes..width_bytes + height_bytes]);
    if width == 0 || height == 0 {
        return Err(GrzError::InvalidInput);
    }
    let size = width
        .checked_mul(height)
        .and_then(|s| usize::try_from(s).ok())
        .ok_or(GrzError::InvalidInput)?;

    let mut runs = RunReader::new(&rest[width_bytes + height_bytes..]);
    let pixels = if horizontal {
        decode_horizontal(&mut runs, size)?
    } else {
        decode_vertical(&mut runs, width as usize, height as usize)?
    };

    Ok(RleImage {
        pixels,
        width,
        height,
        differenced,
    })
}

/// Worst case stream size: every pixel a singleton costs one data byte plus
/// a classifier byte per eight, on top of the prefix.
fn worst_case(len: usize) -> usize {
    len + len / GROUP_SIZE + 16
}

/// Number of bytes in the minimum big-endian encoding of `value`.
fn be_len(value: u64) -> usize {
    ((64 - value.leading_zeros()).div_ceil(8) as usize).max(1)
}

/// Big-endian read of up to 8 bytes.
fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

/// Write the settings byte followed by the minimum-length big-endian width
/// and height.
fn write_prefix(out: &mut Vec<u8>, flags: u8, width: u64, height: u64) {
    let width_len = be_len(width);
    let height_len = be_len(height);
    out.push(flags | (((width_len - 1) as u8) << 3) | (height_len - 1) as u8);
    for i in (0..width_len).rev() {
        out.push((width >> (8 * i)) as u8);
    }
    for i in (0..height_len).rev() {
        out.push((height >> (8 * i)) as u8);
    }
}

/// Collapse a pixel scan into maximal runs and frame each one.
fn emit_runs<I: Iterator<Item = u8>>(mut scan: I, groups: &mut GroupWriter) {
    let Some(mut value) = scan.next() else {
        return;
    };
    let mut count: u64 = 1;
    for pixel in scan {
        if pixel == value {
            count += 1;
        } else {
            emit_run(groups, count, value);
            value = pixel;
            count = 1;
        }
    }
    emit_run(groups, count, value);
}

/// Frame one `(count, value)` run.
fn emit_run(groups: &mut GroupWriter, count: u64, value: u8) {
    if count >= 2 {
        let extra = count - 2;
        if extra == 0 {
            // A bare zero counter byte: the only encoding for count 2.
            groups.push_count(0);
        } else {
            let len = be_len(extra);
            for i in (0..len).rev() {
                groups.push_count((extra >> (8 * i)) as u8);
            }
        }
    }
    groups.push_value(value);
}

/// Accumulates data bytes and emits a classifier byte ahead of every eight.
struct GroupWriter {
    out: Vec<u8>,
    classifier: u8,
    pending: [u8; GROUP_SIZE],
    pending_len: usize,
}

impl GroupWriter {
    fn new(out: Vec<u8>) -> Self {
        Self {
            out,
            classifier: 0,
            pending: [0; GROUP_SIZE],
            pending_len: 0,
        }
    }

    fn push_count(&mut self, byte: u8) {
        self.classifier |= 1 << self.pending_len;
        self.push(byte);
    }

    fn push_value(&mut self, byte: u8) {
        self.push(byte);
    }

    fn push(&mut self, byte: u8) {
        self.pending[self.pending_len] = byte;
        self.pending_len += 1;
        if self.pending_len == GROUP_SIZE {
            self.flush();
        }
    }

    fn flush(&mut self) {
        self.out.push(self.classifier);
        self.out.extend_from_slice(&self.pending[..self.pending_len]);
        self.classifier = 0;
        self.pending_len = 0;
    }

    fn finish(mut self) -> Vec<u8> {
        if self.pending_len > 0 {
            self.flush();
        }
        self.out
    }
}

/// Streaming parser for the framed run stream.
struct RunReader<'a> {
    data: &'a [u8],
    pos: usize,
    classifier: u8,
    /// Classifier bits consumed from the current group; 8 forces a fetch.
    bit: usize,
}

impl<'a> RunReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            classifier: 0,
            bit: GROUP_SIZE,
        }
    }

    fn next_data_byte(&mut self) -> GrzResult<u8> {
        if self.pos == self.data.len() {
            return Err(GrzError::TruncatedInput);
        }
        let byte = self.data[self.pos];
        self.pos += 1;
        Ok(byte)
    }

    /// Parse the next `(count, value)` run, or `None` at the clean end of
    /// the stream. The stream may only end at a group-byte boundary; running
    /// out of bytes anywhere else is an error, as is a counter too wide for
    /// any plausible run.
    fn next_run(&mut self) -> GrzResult<Option<(u64, u8)>> {
        let mut acc: u64 = 0;
        let mut saw_count = false;

        loop {
            if self.bit == GROUP_SIZE {
                if self.pos == self.data.len() {
                    if saw_count {
                        return Err(GrzError::TruncatedInput);
                    }
                    return Ok(None);
                }
                self.classifier = self.data[self.pos];
                self.pos += 1;
                self.bit = 0;
            }

            while self.bit < GROUP_SIZE {
                let is_count = self.classifier & (1 << self.bit) != 0;
                self.bit += 1;
                if is_count {
                    if acc >> 56 != 0 {
                        return Err(GrzError::InvalidInput);
                    }
                    acc = (acc << 8) | u64::from(self.next_data_byte()?);
                    saw_count = true;
                } else {
                    let count = if saw_count { acc + 2 } else { 1 };
                    let value = self.next_data_byte()?;
                    return Ok(Some((count, value)));
                }
            }
        }
    }
}

/// Replay runs in row-major order, filling exactly `size` pixels.
fn decode_horizontal(runs: &mut RunReader<'_>, size: usize) -> GrzResult<Vec<u8>> {
    let mut pixels = Vec::with_capacity(size);
    while let Some((count, value)) = runs.next_run()? {
        if count > (size - pixels.len()) as u64 {
            return Err(GrzError::InvalidInput);
        }
        pixels.resize(pixels.len() + count as usize, value);
    }
    if pixels.len() != size {
        return Err(GrzError::InvalidInput);
    }
    Ok(pixels)
}

/// Replay runs in column-major order. The scan must land exactly on the
/// bottom cell of the last column.
fn decode_vertical(runs: &mut RunReader<'_>, width: usize, height: usize) -> GrzResult<Vec<u8>> {
    let size = width * height;
    let mut pixels = vec![0u8; size];
    let mut written = 0usize;
    let (mut x, mut y) = (0usize, 0usize);

    while let Some((count, value)) = runs.next_run()? {
        for _ in 0..count {
            if written == size {
                return Err(GrzError::InvalidInput);
            }
            pixels[y * width + x] = value;
            written += 1;
            y += 1;
            if y == height {
                y = 0;
                x += 1;
            }
        }
    }
    if written != size {
        return Err(GrzError::InvalidInput);
    }
    Ok(pixels)
}
