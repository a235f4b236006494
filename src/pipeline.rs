//! Compression pipeline orchestrator.
//!
//! Chains the codec stages in order for compression and in reverse for
//! decompression:
//!
//! ```text
//! pixels ── delta (optional) ── RLE ── adaptive Huffman (kept if smaller) ── stream
//! ```
//!
//! **Container format:** one header byte, then the payload.
//!
//! - bits 0-2: padding bit count of the Huffman payload (0-7)
//! - bit 3: payload is Huffman-encoded (otherwise it is the raw RLE stream)
//! - bits 4-7: reserved, written as zero
//!
//! Whether the pixels were differenced and which scan direction was used are
//! not container concerns; the RLE settings byte inside the payload carries
//! both, so decompression is driven entirely by stored bits.

use crate::{delta, huffman, rle, GrzError, GrzResult};

/// Container header bit marking a Huffman-encoded payload.
const HUFFMAN_BIT: u8 = 0b0000_1000;

/// Container header bits holding the padding bit count.
const PADDING_MASK: u8 = 0b0000_0111;

/// Options controlling pipeline compression behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompressOptions {
    /// Apply first-order pixel differencing before run-length encoding.
    pub model: bool,
    /// Try both scan directions and keep the smaller stream.
    pub adaptive: bool,
}

/// Compress a raw grayscale image of the given width.
///
/// The height is implied by the buffer length, which must be a non-zero
/// multiple of `width`. Returns a self-contained compressed stream.
pub fn compress(input: &[u8], width: u64, options: &CompressOptions) -> GrzResult<Vec<u8>> {
    if width == 0 || input.is_empty() || input.len() as u64 % width != 0 {
        return Err(GrzError::InvalidInput);
    }
    let height = input.len() as u64 / width;

    let pixels = if options.model {
        delta::encode(input)
    } else {
        input.to_vec()
    };

    let encoded = if options.adaptive {
        rle::encode_adaptive(&pixels, width, height, options.model)
    } else {
        rle::encode_sequence(&pixels, width, height, options.model)
    };

    // Speculative entropy pass: keep it only when it strictly shrinks the
    // stream, else store the RLE bytes untouched.
    let (header, payload) = match huffman::encode(&encoded) {
        (packed, padding) if packed.len() < encoded.len() => (HUFFMAN_BIT | padding, packed),
        _ => (0, encoded),
    };

    let mut output = Vec::with_capacity(1 + payload.len());
    output.push(header);
    output.extend_from_slice(&payload);
    Ok(output)
}

/// Decompress a stream produced by [`compress`] back into raw pixels.
pub fn decompress(input: &[u8]) -> GrzResult<Vec<u8>> {
    let (&header, payload) = input.split_first().ok_or(GrzError::TruncatedInput)?;

    let encoded = if header & HUFFMAN_BIT != 0 {
        huffman::decode(payload, header & PADDING_MASK)?
    } else {
        payload.to_vec()
    };

    let image = rle::decode(&encoded)?;
    if image.differenced {
        Ok(delta::decode(&image.pixels))
    } else {
        Ok(image.pixels)
    }
}
