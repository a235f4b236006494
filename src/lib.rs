//! grz: lossless compression for raw 8-bit grayscale images.
//!
//! The codec chains three stages. Each stage is a standalone module and the
//! pipeline applies them in order for compression, in reverse for
//! decompression:
//!
//! | Stage     | Module      | Responsibility                                  |
//! |-----------|-------------|-------------------------------------------------|
//! | Delta     | [`delta`]   | First-order pixel differencing modulo 256       |
//! | RLE       | [`rle`]     | Group-byte framed run-length encoding           |
//! | Huffman   | [`huffman`] | Adaptive (FGK) Huffman coding, kept if smaller  |
//!
//! The run-length stage scans the image row-major, or picks the smaller of a
//! row-major and a column-major scan when adaptive scanning is requested. The
//! Huffman stage is speculative: its output replaces the RLE stream only when
//! it is strictly smaller, and a container header bit records the choice so
//! decompression knows which decoder to run.

pub mod bitio;
pub mod delta;
pub mod huffman;
pub mod pipeline;
pub mod rle;

#[cfg(test)]
mod validation;

/// Error types for grz operations.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GrzError {
    /// Compressed stream ended in the middle of a record.
    TruncatedInput,
    /// Compressed stream is structurally invalid.
    InvalidInput,
}

impl std::fmt::Display for GrzError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TruncatedInput => write!(f, "unexpected end of compressed stream"),
            Self::InvalidInput => write!(f, "invalid compressed data"),
        }
    }
}

impl std::error::Error for GrzError {}

pub type GrzResult<T> = Result<T, GrzError>;
