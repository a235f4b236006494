//! Validation tests across the codec stages.
//!
//! These verify, over a set of named image shapes:
//! 1. **Stage round-trips** - differencing, both RLE scans, Huffman
//! 2. **Cross-stage composition** - Huffman driven by real RLE streams
//! 3. **Full pipeline round-trips** - every flag combination, many widths
//! 4. **Container header consistency** - the Huffman bit never lies about
//!    the payload
#[cfg(test)]
mod tests {
    use crate::delta;
    use crate::huffman;
    use crate::pipeline::{self, CompressOptions};
    use crate::rle;

    /// A handful of widths dividing `len`, always including the degenerate
    /// single-column and single-row geometries.
    fn widths_of(len: usize) -> Vec<u64> {
        let mut widths = vec![1u64];
        for w in [2, 3, 4, 8, 16, 32, 50, 64, len as u64] {
            if len as u64 % w == 0 && !widths.contains(&w) {
                widths.push(w);
            }
        }
        widths
    }

    fn pipeline_round_trip(data: &[u8]) {
        for width in widths_of(data.len()) {
            for model in [false, true] {
                for adaptive in [false, true] {
                    let options = CompressOptions { model, adaptive };
                    let compressed = pipeline::compress(data, width, &options).unwrap();
                    assert_eq!(
                        pipeline::decompress(&compressed).unwrap(),
                        data,
                        "width={width} model={model} adaptive={adaptive}"
                    );
                }
            }
        }
    }

    macro_rules! image_suite {
        ($name:ident, $data:expr) => {
            mod $name {
                use super::*;

                #[test]
                fn delta_inverse() {
                    let input = $data;
                    assert_eq!(delta::decode(&delta::encode(&input)), input);
                }

                #[test]
                fn rle_both_scans() {
                    let input = $data;
                    for width in widths_of(input.len()) {
                        let height = input.len() as u64 / width;
                        let encoded = rle::encode_sequence(&input, width, height, false);
                        assert_eq!(rle::decode(&encoded).unwrap().pixels, input, "{width}");
                        let encoded = rle::encode_adaptive(&input, width, height, false);
                        assert_eq!(
                            rle::decode(&encoded).unwrap().pixels,
                            input,
                            "{width} adaptive"
                        );
                    }
                }

                #[test]
                fn huffman_over_rle_stream() {
                    let input = $data;
                    let stream = rle::encode_sequence(&input, 1, input.len() as u64, false);
                    let (bytes, padding) = huffman::encode(&stream);
                    assert_eq!(huffman::decode(&bytes, padding).unwrap(), stream);
                }

                #[test]
                fn pipeline_matrix() {
                    let input = $data;
                    pipeline_round_trip(&input);
                }

                #[test]
                fn container_header_consistency() {
                    let input = $data;
                    for width in widths_of(input.len()) {
                        let height = input.len() as u64 / width;
                        let compressed =
                            pipeline::compress(&input, width, &CompressOptions::default())
                                .unwrap();
                        let stream = rle::encode_sequence(&input, width, height, false);
                        if compressed[0] & 0b0000_1000 != 0 {
                            assert!(compressed.len() - 1 < stream.len(), "{width}");
                        } else {
                            assert_eq!(&compressed[1..], &stream[..], "{width}");
                        }
                    }
                }
            }
        };
    }

    /// Flat image, the best case for run-length coding.
    image_suite!(constant, vec![0x55u8; 1024]);

    /// Smooth gradient: differencing turns it into long runs.
    image_suite!(
        gradient,
        (0..1024).map(|i| (i / 4) as u8).collect::<Vec<u8>>()
    );

    /// All rows identical: columns are constant, so the vertical scan wins.
    image_suite!(
        vertical_stripes,
        (0..1024).map(|i| (i % 32) as u8).collect::<Vec<u8>>()
    );

    /// Wrapping ramp, exercises the modular arithmetic.
    image_suite!(
        sawtooth,
        (0..1024).map(|i| (i % 256) as u8).collect::<Vec<u8>>()
    );

    /// Pseudo-random pixels, the worst case for every stage.
    image_suite!(
        noise,
        (0..1024)
            .map(|i| ((i * 17 + 31) % 256) as u8)
            .collect::<Vec<u8>>()
    );

    /// Every byte value exactly once.
    image_suite!(all_bytes, (0u16..=255).map(|i| i as u8).collect::<Vec<u8>>());

    /// Degenerate one-pixel image.
    image_suite!(single_pixel, vec![0x80u8]);

    /// Blocky two-level image with runs crossing row boundaries.
    image_suite!(
        two_tone,
        (0..2048)
            .map(|i| if (i / 100) % 2 == 0 { 0u8 } else { 0xFFu8 })
            .collect::<Vec<u8>>()
    );
}
