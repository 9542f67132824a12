//! One-dimensional (modified Huffman) decoding of a single scanline.

use crate::changes::ChangingElements;
use crate::decode::{Code, read_code};
use crate::error::{Result, WarningKind};
use crate::Reporter;
use hayro_common::bit::BitReader;

/// How decoding of a scanline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineEnd {
    /// All pixels of the line were decoded.
    Complete,
    /// An EOL code appeared before the end of the line. The EOL is left
    /// in the stream.
    Truncated,
    /// An invalid code word was found, the position in the stream is
    /// meaningless.
    Corrupt,
}

/// The zero-length white terminating code, `00110101`.
const WHITE_ZERO: u32 = 0b00110101;
/// The zero-length black terminating code, `0000110111`.
const BLACK_ZERO: u32 = 0b0000110111;

/// A packed output row. Set bits are black.
pub(crate) struct Row<'a> {
    data: &'a mut [u8],
    width: u32,
}

impl<'a> Row<'a> {
    pub(crate) fn new(data: &'a mut [u8], width: u32) -> Self {
        data.fill(0);

        Self { data, width }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    /// Set the pixels in `start..end` to black.
    pub(crate) fn fill_black(&mut self, start: u32, end: u32) {
        let mut pos = start as usize;
        let end = end.min(self.width) as usize;

        while pos < end && !pos.is_multiple_of(8) {
            self.data[pos / 8] |= 0x80 >> (pos % 8);
            pos += 1;
        }

        while pos + 8 <= end {
            self.data[pos / 8] = 0xFF;
            pos += 8;
        }

        while pos < end {
            self.data[pos / 8] |= 0x80 >> (pos % 8);
            pos += 1;
        }
    }

    /// Move `pos` forward by `run` pixels, clamping at the line end.
    pub(crate) fn advance(&self, pos: u32, run: u32, reporter: &mut Reporter<'_>) -> Result<u32> {
        let end = pos.saturating_add(run);

        if end > self.width {
            reporter.warn(WarningKind::RunOverflow)?;

            return Ok(self.width);
        }

        Ok(end)
    }
}

/// Decode one scanline of alternating white and black runs.
pub(crate) fn decode_1d(
    reader: &mut BitReader<'_>,
    row: &mut Row<'_>,
    changes: &mut ChangingElements,
    reporter: &mut Reporter<'_>,
) -> Result<LineEnd> {
    let width = row.width();
    let mut pos = 0;
    let mut is_white = true;

    changes.clear();

    while pos < width {
        match read_code(reader, is_white) {
            Code::Terminating(len) => {
                let end = row.advance(pos, len, reporter)?;

                if !is_white {
                    row.fill_black(pos, end);
                }

                pos = end;
                changes.push(pos);
                is_white = !is_white;
            }
            Code::MakeUp(len) => {
                let end = row.advance(pos, len, reporter)?;

                if !is_white {
                    row.fill_black(pos, end);
                }

                pos = end;

                if pos == width {
                    // A make-up code filled the line, the zero-length
                    // terminating code should still follow.
                    let (zero, zero_len) = if is_white {
                        (WHITE_ZERO, 8)
                    } else {
                        (BLACK_ZERO, 10)
                    };

                    if reader.peek_bits(zero_len) == zero {
                        reader.skip(zero_len as usize);
                    } else {
                        reporter.warn(WarningKind::MissingTerminatingCode { white: is_white })?;
                    }

                    changes.push(pos);
                }
            }
            Code::Eol => {
                reporter.warn(WarningKind::PrematureEol)?;
                changes.finish();

                return Ok(LineEnd::Truncated);
            }
            Code::Invalid => {
                reporter.warn(WarningKind::InvalidCode)?;
                changes.finish();

                return Ok(LineEnd::Corrupt);
            }
        }
    }

    changes.finish();

    Ok(LineEnd::Complete)
}

#[cfg(test)]
#[allow(clippy::unusual_byte_groupings)]
mod tests {
    use super::*;

    fn decode(data: &[u8], width: u32) -> (Vec<u8>, Vec<u32>, LineEnd, Vec<String>) {
        let mut out = vec![0xAA; width.div_ceil(8) as usize];
        let mut changes = ChangingElements::new(width);
        let mut warnings = Vec::<String>::new();
        let mut reporter = Reporter::new(&mut warnings, false);
        let mut reader = BitReader::new(data);
        let end = {
            let mut row = Row::new(&mut out, width);
            decode_1d(&mut reader, &mut row, &mut changes, &mut reporter).unwrap()
        };
        let changes = changes.as_slice().to_vec();

        (out, changes, end, warnings)
    }

    #[test]
    fn two_white_pixels() {
        let (out, changes, end, warnings) = decode(&[0b0111_0000], 2);
        assert_eq!(out, [0]);
        assert_eq!(changes, [2]);
        assert_eq!(end, LineEnd::Complete);
        assert!(warnings.is_empty());
    }

    #[test]
    fn white_black_white() {
        // White 3 (1000), black 2 (11), white 3 (1000).
        let (out, changes, end, _) = decode(&[0b1000_11_10, 0b00_000000], 8);
        assert_eq!(out, [0b000_11_000]);
        assert_eq!(changes, [3, 5, 8]);
        assert_eq!(end, LineEnd::Complete);
    }

    #[test]
    fn leading_black_run() {
        // White 0 (00110101), black 4 (011), white 4 (1011).
        let (out, changes, _, warnings) = decode(&[0b00110101, 0b011_1011_0], 8);
        assert_eq!(out, [0b1111_0000]);
        assert_eq!(changes, [0, 4, 8]);
        assert!(warnings.is_empty());
    }

    #[test]
    fn long_black_run_across_bytes() {
        // White 3 (1000), black 64 + 0 (0000001111 0000110111), white 5 (1100).
        let data = [0b1000_0000, 0b001111_00, 0b00110111, 0b1100_0000];
        let (out, changes, _, warnings) = decode(&data, 72);
        assert_eq!(changes, [3, 67, 72]);
        assert_eq!(out[0], 0b0001_1111);
        assert!(out[1..8].iter().all(|b| *b == 0xFF));
        assert_eq!(out[8], 0b1110_0000);
        assert!(warnings.is_empty());
    }

    #[test]
    fn makeup_at_line_end_with_terminator() {
        // White 64 (11011) + 0 (00110101).
        let reader_data = [0b11011_001, 0b10101_000];
        let (out, changes, _, warnings) = decode(&reader_data, 64);
        assert!(out.iter().all(|b| *b == 0));
        assert_eq!(changes, [64]);
        assert!(warnings.is_empty());

        let (_, _, _, warnings) = decode(&reader_data[..1], 64);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn makeup_at_line_end_without_terminator() {
        // White 64 (11011) followed by the EOL of the next line.
        let data = [0b11011_000, 0b00000000, 0b1_0000000];
        let mut out = vec![0; 8];
        let mut changes = ChangingElements::new(64);
        let mut warnings = Vec::<String>::new();
        let mut reporter = Reporter::new(&mut warnings, false);
        let mut reader = BitReader::new(&data);
        let mut row = Row::new(&mut out, 64);

        let end = decode_1d(&mut reader, &mut row, &mut changes, &mut reporter).unwrap();
        assert_eq!(end, LineEnd::Complete);
        assert_eq!(reader.cur_pos(), 5);
        assert_eq!(changes.as_slice(), [64]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("missing zero white run length terminating code"));
    }

    #[test]
    fn premature_eol() {
        // White 2 (0111), then EOL.
        let (out, changes, end, warnings) = decode(&[0b0111_0000, 0b0000_0001], 8);
        assert_eq!(out, [0]);
        assert_eq!(changes, [2]);
        assert_eq!(end, LineEnd::Truncated);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn run_overflow_is_clamped() {
        // White 2 (0111), black 3 (10) on a 4 pixel line.
        let (out, changes, end, warnings) = decode(&[0b0111_10_00], 4);
        assert_eq!(out, [0b0011_0000]);
        assert_eq!(changes, [2, 4]);
        assert_eq!(end, LineEnd::Complete);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn strict_mode_fails_on_warning() {
        let mut out = vec![0; 1];
        let mut changes = ChangingElements::new(4);
        let mut warnings = Vec::<String>::new();
        let mut reporter = Reporter::new(&mut warnings, true);
        let data = [0b0111_10_00];
        let mut reader = BitReader::new(&data);
        let mut row = Row::new(&mut out, 4);

        let result = decode_1d(&mut reader, &mut row, &mut changes, &mut reporter);
        assert!(matches!(
            result,
            Err(crate::DecodeError::Strict(crate::Warning {
                row: 0,
                kind: WarningKind::RunOverflow
            }))
        ));
    }

    #[test]
    fn fill_black_partial_bytes() {
        let mut data = [0_u8; 3];
        let mut row = Row::new(&mut data, 20);
        row.fill_black(5, 19);
        assert_eq!(data, [0b0000_0111, 0xFF, 0b1110_0000]);
    }
}
