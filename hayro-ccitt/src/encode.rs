/*!
A small fax encoder.

It produces modified Huffman, T.4 and T.6 data from packed bi-level rows
(set bits are black, rows start on a byte boundary). The output always
uses the shortest codes the standards allow and never enters
uncompressed mode, which makes it useful for producing test data and
for fuzzing the decoder.
*/

use crate::tables::{
    BLACK_MAKEUP, BLACK_TERMINATING, EOFB, EOL, EXTENDED_MAKEUP, MODE_CODES, Mode, WHITE_MAKEUP,
    WHITE_TERMINATING,
};
use crate::{Compression, T4Options};
use hayro_common::bit::BitWriter;

/// Settings for encoding fax data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeSettings {
    /// The width of the image in pixels.
    pub columns: u32,
    /// The compression scheme.
    pub compression: Compression,
    /// Options for [`Compression::Group3`].
    pub t4_options: T4Options,
    /// For two-dimensional T.4 data, every `k`-th line is coded
    /// one-dimensionally. Zero is treated as one.
    pub k: u32,
}

/// Encode the packed rows in `rows`.
///
/// The number of rows is derived from the length of `rows`, an incomplete
/// trailing row is ignored.
pub fn encode(rows: &[u8], settings: &EncodeSettings) -> Vec<u8> {
    let mut writer = BitWriter::new();

    if settings.columns == 0 {
        return writer.finish();
    }

    let stride = settings.columns.div_ceil(8) as usize;
    let fill = settings.t4_options.contains(T4Options::FILL_BITS);
    let two_dimensional = settings.t4_options.contains(T4Options::TWO_DIMENSIONAL);
    let k = settings.k.max(1) as usize;

    let mut reference = vec![];
    let mut coding = vec![];

    for (y, row) in rows.chunks_exact(stride).enumerate() {
        changes(row, settings.columns, &mut coding);

        match settings.compression {
            Compression::ModifiedHuffman => {
                encode_1d(&mut writer, &coding, settings.columns);
                writer.align();
            }
            Compression::Group3 => {
                write_eol(&mut writer, fill);

                if two_dimensional {
                    let one_dimensional = y % k == 0;
                    writer.write(one_dimensional as u32, 1);

                    if one_dimensional {
                        encode_1d(&mut writer, &coding, settings.columns);
                    } else {
                        encode_2d(&mut writer, &coding, &reference, settings.columns);
                    }
                } else {
                    encode_1d(&mut writer, &coding, settings.columns);
                }
            }
            Compression::Group4 => {
                if y == 0 {
                    reference.clear();
                }

                encode_2d(&mut writer, &coding, &reference, settings.columns);
            }
        }

        core::mem::swap(&mut reference, &mut coding);
    }

    match settings.compression {
        Compression::ModifiedHuffman => {}
        Compression::Group3 => {
            // Return to control: six EOLs.
            write_eol(&mut writer, fill);

            for i in 0..6 {
                if i > 0 {
                    writer.write(EOL, 12);
                }

                if two_dimensional {
                    writer.write(1, 1);
                }
            }
        }
        Compression::Group4 => writer.write(EOFB, 24),
    }

    writer.finish()
}

/// Collect the changing elements of a packed row.
fn changes(row: &[u8], width: u32, out: &mut Vec<u32>) {
    out.clear();
    let mut black = false;

    for x in 0..width {
        let pixel = row[x as usize / 8] & (0x80 >> (x % 8)) != 0;

        if pixel != black {
            out.push(x);
            black = pixel;
        }
    }
}

fn write_eol(writer: &mut BitWriter, fill: bool) {
    if fill {
        // Pad so that the EOL ends on a byte boundary.
        while (writer.cur_pos() + 12) % 8 != 0 {
            writer.write(0, 1);
        }
    }

    writer.write(EOL, 12);
}

fn encode_1d(writer: &mut BitWriter, changes: &[u32], width: u32) {
    let mut pos = 0;
    let mut is_white = true;

    for &change in changes.iter().chain(core::iter::once(&width)) {
        write_run(writer, change - pos, is_white);
        pos = change;
        is_white = !is_white;

        if pos == width {
            break;
        }
    }
}

fn encode_2d(writer: &mut BitWriter, coding: &[u32], reference: &[u32], width: u32) {
    let element = |list: &[u32], i: usize| list.get(i).copied().unwrap_or(width);

    let mut a0 = -1_i64;
    let mut is_white = true;

    while a0 < width as i64 {
        let a1_index = coding.partition_point(|&c| (c as i64) <= a0);
        let a1 = element(coding, a1_index);
        let a2 = element(coding, a1_index + 1);

        // b1 has the opposite color of a0, i.e. it starts a black run
        // (even index) if a0 is white.
        let mut b1_index = reference.partition_point(|&c| (c as i64) <= a0);

        if (b1_index % 2 == 0) != is_white {
            b1_index += 1;
        }

        let b1 = element(reference, b1_index);
        let b2 = element(reference, b1_index + 1);

        if b2 < a1 {
            write_mode(writer, Mode::Pass);
            a0 = b2 as i64;
        } else if (a1 as i64 - b1 as i64).abs() <= 3 {
            write_mode(writer, Mode::Vertical((a1 as i64 - b1 as i64) as i8));
            a0 = a1 as i64;
            is_white = !is_white;
        } else {
            let start = a0.max(0) as u32;
            write_mode(writer, Mode::Horizontal);
            write_run(writer, a1 - start, is_white);
            write_run(writer, a2 - a1, !is_white);
            a0 = a2 as i64;
        }
    }
}

fn write_mode(writer: &mut BitWriter, mode: Mode) {
    if let Some((_, len, code)) = MODE_CODES.iter().find(|(m, _, _)| *m == mode) {
        writer.write(*code as u32, *len);
    }
}

fn write_run(writer: &mut BitWriter, mut run: u32, is_white: bool) {
    let (terminating, makeup) = if is_white {
        (&WHITE_TERMINATING, &WHITE_MAKEUP)
    } else {
        (&BLACK_TERMINATING, &BLACK_MAKEUP)
    };

    let write_code = |writer: &mut BitWriter, (_, len, code): (u16, u8, u16)| {
        writer.write(code as u32, len);
    };

    let makeup_code = |run: u32| {
        makeup
            .iter()
            .chain(EXTENDED_MAKEUP.iter())
            .find(|(r, _, _)| *r as u32 == run)
            .copied()
    };

    while run > 2560 {
        if let Some(code) = makeup_code(2560) {
            write_code(writer, code);
        }

        run -= 2560;
    }

    if run >= 64 {
        if let Some(code) = makeup_code(run / 64 * 64) {
            write_code(writer, code);
        }
    }

    write_code(writer, terminating[(run % 64) as usize]);
}

#[cfg(test)]
#[allow(clippy::unusual_byte_groupings)]
mod tests {
    use super::*;

    fn settings(columns: u32, compression: Compression) -> EncodeSettings {
        EncodeSettings {
            columns,
            compression,
            t4_options: T4Options::empty(),
            k: 0,
        }
    }

    #[test]
    fn modified_huffman_row() {
        // White 3 (1000), black 2 (11), white 3 (1000).
        let data = encode(&[0b000_11_000], &settings(8, Compression::ModifiedHuffman));
        assert_eq!(data, [0b1000_11_10, 0b00_000000]);
    }

    #[test]
    fn leading_black_pixel() {
        // White 0 (00110101), black 8 (000101).
        let data = encode(&[0xFF], &settings(8, Compression::ModifiedHuffman));
        assert_eq!(data, [0b00110101, 0b000101_00]);
    }

    #[test]
    fn long_runs_use_makeup_codes() {
        // White 2600: make-up 2560 (000000011111), then 40 (00101001).
        let columns = 2600;
        let row = vec![0; 325];
        let data = encode(&row, &settings(columns, Compression::ModifiedHuffman));
        assert_eq!(data, [0b00000001, 0b1111_0010, 0b1001_0000]);
    }

    #[test]
    fn group4_identical_rows() {
        // Row 1: horizontal, white 3, black 2, V0.
        // Row 2: three times V0. Then EOFB.
        let data = encode(&[0b000_11_000, 0b000_11_000], &settings(8, Compression::Group4));
        let mut expected = BitWriter::new();
        expected.write(0b001_1000_11_1, 10);
        expected.write(0b111, 3);
        expected.write(EOFB, 24);
        assert_eq!(data, expected.finish());
    }

    #[test]
    fn group3_fill_bits_align_eols() {
        let mut settings = settings(8, Compression::Group3);
        settings.t4_options = T4Options::FILL_BITS;
        let data = encode(&[0, 0], &settings);

        // Every EOL ends on a byte boundary.
        assert_eq!(&data[..4], [0b0000_0000, 0b0000_0001, 0b10011_000, 0b0000_0000]);
        assert_eq!(data[4], 0b0000_0001);
    }
}
