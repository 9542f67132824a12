/*!
A decoder for CCITT fax-encoded bi-level images, as found in TIFF files.

Three TIFF compression schemes are supported:
- Compression 2, modified Huffman run-length encoding without EOL codes,
  where every row starts on a byte boundary.
- Compression 3, ITU-T T.4 (Group 3) with EOL codes and optional
  two-dimensional coding and fill bits.
- Compression 4, ITU-T T.6 (Group 4), purely two-dimensional coding,
  including uncompressed mode.

The decoded image is written as packed rows with one bit per pixel, the
most significant bit being the leftmost pixel. A set bit is black, i.e. the
output is in `WhiteIsZero` polarity.

Corrupt data is handled leniently: problems such as a missing EOL or an
invalid code word are reported to a [`Warnings`] sink and decoding
continues as well as it can. With [`DecodeSettings::strict`] enabled, the
first such problem is returned as an error instead.

For a small encoder that produces data this crate can decode, see the
[`encode`] module.

# Cargo features
- `logging`: Forward warnings and decoding progress to the `log` crate.
*/

#![forbid(unsafe_code)]

mod changes;
mod decode;
pub mod encode;
mod error;
mod line;
mod log;
mod page;
mod tables;

use crate::error::bail;
use crate::log::lwarn;
use crate::page::PageDecoder;
use bitflags::bitflags;

pub use error::{DecodeError, Result, Warning, WarningKind};
pub use hayro_common::bit::FillOrder;

/// The fax compression scheme of a strip or tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// TIFF compression 2: modified Huffman run-length encoding.
    ModifiedHuffman,
    /// TIFF compression 3: ITU-T T.4.
    Group3,
    /// TIFF compression 4: ITU-T T.6.
    Group4,
}

impl Compression {
    /// Map a value of the TIFF `Compression` field.
    pub fn from_tag(value: u16) -> Option<Self> {
        match value {
            2 => Some(Self::ModifiedHuffman),
            3 => Some(Self::Group3),
            4 => Some(Self::Group4),
            _ => None,
        }
    }
}

bitflags! {
    /// The TIFF `T4Options` field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct T4Options: u32 {
        /// Lines may be coded two-dimensionally, each EOL is followed by
        /// a tag bit.
        const TWO_DIMENSIONAL = 1;
        /// Uncompressed mode may be used.
        const UNCOMPRESSED = 1 << 1;
        /// Fill bits were added so that every EOL ends on a byte boundary.
        const FILL_BITS = 1 << 2;
    }
}

bitflags! {
    /// The TIFF `T6Options` field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct T6Options: u32 {
        /// Uncompressed mode may be used.
        const UNCOMPRESSED = 1 << 1;
    }
}

/// Settings for decoding fax data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSettings {
    /// The width of the image in pixels.
    pub columns: u32,
    /// The number of rows to decode.
    pub rows: u32,
    /// The compression scheme.
    pub compression: Compression,
    /// The bit order of the input data.
    pub fill_order: FillOrder,
    /// Options for [`Compression::Group3`].
    pub t4_options: T4Options,
    /// Options for [`Compression::Group4`].
    pub t6_options: T6Options,
    /// Whether to fail on the first recoverable problem.
    pub strict: bool,
}

impl Default for DecodeSettings {
    fn default() -> Self {
        Self {
            columns: 1728,
            rows: 0,
            compression: Compression::Group4,
            fill_order: FillOrder::MsbFirst,
            t4_options: T4Options::empty(),
            t6_options: T6Options::empty(),
            strict: false,
        }
    }
}

impl DecodeSettings {
    /// The number of bytes of a packed output row.
    pub fn bytes_per_row(&self) -> usize {
        self.columns.div_ceil(8) as usize
    }
}

/// A sink for recoverable problems found while decoding.
pub trait Warnings {
    /// Report a problem.
    fn warning(&mut self, message: &str);
}

/// Forwards all warnings to `log::warn!` if the `logging` feature is
/// enabled, and drops them otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWarnings;

impl Warnings for LogWarnings {
    fn warning(&mut self, message: &str) {
        lwarn!("{}", message);
    }
}

impl Warnings for Vec<String> {
    fn warning(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// The outcome of decoding a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    /// The number of rows that were decoded, fully or in part.
    pub decoded_rows: u32,
    /// The number of warnings that were reported.
    pub warnings: usize,
}

/// Decode fax data into a new buffer of `settings.rows` packed rows.
pub fn decode(data: &[u8], settings: &DecodeSettings, warnings: &mut dyn Warnings) -> Result<Vec<u8>> {
    let stride = settings.bytes_per_row();
    let mut out = vec![0; stride * settings.rows as usize];
    decode_into(data, settings, &mut out, 0, stride, warnings)?;

    Ok(out)
}

/// Decode fax data into `out`, writing row `y` at byte offset
/// `offset + y * stride`.
///
/// Rows that cannot be decoded are left white.
pub fn decode_into(
    data: &[u8],
    settings: &DecodeSettings,
    out: &mut [u8],
    offset: usize,
    stride: usize,
    warnings: &mut dyn Warnings,
) -> Result<DecodeSummary> {
    let bytes_per_row = settings.bytes_per_row();

    if settings.columns == 0 || stride < bytes_per_row {
        bail!(DecodeError::InvalidDimensions);
    }

    if settings.rows == 0 {
        return Ok(DecodeSummary {
            decoded_rows: 0,
            warnings: 0,
        });
    }

    let required = (settings.rows as usize - 1)
        .checked_mul(stride)
        .and_then(|n| n.checked_add(offset + bytes_per_row))
        .ok_or(DecodeError::InvalidDimensions)?;

    if out.len() < required {
        bail!(DecodeError::BufferTooSmall);
    }

    if data.is_empty() {
        bail!(DecodeError::UnexpectedEof);
    }

    let mut decoder = PageDecoder::new(data, settings, Reporter::new(warnings, settings.strict));
    let decoded_rows = decoder.decode(out, offset, stride)?;

    Ok(DecodeSummary {
        decoded_rows,
        warnings: decoder.warnings(),
    })
}

/// Reports warnings to a sink, or turns them into errors in strict mode.
pub(crate) struct Reporter<'a> {
    sink: &'a mut dyn Warnings,
    strict: bool,
    row: u32,
    count: usize,
}

impl<'a> Reporter<'a> {
    pub(crate) fn new(sink: &'a mut dyn Warnings, strict: bool) -> Self {
        Self {
            sink,
            strict,
            row: 0,
            count: 0,
        }
    }

    pub(crate) fn set_row(&mut self, row: u32) {
        self.row = row;
    }

    pub(crate) fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn warn(&mut self, kind: WarningKind) -> Result<()> {
        let warning = Warning {
            row: self.row,
            kind,
        };

        if self.strict {
            bail!(warning);
        }

        self.count += 1;
        self.sink.warning(&warning.to_string());

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unusual_byte_groupings)]
mod tests {
    use super::*;
    use crate::encode::{EncodeSettings, encode};
    use hayro_common::bit::{BitWriter, FLIP_TABLE};
    use rand::{Rng, SeedableRng};
    use rand_xorshift::XorShiftRng;

    fn settings(columns: u32, rows: u32, compression: Compression) -> DecodeSettings {
        DecodeSettings {
            columns,
            rows,
            compression,
            ..Default::default()
        }
    }

    fn run(data: &[u8], settings: &DecodeSettings) -> (Vec<u8>, Vec<String>) {
        let mut warnings = vec![];
        let out = decode(data, settings, &mut warnings).unwrap();

        (out, warnings)
    }

    /// Random rows with runs of varying lengths, padding bits cleared.
    fn random_image(rng: &mut XorShiftRng, columns: u32, rows: u32) -> Vec<u8> {
        let stride = columns.div_ceil(8) as usize;
        let mut out = vec![0; stride * rows as usize];

        for y in 0..rows as usize {
            let mut x = 0;
            let mut black = rng.random::<bool>();

            while x < columns {
                let max_run = if rng.random_range(0..10) == 0 { 3000 } else { 12 };
                let run = rng.random_range(1..=max_run).min(columns - x);

                if black {
                    for i in x..x + run {
                        out[y * stride + i as usize / 8] |= 0x80 >> (i % 8);
                    }
                }

                x += run;
                black = !black;
            }
        }

        out
    }

    // =========================================================================
    // Modified Huffman (compression 2)
    // =========================================================================

    #[test]
    fn modified_huffman_rows_are_byte_aligned() {
        // Row 1: white 2 (0111), black 2 (11), padded.
        // Row 2: white 4 (1011), padded.
        let data = [0b0111_11_00, 0b1011_0000];
        let (out, warnings) = run(&data, &settings(4, 2, Compression::ModifiedHuffman));
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(out, [0b0011_0000, 0b0000_0000]);
    }

    #[test]
    fn missing_zero_terminator_warns_once() {
        // White 64 without the zero terminating code.
        let data = [0b11011_000];
        let (out, warnings) = run(&data, &settings(64, 1, Compression::ModifiedHuffman));
        assert_eq!(out, [0; 8]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn lsb_fill_order() {
        let data = [FLIP_TABLE[0b0111_11_00]];
        let mut settings = settings(4, 1, Compression::ModifiedHuffman);
        settings.fill_order = FillOrder::LsbFirst;
        let (out, _) = run(&data, &settings);
        assert_eq!(out, [0b0011_0000]);
    }

    // =========================================================================
    // T.4 (compression 3)
    // =========================================================================

    #[test]
    fn group3_one_dimensional() {
        let mut writer = BitWriter::new();
        // EOL, white 3 (1000), black 2 (11), white 3 (1000).
        writer.write(1, 12);
        writer.write(0b1000_11_1000, 10);
        // EOL, white 8 (10011).
        writer.write(1, 12);
        writer.write(0b10011, 5);
        let data = writer.finish();

        let (out, warnings) = run(&data, &settings(8, 2, Compression::Group3));
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(out, [0b000_11_000, 0]);
    }

    #[test]
    fn group3_missing_first_eol() {
        // White 3, black 2, white 3 without a leading EOL.
        let data = [0b1000_11_10, 0b00_000000];
        let (out, warnings) = run(&data, &settings(8, 1, Compression::Group3));
        assert_eq!(out, [0b000_11_000]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("EOL"));
    }

    #[test]
    fn group3_detects_padded_eol() {
        let mut writer = BitWriter::new();
        // EOL with four fill bits, white 8 (10011), then fill bits and EOL.
        writer.write(1, 16);
        writer.write(0b10011_000, 8);
        writer.write(0, 4);
        writer.write(1, 12);
        writer.write(0b1000_11_1000, 10);
        let data = writer.finish();

        let (out, warnings) = run(&data, &settings(8, 2, Compression::Group3));
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(out, [0, 0b000_11_000]);
    }

    #[test]
    fn group3_stops_at_rtc() {
        let mut writer = BitWriter::new();
        writer.write(1, 12);
        writer.write(0b10011, 5);

        for _ in 0..6 {
            writer.write(1, 12);
        }

        let data = writer.finish();
        let mut warnings = vec![];
        let mut out = vec![0xFF; 4];
        let summary =
            decode_into(&data, &settings(8, 4, Compression::Group3), &mut out, 0, 1, &mut warnings).unwrap();

        assert_eq!(summary.decoded_rows, 1);
        assert!(warnings.is_empty());
        assert_eq!(out, [0; 4]);
    }

    #[test]
    fn group3_eof_before_last_row() {
        let mut writer = BitWriter::new();
        writer.write(1, 12);
        writer.write(0b10011, 5);
        let data = writer.finish();

        let mut warnings = vec![];
        let mut out = vec![0; 3];
        let summary =
            decode_into(&data, &settings(8, 3, Compression::Group3), &mut out, 0, 1, &mut warnings).unwrap();

        assert_eq!(summary.decoded_rows, 1);
        assert_eq!(summary.warnings, 1);
        assert!(warnings[0].contains("row 1"));
    }

    #[test]
    fn group3_resynchronizes_after_invalid_code() {
        let mut settings = settings(8, 2, Compression::Group3);
        settings.t4_options = T4Options::TWO_DIMENSIONAL;

        let mut writer = BitWriter::new();
        // EOL + 2-D tag, then the invalid mode code 0000000.
        writer.write(1, 12);
        writer.write(0, 1);
        writer.write(0b0000000_1, 8);
        // EOL + 1-D tag, white 3, black 2, white 3.
        writer.write(1, 12);
        writer.write(1, 1);
        writer.write(0b1000_11_1000, 10);
        let data = writer.finish();

        let (out, warnings) = run(&data, &settings);
        assert_eq!(out, [0, 0b000_11_000]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unknown coding mode"));
    }

    // =========================================================================
    // T.6 (compression 4)
    // =========================================================================

    #[test]
    fn group4_vertical_modes() {
        // Row 1: horizontal (001), white 3 (1000), black 2 (11), then V0 (1).
        // Row 2: V0 (1), V0 (1), V0 (1), same as row 1.
        let mut writer = BitWriter::new();
        writer.write(0b001_1000_11, 9);
        writer.write(0b1, 1);
        writer.write(0b111, 3);
        // EOFB
        writer.write(0x001001, 24);
        let data = writer.finish();

        let (out, warnings) = run(&data, &settings(8, 2, Compression::Group4));
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(out, [0b000_11_000, 0b000_11_000]);
    }

    #[test]
    fn group4_pass_mode() {
        // Row 1: white 1, black 1, white 6 via horizontal (001 000111 010),
        // then V0.
        // Row 2: pass (0001) skips the black run of row 1, V0 (1) at the end.
        let mut writer = BitWriter::new();
        writer.write(0b001_000111_010, 12);
        writer.write(0b1, 1);
        writer.write(0b0001, 4);
        writer.write(0b1, 1);
        let data = writer.finish();

        let (out, warnings) = run(&data, &settings(8, 2, Compression::Group4));
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(out, [0b0100_0000, 0]);
    }

    #[test]
    fn group4_unknown_mode_stops_page() {
        let mut writer = BitWriter::new();
        writer.write(0b001_1000_11, 9);
        writer.write(0b1, 1);
        writer.write(0, 7);
        writer.write(0xFF, 8);
        let data = writer.finish();

        let mut warnings = vec![];
        let mut out = vec![0xFF; 3];
        let summary =
            decode_into(&data, &settings(8, 3, Compression::Group4), &mut out, 0, 1, &mut warnings).unwrap();

        assert_eq!(summary.decoded_rows, 2);
        assert_eq!(out, [0b000_11_000, 0, 0]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn group4_uncompressed_mode() {
        let mut settings = settings(8, 1, Compression::Group4);
        settings.t6_options = T6Options::UNCOMPRESSED;

        let mut writer = BitWriter::new();
        // Extension 0000001 111, then "1" (black), "01" (white, black),
        // exit "0000001" + tag 0 (2 pixels consumed so far = 3).
        writer.write(0b0000001_111, 10);
        writer.write(0b1, 1);
        writer.write(0b01, 2);
        writer.write(0b0000001_0, 8);
        // Back in 2-D mode at a0 = 3, white: V0 to b1 = 8.
        writer.write(0b1, 1);
        let data = writer.finish();

        let (out, warnings) = run(&data, &settings);
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(out, [0b101_00000]);
    }

    #[test]
    fn group4_extension_without_option() {
        let mut writer = BitWriter::new();
        writer.write(0b0000001_111, 10);
        let data = writer.finish();

        let (_, warnings) = run(&data, &settings(8, 1, Compression::Group4));
        assert_eq!(warnings.len(), 1);
    }

    // =========================================================================
    // Errors and settings
    // =========================================================================

    #[test]
    fn empty_data() {
        let mut warnings = vec![];
        assert_eq!(
            decode(&[], &settings(8, 1, Compression::Group4), &mut warnings),
            Err(DecodeError::UnexpectedEof)
        );
    }

    #[test]
    fn buffer_checks() {
        let mut warnings = vec![];
        let settings = settings(16, 2, Compression::Group4);
        let mut out = vec![0; 3];
        assert_eq!(
            decode_into(&[0xFF], &settings, &mut out, 0, 2, &mut warnings),
            Err(DecodeError::BufferTooSmall)
        );
        assert_eq!(
            decode_into(&[0xFF], &settings, &mut out, 0, 1, &mut warnings),
            Err(DecodeError::InvalidDimensions)
        );
    }

    #[test]
    fn strict_mode() {
        let mut settings = settings(64, 1, Compression::ModifiedHuffman);
        settings.strict = true;
        let mut warnings = vec![];
        let result = decode(&[0b11011_000], &settings, &mut warnings);
        assert!(matches!(result, Err(DecodeError::Strict(_))));
        assert!(warnings.is_empty());
    }

    #[test]
    fn writes_at_offset_and_stride() {
        let data = [0b0111_11_00];
        let mut out = vec![0xEE; 6];
        let mut warnings = vec![];
        decode_into(&data, &settings(4, 1, Compression::ModifiedHuffman), &mut out, 2, 3, &mut warnings)
            .unwrap();
        assert_eq!(out, [0xEE, 0xEE, 0b0011_0000, 0xEE, 0xEE, 0xEE]);
    }

    // =========================================================================
    // Round trips through the encoder
    // =========================================================================

    #[test]
    fn round_trip_all_schemes() {
        let mut rng = XorShiftRng::seed_from_u64(7);

        for _ in 0..30 {
            let columns = rng.random_range(1..4000);
            let rows = rng.random_range(1..8);
            let image = random_image(&mut rng, columns, rows);

            let schemes = [
                (Compression::ModifiedHuffman, T4Options::empty(), 0),
                (Compression::Group3, T4Options::empty(), 0),
                (Compression::Group3, T4Options::FILL_BITS, 0),
                (Compression::Group3, T4Options::TWO_DIMENSIONAL, 2),
                (Compression::Group3, T4Options::TWO_DIMENSIONAL | T4Options::FILL_BITS, 4),
                (Compression::Group4, T4Options::empty(), 0),
            ];

            for (compression, t4_options, k) in schemes {
                let encoded = encode(
                    &image,
                    &EncodeSettings {
                        columns,
                        compression,
                        t4_options,
                        k,
                    },
                );

                let mut settings = settings(columns, rows, compression);
                settings.t4_options = t4_options;
                settings.strict = true;

                let mut warnings = vec![];
                let decoded = decode(&encoded, &settings, &mut warnings).unwrap();
                assert_eq!(decoded, image, "{compression:?} {t4_options:?} {columns}x{rows}");
            }
        }
    }
}
