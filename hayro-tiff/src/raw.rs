//! Strategies that turn the compressed bytes of a strip or tile into raw,
//! uncompressed samples.

use crate::error::{BufferError, FormatError, Result, bail, err};
use crate::info::{ImageInfo, compression};
use crate::log::{ltrace, lwarn};
use hayro_ccitt::{Compression, DecodeSettings, Warnings};
use hayro_common::byte::Reader;

/// The compressed data of a strip or tile and how to interpret it.
#[derive(Debug, Clone, Copy)]
pub struct RawSource<'a> {
    /// The compressed bytes.
    pub data: &'a [u8],
    /// The image the data belongs to.
    pub info: &'a ImageInfo,
    /// The width of the strip or tile in pixels.
    pub width: u32,
    /// The height of the strip or tile in pixels.
    pub height: u32,
    /// The number of bits of a pixel in the decompressed data.
    pub bits_per_pixel: u32,
}

impl RawSource<'_> {
    /// The number of bytes of a decompressed row. Rows are padded to a
    /// byte boundary.
    pub fn bytes_per_row(&self) -> usize {
        (self.bits_per_pixel as usize * self.width as usize).div_ceil(8)
    }
}

/// Decompresses strips or tiles of a single compression scheme.
///
/// Only [`RawDecoder::decode_raw`] has to be implemented. The typed
/// variants decompress bytes and combine them in the byte order of the
/// image, decoders that can produce wider samples directly may override
/// them.
pub trait RawDecoder {
    /// Decompress `src` into bytes, writing row `y` at
    /// `out[offset + y * stride..]`.
    fn decode_raw(
        &mut self,
        src: &RawSource<'_>,
        out: &mut [u8],
        offset: usize,
        stride: usize,
        warnings: &mut dyn Warnings,
    ) -> Result<()>;

    /// Decompress `src` into 16-bit samples. `offset` and `stride` are in
    /// elements.
    fn decode_raw_u16(
        &mut self,
        src: &RawSource<'_>,
        out: &mut [u16],
        offset: usize,
        stride: usize,
        warnings: &mut dyn Warnings,
    ) -> Result<()> {
        let bytes = decode_bytes(self, src, warnings)?;
        combine(src, &bytes, out, offset, stride, |r| r.read_u16())
    }

    /// Decompress `src` into 32-bit samples. `offset` and `stride` are in
    /// elements.
    fn decode_raw_u32(
        &mut self,
        src: &RawSource<'_>,
        out: &mut [u32],
        offset: usize,
        stride: usize,
        warnings: &mut dyn Warnings,
    ) -> Result<()> {
        let bytes = decode_bytes(self, src, warnings)?;
        combine(src, &bytes, out, offset, stride, |r| r.read_u32())
    }

    /// Decompress `src` into single precision samples. `offset` and
    /// `stride` are in elements.
    fn decode_raw_f32(
        &mut self,
        src: &RawSource<'_>,
        out: &mut [f32],
        offset: usize,
        stride: usize,
        warnings: &mut dyn Warnings,
    ) -> Result<()> {
        let bytes = decode_bytes(self, src, warnings)?;
        combine(src, &bytes, out, offset, stride, |r| r.read_f32())
    }

    /// Decompress `src` into double precision samples. `offset` and
    /// `stride` are in elements.
    fn decode_raw_f64(
        &mut self,
        src: &RawSource<'_>,
        out: &mut [f64],
        offset: usize,
        stride: usize,
        warnings: &mut dyn Warnings,
    ) -> Result<()> {
        let bytes = decode_bytes(self, src, warnings)?;
        combine(src, &bytes, out, offset, stride, |r| r.read_f64())
    }
}

/// Decompress into a tightly packed byte buffer.
pub(crate) fn decode_bytes<D: RawDecoder + ?Sized>(
    decoder: &mut D,
    src: &RawSource<'_>,
    warnings: &mut dyn Warnings,
) -> Result<Vec<u8>> {
    let bytes_per_row = src.bytes_per_row();
    let len = bytes_per_row
        .checked_mul(src.height as usize)
        .ok_or(BufferError::InvalidDimensions)?;
    let mut bytes = vec![0; len];
    decoder.decode_raw(src, &mut bytes, 0, bytes_per_row, warnings)?;

    Ok(bytes)
}

fn combine<T>(
    src: &RawSource<'_>,
    bytes: &[u8],
    out: &mut [T],
    offset: usize,
    stride: usize,
    read: impl Fn(&mut Reader<'_>) -> Option<T>,
) -> Result<()> {
    let bytes_per_row = src.bytes_per_row();
    let per_row = bytes_per_row / size_of::<T>();

    if bytes_per_row == 0 {
        return Ok(());
    }

    for (y, row) in bytes.chunks_exact(bytes_per_row).enumerate() {
        let start = offset + y * stride;
        let Some(dst) = out.get_mut(start..start + per_row) else {
            bail!(BufferError::TooSmall);
        };
        let mut reader = Reader::new(row, src.info.byte_order);

        for (v, sample) in dst.iter_mut().zip(core::iter::from_fn(|| read(&mut reader))) {
            *v = sample;
        }
    }

    Ok(())
}

/// Copies uncompressed data.
#[derive(Debug, Default, Clone, Copy)]
pub struct Uncompressed;

impl RawDecoder for Uncompressed {
    fn decode_raw(
        &mut self,
        src: &RawSource<'_>,
        out: &mut [u8],
        offset: usize,
        stride: usize,
        warnings: &mut dyn Warnings,
    ) -> Result<()> {
        let bytes_per_row = src.bytes_per_row();
        let mut truncated = false;

        for y in 0..src.height as usize {
            let start = offset + y * stride;
            let Some(dst) = out.get_mut(start..start + bytes_per_row) else {
                bail!(BufferError::TooSmall);
            };

            let available = src
                .data
                .get(y * bytes_per_row..)
                .map(|d| &d[..d.len().min(bytes_per_row)])
                .unwrap_or(&[]);

            dst[..available.len()].copy_from_slice(available);
            dst[available.len()..].fill(0);
            truncated |= available.len() < bytes_per_row;
        }

        if truncated {
            lwarn!(
                "uncompressed strip has {} of {} bytes",
                src.data.len(),
                bytes_per_row * src.height as usize
            );
            warnings.warning("uncompressed strip or tile is truncated, missing samples are zero");
        }

        Ok(())
    }
}

/// Decodes CCITT modified Huffman, T.4 and T.6 data.
#[derive(Debug, Default, Clone, Copy)]
pub struct Fax {
    strict: bool,
}

impl Fax {
    /// A decoder that fails on the first problem in the data instead of
    /// recovering from it.
    pub fn strict() -> Self {
        Self { strict: true }
    }
}

impl RawDecoder for Fax {
    fn decode_raw(
        &mut self,
        src: &RawSource<'_>,
        out: &mut [u8],
        offset: usize,
        stride: usize,
        warnings: &mut dyn Warnings,
    ) -> Result<()> {
        let Some(compression) = Compression::from_tag(src.info.compression) else {
            return err!(FormatError::UnsupportedCompression(src.info.compression));
        };

        if src.bits_per_pixel != 1 {
            bail!(FormatError::UnsupportedLayout);
        }

        let settings = DecodeSettings {
            columns: src.width,
            rows: src.height,
            compression,
            fill_order: src.info.fill_order,
            t4_options: src.info.t4_options,
            t6_options: src.info.t6_options,
            strict: self.strict,
        };

        let summary = hayro_ccitt::decode_into(src.data, &settings, out, offset, stride, warnings)?;
        ltrace!(
            "decoded {} of {} fax rows with {} warnings",
            summary.decoded_rows,
            src.height,
            summary.warnings
        );

        Ok(())
    }
}

/// The decoder for a value of the `Compression` field.
pub fn for_compression(value: u16) -> Result<Box<dyn RawDecoder>> {
    match value {
        compression::NONE => Ok(Box::new(Uncompressed)),
        compression::CCITT_RLE | compression::CCITT_T4 | compression::CCITT_T6 => {
            Ok(Box::new(Fax::default()))
        }
        _ => err!(FormatError::UnsupportedCompression(value)),
    }
}
