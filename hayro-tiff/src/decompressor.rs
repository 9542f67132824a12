//! Decompression of strips and tiles into a destination buffer.

use crate::buffer::{Element, ElementKind, PixelBuffer, SampleModel, Storage};
use crate::color::{self, ColorConverter};
use crate::error::{FormatError, Result, bail};
use crate::geometry::{BandMapping, Geometry};
use crate::info::{ImageInfo, Photometric};
use crate::layout::{RawLayout, planar_layout, raw_layout};
use crate::log::{ldebug, ltrace};
use crate::ops;
use crate::raw::{self, RawDecoder, RawSource, decode_bytes};
use crate::rescale::{RescaleCache, RescaleTable};
use hayro_ccitt::Warnings;
use hayro_common::bit::BitReader;
use std::io::{Read, Seek, SeekFrom};

/// Decompresses the strips or tiles of one image.
///
/// A decompressor is created once per image and then called for every
/// strip or tile. Each call decodes the compressed data into raw samples,
/// converts the color space if requested, inverts `WhiteIsZero` samples and
/// finally copies the active region into the destination, selecting and
/// rescaling bands and subsampling on the way. If the destination already
/// has the raw layout and nothing needs to be transformed, the samples are
/// decoded into it directly.
pub struct Decompressor {
    info: ImageInfo,
    decoder: Box<dyn RawDecoder>,
    layout: Option<RawLayout>,
    converter: Option<Box<dyn ColorConverter>>,
    rescale: RescaleCache,
}

impl Decompressor {
    /// Create a decompressor that uses `decoder` for the compressed data.
    pub fn new(info: ImageInfo, decoder: Box<dyn RawDecoder>) -> Result<Self> {
        info.validate()?;

        let layout = if info.planar {
            Some(planar_layout(&info))
        } else {
            raw_layout(&info)
        };

        ldebug!(
            "raw layout for {} bands of {:?} bits: {:?}",
            info.samples_per_pixel,
            info.bits_per_sample,
            layout
        );

        Ok(Self {
            info,
            decoder,
            layout,
            converter: None,
            rescale: RescaleCache::default(),
        })
    }

    /// Create a decompressor for the compression scheme of the image.
    pub fn for_image(info: ImageInfo) -> Result<Self> {
        let decoder = raw::for_compression(info.compression)?;

        Self::new(info, decoder)
    }

    /// Convert the first three bands of every raw pixel with `converter`.
    pub fn with_color_converter(mut self, converter: impl ColorConverter + 'static) -> Self {
        self.converter = Some(Box::new(converter));

        self
    }

    /// The image description.
    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    /// The layout raw samples are decoded into, or `None` if the image
    /// cannot be decoded.
    pub fn raw_layout(&self) -> Option<&RawLayout> {
        self.layout.as_ref()
    }

    /// Read `byte_count` bytes at `offset` from `reader` and decode them.
    pub fn decode_from<R: Read + Seek>(
        &mut self,
        reader: &mut R,
        offset: u64,
        byte_count: usize,
        geometry: &Geometry,
        bands: &BandMapping,
        dst: &mut PixelBuffer,
        warnings: &mut dyn Warnings,
    ) -> Result<()> {
        let mut data = vec![0; byte_count];
        reader.seek(SeekFrom::Start(offset))?;
        reader.read_exact(&mut data)?;

        self.decode(&data, geometry, bands, dst, warnings)
    }

    /// Decode the compressed data of a strip or tile into `dst`.
    pub fn decode(
        &mut self,
        data: &[u8],
        geometry: &Geometry,
        bands: &BandMapping,
        dst: &mut PixelBuffer,
        warnings: &mut dyn Warnings,
    ) -> Result<()> {
        geometry.validate(dst.width(), dst.height())?;
        bands.validate(&self.info, dst.bands())?;

        let Some(layout) = self.layout.as_ref() else {
            bail!(FormatError::UnsupportedLayout);
        };

        let table = self.rescale.update(&self.info, bands, dst);
        let (width, height) = (geometry.src_width, geometry.src_height);

        let direct = self.converter.is_none()
            && geometry.is_unscaled()
            && table.is_none()
            && bands.is_identity(self.info.samples_per_pixel as usize)
            && dst.kind() == layout.kind
            && dst.model() == layout.model
            && window_aligned(dst, geometry);

        ldebug!(
            "decoding {}x{} pixels at ({}, {}), direct: {}",
            width,
            height,
            geometry.src_min_x,
            geometry.src_min_y,
            direct
        );

        if direct {
            let (x, y) = (geometry.dst_min_x, geometry.dst_min_y);
            decode_window(&mut *self.decoder, &self.info, data, dst, x, y, width, height, warnings)?;
            finish_raw(self.converter.as_deref(), &self.info, dst, x, y, width, height);

            return Ok(());
        }

        let mut raw = layout.create_buffer(width, height)?;
        decode_window(&mut *self.decoder, &self.info, data, &mut raw, 0, 0, width, height, warnings)?;
        finish_raw(self.converter.as_deref(), &self.info, &mut raw, 0, 0, width, height);
        place(&raw, dst, geometry, bands, self.info.planar, table);

        Ok(())
    }
}

/// Whether decoding directly into `dst` only touches the destination
/// region.
fn window_aligned(dst: &PixelBuffer, geometry: &Geometry) -> bool {
    if dst.element_offset(geometry.dst_min_x, geometry.dst_min_y).is_none() {
        return false;
    }

    match dst.model() {
        SampleModel::MultiPixelPacked { bits } => {
            let end = geometry.dst_min_x + geometry.dst_width;

            (end as usize * bits as usize).is_multiple_of(8) || end == dst.width()
        }
        _ => true,
    }
}

/// The bits of each band of the raw samples.
fn raw_bits(info: &ImageInfo) -> Vec<u32> {
    if info.planar {
        vec![info.bits(info.planar_band as usize)]
    } else {
        (0..info.samples_per_pixel as usize).map(|b| info.bits(b)).collect()
    }
}

/// Decode raw samples into the `width` x `height` window of `target` at
/// `(x, y)`.
fn decode_window(
    decoder: &mut dyn RawDecoder,
    info: &ImageInfo,
    data: &[u8],
    target: &mut PixelBuffer,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    warnings: &mut dyn Warnings,
) -> Result<()> {
    let bits = raw_bits(info);

    let src = RawSource {
        data,
        info,
        width,
        height,
        bits_per_pixel: bits.iter().sum(),
    };

    if is_bit_contiguous(target, &bits) {
        let offset = target
            .element_offset(x, y)
            .ok_or(FormatError::InvalidGeometry)?;

        decode_contiguous(decoder, &src, target, offset, warnings)
    } else {
        decode_discontiguous(decoder, &src, &bits, target, x, y, warnings)
    }
}

/// Whether the samples fill the elements of `target` without gaps, so the
/// decompressed bytes can be stored as they are.
fn is_bit_contiguous(target: &PixelBuffer, bits: &[u32]) -> bool {
    let element_bits = target.kind().bits();

    match target.model() {
        SampleModel::Interleaved { bands } => {
            bits.len() == bands as usize && bits.iter().all(|b| *b == element_bits)
        }
        SampleModel::MultiPixelPacked { bits: pixel_bits } => {
            bits == [pixel_bits as u32] && element_bits % pixel_bits as u32 == 0
        }
        SampleModel::SinglePixelPacked { .. } => {
            let model_bits: Vec<u32> = (0..target.bands()).map(|b| target.sample_bits(b)).collect();

            model_bits == bits && bits.iter().sum::<u32>() == element_bits
        }
    }
}

fn decode_contiguous(
    decoder: &mut dyn RawDecoder,
    src: &RawSource<'_>,
    target: &mut PixelBuffer,
    offset: usize,
    warnings: &mut dyn Warnings,
) -> Result<()> {
    let stride = target.stride();
    let sizes: Vec<u32> = (0..target.bands()).map(|b| target.sample_bits(b)).collect();
    let all = |n: u32| sizes.iter().all(|s| *s == n);
    let (all_16, all_32) = (all(16), all(32));
    let packed = RawSource {
        bits_per_pixel: sizes.iter().sum(),
        ..*src
    };

    match target.storage_mut() {
        Storage::U8(data) => decoder.decode_raw(src, data, offset, stride, warnings),
        Storage::F32(data) => decoder.decode_raw_f32(src, data, offset, stride, warnings),
        Storage::F64(data) => decoder.decode_raw_f64(src, data, offset, stride, warnings),
        Storage::U16(data) if all_16 => decoder.decode_raw_u16(src, data, offset, stride, warnings),
        Storage::I16(data) if all_16 => {
            let out = bytemuck::cast_slice_mut(data.as_mut_slice());
            decoder.decode_raw_u16(src, out, offset, stride, warnings)
        }
        Storage::I32(data) if all_32 => {
            let out = bytemuck::cast_slice_mut(data.as_mut_slice());
            decoder.decode_raw_u32(src, out, offset, stride, warnings)
        }
        Storage::U16(data) => {
            let bytes = decode_bytes(decoder, &packed, warnings)?;
            reformat(&bytes, packed.bytes_per_row(), data, offset, stride, |v| v as u16);

            Ok(())
        }
        Storage::I16(data) => {
            let bytes = decode_bytes(decoder, &packed, warnings)?;
            reformat(&bytes, packed.bytes_per_row(), data, offset, stride, |v| v as i16);

            Ok(())
        }
        Storage::I32(data) => {
            let bytes = decode_bytes(decoder, &packed, warnings)?;
            reformat(&bytes, packed.bytes_per_row(), data, offset, stride, |v| v as i32);

            Ok(())
        }
    }
}

/// Combine the bytes of every row into big-endian elements. A partial
/// element at the end of a row is filled from the most significant byte.
fn reformat<T>(
    bytes: &[u8],
    bytes_per_row: usize,
    out: &mut [T],
    offset: usize,
    stride: usize,
    from: impl Fn(u32) -> T,
) {
    let size = size_of::<T>();

    if bytes_per_row == 0 {
        return;
    }

    for (y, row) in bytes.chunks_exact(bytes_per_row).enumerate() {
        let start = offset + y * stride;

        for (i, chunk) in row.chunks(size).enumerate() {
            let value = chunk
                .iter()
                .fold(0_u32, |acc, b| (acc << 8) | *b as u32)
                << (8 * (size - chunk.len()));

            if let Some(v) = out.get_mut(start + i) {
                *v = from(value);
            }
        }
    }
}

/// Decode into bytes and distribute the samples of every pixel to the
/// bands of `target`.
fn decode_discontiguous(
    decoder: &mut dyn RawDecoder,
    src: &RawSource<'_>,
    bits: &[u32],
    target: &mut PixelBuffer,
    x0: u32,
    y0: u32,
    warnings: &mut dyn Warnings,
) -> Result<()> {
    if bits.iter().any(|b| *b == 0 || *b > 32) || target.bands() < bits.len() {
        bail!(FormatError::UnsupportedLayout);
    }

    ltrace!("unpacking samples of {:?} bits", bits);

    let bytes = decode_bytes(decoder, src, warnings)?;
    let bytes_per_row = src.bytes_per_row();

    for y in 0..src.height {
        let row = bytes.get(y as usize * bytes_per_row..).unwrap_or(&[]);
        let mut reader = BitReader::new(row);

        for x in 0..src.width {
            for (band, n) in bits.iter().enumerate() {
                let value = reader.read_bits(*n as u8);
                target.set_sample(x0 + x, y0 + y, band, value);
            }
        }
    }

    Ok(())
}

/// Apply color conversion and photometric inversion to a decoded window.
fn finish_raw(
    converter: Option<&dyn ColorConverter>,
    info: &ImageInfo,
    target: &mut PixelBuffer,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
) {
    if let Some(converter) = converter {
        color::convert(target, converter, x, y, width, height);
    }

    if info.photometric == Photometric::WhiteIsZero {
        ops::invert(target, x, y, width, height, &raw_bits(info));
    }
}

/// Copy the active region of the raw samples to the destination region.
fn place(
    raw: &PixelBuffer,
    dst: &mut PixelBuffer,
    geometry: &Geometry,
    bands: &BandMapping,
    planar: bool,
    table: Option<&RescaleTable>,
) {
    let raw_band = |i: usize| if planar { 0 } else { bands.source[i] };
    let rx0 = geometry.active_src_min_x - geometry.src_min_x;
    let ry0 = geometry.active_src_min_y - geometry.src_min_y;
    let (ss_x, ss_y) = (geometry.subsample_x, geometry.subsample_y);

    if let Some(table) = table {
        for dy in 0..geometry.dst_height {
            let ry = ry0 + dy * ss_y;

            for dx in 0..geometry.dst_width {
                let rx = rx0 + dx * ss_x;

                for (i, band) in bands.destination.iter().enumerate() {
                    let value = table.get(i, raw.sample(rx, ry, raw_band(i)));
                    dst.set_sample(geometry.dst_min_x + dx, geometry.dst_min_y + dy, *band, value);
                }
            }
        }

        return;
    }

    if ss_x == 1 && copy_rows(raw, dst, geometry, bands, planar) {
        return;
    }

    let float = raw.kind().is_float() || dst.kind().is_float();

    for dy in 0..geometry.dst_height {
        let ry = ry0 + dy * ss_y;

        for dx in 0..geometry.dst_width {
            let rx = rx0 + dx * ss_x;
            let (x, y) = (geometry.dst_min_x + dx, geometry.dst_min_y + dy);

            for (i, band) in bands.destination.iter().enumerate() {
                if float {
                    dst.set_sample_f64(x, y, *band, raw.sample_f64(rx, ry, raw_band(i)));
                } else {
                    dst.set_sample(x, y, *band, raw.sample(rx, ry, raw_band(i)));
                }
            }
        }
    }
}

/// Copy whole row segments if both buffers store the same bands in the
/// same interleaved elements. Returns `false` if they don't.
fn copy_rows(
    raw: &PixelBuffer,
    dst: &mut PixelBuffer,
    geometry: &Geometry,
    bands: &BandMapping,
    planar: bool,
) -> bool {
    let (
        SampleModel::Interleaved { bands: raw_bands },
        SampleModel::Interleaved { bands: dst_bands },
    ) = (raw.model(), dst.model())
    else {
        return false;
    };

    let count = raw_bands as usize;
    let identity = raw_bands == dst_bands
        && bands.len() == count
        && (0..count).all(|i| (if planar { 0 } else { bands.source[i] }) == i)
        && bands.destination.iter().enumerate().all(|(i, b)| *b == i);

    if !identity || raw.kind() != dst.kind() {
        return false;
    }

    match raw.kind() {
        ElementKind::U8 => copy_rows_typed::<u8>(raw, dst, geometry, count),
        ElementKind::U16 => copy_rows_typed::<u16>(raw, dst, geometry, count),
        ElementKind::I16 => copy_rows_typed::<i16>(raw, dst, geometry, count),
        ElementKind::I32 => copy_rows_typed::<i32>(raw, dst, geometry, count),
        ElementKind::F32 => copy_rows_typed::<f32>(raw, dst, geometry, count),
        ElementKind::F64 => copy_rows_typed::<f64>(raw, dst, geometry, count),
    }

    true
}

fn copy_rows_typed<T: Element>(
    raw: &PixelBuffer,
    dst: &mut PixelBuffer,
    geometry: &Geometry,
    bands: usize,
) {
    let src_start = (geometry.active_src_min_x - geometry.src_min_x) as usize * bands;
    let dst_start = geometry.dst_min_x as usize * bands;
    let len = geometry.dst_width as usize * bands;
    let ry0 = geometry.active_src_min_y - geometry.src_min_y;

    for dy in 0..geometry.dst_height {
        let ry = ry0 + dy * geometry.subsample_y;

        let out = dst.row_mut::<T>(geometry.dst_min_y + dy);

        if let (Some(src), Some(out)) = (raw.row::<T>(ry), out) {
            out[dst_start..dst_start + len].copy_from_slice(&src[src_start..src_start + len]);
        }
    }
}
