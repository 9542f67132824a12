//! Choosing the pixel layout that decoders write raw samples in.

use crate::buffer::{ElementKind, PixelBuffer, SampleModel};
use crate::error::BufferError;
use crate::info::{ImageInfo, Photometric, SampleFormat, compression};

/// An 8-bit lookup table for palette images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    /// The red entries.
    pub red: Vec<u8>,
    /// The green entries.
    pub green: Vec<u8>,
    /// The blue entries.
    pub blue: Vec<u8>,
}

impl Palette {
    /// Build the lookup table of an image with `bits`-bit indices from a
    /// TIFF color map. Returns `None` if the map is too short.
    pub fn from_color_map(map: &[u16], bits: u32) -> Option<Self> {
        let size = 1_usize << bits;

        if map.len() < 3 * size {
            return None;
        }

        let scale = |c: u16| (c as u32 * 255 / 65535) as u8;

        Some(Self {
            red: map[..size].iter().map(|c| scale(*c)).collect(),
            green: map[size..2 * size].iter().map(|c| scale(*c)).collect(),
            blue: map[2 * size..3 * size].iter().map(|c| scale(*c)).collect(),
        })
    }
}

/// How the bands of a raw pixel are interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorKind {
    /// A single gray band.
    Gray,
    /// A single index band into a palette.
    Palette(Palette),
    /// Red, green and blue.
    Rgb,
    /// Red, green and blue without gamma, produced by converting YCbCr or
    /// CIE L*a*b* samples.
    LinearRgb,
    /// Cyan, magenta, yellow and black.
    Cmyk,
    /// Bands without a color interpretation.
    Generic,
}

/// The layout of the buffer that raw samples are decoded into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLayout {
    /// The element kind.
    pub kind: ElementKind,
    /// The sample model.
    pub model: SampleModel,
    /// The color interpretation.
    pub color: ColorKind,
    /// Whether the last band is alpha.
    pub has_alpha: bool,
    /// Whether alpha is premultiplied into the color bands.
    pub premultiplied: bool,
}

impl RawLayout {
    fn new(kind: ElementKind, model: SampleModel, color: ColorKind) -> Self {
        Self {
            kind,
            model,
            color,
            has_alpha: false,
            premultiplied: false,
        }
    }

    fn with_alpha(mut self, info: &ImageInfo) -> Self {
        self.has_alpha = true;
        self.premultiplied = info.associated_alpha();

        self
    }

    /// Create a zero-initialized buffer with this layout.
    pub fn create_buffer(&self, width: u32, height: u32) -> Result<PixelBuffer, BufferError> {
        PixelBuffer::new(width, height, self.kind, self.model)
    }
}

fn int_kind(bits: u32, info: &ImageInfo) -> ElementKind {
    ElementKind::for_bits(bits, info.format() == SampleFormat::Signed)
}

/// Select the layout raw samples of an image are decoded into, or `None` if
/// the sample configuration cannot be represented.
///
/// Common configurations get a layout that matches the data bit for bit,
/// everything else is unpacked into the smallest fitting elements.
pub fn raw_layout(info: &ImageInfo) -> Option<RawLayout> {
    let spp = info.samples_per_pixel as usize;
    let bits = &info.bits_per_sample;

    if spp == 0 || bits.len() != spp {
        return None;
    }

    let format = info.format();
    let is_float = format == SampleFormat::Float;
    let all = |b: u16| bits.iter().all(|v| *v == b);

    // Gray or palette.
    if spp == 1 && matches!(bits[0], 1 | 2 | 4 | 8 | 16) {
        let depth = bits[0] as u32;
        let kind = int_kind(depth, info);
        let model = if depth < 8 {
            SampleModel::MultiPixelPacked { bits: depth as u8 }
        } else {
            SampleModel::Interleaved { bands: 1 }
        };

        let color = match &info.color_map {
            Some(map) => ColorKind::Palette(Palette::from_color_map(map, depth)?),
            None => ColorKind::Gray,
        };

        return Some(RawLayout::new(kind, model, color));
    }

    // Gray and alpha.
    if spp == 2 && (all(8) || all(16)) {
        let kind = int_kind(bits[0] as u32, info);

        return Some(
            RawLayout::new(kind, SampleModel::Interleaved { bands: 2 }, ColorKind::Gray)
                .with_alpha(info),
        );
    }

    if spp == 3 && all(8) {
        let linear = (info.photometric == Photometric::YCbCr
            && info.compression != compression::JPEG
            && info.compression != compression::OLD_JPEG)
            || info.photometric == Photometric::CieLab;
        let color = if linear {
            ColorKind::LinearRgb
        } else {
            ColorKind::Rgb
        };

        return Some(RawLayout::new(
            ElementKind::U8,
            SampleModel::Interleaved { bands: 3 },
            color,
        ));
    }

    if spp == 4 && all(8) {
        let model = SampleModel::Interleaved { bands: 4 };

        return Some(if info.photometric == Photometric::Cmyk {
            RawLayout::new(ElementKind::U8, model, ColorKind::Cmyk)
        } else {
            RawLayout::new(ElementKind::U8, model, ColorKind::Rgb).with_alpha(info)
        });
    }

    if (spp == 3 || spp == 4) && all(16) {
        let layout = RawLayout::new(
            int_kind(16, info),
            SampleModel::Interleaved { bands: spp as u16 },
            ColorKind::Rgb,
        );

        return Some(if spp == 4 { layout.with_alpha(info) } else { layout });
    }

    let total = info.bits_per_pixel();

    // All samples of a pixel in one byte or short.
    if (spp == 3 || spp == 4) && (total == 8 || total == 16) {
        let kind = if total == 8 {
            ElementKind::U8
        } else {
            ElementKind::U16
        };

        return packed_rgb(kind, info);
    }

    if bits[0] % 8 == 0 && bits.iter().all(|b| *b == bits[0]) {
        let kind = match (bits[0], format) {
            (8, f) if f != SampleFormat::Float => Some(ElementKind::U8),
            (16, SampleFormat::Signed) => Some(ElementKind::I16),
            (16, SampleFormat::Unsigned) => Some(ElementKind::U16),
            (32, SampleFormat::Float) => Some(ElementKind::F32),
            (32, _) => Some(ElementKind::I32),
            (64, SampleFormat::Float) => Some(ElementKind::F64),
            _ => None,
        };

        if let Some(kind) = kind {
            let model = SampleModel::Interleaved { bands: spp as u16 };

            if spp <= 4 && matches!(kind, ElementKind::I32 | ElementKind::F32) {
                let color = if spp <= 2 {
                    ColorKind::Gray
                } else {
                    ColorKind::Rgb
                };
                let layout = RawLayout::new(kind, model, color);

                return Some(if spp % 2 == 0 {
                    layout.with_alpha(info)
                } else {
                    layout
                });
            }

            return Some(RawLayout::new(kind, model, ColorKind::Generic));
        }
    }

    // Everything else is unpacked sample by sample.
    let max_bits = bits.iter().copied().max().unwrap_or(0) as u32;

    if info.color_map.is_some() || is_float || max_bits > 32 {
        return None;
    }

    if spp == 2 && bits[0] == bits[1] && matches!(bits[0], 1 | 2 | 4) {
        return Some(
            RawLayout::new(
                ElementKind::U8,
                SampleModel::Interleaved { bands: 2 },
                ColorKind::Gray,
            )
            .with_alpha(info),
        );
    }

    if (spp == 3 || spp == 4) && total <= 32 && format != SampleFormat::Signed {
        return packed_rgb(ElementKind::for_bits(total, false), info);
    }

    Some(RawLayout::new(
        int_kind(max_bits, info),
        SampleModel::Interleaved { bands: spp as u16 },
        ColorKind::Generic,
    ))
}

fn packed_rgb(kind: ElementKind, info: &ImageInfo) -> Option<RawLayout> {
    let model = SampleModel::packed(&info.bits_per_sample)?;
    let layout = RawLayout::new(kind, model, ColorKind::Rgb);

    Some(if info.samples_per_pixel == 4 {
        layout.with_alpha(info)
    } else {
        layout
    })
}

/// The layout of a single plane of a planar image.
pub(crate) fn planar_layout(info: &ImageInfo) -> RawLayout {
    let band = info.planar_band as usize;
    let bits = info.bits(band);
    let format = info.sample_format.get(band).copied().unwrap_or_default();

    let kind = match format {
        SampleFormat::Float if bits <= 32 => ElementKind::F32,
        SampleFormat::Float => ElementKind::F64,
        SampleFormat::Signed => ElementKind::for_bits(bits, true),
        SampleFormat::Unsigned => ElementKind::for_bits(bits, false),
    };

    RawLayout::new(kind, SampleModel::Interleaved { bands: 1 }, ColorKind::Generic)
}
