//! The per-image description that decompression depends on.
//!
//! All values are taken from the TIFF directory of the image by the caller
//! and stay the same for all strips and tiles of the image.

use crate::error::{FormatError, bail};
use hayro_ccitt::{FillOrder, T4Options, T6Options};
use hayro_common::byte::ByteOrder;

/// Values of the `Compression` field.
pub mod compression {
    /// No compression.
    pub const NONE: u16 = 1;
    /// Modified Huffman run-length encoding.
    pub const CCITT_RLE: u16 = 2;
    /// ITU-T T.4 fax encoding.
    pub const CCITT_T4: u16 = 3;
    /// ITU-T T.6 fax encoding.
    pub const CCITT_T6: u16 = 4;
    /// Lempel-Ziv-Welch.
    pub const LZW: u16 = 5;
    /// Pre-TIFF 6.0 JPEG.
    pub const OLD_JPEG: u16 = 6;
    /// JPEG.
    pub const JPEG: u16 = 7;
    /// Deflate.
    pub const DEFLATE: u16 = 8;
    /// Deflate, with the value registered by Adobe.
    pub const ADOBE_DEFLATE: u16 = 32946;
    /// Macintosh PackBits.
    pub const PACKBITS: u16 = 32773;
}

/// The `PhotometricInterpretation` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Photometric {
    /// Zero is white. Samples are inverted during decompression.
    WhiteIsZero,
    /// Zero is black.
    BlackIsZero,
    /// RGB.
    Rgb,
    /// Indices into the color map.
    Palette,
    /// A transparency mask.
    TransparencyMask,
    /// Separated, usually CMYK.
    Cmyk,
    /// YCbCr.
    YCbCr,
    /// CIE L*a*b*.
    CieLab,
    /// Any other value.
    Other(u16),
}

impl Photometric {
    /// Map a value of the `PhotometricInterpretation` field.
    pub fn from_tag(value: u16) -> Self {
        match value {
            0 => Self::WhiteIsZero,
            1 => Self::BlackIsZero,
            2 => Self::Rgb,
            3 => Self::Palette,
            4 => Self::TransparencyMask,
            5 => Self::Cmyk,
            6 => Self::YCbCr,
            8 => Self::CieLab,
            v => Self::Other(v),
        }
    }
}

/// The `SampleFormat` field of a single band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// Unsigned integers.
    #[default]
    Unsigned,
    /// Two's complement signed integers.
    Signed,
    /// IEEE floating point.
    Float,
}

impl SampleFormat {
    /// Map a value of the `SampleFormat` field. Undefined and unknown
    /// formats are read as unsigned integers.
    pub fn from_tag(value: u16) -> Self {
        match value {
            2 => Self::Signed,
            3 => Self::Float,
            _ => Self::Unsigned,
        }
    }
}

/// The `ExtraSamples` field of a single extra band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraSample {
    /// Unspecified data.
    #[default]
    Unspecified,
    /// Alpha premultiplied into the color bands.
    AssociatedAlpha,
    /// Straight alpha.
    UnassociatedAlpha,
}

impl ExtraSample {
    /// Map a value of the `ExtraSamples` field.
    pub fn from_tag(value: u16) -> Self {
        match value {
            1 => Self::AssociatedAlpha,
            2 => Self::UnassociatedAlpha,
            _ => Self::Unspecified,
        }
    }
}

/// Everything about an image that is needed to decompress its strips or
/// tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageInfo {
    /// The value of the `Compression` field, see [`compression`].
    pub compression: u16,
    /// The photometric interpretation.
    pub photometric: Photometric,
    /// The number of bands.
    pub samples_per_pixel: u16,
    /// The bit depth of every band.
    pub bits_per_sample: Vec<u16>,
    /// The sample format of every band. Missing entries are unsigned.
    pub sample_format: Vec<SampleFormat>,
    /// The meaning of the bands beyond the color bands.
    pub extra_samples: Vec<ExtraSample>,
    /// The `ColorMap` field: all red, then all green, then all blue
    /// entries.
    pub color_map: Option<Vec<u16>>,
    /// The bit order of fax data.
    pub fill_order: FillOrder,
    /// The `T4Options` field.
    pub t4_options: T4Options,
    /// The `T6Options` field.
    pub t6_options: T6Options,
    /// The byte order of the file, used for multi-byte samples.
    pub byte_order: ByteOrder,
    /// Whether the bands are stored in separate planes.
    pub planar: bool,
    /// For planar images, the band whose plane is being decoded.
    pub planar_band: u16,
}

impl Default for ImageInfo {
    fn default() -> Self {
        Self {
            compression: compression::NONE,
            photometric: Photometric::BlackIsZero,
            samples_per_pixel: 1,
            bits_per_sample: vec![1],
            sample_format: vec![SampleFormat::Unsigned],
            extra_samples: vec![],
            color_map: None,
            fill_order: FillOrder::MsbFirst,
            t4_options: T4Options::empty(),
            t6_options: T6Options::empty(),
            byte_order: ByteOrder::BigEndian,
            planar: false,
            planar_band: 0,
        }
    }
}

impl ImageInfo {
    /// An image with `samples_per_pixel` unsigned bands of equal depth.
    pub fn new(samples_per_pixel: u16, bits: u16, photometric: Photometric) -> Self {
        Self {
            photometric,
            samples_per_pixel,
            bits_per_sample: vec![bits; samples_per_pixel as usize],
            sample_format: vec![SampleFormat::Unsigned; samples_per_pixel as usize],
            ..Default::default()
        }
    }

    /// The bit depth of a band.
    pub fn bits(&self, band: usize) -> u32 {
        self.bits_per_sample.get(band).copied().unwrap_or(0) as u32
    }

    /// The sample format of the image, given by its first band.
    pub fn format(&self) -> SampleFormat {
        self.sample_format.first().copied().unwrap_or_default()
    }

    /// Whether the first extra sample is premultiplied alpha.
    pub fn associated_alpha(&self) -> bool {
        self.extra_samples.first() == Some(&ExtraSample::AssociatedAlpha)
    }

    /// The total number of bits of a pixel.
    pub fn bits_per_pixel(&self) -> u32 {
        self.bits_per_sample.iter().map(|b| *b as u32).sum()
    }

    pub(crate) fn validate(&self) -> Result<(), FormatError> {
        let bands = self.samples_per_pixel as usize;

        if bands == 0 || self.bits_per_sample.len() != bands {
            bail!(FormatError::InvalidImageInfo);
        }

        if self
            .bits_per_sample
            .iter()
            .any(|b| *b == 0 || (*b > 32 && *b != 64))
        {
            bail!(FormatError::InvalidImageInfo);
        }

        if self.planar && self.planar_band as usize >= bands {
            bail!(FormatError::InvalidImageInfo);
        }

        Ok(())
    }
}
