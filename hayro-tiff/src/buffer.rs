//! Pixel buffers with different element kinds and sample layouts.

use crate::error::{BufferError, bail};
use core::fmt::Debug;

/// The storage type of the elements of a pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Unsigned 8-bit integers.
    U8,
    /// Unsigned 16-bit integers.
    U16,
    /// Signed 16-bit integers.
    I16,
    /// Signed 32-bit integers.
    I32,
    /// Single precision floats.
    F32,
    /// Double precision floats.
    F64,
}

impl ElementKind {
    /// The size of an element in bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::U16 | Self::I16 => 16,
            Self::I32 | Self::F32 => 32,
            Self::F64 => 64,
        }
    }

    /// Whether the elements are floating point numbers.
    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// The smallest integer kind that holds `bits` bits.
    pub(crate) fn for_bits(bits: u32, signed: bool) -> Self {
        if bits <= 8 {
            Self::U8
        } else if bits <= 16 {
            if signed { Self::I16 } else { Self::U16 }
        } else {
            Self::I32
        }
    }
}

/// A numeric element type of a pixel buffer.
///
/// Integer samples are exchanged as `u32` bit patterns, signed elements are
/// sign-extended first.
pub trait Element: bytemuck::Pod + Default + PartialEq + Debug + Send + Sync + 'static {
    /// The kind of this element type.
    const KIND: ElementKind;

    /// The photometric inverse of the value.
    fn invert(self) -> Self;
    /// The value as a double.
    fn to_f64(self) -> f64;
    /// Convert a double, saturating at the bounds of the type.
    fn from_f64(value: f64) -> Self;
    /// The value as an integer sample.
    fn to_u32(self) -> u32;
    /// Convert an integer sample, truncating to the width of the type.
    fn from_u32(value: u32) -> Self;
}

impl Element for u8 {
    const KIND: ElementKind = ElementKind::U8;

    fn invert(self) -> Self {
        self ^ 0xFF
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as Self
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn from_u32(value: u32) -> Self {
        value as Self
    }
}

impl Element for u16 {
    const KIND: ElementKind = ElementKind::U16;

    fn invert(self) -> Self {
        self ^ 0xFFFF
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as Self
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn from_u32(value: u32) -> Self {
        value as Self
    }
}

impl Element for i16 {
    const KIND: ElementKind = ElementKind::I16;

    fn invert(self) -> Self {
        Self::MAX.wrapping_sub(self)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as Self
    }

    fn to_u32(self) -> u32 {
        self as i32 as u32
    }

    fn from_u32(value: u32) -> Self {
        value as Self
    }
}

impl Element for i32 {
    const KIND: ElementKind = ElementKind::I32;

    fn invert(self) -> Self {
        Self::MAX.wrapping_sub(self)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as Self
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn from_u32(value: u32) -> Self {
        value as Self
    }
}

impl Element for f32 {
    const KIND: ElementKind = ElementKind::F32;

    fn invert(self) -> Self {
        1.0 - self
    }

    fn to_f64(self) -> f64 {
        self as f64
    }

    fn from_f64(value: f64) -> Self {
        value as Self
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn from_u32(value: u32) -> Self {
        value as Self
    }
}

impl Element for f64 {
    const KIND: ElementKind = ElementKind::F64;

    fn invert(self) -> Self {
        1.0 - self
    }

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }

    fn to_u32(self) -> u32 {
        self as u32
    }

    fn from_u32(value: u32) -> Self {
        value as Self
    }
}

/// The elements of a pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    /// Unsigned 8-bit integers.
    U8(Vec<u8>),
    /// Unsigned 16-bit integers.
    U16(Vec<u16>),
    /// Signed 16-bit integers.
    I16(Vec<i16>),
    /// Signed 32-bit integers.
    I32(Vec<i32>),
    /// Single precision floats.
    F32(Vec<f32>),
    /// Double precision floats.
    F64(Vec<f64>),
}

/// Run `$body` with `$data` bound to the typed elements of a storage.
macro_rules! dispatch {
    ($storage:expr, $data:ident => $body:expr) => {
        match $storage {
            $crate::buffer::Storage::U8($data) => $body,
            $crate::buffer::Storage::U16($data) => $body,
            $crate::buffer::Storage::I16($data) => $body,
            $crate::buffer::Storage::I32($data) => $body,
            $crate::buffer::Storage::F32($data) => $body,
            $crate::buffer::Storage::F64($data) => $body,
        }
    };
}

pub(crate) use dispatch;

impl Storage {
    /// Zero-initialized storage of `len` elements.
    pub fn new(kind: ElementKind, len: usize) -> Self {
        match kind {
            ElementKind::U8 => Self::U8(vec![0; len]),
            ElementKind::U16 => Self::U16(vec![0; len]),
            ElementKind::I16 => Self::I16(vec![0; len]),
            ElementKind::I32 => Self::I32(vec![0; len]),
            ElementKind::F32 => Self::F32(vec![0.0; len]),
            ElementKind::F64 => Self::F64(vec![0.0; len]),
        }
    }

    /// The element kind.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::U8(_) => ElementKind::U8,
            Self::U16(_) => ElementKind::U16,
            Self::I16(_) => ElementKind::I16,
            Self::I32(_) => ElementKind::I32,
            Self::F32(_) => ElementKind::F32,
            Self::F64(_) => ElementKind::F64,
        }
    }

    /// The number of elements.
    pub fn len(&self) -> usize {
        dispatch!(self, data => data.len())
    }

    /// Whether there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements, if they are of type `T`.
    pub fn as_slice<T: Element>(&self) -> Option<&[T]> {
        dispatch!(self, data => bytemuck::try_cast_slice(data.as_slice()).ok())
            .filter(|_| self.kind() == T::KIND)
    }

    /// The elements, if they are of type `T`.
    pub fn as_mut_slice<T: Element>(&mut self) -> Option<&mut [T]> {
        if self.kind() != T::KIND {
            return None;
        }

        dispatch!(self, data => bytemuck::try_cast_slice_mut(data.as_mut_slice()).ok())
    }
}

/// How the samples of a pixel are arranged in the elements of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleModel {
    /// Every sample occupies one element, the samples of a pixel are
    /// adjacent.
    Interleaved {
        /// The number of bands.
        bands: u16,
    },
    /// Several single-band pixels are packed into one byte, the leftmost
    /// pixel in the most significant bits.
    MultiPixelPacked {
        /// The bits per pixel: 1, 2 or 4.
        bits: u8,
    },
    /// All samples of a pixel are packed into one element, the first band
    /// in the most significant bits.
    SinglePixelPacked {
        /// The bits of every band, only the first `bands` are used.
        bits: [u8; 4],
        /// The number of bands.
        bands: u8,
    },
}

impl SampleModel {
    /// A single pixel packed layout with the given band depths.
    pub fn packed(bits: &[u16]) -> Option<Self> {
        if bits.is_empty() || bits.len() > 4 {
            return None;
        }

        let mut packed = [0; 4];

        for (i, b) in bits.iter().enumerate() {
            packed[i] = u8::try_from(*b).ok()?;
        }

        Some(Self::SinglePixelPacked {
            bits: packed,
            bands: bits.len() as u8,
        })
    }

    /// The number of bands.
    pub fn bands(&self) -> usize {
        match self {
            Self::Interleaved { bands } => *bands as usize,
            Self::MultiPixelPacked { .. } => 1,
            Self::SinglePixelPacked { bands, .. } => *bands as usize,
        }
    }

    /// The number of bits a sample of `band` can hold.
    pub fn sample_bits(&self, kind: ElementKind, band: usize) -> u32 {
        match self {
            Self::Interleaved { .. } => kind.bits(),
            Self::MultiPixelPacked { bits } => *bits as u32,
            Self::SinglePixelPacked { bits, .. } => bits[band] as u32,
        }
    }

    /// The distance between two pixels in bits.
    pub fn pixel_bits(&self, kind: ElementKind) -> u32 {
        match self {
            Self::Interleaved { bands } => *bands as u32 * kind.bits(),
            Self::MultiPixelPacked { bits } => *bits as u32,
            Self::SinglePixelPacked { .. } => kind.bits(),
        }
    }

    /// The number of elements of a row of `width` pixels.
    pub fn row_len(&self, kind: ElementKind, width: u32) -> usize {
        (width as usize * self.pixel_bits(kind) as usize).div_ceil(kind.bits() as usize)
    }

    fn supports(&self, kind: ElementKind) -> bool {
        match self {
            Self::Interleaved { bands } => *bands > 0,
            Self::MultiPixelPacked { bits } => {
                kind == ElementKind::U8 && matches!(bits, 1 | 2 | 4)
            }
            Self::SinglePixelPacked { bits, bands } => {
                let total: u32 = bits[..*bands as usize].iter().map(|b| *b as u32).sum();

                matches!(kind, ElementKind::U8 | ElementKind::U16 | ElementKind::I32)
                    && (1..=4).contains(bands)
                    && bits[..*bands as usize].iter().all(|b| *b > 0)
                    && total <= kind.bits()
            }
        }
    }

    /// The shift of `band` inside a packed pixel.
    fn shift(&self, band: usize) -> u32 {
        match self {
            Self::SinglePixelPacked { bits, bands } => bits[band + 1..*bands as usize]
                .iter()
                .map(|b| *b as u32)
                .sum(),
            _ => 0,
        }
    }
}

fn mask(bits: u32) -> u32 {
    if bits >= 32 { u32::MAX } else { (1 << bits) - 1 }
}

/// A rectangular buffer of pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    model: SampleModel,
    stride: usize,
    storage: Storage,
}

impl PixelBuffer {
    /// Create a zero-initialized buffer with tightly packed rows.
    pub fn new(
        width: u32,
        height: u32,
        kind: ElementKind,
        model: SampleModel,
    ) -> Result<Self, BufferError> {
        let stride = model.row_len(kind, width);
        let len = stride
            .checked_mul(height as usize)
            .ok_or(BufferError::InvalidDimensions)?;

        Self::from_storage(width, height, model, stride, Storage::new(kind, len))
    }

    /// Wrap existing storage, where consecutive rows are `stride` elements
    /// apart.
    pub fn from_storage(
        width: u32,
        height: u32,
        model: SampleModel,
        stride: usize,
        storage: Storage,
    ) -> Result<Self, BufferError> {
        let kind = storage.kind();

        if !model.supports(kind) {
            bail!(BufferError::UnsupportedStorage);
        }

        if width == 0 || height == 0 || stride < model.row_len(kind, width) {
            bail!(BufferError::InvalidDimensions);
        }

        let required = stride
            .checked_mul(height as usize - 1)
            .and_then(|n| n.checked_add(model.row_len(kind, width)))
            .ok_or(BufferError::InvalidDimensions)?;

        if storage.len() < required {
            bail!(BufferError::TooSmall);
        }

        Ok(Self {
            width,
            height,
            model,
            stride,
            storage,
        })
    }

    /// The width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The element kind.
    pub fn kind(&self) -> ElementKind {
        self.storage.kind()
    }

    /// The sample model.
    pub fn model(&self) -> SampleModel {
        self.model
    }

    /// The number of bands.
    pub fn bands(&self) -> usize {
        self.model.bands()
    }

    /// The distance between two rows in elements.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The number of bits a sample of `band` can hold.
    pub fn sample_bits(&self, band: usize) -> u32 {
        self.model.sample_bits(self.kind(), band)
    }

    /// The underlying storage.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// The underlying storage, mutably.
    pub fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Consume the buffer and return its storage.
    pub fn into_storage(self) -> Storage {
        self.storage
    }

    /// The elements of row `y`, if they are of type `T`.
    pub fn row<T: Element>(&self, y: u32) -> Option<&[T]> {
        let start = self.row_start(y)?;
        let len = self.model.row_len(self.kind(), self.width);

        self.storage.as_slice::<T>()?.get(start..start + len)
    }

    /// The elements of row `y`, if they are of type `T`.
    pub fn row_mut<T: Element>(&mut self, y: u32) -> Option<&mut [T]> {
        let start = self.row_start(y)?;
        let len = self.model.row_len(self.kind(), self.width);

        self.storage.as_mut_slice::<T>()?.get_mut(start..start + len)
    }

    fn row_start(&self, y: u32) -> Option<usize> {
        (y < self.height).then(|| y as usize * self.stride)
    }

    /// The element holding the sample and, for packed models, its shift
    /// and mask.
    #[inline]
    fn locate(&self, x: u32, y: u32, band: usize) -> (usize, u32, u32) {
        let row = y as usize * self.stride;

        match self.model {
            SampleModel::Interleaved { bands } => {
                (row + x as usize * bands as usize + band, 0, u32::MAX)
            }
            SampleModel::MultiPixelPacked { bits } => {
                let bit = x as usize * bits as usize;
                let shift = 8 - bits as u32 - (bit % 8) as u32;

                (row + bit / 8, shift, mask(bits as u32))
            }
            SampleModel::SinglePixelPacked { bits, .. } => (
                row + x as usize,
                self.model.shift(band),
                mask(bits[band] as u32),
            ),
        }
    }

    /// The integer value of a sample.
    ///
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn sample(&self, x: u32, y: u32, band: usize) -> u32 {
        debug_assert!(x < self.width && y < self.height && band < self.bands());

        let (index, shift, mask) = self.locate(x, y, band);
        dispatch!(&self.storage, data => (data[index].to_u32() >> shift) & mask)
    }

    /// Set the integer value of a sample. Values are truncated to the
    /// width of the sample.
    ///
    /// Panics if the coordinates are out of bounds.
    #[inline]
    pub fn set_sample(&mut self, x: u32, y: u32, band: usize, value: u32) {
        debug_assert!(x < self.width && y < self.height && band < self.bands());

        let (index, shift, mask) = self.locate(x, y, band);

        match self.model {
            SampleModel::Interleaved { .. } => {
                dispatch!(&mut self.storage, data => data[index] = Element::from_u32(value));
            }
            _ => dispatch!(&mut self.storage, data => {
                let old = data[index].to_u32() & !(mask << shift);
                data[index] = Element::from_u32(old | ((value & mask) << shift));
            }),
        }
    }

    /// The value of a sample as a double, exact for all element kinds.
    #[inline]
    pub fn sample_f64(&self, x: u32, y: u32, band: usize) -> f64 {
        match self.model {
            SampleModel::Interleaved { .. } => {
                let (index, _, _) = self.locate(x, y, band);
                dispatch!(&self.storage, data => data[index].to_f64())
            }
            _ => self.sample(x, y, band) as f64,
        }
    }

    /// Set a sample from a double, saturating at the bounds of the
    /// element type.
    #[inline]
    pub fn set_sample_f64(&mut self, x: u32, y: u32, band: usize, value: f64) {
        match self.model {
            SampleModel::Interleaved { .. } => {
                let (index, _, _) = self.locate(x, y, band);
                dispatch!(&mut self.storage, data => data[index] = Element::from_f64(value));
            }
            _ => self.set_sample(x, y, band, value as u32),
        }
    }

    /// The element offset of pixel `(x, y)`, if it starts on an element
    /// boundary.
    pub(crate) fn element_offset(&self, x: u32, y: u32) -> Option<usize> {
        let bits = x as usize * self.model.pixel_bits(self.kind()) as usize;
        let element_bits = self.kind().bits() as usize;

        bits.is_multiple_of(element_bits)
            .then(|| y as usize * self.stride + bits / element_bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_samples() {
        let mut buffer =
            PixelBuffer::new(3, 2, ElementKind::U16, SampleModel::Interleaved { bands: 2 }).unwrap();
        assert_eq!(buffer.stride(), 6);

        buffer.set_sample(2, 1, 1, 0xBEEF);
        assert_eq!(buffer.sample(2, 1, 1), 0xBEEF);
        assert_eq!(buffer.row::<u16>(1).unwrap(), [0, 0, 0, 0, 0, 0xBEEF]);
        assert!(buffer.row::<u8>(1).is_none());
    }

    #[test]
    fn signed_samples_are_sign_extended() {
        let mut buffer =
            PixelBuffer::new(1, 1, ElementKind::I16, SampleModel::Interleaved { bands: 1 }).unwrap();
        buffer.set_sample_f64(0, 0, 0, -2.0);
        assert_eq!(buffer.sample(0, 0, 0), -2_i32 as u32);
        assert_eq!(buffer.sample_f64(0, 0, 0), -2.0);

        buffer.set_sample_f64(0, 0, 0, 1e9);
        assert_eq!(buffer.sample_f64(0, 0, 0), i16::MAX as f64);
    }

    #[test]
    fn multi_pixel_packed() {
        let mut buffer =
            PixelBuffer::new(5, 2, ElementKind::U8, SampleModel::MultiPixelPacked { bits: 2 }).unwrap();
        assert_eq!(buffer.stride(), 2);

        buffer.set_sample(0, 0, 0, 0b11);
        buffer.set_sample(2, 0, 0, 0b01);
        buffer.set_sample(4, 1, 0, 0b10);
        assert_eq!(buffer.row::<u8>(0).unwrap(), [0b11_00_01_00, 0]);
        assert_eq!(buffer.row::<u8>(1).unwrap(), [0, 0b10_000000]);
        assert_eq!(buffer.sample(2, 0, 0), 1);

        buffer.set_sample(0, 0, 0, 0);
        assert_eq!(buffer.row::<u8>(0).unwrap(), [0b00_00_01_00, 0]);
    }

    #[test]
    fn single_pixel_packed() {
        let model = SampleModel::packed(&[5, 6, 5]).unwrap();
        let mut buffer = PixelBuffer::new(2, 1, ElementKind::U16, model).unwrap();

        buffer.set_sample(1, 0, 0, 31);
        buffer.set_sample(1, 0, 1, 1);
        buffer.set_sample(1, 0, 2, 2);
        assert_eq!(buffer.row::<u16>(0).unwrap(), [0, 0b11111_000001_00010]);
        assert_eq!(buffer.sample(1, 0, 1), 1);
    }

    #[test]
    fn unsupported_models() {
        assert_eq!(
            PixelBuffer::new(1, 1, ElementKind::U16, SampleModel::MultiPixelPacked { bits: 1 }),
            Err(BufferError::UnsupportedStorage)
        );
        assert_eq!(
            PixelBuffer::new(1, 1, ElementKind::F32, SampleModel::packed(&[8, 8]).unwrap()),
            Err(BufferError::UnsupportedStorage)
        );
        assert_eq!(
            PixelBuffer::new(1, 1, ElementKind::U8, SampleModel::packed(&[4, 4, 4]).unwrap()),
            Err(BufferError::UnsupportedStorage)
        );
        assert_eq!(
            PixelBuffer::new(0, 1, ElementKind::U8, SampleModel::Interleaved { bands: 1 }),
            Err(BufferError::InvalidDimensions)
        );
        assert_eq!(
            PixelBuffer::from_storage(
                4,
                2,
                SampleModel::Interleaved { bands: 1 },
                4,
                Storage::new(ElementKind::U8, 7)
            ),
            Err(BufferError::TooSmall)
        );
    }

    #[test]
    fn element_offsets() {
        let buffer =
            PixelBuffer::new(16, 2, ElementKind::U8, SampleModel::MultiPixelPacked { bits: 1 }).unwrap();
        assert_eq!(buffer.element_offset(8, 1), Some(3));
        assert_eq!(buffer.element_offset(3, 0), None);
    }
}
