//! Error types for strip and tile decompression.

use core::fmt;

/// The main error type for decompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The image description cannot be decoded.
    Format(FormatError),
    /// A pixel buffer cannot be used.
    Buffer(BufferError),
    /// The fax decoder failed.
    Fax(hayro_ccitt::DecodeError),
    /// Reading the strip or tile data failed.
    Io(std::io::ErrorKind),
}

/// Errors related to the image description and the decode parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// No decoder exists for the compression scheme.
    UnsupportedCompression(u16),
    /// No raw pixel layout can represent the samples.
    UnsupportedLayout,
    /// The band counts, bit depths or sample formats are inconsistent.
    InvalidImageInfo,
    /// The source and destination band lists don't match the image.
    InvalidBandMapping,
    /// The source, active or destination regions are inconsistent.
    InvalidGeometry,
}

/// Errors related to pixel buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The element kind cannot store the sample model.
    UnsupportedStorage,
    /// The buffer dimensions are zero or too large.
    InvalidDimensions,
    /// The storage is smaller than the dimensions require.
    TooSmall,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format(e) => write!(f, "{e}"),
            Self::Buffer(e) => write!(f, "{e}"),
            Self::Fax(e) => write!(f, "fax decoding failed: {e}"),
            Self::Io(kind) => write!(f, "failed to read image data: {kind}"),
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedCompression(c) => write!(f, "unsupported compression {c}"),
            Self::UnsupportedLayout => write!(f, "unsupported raw pixel layout"),
            Self::InvalidImageInfo => write!(f, "invalid image description"),
            Self::InvalidBandMapping => write!(f, "invalid source or destination bands"),
            Self::InvalidGeometry => write!(f, "invalid source or destination region"),
        }
    }
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedStorage => write!(f, "unsupported buffer storage kind"),
            Self::InvalidDimensions => write!(f, "invalid buffer dimensions"),
            Self::TooSmall => write!(f, "buffer storage is too small"),
        }
    }
}

impl std::error::Error for DecodeError {}
impl std::error::Error for FormatError {}
impl std::error::Error for BufferError {}

impl From<FormatError> for DecodeError {
    fn from(e: FormatError) -> Self {
        Self::Format(e)
    }
}

impl From<BufferError> for DecodeError {
    fn from(e: BufferError) -> Self {
        Self::Buffer(e)
    }
}

impl From<hayro_ccitt::DecodeError> for DecodeError {
    fn from(e: hayro_ccitt::DecodeError) -> Self {
        Self::Fax(e)
    }
}

impl From<std::io::Error> for DecodeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.kind())
    }
}

/// Result type for decompression.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

macro_rules! err {
    ($err:expr) => {
        Err($err.into())
    };
}

pub(crate) use bail;
pub(crate) use err;
