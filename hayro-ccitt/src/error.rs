//! Error and warning types for fax decoding.

use core::fmt;

/// A hard failure that aborts decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The data ended before the first code word of the page.
    UnexpectedEof,
    /// The number of columns or the scanline stride is invalid.
    InvalidDimensions,
    /// The output buffer cannot hold the requested number of rows.
    BufferTooSmall,
    /// A recoverable problem that was promoted to an error in strict mode.
    Strict(Warning),
}

/// A recoverable problem in the fax data, together with the row it
/// occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Warning {
    /// The zero-based row that was being decoded.
    pub row: u32,
    /// What went wrong.
    pub kind: WarningKind,
}

/// The kinds of recoverable problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// A run ending exactly at the line end with a make-up code was not
    /// followed by the zero-length terminating code.
    MissingTerminatingCode {
        /// Whether the run was white.
        white: bool,
    },
    /// An EOL code appeared in the middle of a scanline.
    PrematureEol,
    /// A bit pattern that is not a valid run-length code.
    InvalidCode,
    /// A run or position extends beyond the line width.
    RunOverflow,
    /// A scanline did not begin with an EOL code.
    MissingEol,
    /// The data ended while searching for an EOL code.
    EofSearchingEol,
    /// The data ended before all rows were decoded.
    PrematureEnd,
    /// An unknown two-dimensional coding mode.
    UnknownMode,
    /// The uncompressed mode entrance code was not `111`.
    InvalidUncompressedEntrance,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of data"),
            Self::InvalidDimensions => write!(f, "invalid image dimensions"),
            Self::BufferTooSmall => write!(f, "output buffer is too small"),
            Self::Strict(w) => write!(f, "{w}"),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.row, self.kind)
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTerminatingCode { white: true } => {
                write!(f, "missing zero white run length terminating code")
            }
            Self::MissingTerminatingCode { white: false } => {
                write!(f, "missing zero black run length terminating code")
            }
            Self::PrematureEol => write!(f, "EOL code word encountered within a scanline"),
            Self::InvalidCode => write!(f, "invalid code word encountered"),
            Self::RunOverflow => write!(f, "run extends beyond the scanline"),
            Self::MissingEol => write!(f, "scanline must begin with EOL code word"),
            Self::EofSearchingEol => write!(f, "end of data while searching for EOL"),
            Self::PrematureEnd => write!(f, "end of data before the last row"),
            Self::UnknownMode => write!(f, "unknown coding mode encountered"),
            Self::InvalidUncompressedEntrance => {
                write!(f, "unsupported uncompressed mode entrance code")
            }
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<Warning> for DecodeError {
    fn from(w: Warning) -> Self {
        Self::Strict(w)
    }
}

/// Result type for fax decoding operations.
pub type Result<T> = core::result::Result<T, DecodeError>;

macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}

pub(crate) use bail;
