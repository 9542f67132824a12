/*!
Decompression of the strips and tiles of TIFF images.

This crate implements the part of a TIFF reader that sits between the
parsed image directory and the final pixels: a [`Decompressor`] takes the
compressed bytes of one strip or tile, decodes them into raw samples and
writes the samples into a caller-provided [`PixelBuffer`]. On the way it
can
- read only a region of interest and keep every n-th pixel of it,
- select and reorder bands,
- rescale samples to the bit depth of the destination,
- invert `WhiteIsZero` samples,
- convert YCbCr and CIE L*a*b* samples to RGB.

Parsing TIFF directories is left to the caller, who describes the image
with an [`ImageInfo`].

Uncompressed data and the CCITT fax schemes (compression 2, 3 and 4) are
decoded out of the box, using [`hayro_ccitt`]. Other schemes can be added
by implementing [`RawDecoder`].

Problems in corrupt data that can be worked around are reported to a
[`Warnings`] sink instead of failing the call.

# Example
```
use hayro_tiff::{
    BandMapping, Decompressor, ElementKind, Geometry, ImageInfo, Photometric, PixelBuffer,
    Rect, SampleModel,
};

let info = ImageInfo::new(1, 8, Photometric::WhiteIsZero);
let mut decompressor = Decompressor::for_image(info).unwrap();
let mut dst =
    PixelBuffer::new(2, 1, ElementKind::U8, SampleModel::Interleaved { bands: 1 }).unwrap();

decompressor
    .decode(
        &[0, 255],
        &Geometry::unscaled(Rect::new(0, 0, 2, 1)),
        &BandMapping::identity(1),
        &mut dst,
        &mut Vec::<String>::new(),
    )
    .unwrap();

assert_eq!(dst.row::<u8>(0).unwrap(), [255, 0]);
```

# Cargo features
- `logging`: Log decoding decisions and recoverable problems via the `log`
  crate.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod buffer;
mod color;
mod decompressor;
mod error;
mod geometry;
mod info;
mod layout;
mod log;
mod ops;
mod raw;
mod rescale;

pub use buffer::{Element, ElementKind, PixelBuffer, SampleModel, Storage};
pub use color::{CieLabConverter, ColorConverter, YCbCrConverter};
pub use decompressor::Decompressor;
pub use error::{BufferError, DecodeError, FormatError, Result};
pub use geometry::{BandMapping, Geometry, Rect};
pub use info::{ExtraSample, ImageInfo, Photometric, SampleFormat, compression};
pub use layout::{ColorKind, Palette, RawLayout, raw_layout};
pub use raw::{Fax, RawDecoder, RawSource, Uncompressed, for_compression};
pub use rescale::{RescaleTable, scale_table};

pub use hayro_ccitt::{FillOrder, LogWarnings, T4Options, T6Options, Warnings};
pub use hayro_common::byte::ByteOrder;
