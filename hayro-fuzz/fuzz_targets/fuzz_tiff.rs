#![no_main]

use hayro_tiff::{
    BandMapping, Decompressor, ElementKind, Geometry, ImageInfo, Photometric, PixelBuffer, Rect,
    SampleModel, compression,
};
use libfuzzer_sys::fuzz_target;

// Header layout (8 bytes):
// [0]     width - 1
// [1]     height - 1
// [2]     samples per pixel - 1 (mod 4)
// [3]     bits per sample (mod 33, 0 becomes 1)
// [4]     compression (0=none, 1=CCITT RLE, 2=T.4, 3=T.6)
// [5]     horizontal and vertical subsampling (low and high nibble, mod 4)
// [6]     photometric interpretation (mod 9)
// [7]     destination element kind (mod 6)
// [8..]   strip data

const HEADER_SIZE: usize = 8;

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER_SIZE {
        return;
    }

    let width = data[0] as u32 + 1;
    let height = data[1] as u32 + 1;
    let bands = (data[2] % 4) as u16 + 1;
    let bits = (data[3] % 33).max(1) as u16;

    let mut info = ImageInfo::new(bands, bits, Photometric::from_tag((data[6] % 9) as u16));
    info.compression = match data[4] % 4 {
        0 => compression::NONE,
        1 => compression::CCITT_RLE,
        2 => compression::CCITT_T4,
        _ => compression::CCITT_T6,
    };

    let subsample = ((data[5] & 0x3) as u32 + 1, ((data[5] >> 4) & 0x3) as u32 + 1);
    let dst_size = (width.div_ceil(subsample.0), height.div_ceil(subsample.1));
    let src = Rect::new(0, 0, width, height);

    let Some(geometry) = Geometry::clip(src, src, subsample, (0, 0), dst_size) else {
        return;
    };

    let kind = match data[7] % 6 {
        0 => ElementKind::U8,
        1 => ElementKind::U16,
        2 => ElementKind::I16,
        3 => ElementKind::I32,
        4 => ElementKind::F32,
        _ => ElementKind::F64,
    };
    let Ok(mut dst) = PixelBuffer::new(
        dst_size.0,
        dst_size.1,
        kind,
        SampleModel::Interleaved { bands },
    ) else {
        return;
    };

    let Ok(mut decompressor) = Decompressor::for_image(info) else {
        return;
    };

    let _ = decompressor.decode(
        &data[HEADER_SIZE..],
        &geometry,
        &BandMapping::identity(bands as usize),
        &mut dst,
        &mut Vec::<String>::new(),
    );
});
