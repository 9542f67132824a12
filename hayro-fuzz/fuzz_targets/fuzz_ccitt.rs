#![no_main]

use hayro_ccitt::{Compression, DecodeSettings, FillOrder, T4Options, T6Options, Warnings};
use libfuzzer_sys::fuzz_target;

/// A warning sink that discards everything.
struct Ignore;

impl Warnings for Ignore {
    fn warning(&mut self, _: &str) {}
}

// Header layout (8 bytes):
// [0..2]  columns (u16 LE)
// [2..4]  rows (u16 LE)
// [4]     compression (0=ModifiedHuffman, 1=Group3, 2+=Group4)
// [5]     T4Options bits
// [6]     bit 0: LSB-first fill order, bit 1: uncompressed mode for Group4
// [7]     strict (bool)
// [8..]   CCITT encoded data

const HEADER_SIZE: usize = 8;

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER_SIZE {
        return;
    }

    let columns = u16::from_le_bytes([data[0], data[1]]).max(1) as u32;
    let rows = u16::from_le_bytes([data[2], data[3]]).max(1) as u32;
    let compression = match data[4] % 3 {
        0 => Compression::ModifiedHuffman,
        1 => Compression::Group3,
        _ => Compression::Group4,
    };
    let fill_order = if data[6] & 1 != 0 {
        FillOrder::LsbFirst
    } else {
        FillOrder::MsbFirst
    };
    let t6_options = if data[6] & 2 != 0 {
        T6Options::UNCOMPRESSED
    } else {
        T6Options::empty()
    };

    let settings = DecodeSettings {
        columns,
        rows,
        compression,
        fill_order,
        t4_options: T4Options::from_bits_truncate(data[5] as u32),
        t6_options,
        strict: data[7] != 0,
    };

    let _ = hayro_ccitt::decode(&data[HEADER_SIZE..], &settings, &mut Ignore);
});
