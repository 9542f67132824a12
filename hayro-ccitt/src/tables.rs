//! Lookup tables for the modified Huffman run-length codes and the
//! two-dimensional mode codes of ITU-T T.4 and T.6.
//!
//! Every run-length table entry packs the decoded run length, the length
//! of the code word and whether the code is a terminating code (run
//! lengths below 64) or a make-up code.

/// A two-dimensional coding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Pass,
    Horizontal,
    Vertical(i8),
    /// The prefix `0000001` of an extension code. The three bits that
    /// follow select the extension.
    Extension,
    Invalid,
}

/// A packed run-length table entry.
pub(crate) type Entry = u32;

const LEN_MASK: u32 = 0xF;
const TERMINATING: u32 = 1 << 4;
const VALID: u32 = 1 << 5;

pub(crate) const INVALID: Entry = 0;
/// Marks black codes starting with `000`, which are looked up in
/// [`BLACK_LONG_TABLE`].
pub(crate) const LONG_PREFIX: Entry = 1 << 6;

/// The end-of-line code word, `000000000001`.
pub(crate) const EOL: u32 = 0x001;
/// The end-of-facsimile-block code word of T.6, two EOLs in a row.
pub(crate) const EOFB: u32 = 0x001001;

/// The extension code that enters uncompressed mode.
pub(crate) const UNCOMPRESSED_EXTENSION: u32 = 0b111;

const fn entry(run: u16, code_len: u8) -> Entry {
    let terminating = if run < 64 { TERMINATING } else { 0 };
    ((run as u32) << 8) | VALID | terminating | code_len as u32
}

#[inline(always)]
pub(crate) fn run_length(entry: Entry) -> u32 {
    entry >> 8
}

#[inline(always)]
pub(crate) fn code_len(entry: Entry) -> usize {
    (entry & LEN_MASK) as usize
}

#[inline(always)]
pub(crate) fn is_terminating(entry: Entry) -> bool {
    entry & TERMINATING != 0
}

#[inline(always)]
pub(crate) fn is_valid(entry: Entry) -> bool {
    entry & VALID != 0
}

/// Table 2/T.6 - White terminating codes.
pub(crate) const WHITE_TERMINATING: [(u16, u8, u16); 64] = [
    (0, 8, 0b00110101),
    (1, 6, 0b000111),
    (2, 4, 0b0111),
    (3, 4, 0b1000),
    (4, 4, 0b1011),
    (5, 4, 0b1100),
    (6, 4, 0b1110),
    (7, 4, 0b1111),
    (8, 5, 0b10011),
    (9, 5, 0b10100),
    (10, 5, 0b00111),
    (11, 5, 0b01000),
    (12, 6, 0b001000),
    (13, 6, 0b000011),
    (14, 6, 0b110100),
    (15, 6, 0b110101),
    (16, 6, 0b101010),
    (17, 6, 0b101011),
    (18, 7, 0b0100111),
    (19, 7, 0b0001100),
    (20, 7, 0b0001000),
    (21, 7, 0b0010111),
    (22, 7, 0b0000011),
    (23, 7, 0b0000100),
    (24, 7, 0b0101000),
    (25, 7, 0b0101011),
    (26, 7, 0b0010011),
    (27, 7, 0b0100100),
    (28, 7, 0b0011000),
    (29, 8, 0b00000010),
    (30, 8, 0b00000011),
    (31, 8, 0b00011010),
    (32, 8, 0b00011011),
    (33, 8, 0b00010010),
    (34, 8, 0b00010011),
    (35, 8, 0b00010100),
    (36, 8, 0b00010101),
    (37, 8, 0b00010110),
    (38, 8, 0b00010111),
    (39, 8, 0b00101000),
    (40, 8, 0b00101001),
    (41, 8, 0b00101010),
    (42, 8, 0b00101011),
    (43, 8, 0b00101100),
    (44, 8, 0b00101101),
    (45, 8, 0b00000100),
    (46, 8, 0b00000101),
    (47, 8, 0b00001010),
    (48, 8, 0b00001011),
    (49, 8, 0b01010010),
    (50, 8, 0b01010011),
    (51, 8, 0b01010100),
    (52, 8, 0b01010101),
    (53, 8, 0b00100100),
    (54, 8, 0b00100101),
    (55, 8, 0b01011000),
    (56, 8, 0b01011001),
    (57, 8, 0b01011010),
    (58, 8, 0b01011011),
    (59, 8, 0b01001010),
    (60, 8, 0b01001011),
    (61, 8, 0b00110010),
    (62, 8, 0b00110011),
    (63, 8, 0b00110100),
];

/// Table 3/T.6 - White make-up codes.
pub(crate) const WHITE_MAKEUP: [(u16, u8, u16); 27] = [
    (64, 5, 0b11011),
    (128, 5, 0b10010),
    (192, 6, 0b010111),
    (256, 7, 0b0110111),
    (320, 8, 0b00110110),
    (384, 8, 0b00110111),
    (448, 8, 0b01100100),
    (512, 8, 0b01100101),
    (576, 8, 0b01101000),
    (640, 8, 0b01100111),
    (704, 9, 0b011001100),
    (768, 9, 0b011001101),
    (832, 9, 0b011010010),
    (896, 9, 0b011010011),
    (960, 9, 0b011010100),
    (1024, 9, 0b011010101),
    (1088, 9, 0b011010110),
    (1152, 9, 0b011010111),
    (1216, 9, 0b011011000),
    (1280, 9, 0b011011001),
    (1344, 9, 0b011011010),
    (1408, 9, 0b011011011),
    (1472, 9, 0b010011000),
    (1536, 9, 0b010011001),
    (1600, 9, 0b010011010),
    (1664, 6, 0b011000),
    (1728, 9, 0b010011011),
];

/// Table 2/T.6 - Black terminating codes.
pub(crate) const BLACK_TERMINATING: [(u16, u8, u16); 64] = [
    (0, 10, 0b0000110111),
    (1, 3, 0b010),
    (2, 2, 0b11),
    (3, 2, 0b10),
    (4, 3, 0b011),
    (5, 4, 0b0011),
    (6, 4, 0b0010),
    (7, 5, 0b00011),
    (8, 6, 0b000101),
    (9, 6, 0b000100),
    (10, 7, 0b0000100),
    (11, 7, 0b0000101),
    (12, 7, 0b0000111),
    (13, 8, 0b00000100),
    (14, 8, 0b00000111),
    (15, 9, 0b000011000),
    (16, 10, 0b0000010111),
    (17, 10, 0b0000011000),
    (18, 10, 0b0000001000),
    (19, 11, 0b00001100111),
    (20, 11, 0b00001101000),
    (21, 11, 0b00001101100),
    (22, 11, 0b00000110111),
    (23, 11, 0b00000101000),
    (24, 11, 0b00000010111),
    (25, 11, 0b00000011000),
    (26, 12, 0b000011001010),
    (27, 12, 0b000011001011),
    (28, 12, 0b000011001100),
    (29, 12, 0b000011001101),
    (30, 12, 0b000001101000),
    (31, 12, 0b000001101001),
    (32, 12, 0b000001101010),
    (33, 12, 0b000001101011),
    (34, 12, 0b000011010010),
    (35, 12, 0b000011010011),
    (36, 12, 0b000011010100),
    (37, 12, 0b000011010101),
    (38, 12, 0b000011010110),
    (39, 12, 0b000011010111),
    (40, 12, 0b000001101100),
    (41, 12, 0b000001101101),
    (42, 12, 0b000011011010),
    (43, 12, 0b000011011011),
    (44, 12, 0b000001010100),
    (45, 12, 0b000001010101),
    (46, 12, 0b000001010110),
    (47, 12, 0b000001010111),
    (48, 12, 0b000001100100),
    (49, 12, 0b000001100101),
    (50, 12, 0b000001010010),
    (51, 12, 0b000001010011),
    (52, 12, 0b000000100100),
    (53, 12, 0b000000110111),
    (54, 12, 0b000000111000),
    (55, 12, 0b000000100111),
    (56, 12, 0b000000101000),
    (57, 12, 0b000001011000),
    (58, 12, 0b000001011001),
    (59, 12, 0b000000101011),
    (60, 12, 0b000000101100),
    (61, 12, 0b000001011010),
    (62, 12, 0b000001100110),
    (63, 12, 0b000001100111),
];

/// Table 3/T.6 - Black make-up codes.
pub(crate) const BLACK_MAKEUP: [(u16, u8, u16); 27] = [
    (64, 10, 0b0000001111),
    (128, 12, 0b000011001000),
    (192, 12, 0b000011001001),
    (256, 12, 0b000001011011),
    (320, 12, 0b000000110011),
    (384, 12, 0b000000110100),
    (448, 12, 0b000000110101),
    (512, 13, 0b0000001101100),
    (576, 13, 0b0000001101101),
    (640, 13, 0b0000001001010),
    (704, 13, 0b0000001001011),
    (768, 13, 0b0000001001100),
    (832, 13, 0b0000001001101),
    (896, 13, 0b0000001110010),
    (960, 13, 0b0000001110011),
    (1024, 13, 0b0000001110100),
    (1088, 13, 0b0000001110101),
    (1152, 13, 0b0000001110110),
    (1216, 13, 0b0000001110111),
    (1280, 13, 0b0000001010010),
    (1344, 13, 0b0000001010011),
    (1408, 13, 0b0000001010100),
    (1472, 13, 0b0000001010101),
    (1536, 13, 0b0000001011010),
    (1600, 13, 0b0000001011011),
    (1664, 13, 0b0000001100100),
    (1728, 13, 0b0000001100101),
];

/// Table 3/T.6 - Make-up codes shared by both colors.
pub(crate) const EXTENDED_MAKEUP: [(u16, u8, u16); 13] = [
    (1792, 11, 0b00000001000),
    (1856, 11, 0b00000001100),
    (1920, 11, 0b00000001101),
    (1984, 12, 0b000000010010),
    (2048, 12, 0b000000010011),
    (2112, 12, 0b000000010100),
    (2176, 12, 0b000000010101),
    (2240, 12, 0b000000010110),
    (2304, 12, 0b000000010111),
    (2368, 12, 0b000000011100),
    (2432, 12, 0b000000011101),
    (2496, 12, 0b000000011110),
    (2560, 12, 0b000000011111),
];


/// Table 4/T.4 - Two-dimensional mode codes, plus the extension prefix.
pub(crate) const MODE_CODES: [(Mode, u8, u16); 10] = [
    (Mode::Pass, 4, 0b0001),
    (Mode::Horizontal, 3, 0b001),
    (Mode::Vertical(0), 1, 0b1),
    (Mode::Vertical(1), 3, 0b011),
    (Mode::Vertical(2), 6, 0b000011),
    (Mode::Vertical(3), 7, 0b0000011),
    (Mode::Vertical(-1), 3, 0b010),
    (Mode::Vertical(-2), 6, 0b000010),
    (Mode::Vertical(-3), 7, 0b0000010),
    (Mode::Extension, 7, 0b0000001),
];

/// Store `value` at every index whose top `code_len` bits (out of
/// `index_bits`) equal `code`.
const fn insert<T: Copy, const N: usize>(
    table: &mut [T; N],
    index_bits: u8,
    code: u16,
    code_len: u8,
    value: T,
) {
    let shift = index_bits - code_len;
    let base = (code as usize) << shift;
    let mut i = 0;

    while i < (1 << shift) {
        table[base + i] = value;
        i += 1;
    }
}

/// Insert all codes of at most `index_bits` bits whose first `prefix_len`
/// bits are zero, indexed by the bits after the prefix.
const fn insert_codes<const N: usize, const M: usize>(
    table: &mut [Entry; N],
    index_bits: u8,
    prefix_len: u8,
    codes: &[(u16, u8, u16); M],
) {
    let mut i = 0;

    while i < M {
        let (run, len, code) = codes[i];

        if len > prefix_len && len - prefix_len <= index_bits && (code >> (len - prefix_len)) == 0
        {
            insert(table, index_bits, code, len - prefix_len, entry(run, len));
        }

        i += 1;
    }
}

/// White codes, indexed by the next 10 bits.
pub(crate) const WHITE_TABLE: [Entry; 1024] = {
    let mut table = [INVALID; 1024];
    insert_codes(&mut table, 10, 0, &WHITE_TERMINATING);
    insert_codes(&mut table, 10, 0, &WHITE_MAKEUP);
    table
};

/// Black codes of up to 4 bits, indexed by the next 4 bits.
pub(crate) const BLACK_SHORT_TABLE: [Entry; 16] = {
    let mut table = [INVALID; 16];
    insert_codes(&mut table, 4, 0, &BLACK_TERMINATING);
    table[0b0000] = LONG_PREFIX;
    table[0b0001] = LONG_PREFIX;
    table
};

/// Black codes starting with `000`, indexed by the 10 bits following the
/// prefix.
pub(crate) const BLACK_LONG_TABLE: [Entry; 1024] = {
    let mut table = [INVALID; 1024];
    insert_codes(&mut table, 10, 3, &BLACK_TERMINATING);
    insert_codes(&mut table, 10, 3, &BLACK_MAKEUP);
    table
};

/// Make-up codes from 1792 to 2560, indexed by the 4 bits following the
/// `00000001` prefix.
pub(crate) const EXTENDED_TABLE: [Entry; 16] = {
    let mut table = [INVALID; 16];
    let mut i = 0;

    while i < EXTENDED_MAKEUP.len() {
        let (run, len, code) = EXTENDED_MAKEUP[i];
        // Only the bits after the prefix, 3 for the shorter codes.
        let suffix = code & ((1 << (len - 8)) - 1);
        insert(&mut table, 4, suffix, len - 8, entry(run, len));
        i += 1;
    }

    table
};

/// Mode codes, indexed by the next 7 bits.
pub(crate) const MODE_TABLE: [(Mode, u8); 128] = {
    let mut table = [(Mode::Invalid, 0); 128];
    let mut i = 0;

    while i < MODE_CODES.len() {
        let (mode, len, code) = MODE_CODES[i];
        insert(&mut table, 7, code, len, (mode, len));
        i += 1;
    }

    table
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn white_table_is_complete() {
        // Only indices with seven leading zeros escape to the extended
        // make-up codes or EOL.
        for (idx, e) in WHITE_TABLE.iter().enumerate() {
            assert_eq!(is_valid(*e), idx >> 3 != 0, "index {idx:010b}");
        }
    }

    #[test]
    fn black_long_table_is_complete() {
        for (idx, e) in BLACK_LONG_TABLE.iter().enumerate() {
            assert_eq!(is_valid(*e), idx >> 6 != 0, "index {idx:010b}");
        }
    }

    #[test]
    fn extended_table_is_complete() {
        assert!(EXTENDED_TABLE.iter().all(|e| is_valid(*e)));
        assert_eq!(run_length(EXTENDED_TABLE[0b0000]), 1792);
        assert_eq!(run_length(EXTENDED_TABLE[0b0001]), 1792);
        assert_eq!(code_len(EXTENDED_TABLE[0b0001]), 11);
        assert_eq!(run_length(EXTENDED_TABLE[0b1001]), 1856);
        assert_eq!(run_length(EXTENDED_TABLE[0b1010]), 1920);
        assert_eq!(run_length(EXTENDED_TABLE[0b1011]), 1920);
        assert_eq!(code_len(EXTENDED_TABLE[0b1011]), 11);
        assert_eq!(run_length(EXTENDED_TABLE[0b0010]), 1984);
        assert_eq!(run_length(EXTENDED_TABLE[0b1111]), 2560);
        assert_eq!(code_len(EXTENDED_TABLE[0b1111]), 12);
    }

    #[test]
    fn mode_table() {
        assert_eq!(MODE_TABLE[0b1000000], (Mode::Vertical(0), 1));
        assert_eq!(MODE_TABLE[0b0010111], (Mode::Horizontal, 3));
        assert_eq!(MODE_TABLE[0b0000001], (Mode::Extension, 7));
        assert_eq!(MODE_TABLE[0b0000000].0, Mode::Invalid);
    }

    #[test]
    fn entry_packing() {
        let e = entry(1728, 9);
        assert!(is_valid(e));
        assert!(!is_terminating(e));
        assert_eq!(run_length(e), 1728);
        assert_eq!(code_len(e), 9);
        assert!(is_terminating(entry(63, 8)));
        assert!(!is_valid(LONG_PREFIX));
    }
}
