//! A bit reader and writer for packed sample and fax data.

/// The order in which pixels are packed into the bits of a byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillOrder {
    /// Lower column values are stored in the higher-order bits of a byte.
    #[default]
    MsbFirst,
    /// Lower column values are stored in the lower-order bits of a byte.
    LsbFirst,
}

impl FillOrder {
    /// Map a value of the TIFF `FillOrder` field.
    pub fn from_tag(value: u16) -> Option<Self> {
        match value {
            1 => Some(Self::MsbFirst),
            2 => Some(Self::LsbFirst),
            _ => None,
        }
    }
}

/// Reverses the bits of every byte value.
pub const FLIP_TABLE: [u8; 256] = {
    let mut table = [0; 256];
    let mut i = 0;

    while i < 256 {
        table[i] = (i as u8).reverse_bits();
        i += 1;
    }

    table
};

/// A bit reader.
///
/// Reading beyond the end of the data yields zero bits, callers that care
/// about the end of the data need to check [`BitReader::at_end`] themselves.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// The underlying bytes of the bit reader.
    pub data: &'a [u8],
    cur_pos: usize,
    fill_order: FillOrder,
}

impl<'a> BitReader<'a> {
    /// Create a new bit reader that reads the most significant bit first.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self::new_with(data, FillOrder::MsbFirst)
    }

    /// Create a new bit reader with the given fill order.
    #[inline]
    pub fn new_with(data: &'a [u8], fill_order: FillOrder) -> Self {
        Self {
            data,
            cur_pos: 0,
            fill_order,
        }
    }

    #[inline(always)]
    fn byte(&self, idx: usize) -> u64 {
        match (self.data.get(idx), self.fill_order) {
            (Some(b), FillOrder::MsbFirst) => *b as u64,
            (Some(b), FillOrder::LsbFirst) => FLIP_TABLE[*b as usize] as u64,
            (None, _) => 0,
        }
    }

    /// Peek the given number of bits (between 1 and 32) without advancing.
    #[inline(always)]
    pub fn peek_bits(&self, bit_size: u8) -> u32 {
        debug_assert!((1..=32).contains(&bit_size));

        let byte_pos = self.byte_pos();
        let mut window = 0_u64;

        // A 32-bit read starting at bit 7 touches five bytes.
        for i in 0..5 {
            window = (window << 8) | self.byte(byte_pos + i);
        }

        let shift = 40 - self.bit_pos() - bit_size as usize;
        (window >> shift) as u32 & bit_mask(bit_size)
    }

    /// Read the given number of bits (between 1 and 32).
    #[inline(always)]
    pub fn read_bits(&mut self, bit_size: u8) -> u32 {
        let value = self.peek_bits(bit_size);
        self.cur_pos += bit_size as usize;

        value
    }

    /// Read up to 7 bits, touching at most two bytes.
    #[inline(always)]
    pub fn read_bits_small(&mut self, bit_size: u8) -> u32 {
        debug_assert!(bit_size <= 7);

        if bit_size == 0 {
            return 0;
        }

        let byte_pos = self.byte_pos();
        let window = (self.byte(byte_pos) << 8) | self.byte(byte_pos + 1);
        let shift = 16 - self.bit_pos() - bit_size as usize;
        self.cur_pos += bit_size as usize;

        (window >> shift) as u32 & bit_mask(bit_size)
    }

    /// Read a single bit.
    #[inline(always)]
    pub fn read_bit(&mut self) -> u32 {
        let value = (self.byte(self.byte_pos()) >> (7 - self.bit_pos())) as u32 & 1;
        self.cur_pos += 1;

        value
    }

    /// Skip the given number of bits.
    #[inline]
    pub fn skip(&mut self, num_bits: usize) {
        self.cur_pos += num_bits;
    }

    /// Move the reader back by the given number of bits.
    #[inline]
    pub fn rewind(&mut self, num_bits: usize) {
        self.cur_pos = self.cur_pos.saturating_sub(num_bits);
    }

    /// Move the reader to an absolute bit position.
    #[inline]
    pub fn seek(&mut self, bit_pos: usize) {
        self.cur_pos = bit_pos;
    }

    /// Align the reader to the next byte boundary.
    #[inline]
    pub fn align(&mut self) {
        let bit_pos = self.bit_pos();

        if !bit_pos.is_multiple_of(8) {
            self.cur_pos += 8 - bit_pos;
        }
    }

    /// Whether the bit reader has read all bits.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.cur_pos >= self.data.len() * 8
    }

    /// The number of bits that are left.
    #[inline]
    pub fn bits_remaining(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.cur_pos)
    }

    /// Get the current byte position.
    #[inline]
    pub fn byte_pos(&self) -> usize {
        self.cur_pos / 8
    }

    /// Get the current position within the byte.
    #[inline]
    pub fn bit_pos(&self) -> usize {
        self.cur_pos % 8
    }

    /// Get the current position in bits.
    #[inline]
    pub fn cur_pos(&self) -> usize {
        self.cur_pos
    }

    /// The fill order of the reader.
    #[inline]
    pub fn fill_order(&self) -> FillOrder {
        self.fill_order
    }
}

/// Get the mask for the given bit size.
#[inline(always)]
pub fn bit_mask(bit_size: u8) -> u32 {
    ((1_u64 << bit_size as u64) - 1) as u32
}

/// A bit writer that appends to a growable buffer, most significant bit first.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    data: Vec<u8>,
    cur_pos: usize,
}

impl BitWriter {
    /// Create a new, empty bit writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the lowest `bit_size` bits (between 0 and 32) of `value`.
    pub fn write(&mut self, value: u32, bit_size: u8) {
        debug_assert!(bit_size <= 32);

        let value = value & bit_mask(bit_size);
        let mut bits_left = bit_size as usize;

        while bits_left > 0 {
            let bit_pos = self.cur_pos % 8;

            if bit_pos == 0 {
                self.data.push(0);
            }

            let bits_in_byte = (8 - bit_pos).min(bits_left);
            let chunk = (value >> (bits_left - bits_in_byte)) & bit_mask(bits_in_byte as u8);
            let shift_in_byte = 8 - bits_in_byte - bit_pos;

            if let Some(last) = self.data.last_mut() {
                *last |= (chunk as u8) << shift_in_byte;
            }

            bits_left -= bits_in_byte;
            self.cur_pos += bits_in_byte;
        }
    }

    /// Write the same bit `count` times.
    pub fn write_repeated(&mut self, bit: bool, count: usize) {
        for _ in 0..count {
            self.write(bit as u32, 1);
        }
    }

    /// Pad with zero bits up to the next byte boundary.
    pub fn align(&mut self) {
        let bit_pos = self.cur_pos % 8;

        if bit_pos != 0 {
            self.cur_pos += 8 - bit_pos;
        }
    }

    /// Return the number of written bits.
    pub fn cur_pos(&self) -> usize {
        self.cur_pos
    }

    /// Return the written bytes. A trailing partial byte is padded with zeros.
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}
