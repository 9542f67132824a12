//! A byte reader that honors the byte order of the underlying stream.

/// The byte order of multi-byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    /// Most significant byte first (`MM`).
    #[default]
    BigEndian,
    /// Least significant byte first (`II`).
    LittleEndian,
}

/// A reader for fixed-size values from a byte slice.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
    byte_order: ByteOrder,
}

macro_rules! read_int {
    ($name:ident, $ty:ty) => {
        #[doc = concat!("Read a `", stringify!($ty), "` in the byte order of the reader.")]
        #[inline]
        pub fn $name(&mut self) -> Option<$ty> {
            let bytes = self.read_array()?;

            Some(match self.byte_order {
                ByteOrder::BigEndian => <$ty>::from_be_bytes(bytes),
                ByteOrder::LittleEndian => <$ty>::from_le_bytes(bytes),
            })
        }
    };
}

impl<'a> Reader<'a> {
    /// Create a new reader.
    #[inline]
    pub fn new(data: &'a [u8], byte_order: ByteOrder) -> Self {
        Self {
            data,
            offset: 0,
            byte_order,
        }
    }

    #[inline(always)]
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.offset..self.offset + N)?;
        self.offset += N;

        bytes.try_into().ok()
    }

    /// Read a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.offset)?;
        self.offset += 1;

        Some(byte)
    }

    read_int!(read_u16, u16);
    read_int!(read_u32, u32);
    read_int!(read_u64, u64);

    /// Read an IEEE 754 single precision value.
    #[inline]
    pub fn read_f32(&mut self) -> Option<f32> {
        self.read_u32().map(f32::from_bits)
    }

    /// Read an IEEE 754 double precision value.
    #[inline]
    pub fn read_f64(&mut self) -> Option<f64> {
        self.read_u64().map(f64::from_bits)
    }

    /// Skip the given number of bytes.
    #[inline]
    pub fn skip(&mut self, len: usize) -> Option<()> {
        if self.offset + len > self.data.len() {
            return None;
        }

        self.offset += len;

        Some(())
    }

    /// Move to an absolute byte offset.
    #[inline]
    pub fn jump(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// The current byte offset.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Whether all bytes have been read.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// The bytes that have not been read yet.
    #[inline]
    pub fn tail(&self) -> &'a [u8] {
        self.data.get(self.offset..).unwrap_or(&[])
    }
}
