//! Decoding of single code words.

use crate::tables::{
    BLACK_LONG_TABLE, BLACK_SHORT_TABLE, EOL, EXTENDED_TABLE, LONG_PREFIX, MODE_TABLE, Mode,
    WHITE_TABLE, code_len, is_terminating, is_valid, run_length,
};
use hayro_common::bit::BitReader;

/// A single run-length code word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Code {
    Terminating(u32),
    MakeUp(u32),
    /// An EOL code. It is not consumed.
    Eol,
    Invalid,
}

/// Why a complete run could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RunError {
    Eol,
    Invalid,
}

#[inline(always)]
pub(crate) fn read_code(reader: &mut BitReader<'_>, is_white: bool) -> Code {
    let mut entry = if is_white {
        WHITE_TABLE[reader.peek_bits(10) as usize]
    } else {
        match BLACK_SHORT_TABLE[reader.peek_bits(4) as usize] {
            LONG_PREFIX => BLACK_LONG_TABLE[(reader.peek_bits(13) & 0x3FF) as usize],
            e => e,
        }
    };

    if !is_valid(entry) {
        // Codes with seven leading zeros are shared by both colors.
        let next = reader.peek_bits(12);

        if next == EOL {
            return Code::Eol;
        } else if next >> 4 == 0b0000_0001 {
            entry = EXTENDED_TABLE[(next & 0xF) as usize];
        } else {
            return Code::Invalid;
        }
    }

    reader.skip(code_len(entry));

    if is_terminating(entry) {
        Code::Terminating(run_length(entry))
    } else {
        Code::MakeUp(run_length(entry))
    }
}

/// Read make-up codes until a terminating code and return the total run.
#[inline]
pub(crate) fn read_run(reader: &mut BitReader<'_>, is_white: bool) -> Result<u32, RunError> {
    let mut total = 0_u32;

    loop {
        match read_code(reader, is_white) {
            Code::Terminating(len) => return Ok(total.saturating_add(len)),
            Code::MakeUp(len) => total = total.saturating_add(len),
            Code::Eol => return Err(RunError::Eol),
            Code::Invalid => return Err(RunError::Invalid),
        }
    }
}

/// Read a two-dimensional mode code. Invalid codes are not consumed.
#[inline(always)]
pub(crate) fn read_mode(reader: &mut BitReader<'_>) -> Mode {
    let (mode, len) = MODE_TABLE[reader.peek_bits(7) as usize];

    if mode != Mode::Invalid {
        reader.skip(len as usize);
    }

    mode
}

/// Whether an EOL code follows, optionally after zero fill bits.
pub(crate) fn eol_follows(reader: &BitReader<'_>, allow_fill: bool) -> bool {
    let mut probe = reader.clone();

    loop {
        if probe.peek_bits(12) == EOL {
            return true;
        }

        if !allow_fill || probe.at_end() || probe.peek_bits(1) != 0 {
            return false;
        }

        probe.skip(1);
    }
}
