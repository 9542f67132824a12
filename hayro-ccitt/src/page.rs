//! Decoding of a complete page (strip or tile) of fax data.

use crate::changes::ChangingElements;
use crate::decode::{RunError, eol_follows, read_mode, read_run};
use crate::error::{Result, WarningKind};
use crate::line::{LineEnd, Row, decode_1d};
use crate::log::ltrace;
use crate::tables::{EOFB, EOL, Mode, UNCOMPRESSED_EXTENSION};
use crate::{Compression, DecodeSettings, Reporter, T4Options, T6Options};
use hayro_common::bit::BitReader;

pub(crate) struct PageDecoder<'a, 'b> {
    reader: BitReader<'a>,
    settings: &'a DecodeSettings,
    reporter: Reporter<'b>,
    /// The changing elements of the previous line.
    reference: ChangingElements,
    /// The changing elements of the line being decoded.
    coding: ChangingElements,
    /// Whether EOL codes are padded to end on a byte boundary.
    fill_bits: bool,
}

impl<'a, 'b> PageDecoder<'a, 'b> {
    pub(crate) fn new(data: &'a [u8], settings: &'a DecodeSettings, reporter: Reporter<'b>) -> Self {
        let mut reference = ChangingElements::new(settings.columns);
        // "The reference line for the first coding line in a page is an
        // imaginary white line."
        reference.finish();

        Self {
            reader: BitReader::new_with(data, settings.fill_order),
            settings,
            reporter,
            reference,
            coding: ChangingElements::new(settings.columns),
            fill_bits: settings.t4_options.contains(T4Options::FILL_BITS),
        }
    }

    pub(crate) fn warnings(&self) -> usize {
        self.reporter.count()
    }

    /// Decode all rows into `out` and return the number of rows that were
    /// (possibly partially) decoded.
    pub(crate) fn decode(&mut self, out: &mut [u8], offset: usize, stride: usize) -> Result<u32> {
        let bytes_per_row = self.settings.columns.div_ceil(8) as usize;
        let rows = self.settings.rows as usize;

        // Rows that are never reached stay white.
        for row in 0..rows {
            let start = offset + row * stride;
            out[start..start + bytes_per_row].fill(0);
        }

        let mut decoded = 0;

        for row in 0..self.settings.rows {
            self.reporter.set_row(row);
            let start = offset + row as usize * stride;
            let mut line = Row::new(&mut out[start..start + bytes_per_row], self.settings.columns);

            let more = match self.settings.compression {
                Compression::ModifiedHuffman => self.modified_huffman_line(&mut line)?,
                Compression::Group3 => self.group3_line(&mut line, row == 0)?,
                Compression::Group4 => self.group4_line(&mut line)?,
            };

            match more {
                Next::Decoded => decoded += 1,
                Next::DecodedLast => {
                    decoded += 1;
                    break;
                }
                Next::Stop => break,
            }

            core::mem::swap(&mut self.reference, &mut self.coding);
        }

        ltrace!("decoded {} of {} rows", decoded, self.settings.rows);

        Ok(decoded)
    }

    fn modified_huffman_line(&mut self, line: &mut Row<'_>) -> Result<Next> {
        if self.reader.at_end() {
            self.reporter.warn(WarningKind::PrematureEnd)?;

            return Ok(Next::Stop);
        }

        decode_1d(&mut self.reader, line, &mut self.coding, &mut self.reporter)?;
        // Every row starts on a byte boundary.
        self.reader.align();

        Ok(Next::Decoded)
    }

    fn group3_line(&mut self, line: &mut Row<'_>, first: bool) -> Result<Next> {
        let two_dimensional = self.settings.t4_options.contains(T4Options::TWO_DIMENSIONAL);

        let Some(one_dimensional) = self.read_eol(first)? else {
            return Ok(Next::Stop);
        };

        // A second EOL marks the start of the return-to-control sequence.
        if eol_follows(&self.reader, self.fill_bits) {
            return Ok(Next::Stop);
        }

        let end = if one_dimensional {
            decode_1d(&mut self.reader, line, &mut self.coding, &mut self.reporter)?
        } else {
            self.decode_2d(line, false)?
        };

        if end == LineEnd::Corrupt {
            // Resynchronize on the next line that does not depend on
            // the damaged reference line.
            loop {
                match self.find_next_line()? {
                    None => return Ok(Next::DecodedLast),
                    Some(true) => {
                        self.reader.rewind(EOL_LEN + two_dimensional as usize);
                        break;
                    }
                    Some(false) => {}
                }
            }
        }

        Ok(Next::Decoded)
    }

    fn group4_line(&mut self, line: &mut Row<'_>) -> Result<Next> {
        if self.reader.peek_bits(24) == EOFB {
            return Ok(Next::Stop);
        }

        if self.reader.at_end() {
            self.reporter.warn(WarningKind::PrematureEnd)?;

            return Ok(Next::Stop);
        }

        let uncompressed = self.settings.t6_options.contains(T6Options::UNCOMPRESSED);

        match self.decode_2d(line, uncompressed)? {
            LineEnd::Complete => Ok(Next::Decoded),
            LineEnd::Truncated | LineEnd::Corrupt => Ok(Next::DecodedLast),
        }
    }

    /// Read the EOL preceding a line and return whether the line is
    /// one-dimensionally coded, or `None` if the data ended.
    fn read_eol(&mut self, first: bool) -> Result<Option<bool>> {
        if self.reader.at_end() {
            self.reporter.warn(WarningKind::EofSearchingEol)?;

            return Ok(None);
        }

        // Some encoders pad EOLs without announcing it.
        if first && !self.fill_bits && self.reader.peek_bits(12) == 0 && self.reader.peek_bits(16) == EOL
        {
            self.fill_bits = true;
        }

        let start = self.reader.cur_pos();

        if self.fill_bits {
            while self.reader.peek_bits(12) != EOL
                && self.reader.peek_bits(1) == 0
                && !self.reader.at_end()
            {
                self.reader.skip(1);
            }
        }

        if self.reader.peek_bits(12) != EOL {
            if self.only_padding_left() {
                self.reporter.warn(WarningKind::EofSearchingEol)?;

                return Ok(None);
            }

            self.reader.seek(start);
            self.reporter.warn(WarningKind::MissingEol)?;

            return Ok(Some(true));
        }

        self.reader.skip(EOL_LEN);

        Ok(Some(self.read_tag()))
    }

    fn only_padding_left(&self) -> bool {
        let mut probe = self.reader.clone();

        while !probe.at_end() {
            if probe.read_bit() == 1 {
                return false;
            }
        }

        true
    }

    /// Skip to the next EOL and return the tag bit that follows it, or
    /// `None` if the data ended.
    fn find_next_line(&mut self) -> Result<Option<bool>> {
        loop {
            if self.reader.at_end() {
                self.reporter.warn(WarningKind::EofSearchingEol)?;

                return Ok(None);
            }

            if self.reader.peek_bits(12) == EOL {
                self.reader.skip(EOL_LEN);

                return Ok(Some(self.read_tag()));
            }

            self.reader.skip(1);
        }
    }

    fn read_tag(&mut self) -> bool {
        if self.settings.t4_options.contains(T4Options::TWO_DIMENSIONAL) {
            self.reader.read_bit() == 1
        } else {
            true
        }
    }

    /// Decode one line relative to the reference line.
    fn decode_2d(&mut self, line: &mut Row<'_>, allow_uncompressed: bool) -> Result<LineEnd> {
        let width = line.width();
        let mut a0 = -1_i64;
        let mut pos = 0_u32;
        let mut is_white = true;

        self.coding.clear();

        while pos < width {
            let (b1, b2) = self.reference.next_changing_element(a0, is_white);

            match read_mode(&mut self.reader) {
                Mode::Pass => {
                    let end = b2.max(pos);

                    if !is_white {
                        line.fill_black(pos, end);
                    }

                    pos = end;
                    a0 = end as i64;
                }
                Mode::Horizontal => {
                    for _ in 0..2 {
                        let run = match read_run(&mut self.reader, is_white) {
                            Ok(run) => run,
                            Err(RunError::Eol) => {
                                return self.abort_line(LineEnd::Truncated, WarningKind::PrematureEol);
                            }
                            Err(RunError::Invalid) => {
                                return self.abort_line(LineEnd::Corrupt, WarningKind::InvalidCode);
                            }
                        };
                        let end = line.advance(pos, run, &mut self.reporter)?;

                        if !is_white {
                            line.fill_black(pos, end);
                        }

                        pos = end;
                        self.coding.push(pos);
                        is_white = !is_white;
                    }

                    a0 = pos as i64;
                }
                Mode::Vertical(delta) => {
                    let a1 = b1 as i64 + delta as i64;
                    let end = if a1 > width as i64 {
                        self.reporter.warn(WarningKind::RunOverflow)?;
                        width
                    } else if a1 < pos as i64 {
                        self.reporter.warn(WarningKind::RunOverflow)?;
                        pos
                    } else {
                        a1 as u32
                    };

                    if !is_white {
                        line.fill_black(pos, end);
                    }

                    pos = end;
                    a0 = end as i64;
                    self.coding.push(pos);
                    is_white = !is_white;
                }
                Mode::Extension => {
                    let extension = self.reader.read_bits_small(3);

                    if !allow_uncompressed {
                        return self.abort_line(LineEnd::Corrupt, WarningKind::UnknownMode);
                    }

                    if extension != UNCOMPRESSED_EXTENSION {
                        self.reporter.warn(WarningKind::InvalidUncompressedEntrance)?;
                    }

                    if !self.uncompressed(line, &mut pos, &mut is_white)? {
                        self.coding.finish();

                        return Ok(LineEnd::Corrupt);
                    }

                    a0 = pos as i64;
                }
                Mode::Invalid => {
                    return self.abort_line(LineEnd::Corrupt, WarningKind::UnknownMode);
                }
            }
        }

        self.coding.finish();

        Ok(LineEnd::Complete)
    }

    fn abort_line(&mut self, end: LineEnd, kind: WarningKind) -> Result<LineEnd> {
        self.reporter.warn(kind)?;
        self.coding.finish();

        Ok(end)
    }

    /// Decode uncompressed mode until its exit code. Returns `false` if the
    /// data ended first.
    fn uncompressed(&mut self, line: &mut Row<'_>, pos: &mut u32, is_white: &mut bool) -> Result<bool> {
        loop {
            let mut zeros = 0_u32;

            while self.reader.read_bit() == 0 {
                if self.reader.at_end() {
                    self.reporter.warn(WarningKind::PrematureEnd)?;

                    return Ok(false);
                }

                zeros += 1;
            }

            if zeros >= 6 {
                // Exit code: `zeros - 6` white pixels, then a tag bit with
                // the color of the next run.
                self.emit(line, pos, is_white, true, zeros - 6)?;
                let next_white = self.reader.read_bit() == 0;

                if next_white != *is_white {
                    self.coding.push(*pos);
                    *is_white = next_white;
                }

                return Ok(true);
            } else if zeros == 5 {
                self.emit(line, pos, is_white, true, 5)?;
            } else {
                self.emit(line, pos, is_white, true, zeros)?;
                self.emit(line, pos, is_white, false, 1)?;
            }
        }
    }

    fn emit(
        &mut self,
        line: &mut Row<'_>,
        pos: &mut u32,
        is_white: &mut bool,
        white: bool,
        count: u32,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }

        if white != *is_white {
            self.coding.push(*pos);
            *is_white = white;
        }

        let end = line.advance(*pos, count, &mut self.reporter)?;

        if !white {
            line.fill_black(*pos, end);
        }

        *pos = end;

        Ok(())
    }
}

const EOL_LEN: usize = 12;

/// What to do after a row.
enum Next {
    Decoded,
    /// The row was decoded, but no further rows can be.
    DecodedLast,
    Stop,
}
