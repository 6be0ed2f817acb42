//! Raw terminal I/O behind a small trait so the window/surface geometry can
//! be exercised without a real terminal.

use std::io::{self, BufWriter, Stdout, Write};

use crossterm::{
    cursor, queue,
    style::{Attribute, Print, SetAttribute},
    terminal,
};

use crate::error::TerminalError;
use crate::geometry::{Dimensions, Point};

pub trait TerminalDriver {
    fn get_terminal_size(&mut self) -> Result<Dimensions, TerminalError>;
    fn get_cursor_position(&mut self) -> Result<Point, TerminalError>;
    fn set_cursor_position(&mut self, point: Point) -> Result<(), TerminalError>;
    fn put_char(&mut self, ch: char) -> Result<(), TerminalError>;
    /// Writes a single (possibly multi-byte) glyph, or a preformatted run of
    /// text that occupies consecutive cells.
    fn put_uchar(&mut self, glyph: &str) -> Result<(), TerminalError>;
    fn set_reverse_video(&mut self, on: bool) -> Result<(), TerminalError>;
    fn flush(&mut self) -> Result<(), TerminalError>;
}

/// Driver for the process's controlling terminal. Expects raw mode to be
/// enabled before the cursor position is queried.
pub struct CrosstermDriver {
    out: BufWriter<Stdout>,
}

impl CrosstermDriver {
    pub fn new() -> Self {
        Self {
            out: BufWriter::new(io::stdout()),
        }
    }
}

impl Default for CrosstermDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalDriver for CrosstermDriver {
    fn get_terminal_size(&mut self) -> Result<Dimensions, TerminalError> {
        let (cols, rows) = terminal::size()?;
        Ok(Dimensions::new(cols, rows))
    }

    fn get_cursor_position(&mut self) -> Result<Point, TerminalError> {
        // pending output would otherwise land after the position report
        self.out.flush()?;
        let (col, row) = cursor::position()?;
        Ok(Point::new(col + 1, row + 1))
    }

    fn set_cursor_position(&mut self, point: Point) -> Result<(), TerminalError> {
        queue!(
            self.out,
            cursor::MoveTo(point.x.saturating_sub(1), point.y.saturating_sub(1))
        )?;
        Ok(())
    }

    fn put_char(&mut self, ch: char) -> Result<(), TerminalError> {
        queue!(self.out, Print(ch))?;
        Ok(())
    }

    fn put_uchar(&mut self, glyph: &str) -> Result<(), TerminalError> {
        queue!(self.out, Print(glyph))?;
        Ok(())
    }

    fn set_reverse_video(&mut self, on: bool) -> Result<(), TerminalError> {
        let attr = if on { Attribute::Reverse } else { Attribute::NoReverse };
        queue!(self.out, SetAttribute(attr))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TerminalError> {
        self.out.flush()?;
        Ok(())
    }
}
