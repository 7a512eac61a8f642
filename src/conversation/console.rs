//! Console output for the conversation

use colored::{Color, Colorize};
use std::io::{self, Write};

/// Writes messages and streamed fragments, optionally coloured
pub struct Console<W: Write> {
    out: W,
    color: bool,
}

impl Console<io::Stdout> {
    /// Console on stdout; colour follows `colored`'s terminal detection
    pub fn stdout() -> Self {
        Self::new(io::stdout(), colored::control::SHOULD_COLORIZE.should_colorize())
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self { out, color }
    }

    /// Full line in `color`
    pub fn print(&mut self, message: &str, color: Color) -> io::Result<()> {
        if self.color {
            writeln!(self.out, "{}", message.color(color))?;
        } else {
            writeln!(self.out, "{}", message)?;
        }
        self.out.flush()
    }

    /// Streamed text, written and flushed immediately with no newline
    pub fn fragment(&mut self, text: &str, color: Color) -> io::Result<()> {
        if self.color {
            write!(self.out, "{}", text.color(color))?;
        } else {
            write!(self.out, "{}", text)?;
        }
        self.out.flush()
    }

    pub fn newline(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.out.flush()
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}
