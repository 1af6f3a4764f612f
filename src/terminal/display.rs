//! Console implementation of [`DisplaySink`].

use crossterm::cursor::{MoveTo, MoveToColumn};
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use log::warn;
use std::io::{self, Write};

use super::DisplaySink;

/// Writes terminal output to any [`Write`], usually stdout.
///
/// Output errors are logged; a display has no way to report them upstream.
pub struct ConsoleDisplay<W: Write> {
    out: W,
}

impl ConsoleDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn report(result: io::Result<()>) {
        if let Err(e) = result {
            warn!("Console output failed: {e}");
        }
    }
}

impl<W: Write> DisplaySink for ConsoleDisplay<W> {
    fn write(&mut self, text: &str) {
        let result = self
            .out
            .write_all(text.as_bytes())
            .and_then(|()| self.out.flush());
        Self::report(result);
    }

    fn clear(&mut self) {
        let result = queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))
            .and_then(|()| self.out.flush());
        Self::report(result);
    }

    fn erase_current_line_and_home_cursor(&mut self) {
        let result = queue!(self.out, Clear(ClearType::CurrentLine), MoveToColumn(0))
            .and_then(|()| self.out.flush());
        Self::report(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_written_verbatim() {
        let mut display = ConsoleDisplay::new(Vec::new());
        display.write("(AT)> ");
        display.write("OK\r\n");
        assert_eq!(display.into_inner(), b"(AT)> OK\r\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_clear_emits_erase_sequences() {
        let mut display = ConsoleDisplay::new(Vec::new());
        display.erase_current_line_and_home_cursor();
        display.clear();
        let out = String::from_utf8(display.into_inner()).unwrap();
        assert!(out.contains("\x1b[2K"));
        assert!(out.contains("\x1b[2J"));
    }
}
