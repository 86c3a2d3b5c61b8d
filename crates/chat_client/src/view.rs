//! Inline redraw of the transcript in the normal screen buffer.
//!
//! The view owns the rows from its first line down to the prompt row. A redraw rewrites
//! only the rows after the longest unchanged prefix.

use std::io::{self, Write};

use diagram_chat::core::text::width::visible_width;

pub const PROMPT: &str = "› ";

pub struct InlineView<W: Write> {
    out: W,
    width: usize,
    previous: Vec<String>,
    /// Rows the terminal echoed below the view since the last redraw.
    echoed_rows: usize,
}

impl<W: Write> InlineView<W> {
    pub fn new(out: W, width: usize) -> Self {
        Self {
            out,
            width: width.max(1),
            previous: Vec::new(),
            echoed_rows: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Accounts for a submitted input line the terminal echoed after the prompt.
    pub fn input_echoed(&mut self, input: &str) {
        let columns = visible_width(PROMPT) + visible_width(input);
        self.echoed_rows += columns.div_ceil(self.width).max(1);
    }

    pub fn redraw(&mut self, lines: &[String]) -> io::Result<()> {
        let common = self
            .previous
            .iter()
            .zip(lines)
            .take_while(|(before, after)| before == after)
            .count();
        let up = self.previous.len() - common + self.echoed_rows;

        let mut frame = String::from("\r");
        if up > 0 {
            frame.push_str(&format!("\x1b[{up}A"));
        }
        frame.push_str("\x1b[J");
        for line in &lines[common..] {
            frame.push_str(line);
            frame.push_str("\r\n");
        }
        frame.push_str(PROMPT);

        self.out.write_all(frame.as_bytes())?;
        self.out.flush()?;

        self.previous = lines.to_vec();
        self.echoed_rows = 0;
        Ok(())
    }

    /// Leaves the cursor on a fresh line below the view.
    pub fn finish(&mut self) -> io::Result<()> {
        self.out.write_all(b"\r\x1b[J")?;
        self.out.flush()
    }
}
