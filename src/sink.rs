//! Output sinks — ordered, append-only destinations for streamed text.
//!
//! The engine writes every generated chunk and every voice separator to a
//! sink as soon as it has it. Sinks never reorder writes.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Available colors for separators on a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterColor {
    Cyan,
    Magenta,
    Yellow,
    BoldCyan,
    BoldMagenta,
    BoldYellow,
}

impl PrinterColor {
    /// ANSI escape code for this color.
    fn ansi_code(&self) -> &'static str {
        match self {
            Self::Cyan => "\x1b[36m",
            Self::Magenta => "\x1b[35m",
            Self::Yellow => "\x1b[33m",
            Self::BoldCyan => "\x1b[1;36m",
            Self::BoldMagenta => "\x1b[1;35m",
            Self::BoldYellow => "\x1b[1;33m",
        }
    }
}

/// ANSI reset code.
const RESET: &str = "\x1b[0m";

/// An ordered text destination.
pub trait OutputSink: Send {
    /// Append generated text.
    fn write(&mut self, text: &str) -> Result<()>;

    /// Append a separator announcing the next voice. Plain text by default.
    fn write_separator(&mut self, text: &str) -> Result<()> {
        self.write(text)
    }
}

/// Writes straight to stdout, flushing after each chunk.
#[derive(Debug, Clone)]
pub struct StdoutSink {
    /// Separator color; `None` prints separators uncolored.
    pub separator_color: Option<PrinterColor>,
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self {
            separator_color: Some(PrinterColor::BoldCyan),
        }
    }
}

impl StdoutSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// No ANSI escapes (for pipes and log files).
    pub fn plain() -> Self {
        Self {
            separator_color: None,
        }
    }
}

impl OutputSink for StdoutSink {
    fn write(&mut self, text: &str) -> Result<()> {
        let mut out = std::io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    fn write_separator(&mut self, text: &str) -> Result<()> {
        match self.separator_color {
            Some(color) => self.write(&format!("{}{}{}", color.ansi_code(), text, RESET)),
            None => self.write(text),
        }
    }
}

/// Accumulates everything into a string.
#[derive(Debug, Clone, Default)]
pub struct BufferSink {
    buffer: String,
    writes: usize,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }

    /// Number of write calls received.
    pub fn writes(&self) -> usize {
        self.writes
    }

    pub fn into_string(self) -> String {
        self.buffer
    }
}

impl OutputSink for BufferSink {
    fn write(&mut self, text: &str) -> Result<()> {
        self.buffer.push_str(text);
        self.writes += 1;
        Ok(())
    }
}

/// Discards all output.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write(&mut self, _text: &str) -> Result<()> {
        Ok(())
    }
}
