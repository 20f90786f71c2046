//! Line printers used by dry-run delivery.

use parking_lot::Mutex;
use std::io::Write;

/// Writes one complete line per call.
pub trait LinePrinter: Send + Sync {
    fn print_line(&self, line: &str) -> std::io::Result<()>;
}

/// Prints to process stdout, holding the lock for the whole line.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutPrinter;

impl LinePrinter for StdoutPrinter {
    fn print_line(&self, line: &str) -> std::io::Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", line)?;
        handle.flush()
    }
}

/// Collects lines in memory. Used where output must be inspected (tests, previews).
#[derive(Debug, Default)]
pub struct BufferPrinter {
    lines: Mutex<Vec<String>>,
}

impl BufferPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl LinePrinter for BufferPrinter {
    fn print_line(&self, line: &str) -> std::io::Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }
}
