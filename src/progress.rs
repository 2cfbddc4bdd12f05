//! Progress reporting for sequences.
//!
//! A sequence pushes the label of the task it is about to start together
//! with a 1-based position and the total task count. Rendering is cosmetic:
//! reporters never fail the run.

use std::io::{self, Write};

/// Receives progress updates from a running sequence.
pub trait ProgressReporter: Send {
    /// Task `current` of `total` named `label` is about to start.
    fn advance(&mut self, label: &str, current: usize, total: usize);

    /// The sequence stopped (completed, failed or cancelled).
    fn finish(&mut self) {}
}

/// Discards all progress updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn advance(&mut self, _label: &str, _current: usize, _total: usize) {}
}

const BAR_WIDTH: usize = 32;

/// Single-line text progress bar, redrawn in place with `\r`.
///
/// ```text
/// Installing.. ████████████████∙∙∙∙∙∙∙∙∙∙∙∙∙∙∙∙ 2/4 InstallToVirtualEnvironment
/// ```
pub struct ChargingBar<W: Write + Send> {
    out: W,
    message: String,
    drawn: bool,
}

impl ChargingBar<io::Stderr> {
    /// Bar drawn on standard error
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> ChargingBar<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            message: "Installing..".to_string(),
            drawn: false,
        }
    }

    /// Replace the leading message (default `Installing..`)
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Render one frame of the bar
    pub fn render(&self, label: &str, current: usize, total: usize) -> String {
        let filled = if total == 0 {
            BAR_WIDTH
        } else {
            (current.min(total) * BAR_WIDTH) / total
        };
        format!(
            "{} {}{} {}/{} {}",
            self.message,
            "█".repeat(filled),
            "∙".repeat(BAR_WIDTH - filled),
            current,
            total,
            label
        )
    }

    /// Access the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<W: Write + Send> ProgressReporter for ChargingBar<W> {
    fn advance(&mut self, label: &str, current: usize, total: usize) {
        let frame = self.render(label, current, total);
        // Clear to end of line so a shorter label does not leave residue
        let _ = write!(self.out, "\r{frame}\x1b[K");
        let _ = self.out.flush();
        self.drawn = true;
    }

    fn finish(&mut self) {
        if self.drawn {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
            self.drawn = false;
        }
    }
}
