//! Live progress line and end-of-run summary

use crate::proxy::models::{throughput, RunSummary};
use crossterm::{
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::{self, Write};
use std::time::Duration;

/// Renders the in-place status line while probes complete
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressReporter {
    silent: bool,
}

impl ProgressReporter {
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    /// Format the status line for the given counters
    pub fn status_line(checked: usize, total: usize, working: usize, elapsed: Duration) -> String {
        format!(
            "Progress: {}/{} | Working: {} | {:.1} req/s",
            checked,
            total,
            working,
            throughput(checked, elapsed)
        )
    }

    /// Overwrite the current terminal line with fresh counters.
    ///
    /// Best-effort: terminal write errors are dropped.
    pub fn report(&self, checked: usize, total: usize, working: usize, elapsed: Duration) {
        if self.silent {
            return;
        }

        let line = Self::status_line(checked, total, working, elapsed);
        let mut stdout = io::stdout().lock();
        let _ = queue!(stdout, Print('\r'), Clear(ClearType::CurrentLine), Print(line));
        let _ = stdout.flush();
    }

    /// Terminate the status line so later output starts on a fresh line
    pub fn finish(&self) {
        if !self.silent {
            println!();
        }
    }
}

/// Render the summary record written to `summary.log`
pub fn summary_text(summary: &RunSummary) -> String {
    format!(
        "Total: {}\nChecked: {}\nWorking: {}\nTime: {:.2}s\nSpeed: {:.1} req/s\n",
        summary.total,
        summary.checked,
        summary.working,
        summary.elapsed.as_secs_f64(),
        summary.speed()
    )
}

/// Write the summary record to `writer`
pub fn write_summary<W: Write>(writer: &mut W, summary: &RunSummary) -> io::Result<()> {
    writer.write_all(summary_text(summary).as_bytes())?;
    writer.flush()
}
