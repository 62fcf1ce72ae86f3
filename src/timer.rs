//! Operator progress output and timed steps.
//!
//! Every blocking remote step prints a fixed-width label when it starts and
//! the elapsed time when it ends:
//!
//! ```text
//! loading account...  0.412s
//! loading backends... 1.873s
//! transpiling...      0.051s
//! sending job...      0.640s
//! ```

use std::future::Future;
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Width the step labels are padded to.
pub const LABEL_WIDTH: usize = 20;

/// Where operator-facing progress goes.
///
/// Separate from `tracing` logs: this is the contract the operator reads
/// while a remote call is in flight.
#[derive(Debug, Clone, Default)]
pub enum Progress {
    /// Write to standard output.
    #[default]
    Stdout,
    /// Discard progress.
    Silent,
    /// Append to a shared in-memory buffer.
    Capture(Arc<Mutex<String>>),
}

impl Progress {
    /// A capturing sink and the buffer it writes into.
    pub fn capture() -> (Self, Arc<Mutex<String>>) {
        let buf = Arc::new(Mutex::new(String::new()));
        (Self::Capture(buf.clone()), buf)
    }

    /// Whether progress goes to a stdout attached to a terminal. Redirected
    /// output gets plain lines instead of redrawn ones.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Stdout) && io::stdout().is_terminal()
    }

    /// Write `text` without a trailing newline and flush.
    pub fn write(&self, text: &str) {
        match self {
            Self::Stdout => {
                let mut out = io::stdout().lock();
                // Progress is best effort; a closed stdout must not abort a job.
                let _ = out.write_all(text.as_bytes());
                let _ = out.flush();
            }
            Self::Silent => {}
            Self::Capture(buf) => {
                if let Ok(mut buf) = buf.lock() {
                    buf.push_str(text);
                }
            }
        }
    }

    /// Write `text` followed by a newline.
    pub fn line(&self, text: &str) {
        self.write(text);
        self.write("\n");
    }
}

/// Prints a labeled start message, then the elapsed time when finished or
/// dropped.
///
/// ```ignore
/// let timer = PrintTimer::start(&progress, "loading account...");
/// let provider = authenticator.authenticate().await?;
/// timer.finish();
/// ```
#[derive(Debug)]
pub struct PrintTimer {
    progress: Progress,
    started: Instant,
    done: bool,
}

impl PrintTimer {
    /// Print `label` padded to [`LABEL_WIDTH`] and start the clock.
    pub fn start(progress: &Progress, label: &str) -> Self {
        progress.write(&format!("{label:<LABEL_WIDTH$}"));
        Self {
            progress: progress.clone(),
            started: Instant::now(),
            done: false,
        }
    }

    /// Print the elapsed time and return it.
    pub fn finish(mut self) -> Duration {
        self.report()
    }

    fn report(&mut self) -> Duration {
        let elapsed = self.started.elapsed();
        if !self.done {
            self.done = true;
            self.progress.line(&format_elapsed(elapsed));
        }
        elapsed
    }
}

impl Drop for PrintTimer {
    fn drop(&mut self) {
        self.report();
    }
}

/// Run `fut` as a timed step.
///
/// The elapsed time is printed even when the step fails, so the operator
/// always sees the line completed.
pub async fn timed<F: Future>(progress: &Progress, label: &str, fut: F) -> F::Output {
    let timer = PrintTimer::start(progress, label);
    let output = fut.await;
    let elapsed = timer.finish();
    tracing::debug!(step = label.trim_end_matches('.').trim(), ?elapsed, "step finished");
    output
}

/// `1.2345s` → `"1.234s"`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}s", elapsed.as_secs_f64())
}
