//! Numbered terminal prompt.

use console::{Term, style};
use tokio::runtime::{Handle, RuntimeFlavor};

use hal_dispatch::Chooser;

/// Lists the choices with numbers and reads the operator's pick from the
/// terminal. An empty or unrecognised answer counts as no choice.
pub struct TerminalChooser {
    term: Term,
}

impl TerminalChooser {
    pub fn stdout() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    fn ask(&self, title: &str, body: &str, choices: &[String]) -> std::io::Result<Option<String>> {
        self.term.write_line("")?;
        self.term
            .write_line(&format!("{} {}", style(title).cyan().bold(), body))?;
        for (i, choice) in choices.iter().enumerate() {
            let mut lines = choice.lines();
            let name = lines.next().unwrap_or_default();
            self.term
                .write_line(&format!("  {:>3}) {}", i + 1, style(name).bold()))?;
            for line in lines.filter(|l| !l.is_empty()) {
                self.term.write_line(&format!("       {line}"))?;
            }
        }
        self.term.write_str("> ")?;

        let answer = self.term.read_line()?;
        Ok(pick(&answer, choices))
    }
}

impl Chooser for TerminalChooser {
    fn choose(&self, title: &str, body: &str, choices: &[String]) -> Option<String> {
        match blocking(|| self.ask(title, body, choices)) {
            Ok(choice) => choice,
            Err(e) => {
                tracing::warn!(error = %e, "prompt failed");
                None
            }
        }
    }
}

/// Run `f` where blocking on terminal input does not stall other tasks.
/// A multi-threaded runtime hands the worker's tasks off first; a
/// current-thread runtime or no runtime at all runs `f` directly.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Accept a 1-based number or a backend name.
fn pick(answer: &str, choices: &[String]) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    if let Ok(n) = answer.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| choices.get(i)).cloned();
    }
    choices
        .iter()
        .find(|c| c.lines().next() == Some(answer))
        .cloned()
}
