//! Backend selection.
//!
//! The operator picks from the rendered directory through a [`Chooser`], or
//! the caller names a backend directly and skips the prompt.

use serde::{Deserialize, Serialize};

use crate::directory::BackendDescriptor;
use crate::error::{DispatchError, DispatchResult};

/// Prompt title.
pub const CHOOSER_TITLE: &str = "Backend";

/// Prompt instruction.
pub const CHOOSER_BODY: &str = "Please choose a backend:";

/// Single-choice prompt.
pub trait Chooser: Send + Sync {
    /// Show `choices` and return the chosen text, or `None` if the operator
    /// made no choice.
    fn choose(&self, title: &str, body: &str, choices: &[String]) -> Option<String>;
}

/// How the target backend is determined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendChoice {
    /// Use this backend; no prompt.
    Named(String),
    /// Ask the operator.
    Prompt {
        /// Leave simulators out of the choices.
        hide_simulated: bool,
    },
}

impl Default for BackendChoice {
    fn default() -> Self {
        Self::Prompt {
            hide_simulated: true,
        }
    }
}

/// Directory rows offered to the operator.
pub fn candidates(directory: &[BackendDescriptor], hide_simulated: bool) -> Vec<&BackendDescriptor> {
    directory
        .iter()
        .filter(|d| !(hide_simulated && d.is_simulated()))
        .collect()
}

/// Ask the operator to pick a backend from `directory`.
///
/// Fails with [`DispatchError::NoBackendsFound`] when nothing is left after
/// filtering and with [`DispatchError::NoChoiceMade`] when the prompt is
/// dismissed.
pub fn select_backend(
    directory: &[BackendDescriptor],
    hide_simulated: bool,
    chooser: &dyn Chooser,
) -> DispatchResult<String> {
    let choices: Vec<String> = candidates(directory, hide_simulated)
        .into_iter()
        .map(BackendDescriptor::render)
        .collect();

    if choices.is_empty() {
        return Err(DispatchError::NoBackendsFound);
    }

    let choice = chooser
        .choose(CHOOSER_TITLE, CHOOSER_BODY, &choices)
        .ok_or(DispatchError::NoChoiceMade)?;

    let name = parse_choice(&choice);
    tracing::debug!(backend = name, "backend chosen");
    Ok(name.to_string())
}

/// The backend name is the first line of a rendered descriptor.
pub fn parse_choice(choice: &str) -> &str {
    choice.lines().next().unwrap_or_default()
}
