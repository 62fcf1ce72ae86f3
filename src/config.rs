//! Dispatcher configuration.
//!
//! Defaults, optionally loaded from a JSON file, then overridden by
//! `HAL_DISPATCH_*` environment variables:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `HAL_DISPATCH_BACKEND` | `backend` |
//! | `HAL_DISPATCH_SHOTS` | `shots` |
//! | `HAL_DISPATCH_SHOW_SIMULATED` | `hide_simulated` (inverted) |
//! | `HAL_DISPATCH_WORKERS` | `max_workers` |
//! | `HAL_DISPATCH_RESULTS_DIR` | `results_dir` |
//! | `HAL_DISPATCH_POLL_MS` | `poll_interval_ms` |

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::directory::default_workers;
use crate::error::{DispatchError, DispatchResult};
use crate::selector::BackendChoice;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "HAL_DISPATCH_";

/// Orchestration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Backend to use without prompting.
    pub backend: Option<String>,
    /// Leave simulators out of the backend prompt.
    pub hide_simulated: bool,
    /// Follow the last job of each batch until it finishes.
    pub monitor_job: bool,
    /// Shots per item; `None` uses the backend default.
    pub shots: Option<u32>,
    /// Delay between job status polls.
    pub poll_interval_ms: u64,
    /// Directory worker pool size; `None` uses hardware parallelism.
    pub max_workers: Option<usize>,
    /// Where result files are written.
    pub results_dir: PathBuf,
    /// Credential file; `None` uses the per-user default.
    pub credentials_path: Option<PathBuf>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backend: None,
            hide_simulated: true,
            monitor_job: true,
            shots: None,
            poll_interval_ms: 2000,
            max_workers: None,
            results_dir: PathBuf::from("results"),
            credentials_path: None,
        }
    }
}

impl DispatchConfig {
    /// Read a JSON config file. Missing fields keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> DispatchResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> DispatchResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `HAL_DISPATCH_*` overrides looked up through `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> DispatchResult<Self> {
        let get = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(backend) = get("BACKEND").filter(|b| !b.is_empty()) {
            self.backend = Some(backend);
        }
        if let Some(shots) = get("SHOTS") {
            self.shots = Some(parse("SHOTS", &shots)?);
        }
        if let Some(show) = get("SHOW_SIMULATED") {
            self.hide_simulated = !parse_flag("SHOW_SIMULATED", &show)?;
        }
        if let Some(workers) = get("WORKERS") {
            self.max_workers = Some(parse("WORKERS", &workers)?);
        }
        if let Some(dir) = get("RESULTS_DIR") {
            self.results_dir = PathBuf::from(dir);
        }
        if let Some(ms) = get("POLL_MS") {
            self.poll_interval_ms = parse("POLL_MS", &ms)?;
        }
        self.validate()
    }

    fn validate(self) -> DispatchResult<Self> {
        if self.poll_interval_ms == 0 {
            return Err(DispatchError::Configuration(
                "poll interval must be at least 1 ms".into(),
            ));
        }
        Ok(self)
    }

    /// Worker pool size for directory queries.
    pub fn workers(&self) -> usize {
        self.max_workers.unwrap_or_else(default_workers).max(1)
    }

    /// Delay between job status polls.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Named backend if configured, otherwise a prompt.
    pub fn backend_choice(&self) -> BackendChoice {
        match &self.backend {
            Some(name) => BackendChoice::Named(name.clone()),
            None => BackendChoice::Prompt {
                hide_simulated: self.hide_simulated,
            },
        }
    }
}

fn parse<T: FromStr>(name: &str, value: &str) -> DispatchResult<T> {
    value.trim().parse().map_err(|_| {
        DispatchError::Configuration(format!("{ENV_PREFIX}{name}: invalid value '{value}'"))
    })
}

fn parse_flag(name: &str, value: &str) -> DispatchResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DispatchError::Configuration(format!(
            "{ENV_PREFIX}{name}: expected a boolean, got '{value}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = DispatchConfig::default();
        assert!(config.hide_simulated);
        assert!(config.monitor_job);
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert!(config.workers() >= 1);
        assert_eq!(
            config.backend_choice(),
            BackendChoice::Prompt {
                hide_simulated: true
            }
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = DispatchConfig::default()
            .with_overrides(env(&[
                ("HAL_DISPATCH_BACKEND", "ibm_kyiv"),
                ("HAL_DISPATCH_SHOTS", "1000"),
                ("HAL_DISPATCH_SHOW_SIMULATED", "yes"),
                ("HAL_DISPATCH_WORKERS", "3"),
                ("HAL_DISPATCH_POLL_MS", "250"),
            ]))
            .unwrap();

        assert_eq!(config.backend_choice(), BackendChoice::Named("ibm_kyiv".into()));
        assert_eq!(config.shots, Some(1000));
        assert!(!config.hide_simulated);
        assert_eq!(config.workers(), 3);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_bad_override_is_configuration_error() {
        let err = DispatchConfig::default()
            .with_overrides(env(&[("HAL_DISPATCH_SHOTS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(ref m) if m.contains("SHOTS")));
    }

    #[test]
    fn test_zero_poll_interval_is_rejected() {
        let err = DispatchConfig::default()
            .with_overrides(env(&[("HAL_DISPATCH_POLL_MS", "0")]))
            .unwrap_err();
        assert!(matches!(err, DispatchError::Configuration(ref m) if m.contains("poll interval")));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.json");
        std::fs::write(&path, r#"{"poll_interval_ms": 0}"#).unwrap();
        assert!(matches!(
            DispatchConfig::from_file(&path),
            Err(DispatchError::Configuration(_))
        ));
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dispatch.json");
        std::fs::write(&path, r#"{"backend": "ibm_kyiv", "monitor_job": false}"#).unwrap();

        let config = DispatchConfig::from_file(&path).unwrap();
        assert_eq!(config.backend.as_deref(), Some("ibm_kyiv"));
        assert!(!config.monitor_job);
        assert!(config.hide_simulated);
        assert_eq!(config.results_dir, PathBuf::from("results"));
    }
}
