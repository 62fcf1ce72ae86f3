//! Live job monitoring.
//!
//! Polls one job until it reaches a terminal state and reports each status
//! change to the operator. When stdout is a terminal the status is shown on a
//! spinner line; otherwise (redirected stdout, capture) every change is
//! written as its own line.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, warn};

use crate::backend::RemoteJob;
use crate::error::DispatchResult;
use crate::job::JobStatus;
use crate::timer::Progress;

/// Default delay between status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Spinner redraw rate.
const TICK: Duration = Duration::from_millis(100);

/// Block until `job` is terminal, reporting progress along the way.
///
/// Purely observational: a job that ends failed or cancelled is reported,
/// not raised. Only a failure to poll propagates.
pub async fn monitor(
    job: &dyn RemoteJob,
    interval: Duration,
    progress: &Progress,
) -> DispatchResult<()> {
    let spinner = progress.is_interactive().then(|| {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(TICK);
        spinner
    });

    let mut last: Option<String> = None;
    loop {
        let status = job.status().await?;
        let position = match status {
            JobStatus::Queued => job.queue_position().await?,
            _ => None,
        };

        let message = status_message(&status, position);
        if last.as_deref() != Some(message.as_str()) {
            debug!(job = %job.id(), %status, ?position, "job status changed");
            match &spinner {
                Some(spinner) => spinner.set_message(format!("Job Status: {message}")),
                None => progress.line(&format!("Job Status: {message}")),
            }
            last = Some(message);
        }

        if status.is_terminal() {
            if let Some(spinner) = spinner {
                spinner.finish_and_clear();
                progress.line(&format!("Job Status: {}", status_message(&status, None)));
            }
            if !status.is_success() {
                warn!(job = %job.id(), %status, "job did not complete");
            }
            return Ok(());
        }

        tokio::time::sleep(interval).await;
    }
}

/// Operator-facing wording for a status.
pub fn status_message(status: &JobStatus, queue_position: Option<u32>) -> String {
    match (status, queue_position) {
        (JobStatus::Queued, Some(position)) => format!("job is queued ({position})"),
        (JobStatus::Queued, None) => "job is queued".to_string(),
        (JobStatus::Running, _) => "job is actively running".to_string(),
        (JobStatus::Completed, _) => "job has successfully run".to_string(),
        (JobStatus::Failed(reason), _) => format!("job incurred error: {reason}"),
        (JobStatus::Cancelled, _) => "job has been cancelled".to_string(),
    }
}
