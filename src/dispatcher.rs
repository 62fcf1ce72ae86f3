//! The dispatch context.
//!
//! A [`Dispatcher`] owns everything a batch run needs: the session cache,
//! configuration, the operator prompt, and the progress sink. Callers build
//! one and pass it around instead of relying on shared global state.
//!
//! ```text
//!   session() ──→ list_backends() ──→ choose_backend() ──→ submit ──→ monitor(last)
//!                                                             │
//!                                                             └──→ collect()
//! ```

use std::sync::Arc;

use tracing::info;

use crate::aggregate;
use crate::backend::Authenticator;
use crate::config::DispatchConfig;
use crate::directory::{self, BackendDescriptor};
use crate::error::DispatchResult;
use crate::job::JobBatch;
use crate::monitor::monitor;
use crate::result::ResultRecord;
use crate::selector::{BackendChoice, Chooser, select_backend};
use crate::session::{Session, SessionManager};
use crate::submit::submit;
use crate::timer::{Progress, timed};

/// Batch dispatch over one remote service account.
pub struct Dispatcher<C> {
    sessions: SessionManager<C>,
    config: DispatchConfig,
    chooser: Arc<dyn Chooser>,
    progress: Progress,
}

impl<C> Dispatcher<C>
where
    C: Send + Sync + 'static,
{
    /// Create a dispatcher. Nothing is contacted until the first call that
    /// needs a session.
    pub fn new(
        authenticator: Arc<dyn Authenticator<C>>,
        config: DispatchConfig,
        chooser: Arc<dyn Chooser>,
    ) -> Self {
        Self {
            sessions: SessionManager::new(authenticator),
            config,
            chooser,
            progress: Progress::default(),
        }
    }

    /// Send operator progress to `progress` instead of stdout.
    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The session, authenticating on first use or when `force_reload` is set.
    pub async fn session(&self, force_reload: bool) -> DispatchResult<Session<C>> {
        timed(
            &self.progress,
            "loading account...",
            self.sessions.ensure_session(force_reload),
        )
        .await
    }

    /// Describe every backend visible to the account.
    pub async fn list_backends(&self) -> DispatchResult<Vec<BackendDescriptor>> {
        let session = self.session(false).await?;
        self.directory(&session).await
    }

    /// Resolve `choice` to a backend name. A named backend is used as is;
    /// otherwise the operator is prompted with the current directory.
    pub async fn choose_backend(&self, choice: BackendChoice) -> DispatchResult<String> {
        match choice {
            BackendChoice::Named(name) => Ok(name),
            BackendChoice::Prompt { .. } => {
                let session = self.session(false).await?;
                self.select(&session, choice).await
            }
        }
    }

    async fn directory(&self, session: &Session<C>) -> DispatchResult<Vec<BackendDescriptor>> {
        timed(
            &self.progress,
            "loading backends...",
            directory::list_backends(session, self.config.workers()),
        )
        .await
    }

    async fn select(&self, session: &Session<C>, choice: BackendChoice) -> DispatchResult<String> {
        match choice {
            BackendChoice::Named(name) => Ok(name),
            BackendChoice::Prompt { hide_simulated } => {
                let directory = self.directory(session).await?;
                select_backend(&directory, hide_simulated, self.chooser.as_ref())
            }
        }
    }

    /// Submit `items` to the chosen backend.
    ///
    /// When `monitor_job` is configured, blocks until the last job of the
    /// batch is terminal. Earlier jobs are not watched.
    pub async fn execute(
        &self,
        items: Vec<C>,
        choice: BackendChoice,
        shots: Option<u32>,
    ) -> DispatchResult<JobBatch> {
        let session = self.session(false).await?;
        let backend = self.select(&session, choice).await?;
        let shots = shots.or(self.config.shots);

        let batch = submit(&session, items, &backend, shots, &self.progress).await?;
        info!(
            backend = batch.backend(),
            jobs = batch.job_count(),
            items = batch.item_count(),
            "batch submitted"
        );

        if self.config.monitor_job {
            monitor(
                batch.last().job(),
                self.config.poll_interval(),
                &self.progress,
            )
            .await?;
        }
        Ok(batch)
    }

    /// Fetch one record per item of `batch`, in input order.
    pub async fn collect(&self, batch: &JobBatch) -> DispatchResult<Vec<ResultRecord>> {
        aggregate::collect(batch, batch.item_count()).await
    }

    /// [`execute`](Self::execute) followed by [`collect`](Self::collect).
    pub async fn run(
        &self,
        items: Vec<C>,
        choice: BackendChoice,
        shots: Option<u32>,
    ) -> DispatchResult<(JobBatch, Vec<ResultRecord>)> {
        let batch = self.execute(items, choice, shots).await?;
        let records = self.collect(&batch).await?;
        Ok((batch, records))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::DispatchError;
    use crate::memory::{Circuit, InMemoryService, MemoryBackend};

    /// Picks the first choice and remembers what it was shown.
    #[derive(Default)]
    struct First {
        shown: Mutex<Vec<String>>,
    }

    impl Chooser for First {
        fn choose(&self, _title: &str, _body: &str, choices: &[String]) -> Option<String> {
            if let Ok(mut shown) = self.shown.lock() {
                shown.extend_from_slice(choices);
            }
            choices.first().cloned()
        }
    }

    fn dispatcher(service: InMemoryService) -> (Dispatcher<Circuit>, Arc<First>) {
        let chooser = Arc::new(First::default());
        let config = DispatchConfig {
            poll_interval_ms: 10,
            ..DispatchConfig::default()
        };
        let dispatcher = Dispatcher::<Circuit>::new(Arc::new(service), config, chooser.clone())
            .with_progress(Progress::Silent);
        (dispatcher, chooser)
    }

    fn bell(i: usize) -> Circuit {
        Circuit::new(format!("bell-{i}"), 2).h(0).cx(0, 1)
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompt_skips_simulators() {
        let service = InMemoryService::new()
            .with_backend(MemoryBackend::simulator("simulator_mps"))
            .with_backend(MemoryBackend::hardware("ibm_kyiv", 127).with_queue_depth(2));
        let (dispatcher, chooser) = dispatcher(service);

        let batch = dispatcher
            .execute(vec![bell(0)], BackendChoice::default(), Some(100))
            .await
            .unwrap();

        assert_eq!(batch.backend(), "ibm_kyiv");
        let shown = chooser.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].starts_with("ibm_kyiv\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_named_backend_bypasses_prompt() {
        let service = InMemoryService::new().with_backend(MemoryBackend::simulator("sim"));
        let (dispatcher, chooser) = dispatcher(service);

        let (batch, records) = dispatcher
            .run(
                vec![Circuit::new("flip", 1).x(0)],
                BackendChoice::Named("sim".into()),
                Some(10),
            )
            .await
            .unwrap();

        assert_eq!(batch.job_count(), 1);
        assert_eq!(records[0].counts().unwrap().get("1"), 10);
        assert!(chooser.shown.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_only_simulators_and_hidden() {
        let service = InMemoryService::new().with_backend(MemoryBackend::simulator("sim"));
        let (dispatcher, _) = dispatcher(service);

        let err = dispatcher
            .choose_backend(BackendChoice::Prompt {
                hide_simulated: true,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NoBackendsFound));
    }

    #[tokio::test]
    async fn test_configured_shots_apply() {
        let service = InMemoryService::new().with_backend(MemoryBackend::simulator("sim"));
        let chooser = Arc::new(First::default());
        let config = DispatchConfig {
            shots: Some(7),
            monitor_job: false,
            ..DispatchConfig::default()
        };
        let dispatcher = Dispatcher::<Circuit>::new(Arc::new(service), config, chooser)
            .with_progress(Progress::Silent);

        let (_, records) = dispatcher
            .run(
                vec![Circuit::new("zero", 1)],
                BackendChoice::Named("sim".into()),
                None,
            )
            .await
            .unwrap();
        assert_eq!(records[0].counts().unwrap().total_shots(), 7);
    }

    #[tokio::test]
    async fn test_omitted_shots_use_backend_default() {
        let service = InMemoryService::new()
            .with_backend(MemoryBackend::simulator("sim").with_default_shots(123));
        let config = DispatchConfig {
            monitor_job: false,
            ..DispatchConfig::default()
        };
        let dispatcher =
            Dispatcher::<Circuit>::new(Arc::new(service), config, Arc::new(First::default()))
                .with_progress(Progress::Silent);

        let (_, records) = dispatcher
            .run(
                vec![Circuit::new("zero", 1), Circuit::new("one", 1).x(0)],
                BackendChoice::Named("sim".into()),
                None,
            )
            .await
            .unwrap();
        assert_eq!(records[0].counts().unwrap().get("0"), 123);
        assert_eq!(records[1].counts().unwrap().total_shots(), 123);
    }

    #[tokio::test]
    async fn test_timed_steps_are_reported() {
        let service = InMemoryService::new().with_backend(MemoryBackend::hardware("ibm_kyiv", 127));
        let (progress, out) = Progress::capture();
        let dispatcher = Dispatcher::<Circuit>::new(
            Arc::new(service),
            DispatchConfig::default(),
            Arc::new(First::default()),
        )
        .with_progress(progress);

        dispatcher.list_backends().await.unwrap();

        let out = out.lock().unwrap().clone();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("loading account...  "));
        assert!(lines[1].starts_with("loading backends... "));
        assert!(lines[1].ends_with('s'));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prompted_execute_loads_account_once() {
        let service = InMemoryService::new()
            .with_backend(MemoryBackend::hardware("ibm_kyiv", 127).with_queue_depth(1));
        let (progress, out) = Progress::capture();
        let dispatcher = Dispatcher::<Circuit>::new(
            Arc::new(service),
            DispatchConfig {
                poll_interval_ms: 10,
                ..DispatchConfig::default()
            },
            Arc::new(First::default()),
        )
        .with_progress(progress);

        dispatcher
            .execute(vec![bell(0)], BackendChoice::default(), Some(10))
            .await
            .unwrap();

        let out = out.lock().unwrap().clone();
        let labels: Vec<_> = out
            .lines()
            .filter(|l| l.len() >= 20)
            .map(|l| l[..20].trim_end())
            .filter(|l| l.ends_with("..."))
            .collect();
        assert_eq!(
            labels,
            [
                "loading account...",
                "loading backends...",
                "transpiling...",
                "sending job...",
            ]
        );
    }
}
