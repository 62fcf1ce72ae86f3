//! End-to-end dispatch against the in-memory service.

use std::sync::{Arc, Mutex};

use hal_dispatch::memory::{Circuit, InMemoryService, MemoryBackend};
use hal_dispatch::{
    BackendChoice, Chooser, CredentialStore, Credentials, DispatchConfig, DispatchError,
    Dispatcher, Progress, ResultRecord, ResultWriter, ServiceError,
};

/// Chooses a fixed backend name from whatever it is shown.
struct Choose(&'static str);

impl Chooser for Choose {
    fn choose(&self, _title: &str, _body: &str, choices: &[String]) -> Option<String> {
        choices
            .iter()
            .find(|c| c.lines().next() == Some(self.0))
            .cloned()
    }
}

/// Circuit `i` deterministically measures the binary encoding of `i`.
fn encode(i: usize) -> Circuit {
    (0..8u32)
        .filter(|bit| i & (1 << bit) != 0)
        .fold(Circuit::new(format!("encode-{i}"), 8), |c, bit| c.x(bit))
}

fn config() -> DispatchConfig {
    DispatchConfig {
        poll_interval_ms: 50,
        max_workers: Some(2),
        ..DispatchConfig::default()
    }
}

fn dispatcher(service: Arc<InMemoryService>, pick: &'static str) -> Dispatcher<Circuit> {
    Dispatcher::<Circuit>::new(service, config(), Arc::new(Choose(pick)))
        .with_progress(Progress::Silent)
}

fn fleet() -> InMemoryService {
    InMemoryService::new()
        .with_backend(MemoryBackend::simulator("simulator_mps"))
        .with_backend(
            MemoryBackend::hardware("ibm_kyiv", 127)
                .with_pending_jobs(4)
                .with_max_items_per_job(100)
                .with_queue_depth(2),
        )
}

#[tokio::test(start_paused = true)]
async fn test_large_batch_is_split_and_results_keep_input_order() {
    let service = Arc::new(fleet());
    let dispatcher = dispatcher(service.clone(), "ibm_kyiv");

    let items: Vec<Circuit> = (0..250).map(encode).collect();
    let (batch, records) = dispatcher
        .run(items, BackendChoice::default(), Some(64))
        .await
        .unwrap();

    assert_eq!(batch.job_count(), 3);
    let ranges: Vec<_> = batch.handles().iter().map(|h| h.range()).collect();
    assert_eq!(ranges, vec![0..100, 100..200, 200..250]);

    assert_eq!(records.len(), 250);
    for (i, record) in records.iter().enumerate() {
        let counts = record.counts().unwrap();
        assert_eq!(counts.get(&format!("{i:08b}")), 64, "item {i}");
        assert_eq!(counts.len(), 1);
    }

    assert_eq!(service.backends()[1].submitted_jobs(), 3);
    assert_eq!(service.auth_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_item_is_persisted_as_null() {
    let service = Arc::new(
        InMemoryService::new().with_backend(
            MemoryBackend::hardware("ibm_kyiv", 127)
                .with_max_items_per_job(40)
                .with_unavailable_results([57]),
        ),
    );
    let dispatcher = dispatcher(service, "ibm_kyiv");

    let items: Vec<Circuit> = (0..120).map(encode).collect();
    let (batch, records) = dispatcher
        .run(items, BackendChoice::Named("ibm_kyiv".into()), Some(10))
        .await
        .unwrap();

    assert_eq!(batch.job_count(), 3);
    assert_eq!(records.len(), 120);
    assert_eq!(records[57], ResultRecord::Unavailable);
    assert_eq!(
        records.iter().filter(|r| r.is_unavailable()).count(),
        1
    );

    let dir = tempfile::tempdir().unwrap();
    let path = ResultWriter::new(dir.path())
        .write(batch.backend(), &records)
        .unwrap();
    let written: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(written.len(), 120);
    assert!(written[57].is_null());
    assert_eq!(written[58]["00111010"], 10);
}

#[tokio::test(start_paused = true)]
async fn test_session_is_established_once() {
    let service = Arc::new(fleet());
    let dispatcher = dispatcher(service.clone(), "ibm_kyiv");

    let directory = dispatcher.list_backends().await.unwrap();
    let names: Vec<_> = directory.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["simulator_mps", "ibm_kyiv"]);

    dispatcher
        .run(vec![encode(3)], BackendChoice::default(), None)
        .await
        .unwrap();
    assert_eq!(service.auth_calls(), 1);

    dispatcher.session(true).await.unwrap();
    assert_eq!(service.auth_calls(), 2);
}

#[tokio::test]
async fn test_missing_credential_then_saved_credential() {
    let dir = tempfile::tempdir().unwrap();
    let store = CredentialStore::new(dir.path().join("credentials.json"));
    let service = Arc::new(
        fleet()
            .with_required_token("secret")
            .with_credential_store(store.clone()),
    );
    let dispatcher = dispatcher(service, "ibm_kyiv");

    let err = dispatcher.session(false).await.unwrap_err();
    assert!(matches!(err, DispatchError::Authentication { .. }));
    let message = err.to_string();
    assert!(message.contains("save-account"));

    store.save(&Credentials::new("secret"), false).unwrap();
    assert!(dispatcher.session(false).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_failed_job_surfaces_on_collect() {
    let service = Arc::new(
        InMemoryService::new()
            .with_backend(MemoryBackend::hardware("ibm_kyiv", 127).with_job_failure("calibration")),
    );
    let dispatcher = dispatcher(service, "ibm_kyiv");

    let batch = dispatcher
        .execute(vec![encode(1), encode(2)], BackendChoice::Named("ibm_kyiv".into()), None)
        .await
        .unwrap();
    let err = dispatcher.collect(&batch).await.unwrap_err();
    assert!(matches!(
        err,
        DispatchError::Service(ServiceError::JobFailed(_))
    ));
}

#[tokio::test]
async fn test_unknown_backend_and_dismissed_prompt() {
    let service = Arc::new(fleet());
    let dispatcher = dispatcher(service, "nowhere");

    let err = dispatcher
        .execute(vec![encode(1)], BackendChoice::Named("ibm_nowhere".into()), None)
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownBackend(ref n) if n == "ibm_nowhere"));
    assert!(err.is_lookup());

    let err = dispatcher
        .choose_backend(BackendChoice::Prompt {
            hide_simulated: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoChoiceMade));
}

#[tokio::test]
async fn test_progress_lines_use_fixed_width_labels() {
    let (progress, out) = Progress::capture();
    let dispatcher = Dispatcher::<Circuit>::new(
        Arc::new(fleet()),
        DispatchConfig {
            monitor_job: false,
            ..config()
        },
        Arc::new(Choose("ibm_kyiv")),
    )
    .with_progress(progress);

    dispatcher
        .execute(vec![encode(1)], BackendChoice::Named("ibm_kyiv".into()), None)
        .await
        .unwrap();

    let out = out.lock().unwrap().clone();
    let labels: Vec<_> = out.lines().map(|l| l[..20].trim_end()).collect();
    assert_eq!(labels, ["loading account...", "transpiling...", "sending job..."]);
}

#[test]
fn test_chooser_sees_rendered_descriptors() {
    struct Record(Mutex<Vec<String>>);
    impl Chooser for Record {
        fn choose(&self, _: &str, _: &str, choices: &[String]) -> Option<String> {
            self.0.lock().unwrap().extend_from_slice(choices);
            None
        }
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let chooser = Arc::new(Record(Mutex::new(vec![])));
    let dispatcher = Dispatcher::<Circuit>::new(Arc::new(fleet()), config(), chooser.clone())
        .with_progress(Progress::Silent);

    let err = runtime
        .block_on(dispatcher.choose_backend(BackendChoice::Prompt {
            hide_simulated: false,
        }))
        .unwrap_err();
    assert!(matches!(err, DispatchError::NoChoiceMade));

    let shown = chooser.0.lock().unwrap();
    assert_eq!(
        *shown,
        [
            "simulator_mps\n\n0 queued\nsimulated qubits",
            "ibm_kyiv\n\n4 queued\n127 qubits\ndynamic_circuits",
        ]
    );
}
