//! End-to-end tests for the generation flow
//!
//! These tests drive a [`StudioSession`] against a scripted remote and check
//! how the credit ledger and the gallery react to each outcome.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{
    capability::{ApiKeyStore, CapabilityGate, RetryPolicy},
    error::{GenerationError, RemoteError},
    ledger::CreditLedger,
    models::{AspectRatio, GenerationRequest, JobStatus, Resolution},
    orchestrator::{JobOrchestrator, PollPolicy},
    remote::{JobPayload, OperationSnapshot, RemoteFailure, RemoteJobApi, ScriptWriter},
    script::ScriptAssist,
    session::{SessionStatus, StudioSession},
};
use tokio_test::{assert_err, assert_ok};

const OPERATION: &str = "models/veo/operations/it-1";

/// Remote whose polls follow a fixed script
#[derive(Default)]
struct FakeRemote {
    reject_create: bool,
    fail_polls: bool,
    polls: Mutex<VecDeque<OperationSnapshot>>,
    poll_count: Mutex<u32>,
}

impl FakeRemote {
    fn finishing_with(running: usize, last: OperationSnapshot) -> Self {
        let mut polls: VecDeque<_> = (0..running)
            .map(|_| OperationSnapshot::running(OPERATION))
            .collect();
        polls.push_back(last);
        Self {
            polls: Mutex::new(polls),
            ..Self::default()
        }
    }

    fn rejecting() -> Self {
        Self {
            reject_create: true,
            ..Self::default()
        }
    }

    fn unreachable_after_submit() -> Self {
        Self {
            fail_polls: true,
            ..Self::default()
        }
    }

    fn poll_count(&self) -> u32 {
        *self.poll_count.lock().unwrap()
    }
}

#[async_trait]
impl RemoteJobApi for FakeRemote {
    async fn create_operation(
        &self,
        _payload: &JobPayload,
    ) -> Result<OperationSnapshot, RemoteError> {
        if self.reject_create {
            return Err(RemoteError::Api {
                status: 400,
                body: "malformed request".to_string(),
            });
        }
        Ok(OperationSnapshot::running(OPERATION))
    }

    async fn poll_operation(&self, name: &str) -> Result<OperationSnapshot, RemoteError> {
        *self.poll_count.lock().unwrap() += 1;
        if self.fail_polls {
            return Err(RemoteError::Api {
                status: 503,
                body: "backend unavailable".to_string(),
            });
        }
        Ok(self
            .polls
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| OperationSnapshot::running(name)))
    }

    fn authorize_media_uri(&self, uri: &str) -> Result<String, RemoteError> {
        Ok(format!("{}&key=it-key", uri))
    }

    fn model_name(&self) -> &str {
        "veo-test"
    }
}

struct NoScripts;

#[async_trait]
impl ScriptWriter for NoScripts {
    async fn draft_script(&self, _topic: &str) -> Option<String> {
        None
    }
}

fn succeeded() -> OperationSnapshot {
    OperationSnapshot {
        name: OPERATION.to_string(),
        done: true,
        error: None,
        media_uri: Some("https://files.example/video?alt=media".to_string()),
    }
}

fn failed(message: &str) -> OperationSnapshot {
    OperationSnapshot {
        name: OPERATION.to_string(),
        done: true,
        error: Some(RemoteFailure {
            code: Some(13),
            message: message.to_string(),
        }),
        media_uri: None,
    }
}

fn session_with(remote: Arc<FakeRemote>, balance: i64, key: Option<&str>) -> StudioSession {
    session_with_limit(remote, balance, key, None)
}

fn session_with_limit(
    remote: Arc<FakeRemote>,
    balance: i64,
    key: Option<&str>,
    max_wait: Option<Duration>,
) -> StudioSession {
    let keys = ApiKeyStore::new(key.map(str::to_string));
    StudioSession::new(
        CreditLedger::new(balance),
        JobOrchestrator::new(
            remote,
            PollPolicy {
                interval: Duration::from_secs(5),
                max_wait,
            },
        ),
        CapabilityGate::new(Arc::new(keys), RetryPolicy::default()),
        ScriptAssist::new(Arc::new(NoScripts)),
    )
}

fn request(resolution: Resolution) -> GenerationRequest {
    GenerationRequest::new(
        "Propaganda de tênis de corrida",
        AspectRatio::Portrait,
        resolution,
        None,
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn full_hd_failure_restores_balance() {
    let remote = Arc::new(FakeRemote::finishing_with(2, failed("internal error")));
    let session = session_with(remote.clone(), 100, Some("it-key"));

    let pending = session.begin(request(Resolution::FullHd)).await.unwrap();
    assert_eq!(session.ledger().balance().await, 50);
    assert_eq!(session.ledger().pending().await, 50);
    assert!(matches!(
        session.status(),
        SessionStatus::Generating { cost: 50, ref operation, .. } if operation.as_deref() == Some(OPERATION)
    ));

    let err = pending.complete().await.unwrap_err();
    assert!(matches!(err, GenerationError::RemoteGeneration { ref message } if message == "internal error"));

    assert_eq!(session.ledger().balance().await, 100);
    assert_eq!(session.ledger().pending().await, 0);
    assert!(session.gallery().is_empty().await);
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(remote.poll_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn hd_success_keeps_debit_and_records_video() {
    let remote = Arc::new(FakeRemote::finishing_with(1, succeeded()));
    let session = session_with(remote, 100, Some("it-key"));
    assert_eq!(session.gallery().len().await, 0);

    let video = assert_ok!(session.generate(request(Resolution::Hd)).await);

    assert_eq!(session.ledger().balance().await, 70);
    assert_eq!(session.ledger().pending().await, 0);
    assert_eq!(
        video.uri,
        "https://files.example/video?alt=media&key=it-key"
    );
    assert_eq!(video.model, "veo-test");
    assert_eq!(video.aspect_ratio, AspectRatio::Portrait);

    let videos = session.videos().await;
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0], video);
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn newest_video_is_first() {
    let remote = Arc::new(FakeRemote {
        polls: Mutex::new(VecDeque::from(vec![succeeded(), succeeded()])),
        ..FakeRemote::default()
    });
    let session = session_with(remote, 200, Some("it-key"));

    let first = session.generate(request(Resolution::Hd)).await.unwrap();
    let second = session.generate(request(Resolution::FullHd)).await.unwrap();

    let ids: Vec<_> = session
        .videos()
        .await
        .into_iter()
        .map(|v| v.id)
        .collect();
    assert_eq!(ids, vec![second.id, first.id]);
    assert_eq!(session.balance().await, 120);
}

#[tokio::test(start_paused = true)]
async fn missing_result_is_refunded() {
    let remote = Arc::new(FakeRemote::finishing_with(
        0,
        OperationSnapshot {
            media_uri: None,
            ..succeeded()
        },
    ));
    let session = session_with(remote, 100, Some("it-key"));

    let err = assert_err!(session.generate(request(Resolution::Hd)).await);
    assert!(matches!(err, GenerationError::MissingResult));
    assert_eq!(session.ledger().balance().await, 100);
}

#[tokio::test(start_paused = true)]
async fn submission_failure_refunds_without_polling() {
    let remote = Arc::new(FakeRemote::rejecting());
    let session = session_with(remote.clone(), 100, Some("it-key"));

    let err = session.begin(request(Resolution::FullHd)).await.unwrap_err();

    assert!(matches!(err, GenerationError::Submission(_)));
    assert_eq!(session.ledger().balance().await, 100);
    assert_eq!(session.ledger().pending().await, 0);
    assert_eq!(remote.poll_count(), 0);
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn one_job_at_a_time() {
    let remote = Arc::new(FakeRemote::finishing_with(3, succeeded()));
    let session = session_with(remote, 200, Some("it-key"));

    let pending = session.begin(request(Resolution::Hd)).await.unwrap();

    let err = session.begin(request(Resolution::Hd)).await.unwrap_err();
    assert!(matches!(err, GenerationError::JobInFlight));
    assert_eq!(session.ledger().balance().await, 170);

    pending.complete().await.unwrap();
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn insufficient_credits_reserve_nothing() {
    let remote = Arc::new(FakeRemote::finishing_with(0, succeeded()));
    let session = session_with(remote.clone(), 40, Some("it-key"));

    let err = session.begin(request(Resolution::FullHd)).await.unwrap_err();

    assert!(matches!(
        err,
        GenerationError::InsufficientCredits {
            required: 50,
            available: 40
        }
    ));
    assert_eq!(session.ledger().balance().await, 40);
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn missing_credential_gates_submission() {
    let remote = Arc::new(FakeRemote::finishing_with(0, succeeded()));
    let session = session_with(remote.clone(), 100, None);

    let err = session.begin(request(Resolution::Hd)).await.unwrap_err();

    assert!(matches!(err, GenerationError::Capability));
    assert_eq!(session.ledger().balance().await, 100);
    assert_eq!(remote.poll_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancelling_refunds_and_frees_the_slot() {
    let remote = Arc::new(FakeRemote::default());
    let session = session_with(remote, 100, Some("it-key"));

    let pending = session.begin(request(Resolution::FullHd)).await.unwrap();
    assert_eq!(pending.job().status, JobStatus::Pending);
    assert_eq!(pending.cost(), 50);

    let canceller = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(12)).await;
        assert!(canceller.cancel_active());
    });

    let err = pending.complete().await.unwrap_err();
    assert!(matches!(err, GenerationError::Cancelled));
    assert_eq!(session.ledger().balance().await, 100);
    assert_eq!(session.status(), SessionStatus::Idle);
    assert!(!session.cancel_active());
}

#[tokio::test(start_paused = true)]
async fn poll_failure_is_not_retried_and_refunds() {
    let remote = Arc::new(FakeRemote::unreachable_after_submit());
    let session = session_with(remote.clone(), 100, Some("it-key"));

    let err = session.generate(request(Resolution::FullHd)).await.unwrap_err();
    assert!(matches!(
        err,
        GenerationError::Poll(RemoteError::Api { status: 503, .. })
    ));

    assert_eq!(remote.poll_count(), 1);
    assert_eq!(session.ledger().balance().await, 100);
    assert_eq!(session.ledger().pending().await, 0);
    assert!(session.gallery().is_empty().await);
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn timeout_refunds_the_reservation() {
    let remote = Arc::new(FakeRemote::default());
    let session = session_with_limit(
        remote.clone(),
        100,
        Some("it-key"),
        Some(Duration::from_secs(12)),
    );

    let start = tokio::time::Instant::now();
    let err = session.generate(request(Resolution::Hd)).await.unwrap_err();
    assert!(matches!(err, GenerationError::Timeout(d) if d == Duration::from_secs(12)));
    assert_eq!(start.elapsed(), Duration::from_secs(12));

    assert_eq!(remote.poll_count(), 2);
    assert_eq!(session.ledger().balance().await, 100);
    assert_eq!(session.ledger().pending().await, 0);
    assert_eq!(session.status(), SessionStatus::Idle);
}

#[tokio::test]
async fn dropped_generation_settles_as_debited() {
    let remote = Arc::new(FakeRemote::default());
    let session = session_with(remote.clone(), 100, Some("it-key"));

    let pending = session.begin(request(Resolution::Hd)).await.unwrap();
    assert_eq!(session.ledger().pending().await, 30);
    drop(pending);

    assert_eq!(session.ledger().balance().await, 70);
    assert_eq!(session.ledger().pending().await, 0);
    assert_eq!(session.status(), SessionStatus::Idle);
    assert_eq!(remote.poll_count(), 0);

    // The freed slot accepts the next job
    assert_ok!(session.begin(request(Resolution::Hd)).await);
}

#[tokio::test]
async fn top_up_and_round_trip_reservation() {
    let remote = Arc::new(FakeRemote::default());
    let session = session_with(remote, 100, Some("it-key"));

    assert_eq!(assert_ok!(session.top_up(5).await), 50);
    assert_eq!(session.ledger().balance().await, 150);

    for resolution in [Resolution::Hd, Resolution::FullHd] {
        let reservation = session.ledger().reserve(resolution.cost()).await;
        session.ledger().refund(reservation).await;
        assert_eq!(session.ledger().balance().await, 150);
    }
}

#[tokio::test]
async fn absent_script_is_not_an_error() {
    let remote = Arc::new(FakeRemote::default());
    let session = session_with(remote, 100, Some("it-key"));

    assert_eq!(session.draft_script("tênis de corrida").await, None);
}
