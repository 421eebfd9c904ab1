//! Generation controller behaviour against a scripted service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use viastudio_core::{
    AttemptId, CREDENTIAL_EXPIRED_MESSAGE, GenerationRequest, GenerationSettings, LifecyclePhase,
    LifecycleState, NoticeKind, RejectReason, SubmitOutcome,
};
use viastudio_fetch::{
    ApiKey, CredentialCapability, CredentialGate, FetchError, GateState, StaticCredentials,
};
use viastudio_providers::veo::{GenerationClient, GenerationService, Operation};
use viastudio_store::GenerationController;

// ============================================================================
// Scripted Service
// ============================================================================

#[derive(Default)]
struct ScriptedService {
    submits: Mutex<VecDeque<Result<Operation, FetchError>>>,
    refreshes: Mutex<VecDeque<Result<Operation, FetchError>>>,
    submit_calls: AtomicUsize,
    hold: Option<Arc<Notify>>,
}

impl ScriptedService {
    fn new() -> Self {
        Self::default()
    }

    fn held(hold: Arc<Notify>) -> Self {
        Self {
            hold: Some(hold),
            ..Self::default()
        }
    }

    fn on_submit(self, result: Result<Operation, FetchError>) -> Self {
        self.submits.lock().unwrap().push_back(result);
        self
    }

    fn on_refresh(self, result: Result<Operation, FetchError>) -> Self {
        self.refreshes.lock().unwrap().push_back(result);
        self
    }

    fn submit_calls(&self) -> usize {
        self.submit_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationService for ScriptedService {
    async fn submit(
        &self,
        _request: &GenerationRequest,
        _key: &ApiKey,
    ) -> Result<Operation, FetchError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(hold) = &self.hold {
            hold.notified().await;
        }
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::InvalidResponse("script exhausted".into())))
    }

    async fn refresh(&self, operation: &Operation, _key: &ApiKey) -> Result<Operation, FetchError> {
        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Operation::running(operation.name.clone())))
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn controller_with(
    service: Arc<ScriptedService>,
    credentials: Arc<dyn CredentialCapability>,
    poll_interval: Duration,
) -> (Arc<GenerationController>, Arc<CredentialGate>) {
    let gate = Arc::new(CredentialGate::new(Arc::clone(&credentials)));
    let client = GenerationClient::new(service, credentials).with_poll_interval(poll_interval);
    let controller = Arc::new(GenerationController::new(client, Arc::clone(&gate)));
    (controller, gate)
}

fn controller(service: Arc<ScriptedService>) -> (Arc<GenerationController>, Arc<CredentialGate>) {
    controller_with(
        service,
        Arc::new(StaticCredentials::new("abc123")),
        Duration::from_millis(1),
    )
}

fn request(prompt: &str) -> GenerationRequest {
    GenerationRequest::new(prompt, &GenerationSettings::default())
}

fn finished(n: usize) -> Result<Operation, FetchError> {
    Ok(Operation::finished(format!("op{n}"), format!("https://svc/vid{n}")))
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_successful_generation_enters_history() {
    let service = Arc::new(
        ScriptedService::new()
            .on_submit(Ok(Operation::running("op1")))
            .on_refresh(Ok(Operation::running("op1")))
            .on_refresh(finished(1)),
    );
    let (controller, _gate) = controller(service);

    let outcome = controller.submit(request("a red fox in snow")).await;
    let attempt = outcome.completed().expect("completed").clone();

    assert_eq!(
        attempt.result.as_ref().map(|r| r.as_str()),
        Some("https://svc/vid1&key=abc123")
    );

    let state = controller.state();
    assert_eq!(state.phase(), LifecyclePhase::ResultReady);
    assert_eq!(state.history().len(), 1);
    assert_eq!(state.history()[0].id, attempt.id);
    assert_eq!(state.current_result().map(|a| &a.id), Some(&attempt.id));
    assert!(state.progress_message().is_empty());
    assert!(state.last_notice().is_none());
}

#[tokio::test]
async fn test_empty_prompt_is_rejected_without_network() {
    let service = Arc::new(ScriptedService::new().on_submit(finished(1)));
    let (controller, _gate) = controller(Arc::clone(&service));

    let outcome = controller.submit(request("   ")).await;

    assert_eq!(outcome, SubmitOutcome::Rejected(RejectReason::EmptyPrompt));
    assert_eq!(service.submit_calls(), 0);
    assert_eq!(controller.state(), LifecycleState::new());
}

#[tokio::test]
async fn test_no_result_leaves_history_untouched() {
    let service = Arc::new(
        ScriptedService::new()
            .on_submit(Ok(Operation::running("op1")))
            .on_refresh(Ok(Operation::empty("op1"))),
    );
    let (controller, gate) = controller(service);
    gate.refresh().await;

    let outcome = controller.submit(request("a red fox")).await;

    let SubmitOutcome::Failed(notice) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(notice.kind, NoticeKind::NoResult);
    assert_eq!(
        notice.message,
        "Generation failed: No video URI returned from the API."
    );

    let state = controller.state();
    assert_eq!(state.phase(), LifecyclePhase::Idle);
    assert!(state.history().is_empty());
    assert_eq!(state.last_notice(), Some(&notice));
    assert_eq!(gate.state(), GateState::Confirmed);
}

#[tokio::test]
async fn test_rejected_key_invalidates_gate() {
    let service = Arc::new(
        ScriptedService::new()
            .on_submit(finished(1))
            .on_submit(Err(FetchError::Api {
                status: 404,
                message: "Requested entity was not found.".into(),
            })),
    );
    let (controller, gate) = controller(service);
    assert!(gate.refresh().await);

    let first = controller.submit(request("first")).await;
    let first = first.completed().expect("completed").clone();

    let outcome = controller.submit(request("second")).await;

    let SubmitOutcome::Failed(notice) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(notice.requires_credential());
    assert_eq!(notice.message, CREDENTIAL_EXPIRED_MESSAGE);
    assert_eq!(gate.state(), GateState::Invalidated);
    assert!(!gate.is_usable());

    let state = controller.state();
    assert_eq!(state.phase(), LifecyclePhase::ResultReady);
    assert_eq!(state.history().len(), 1);
    assert_eq!(state.current_result().map(|a| &a.id), Some(&first.id));
}

#[tokio::test]
async fn test_other_failure_is_verbatim() {
    let service = Arc::new(ScriptedService::new().on_submit(Err(FetchError::Api {
        status: 429,
        message: "quota exceeded".into(),
    })));
    let (controller, gate) = controller(service);
    gate.refresh().await;

    let outcome = controller.submit(request("a red fox")).await;

    let SubmitOutcome::Failed(notice) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(notice.kind, NoticeKind::GenerationFailed);
    assert_eq!(notice.message, "Generation failed: quota exceeded");
    assert!(gate.is_usable());
}

#[tokio::test]
async fn test_missing_key_invalidates_gate_without_network() {
    let service = Arc::new(ScriptedService::new().on_submit(finished(1)));
    let (controller, gate) = controller_with(
        Arc::clone(&service),
        Arc::new(StaticCredentials::empty()),
        Duration::from_millis(1),
    );
    gate.request_selection().await;
    assert!(gate.is_usable());

    let outcome = controller.submit(request("a red fox")).await;

    let SubmitOutcome::Failed(notice) = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(notice.requires_credential());
    assert_eq!(
        notice.message,
        "Generation failed: API Key is missing. Please select one."
    );
    assert_eq!(service.submit_calls(), 0);
    assert_eq!(gate.state(), GateState::Invalidated);
}

// ============================================================================
// Single Flight
// ============================================================================

#[tokio::test]
async fn test_second_submit_while_in_flight_is_rejected() {
    let hold = Arc::new(Notify::new());
    let service = Arc::new(ScriptedService::held(Arc::clone(&hold)).on_submit(finished(1)));
    let (controller, _gate) = controller(Arc::clone(&service));

    let first = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit(request("first")).await }
    });

    let mut rx = controller.subscribe();
    rx.wait_for(LifecycleState::is_in_flight).await.unwrap();
    assert_eq!(controller.state().phase(), LifecyclePhase::InFlight);

    let second = controller.submit(request("second")).await;
    assert_eq!(second, SubmitOutcome::Rejected(RejectReason::AlreadyInFlight));
    assert_eq!(controller.state().in_flight().map(|a| a.prompt.as_str()), Some("first"));

    hold.notify_one();
    let first = first.await.unwrap();
    assert!(first.completed().is_some());
    assert_eq!(service.submit_calls(), 1);
    assert_eq!(controller.state().history().len(), 1);
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_attempt() {
    let service = Arc::new(ScriptedService::new().on_submit(Ok(Operation::running("op1"))));
    let (controller, _gate) = controller_with(
        service,
        Arc::new(StaticCredentials::new("abc123")),
        Duration::from_secs(3600),
    );

    let task = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.submit(request("a long one")).await }
    });

    let mut rx = controller.subscribe();
    rx.wait_for(|s| !s.progress_message().is_empty() && s.is_in_flight())
        .await
        .unwrap();
    controller.shutdown();

    let SubmitOutcome::Failed(notice) = task.await.unwrap() else {
        panic!("expected failure");
    };
    assert_eq!(notice.kind, NoticeKind::Cancelled);

    let state = controller.state();
    assert_eq!(state.phase(), LifecyclePhase::Idle);
    assert!(state.history().is_empty());
}

#[tokio::test]
async fn test_dropped_submit_releases_in_flight_slot() {
    let service = Arc::new(
        ScriptedService::new()
            .on_submit(Ok(Operation::running("op1")))
            .on_submit(finished(2)),
    );
    let (controller, _gate) = controller_with(
        service,
        Arc::new(StaticCredentials::new("abc123")),
        Duration::from_secs(3600),
    );

    let timed_out = tokio::time::timeout(
        Duration::from_millis(50),
        controller.submit(request("abandoned")),
    )
    .await;
    assert!(timed_out.is_err());

    let state = controller.state();
    assert!(!state.is_in_flight());
    assert_eq!(state.last_notice().map(|n| n.kind), Some(NoticeKind::Cancelled));
    assert!(state.history().is_empty());

    let outcome = controller.submit(request("retry")).await;
    assert!(outcome.completed().is_some(), "got {outcome:?}");
    assert_eq!(controller.state().history().len(), 1);
}

// ============================================================================
// History
// ============================================================================

#[tokio::test]
async fn test_history_is_most_recent_first() {
    let service = Arc::new(
        ScriptedService::new()
            .on_submit(finished(1))
            .on_submit(finished(2))
            .on_submit(finished(3)),
    );
    let (controller, _gate) = controller(service);

    let mut ids = Vec::new();
    for prompt in ["one", "two", "three"] {
        let outcome = controller.submit(request(prompt)).await;
        ids.push(outcome.completed().expect("completed").id.clone());
    }

    let state = controller.state();
    let history: Vec<_> = state.history().iter().map(|a| a.id.clone()).collect();
    ids.reverse();
    assert_eq!(history, ids);
    assert_eq!(state.current_result().map(|a| &a.id), Some(&ids[0]));
}

#[tokio::test]
async fn test_select_history_entry() {
    let service = Arc::new(
        ScriptedService::new()
            .on_submit(finished(1))
            .on_submit(finished(2)),
    );
    let (controller, _gate) = controller(service);

    let oldest = controller.submit(request("one")).await;
    let oldest = oldest.completed().expect("completed").id.clone();
    controller.submit(request("two")).await;

    assert!(controller.select_history_entry(&oldest));
    let state = controller.state();
    let current = state.current_result().expect("selected");
    assert_eq!(current.id, oldest);
    assert_eq!(
        current.result.as_ref().map(|r| r.as_str()),
        Some("https://svc/vid1&key=abc123")
    );

    let before = controller.state();
    assert!(!controller.select_history_entry(&AttemptId::from("missing00")));
    assert_eq!(controller.state(), before);
}

#[tokio::test]
async fn test_history_limit_drops_oldest() {
    let service = Arc::new(
        ScriptedService::new()
            .on_submit(finished(1))
            .on_submit(finished(2))
            .on_submit(finished(3)),
    );
    let (controller, _gate) = controller(service);
    let controller = Arc::try_unwrap(controller)
        .expect("sole owner")
        .with_history_limit(Some(2));

    for prompt in ["one", "two", "three"] {
        controller.submit(request(prompt)).await;
    }

    let state = controller.state();
    let prompts: Vec<_> = state.history().iter().map(|a| a.prompt.as_str()).collect();
    assert_eq!(prompts, vec!["three", "two"]);
}
