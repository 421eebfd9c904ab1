//! Integration tests for the lifecycle view.

use viastudio_core::{
    GenerationRequest, GenerationSettings, LifecyclePhase, LifecycleState, RejectReason,
    VideoReference,
};

#[test]
fn test_history_is_most_recent_first_across_many_attempts() {
    let mut state = LifecycleState::new();
    let settings = GenerationSettings::default();
    let mut ids = Vec::new();

    for n in 0..5 {
        let attempt = state
            .begin(&GenerationRequest::new(format!("shot {n}"), &settings))
            .unwrap();
        let reference = VideoReference::new(format!("https://svc/vid{n}")).unwrap();
        state.record_success(&attempt.id, reference, None).unwrap();
        ids.push(attempt.id);
    }

    ids.reverse();
    let history: Vec<_> = state.history().iter().map(|a| a.id.clone()).collect();
    assert_eq!(history, ids);
    assert_eq!(state.phase(), LifecyclePhase::ResultReady);
}

#[test]
fn test_rejections_never_create_attempts() {
    let mut state = LifecycleState::new();
    let settings = GenerationSettings::default();

    assert_eq!(
        state.begin(&GenerationRequest::new("  ", &settings)),
        Err(RejectReason::EmptyPrompt)
    );
    assert!(state.in_flight().is_none());

    state
        .begin(&GenerationRequest::new("first", &settings))
        .unwrap();
    for _ in 0..3 {
        assert_eq!(
            state.begin(&GenerationRequest::new("again", &settings)),
            Err(RejectReason::AlreadyInFlight)
        );
    }
    assert_eq!(state.in_flight().unwrap().prompt, "first");
}
