//! End-to-end tests of the Veo client against a mock server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use viastudio_core::{GenerationRequest, GenerationSettings};
use viastudio_fetch::{FetchContext, StaticCredentials};
use viastudio_providers::veo::{
    FLAVOR_MESSAGES, GenerationClient, GenerationError, INITIALIZING_MESSAGE, SUBMITTED_MESSAGE,
    VeoApiClient,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn context(key: &str) -> FetchContext {
    FetchContext::builder()
        .credentials(Arc::new(StaticCredentials::new(key)))
        .poll_interval(Duration::from_millis(1))
        .build()
        .unwrap()
}

fn client(server: &MockServer, ctx: &FetchContext) -> GenerationClient {
    let service = VeoApiClient::new(Arc::clone(&ctx.http)).with_base_url(server.uri());
    GenerationClient::from_context(ctx, Arc::new(service))
}

fn request() -> GenerationRequest {
    GenerationRequest::new("a lighthouse at dusk", &GenerationSettings::default())
}

#[tokio::test]
async fn test_submit_poll_and_compose_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/veo-3.1-fast-generate-preview:predictLongRunning"))
        .and(header("x-goog-api-key", "abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "models/veo/operations/op1", "done": false})),
        )
        .expect(1)
        .mount(&server)
        .await;

    // First poll still running, second one done.
    Mock::given(method("GET"))
        .and(path("/v1beta/models/veo/operations/op1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "models/veo/operations/op1", "done": false})),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1beta/models/veo/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "models/veo/operations/op1",
            "done": true,
            "response": {"generateVideoResponse": {"generatedSamples": [{"video": {"uri": "https://svc/vid1"}}]}}
        })))
        .mount(&server)
        .await;

    let ctx = context("abc123");
    let messages = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = {
        let messages = Arc::clone(&messages);
        move |m: &str| messages.lock().unwrap().push(m.to_string())
    };

    let reference = client(&server, &ctx)
        .generate(&request(), &sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(reference.as_str(), "https://svc/vid1&key=abc123");

    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0], INITIALIZING_MESSAGE);
    assert_eq!(messages[1], SUBMITTED_MESSAGE);
    assert!(FLAVOR_MESSAGES.contains(&messages[2].as_str()));
    assert!(FLAVOR_MESSAGES.contains(&messages[3].as_str()));
}

#[tokio::test]
async fn test_rejected_key_is_credential_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Requested entity was not found.", "status": "NOT_FOUND"}
        })))
        .mount(&server)
        .await;

    let ctx = context("stale-key");
    let err = client(&server, &ctx)
        .generate(&request(), &viastudio_core::NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::CredentialExpiredOrInvalid);
}

#[tokio::test]
async fn test_other_service_error_is_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let ctx = context("abc123");
    let err = client(&server, &ctx)
        .generate(&request(), &viastudio_core::NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        GenerationError::GenerationFailed("Resource has been exhausted (e.g. check quota).".into())
    );
}

#[tokio::test]
async fn test_missing_key_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let ctx = FetchContext::builder()
        .credentials(Arc::new(StaticCredentials::empty()))
        .build()
        .unwrap();
    let err = client(&server, &ctx)
        .generate(&request(), &viastudio_core::NoProgress, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err, GenerationError::MissingCredential);
    assert_eq!(err.to_string(), "API Key is missing. Please select one.");
}
