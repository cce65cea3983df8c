//! Gateway over real HTTP against a mock backend.

mod integration;

use integration::mock_server::MockServerFixture;
use llm_gateway::{ChatMessage, ChatRequest, Error, GenerateRequest, ServiceStatus};

const GENERATE_OK: &str = r#"{
    "model": "mistral:7b",
    "response": "The kettle is already on.",
    "done": true,
    "total_duration": 5043500667,
    "load_duration": 5025959,
    "eval_count": 7,
    "eval_duration": 1325000000
}"#;

#[tokio::test]
async fn test_generate_over_http() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_post("/api/generate", 200, GENERATE_OK, 1).await;
    let gateway = fixture.gateway(fixture.config());

    let reply = gateway
        .generate(GenerateRequest::new("mistral:7b", "Good morning"))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply.response, "The kettle is already on.");
    assert_eq!(reply.model, "mistral:7b");
    assert_eq!(reply.total_duration, 5043500667);
    assert_eq!(reply.eval_count, 7);
}

#[tokio::test]
async fn test_upstream_status_preserved_without_retry() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_post("/api/generate", 404, r#"{"error":"model 'nope' not found"}"#, 1)
        .await;
    let gateway = fixture.gateway(fixture.config());

    let err = gateway
        .generate(GenerateRequest::new("nope", "hi"))
        .await
        .unwrap_err();

    mock.assert_async().await;
    match err {
        Error::BackendRejected { status, message } => {
            assert_eq!(status, 404);
            assert!(message.contains("not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_uniform_policy_exhausts_three_attempts() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture.mock_post("/api/generate", 503, "overloaded", 3).await;
    let gateway = fixture.gateway(fixture.fast_retry_config());

    let err = gateway
        .generate(GenerateRequest::new("mistral:7b", "hi"))
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert_eq!(err.status_code(), 503);
}

#[tokio::test]
async fn test_chat_over_http() {
    let mut fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_post(
            "/api/chat",
            200,
            r#"{"message":{"role":"assistant","content":"Fine, thanks."},"total_duration":9}"#,
            1,
        )
        .await;
    let gateway = fixture.gateway(fixture.config());

    let reply = gateway
        .chat(ChatRequest::new("mistral:7b", vec![ChatMessage::user("How are you?")]))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(reply.message.content, "Fine, thanks.");
    assert_eq!(reply.total_duration, 9);
}

#[tokio::test]
async fn test_health_and_models() {
    let mut fixture = MockServerFixture::new().await;
    let _tags = fixture.mock_tags(200).await;
    let gateway = fixture.gateway(fixture.config());

    let report = gateway.health().await;
    assert!(report.is_healthy());
    assert_eq!(report.services.backend, ServiceStatus::Healthy);
    assert_eq!(report.services.cache, ServiceStatus::Disabled);

    let models = gateway.list_models().await.unwrap();
    assert_eq!(models["models"][0]["name"], "mistral:7b");
}

#[tokio::test]
async fn test_health_reports_backend_outage() {
    let mut fixture = MockServerFixture::new().await;
    let _tags = fixture.mock_tags(500).await;
    let gateway = fixture.gateway(fixture.config());

    let report = gateway.health().await;
    assert_eq!(report.status, ServiceStatus::Unhealthy);
    assert_eq!(report.services.backend, ServiceStatus::Unhealthy);
    assert!(gateway.list_models().await.is_err());
}
