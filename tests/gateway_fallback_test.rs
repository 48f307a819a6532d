/// Integration tests for the generation gateway.
///
/// These tests run the full resolution + fallback machinery against mock
/// HTTP servers, covering:
/// - Preset resolution hitting the right endpoint with the right headers
/// - Custom endpoints bypassing preset validation
/// - The fallback chain walk on retryable failures, with the disclosure
///   notice prepended to degraded answers
/// - Streaming ordering (disclosure first, then deltas, then done)
/// - Fatal errors propagating without any fallback hop
use lectern::domain::errors::GatewayError;
use lectern::domain::models::{
    GenerationOptions, Message, ProviderProfile, ProviderRegistry, Settings,
};
use lectern::services::gateway::{ChatOutput, ChatStreamEvent, GenerationGateway};
use mockito::{Matcher, Server};

fn profile(name: &str, base_url: &str, model: &str) -> ProviderProfile {
    ProviderProfile {
        name: name.to_string(),
        base_url: base_url.to_string(),
        default_model: model.to_string(),
    }
}

/// Registry wired to mock endpoints for the default chain [glm, ollama].
fn test_registry(openai_url: &str, glm_url: &str, ollama_url: &str) -> ProviderRegistry {
    ProviderRegistry::new([
        profile("openai", openai_url, "gpt-4o"),
        profile("glm", glm_url, "glm-4"),
        profile("ollama", ollama_url, "qwen3:8b"),
    ])
}

fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.default_provider = "openai".to_string();
    settings.credentials.openai_api_key = "openai-key".to_string();
    settings.credentials.glm_api_key = "glm-key".to_string();
    settings
}

fn openai_completion(content: &str) -> String {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
    .to_string()
}

fn ollama_completion(content: &str) -> String {
    serde_json::json!({
        "message": { "role": "assistant", "content": content },
        "done": true
    })
    .to_string()
}

async fn collect_stream(output: ChatOutput) -> Vec<ChatStreamEvent> {
    let ChatOutput::Stream(mut rx) = output else {
        panic!("expected a stream");
    };
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        let done = event == ChatStreamEvent::Done;
        events.push(event);
        if done {
            break;
        }
    }
    events
}

#[tokio::test]
async fn test_preset_request_carries_bearer_and_model() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer openai-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "gpt-4o",
            "stream": false,
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_completion("four"))
        .create_async()
        .await;

    let registry = test_registry(&server.url(), "http://unused", "http://unused");
    let gateway = GenerationGateway::new(registry, &test_settings()).unwrap();

    let output = gateway
        .chat_with_options(
            &[Message::user("2+2?")],
            &GenerationOptions::default(),
            false,
            true,
        )
        .await
        .unwrap();

    match output {
        ChatOutput::Complete(answer) => assert_eq!(answer, "four"),
        ChatOutput::Stream(_) => panic!("expected a unary answer"),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_custom_endpoint_bypasses_presets_and_credentials() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "custom-model",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(openai_completion("ok"))
        .create_async()
        .await;

    // The registry knows nothing about this endpoint.
    let registry = test_registry("http://unused", "http://unused", "http://unused");
    let gateway = GenerationGateway::new(registry, &test_settings()).unwrap();

    let options = GenerationOptions {
        provider: Some("my-private-deployment".to_string()),
        base_url: Some(server.url()),
        ..GenerationOptions::default()
    };
    let output = gateway
        .chat_with_options(&[Message::user("hi")], &options, false, true)
        .await
        .unwrap();

    assert!(matches!(output, ChatOutput::Complete(answer) if answer == "ok"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fallback_walks_chain_to_local_with_disclosure() {
    // Primary refuses connections; first hop answers 503; the local
    // terminal profile answers. Port 9 is discard, nothing listens there.
    let mut glm_server = Server::new_async().await;
    let glm_mock = glm_server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .with_body("overloaded")
        .create_async()
        .await;

    let mut ollama_server = Server::new_async().await;
    let ollama_mock = ollama_server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(ollama_completion("local answer"))
        .create_async()
        .await;

    let registry = test_registry("http://127.0.0.1:9", &glm_server.url(), &ollama_server.url());
    let gateway = GenerationGateway::new(registry, &test_settings()).unwrap();

    let output = gateway
        .chat_with_options(
            &[Message::user("hi")],
            &GenerationOptions::default(),
            false,
            true,
        )
        .await
        .unwrap();

    let ChatOutput::Complete(answer) = output else {
        panic!("expected a unary answer");
    };
    assert!(
        answer.starts_with("[answered by local model qwen3:8b because provider openai"),
        "missing disclosure prefix: {answer}"
    );
    assert!(answer.ends_with("local answer"));

    glm_mock.assert_async().await;
    ollama_mock.assert_async().await;
}

#[tokio::test]
async fn test_streaming_fallback_emits_disclosure_first() {
    let mut glm_server = Server::new_async().await;
    glm_server
        .mock("POST", "/chat/completions")
        .with_status(502)
        .create_async()
        .await;

    let body = [
        r#"{"message":{"role":"assistant","content":"Hello"},"done":false}"#,
        r#"{"message":{"role":"assistant","content":" there"},"done":false}"#,
        r#"{"done":true}"#,
        "",
    ]
    .join("\n");
    let mut ollama_server = Server::new_async().await;
    ollama_server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "application/x-ndjson")
        .with_body(body)
        .create_async()
        .await;

    let registry = test_registry("http://127.0.0.1:9", &glm_server.url(), &ollama_server.url());
    let gateway = GenerationGateway::new(registry, &test_settings()).unwrap();

    let output = gateway
        .chat_with_options(
            &[Message::user("hi")],
            &GenerationOptions::default(),
            true,
            true,
        )
        .await
        .unwrap();
    let events = collect_stream(output).await;

    match &events[0] {
        ChatStreamEvent::Delta(first) => {
            assert!(first.starts_with("[answered by local model"));
        }
        other => panic!("expected disclosure delta first, got {other:?}"),
    }
    assert_eq!(events[1], ChatStreamEvent::Delta("Hello".to_string()));
    assert_eq!(events[2], ChatStreamEvent::Delta(" there".to_string()));
    assert_eq!(*events.last().unwrap(), ChatStreamEvent::Done);
}

#[tokio::test]
async fn test_stream_closed_without_trailing_newline_keeps_last_delta() {
    // The connection drops after the second frame with no final newline and
    // no done marker; the buffered remainder must still come through.
    let body = [
        r#"{"message":{"role":"assistant","content":"Hello"},"done":false}"#,
        r#"{"message":{"role":"assistant","content":" world"},"done":false}"#,
    ]
    .join("\n");
    let mut ollama_server = Server::new_async().await;
    ollama_server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_header("content-type", "application/x-ndjson")
        .with_body(body)
        .create_async()
        .await;

    let registry = test_registry("http://unused", "http://unused", &ollama_server.url());
    let gateway = GenerationGateway::new(registry, &test_settings()).unwrap();

    let options = GenerationOptions {
        provider: Some("ollama".to_string()),
        ..GenerationOptions::default()
    };
    let output = gateway
        .chat_with_options(&[Message::user("hi")], &options, true, true)
        .await
        .unwrap();
    let events = collect_stream(output).await;

    assert_eq!(
        events,
        vec![
            ChatStreamEvent::Delta("Hello".to_string()),
            ChatStreamEvent::Delta(" world".to_string()),
            ChatStreamEvent::Done,
        ]
    );
}

#[tokio::test]
async fn test_authentication_failure_does_not_fall_back() {
    let mut openai_server = Server::new_async().await;
    let openai_mock = openai_server
        .mock("POST", "/chat/completions")
        .with_status(401)
        .with_body("bad key")
        .create_async()
        .await;

    let mut glm_server = Server::new_async().await;
    let glm_mock = glm_server
        .mock("POST", "/chat/completions")
        .expect(0)
        .create_async()
        .await;

    let registry = test_registry(&openai_server.url(), &glm_server.url(), "http://unused");
    let gateway = GenerationGateway::new(registry, &test_settings()).unwrap();

    let err = gateway
        .chat_with_options(
            &[Message::user("hi")],
            &GenerationOptions::default(),
            false,
            true,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Authentication(_)));
    openai_mock.assert_async().await;
    glm_mock.assert_async().await;
}

#[tokio::test]
async fn test_exhausted_chain_reports_service_degraded() {
    let mut glm_server = Server::new_async().await;
    glm_server
        .mock("POST", "/chat/completions")
        .with_status(503)
        .create_async()
        .await;

    let mut ollama_server = Server::new_async().await;
    let ollama_mock = ollama_server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body("model crashed")
        .create_async()
        .await;

    let registry = test_registry("http://127.0.0.1:9", &glm_server.url(), &ollama_server.url());
    let gateway = GenerationGateway::new(registry, &test_settings()).unwrap();

    let err = gateway
        .chat_with_options(
            &[Message::user("hi")],
            &GenerationOptions::default(),
            false,
            true,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::ServiceDegraded));
    ollama_mock.assert_async().await;
}

#[tokio::test]
async fn test_direct_terminal_failure_is_not_wrapped() {
    // Resolving straight to the local profile skips the fallback machine;
    // its raw error comes back, not ServiceDegraded.
    let mut ollama_server = Server::new_async().await;
    ollama_server
        .mock("POST", "/api/chat")
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let registry = test_registry("http://unused", "http://unused", &ollama_server.url());
    let gateway = GenerationGateway::new(registry, &test_settings()).unwrap();

    let options = GenerationOptions {
        provider: Some("ollama".to_string()),
        ..GenerationOptions::default()
    };
    let err = gateway
        .chat_with_options(&[Message::user("hi")], &options, false, true)
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Upstream { status: 500, .. }));
}
