use std::sync::Arc;
use std::time::Duration;

use parley::{
    CompletionBackend, CompletionError, ContextMode, ConversationState, Dispatcher, FAILURE_NOTICE,
    LlmClient, LlmMessage, Message,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "test-key";

fn client_for(server: &MockServer) -> LlmClient {
    LlmClient::new(
        format!("{}/v1/chat/completions", server.uri()),
        "gpt-3.5-turbo",
        Some(KEY.to_string()),
        Some(Duration::from_secs(5)),
    )
    .expect("client builds")
}

fn hello_body() -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": "Hello" }, "finish_reason": "stop" }
        ]
    })
}

#[tokio::test]
async fn request_carries_model_headers_and_latest_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [{ "role": "user", "content": "hi" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hello_body()))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client_for(&server)
        .complete(&[LlmMessage::user("hi")])
        .await
        .expect("completion ok");
    assert_eq!(reply, "Hello");
}

#[tokio::test]
async fn unauthorized_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Incorrect API key provided" }
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete(&[LlmMessage::user("hi")])
        .await
        .unwrap_err();
    match err {
        CompletionError::Status(status) => assert_eq!(status.as_u16(), 401),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unexpected_shape_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "Hello" })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .complete(&[LlmMessage::user("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, CompletionError::MalformedBody(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_error() {
    let server = MockServer::start().await;
    let url = format!("{}/v1/chat/completions", server.uri());
    drop(server);

    let client = LlmClient::new(url, "m", Some(KEY.to_string()), Some(Duration::from_secs(2))).unwrap();
    let err = client.complete(&[LlmMessage::user("hi")]).await.unwrap_err();
    assert!(matches!(err, CompletionError::Transport(_)));
}

#[tokio::test]
async fn dispatcher_appends_reply_from_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hello_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut dispatcher = Dispatcher::new(Arc::new(client_for(&server)), ContextMode::LatestOnly);
    let mut state = ConversationState::new();
    state.set_draft_input("Say hello");

    assert!(dispatcher.send(&mut state).await);
    assert_eq!(
        state.messages(),
        &[Message::user("Say hello"), Message::bot("Hello")]
    );
    assert!(state.can_send());
}

#[tokio::test]
async fn server_errors_become_the_failure_notice() {
    for status in [401u16, 500] {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&server)
            .await;

        let mut dispatcher = Dispatcher::new(Arc::new(client_for(&server)), ContextMode::LatestOnly);
        let mut state = ConversationState::new();
        state.set_draft_input("anything");

        assert!(dispatcher.send(&mut state).await);
        assert_eq!(state.len(), 2);
        let bot = &state.messages()[1];
        assert_eq!(bot.text(), FAILURE_NOTICE);
        assert!(!bot.text().contains("upstream exploded"));
        assert!(!state.is_awaiting());
    }
}

#[tokio::test]
async fn blank_input_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hello_body()))
        .expect(0)
        .mount(&server)
        .await;

    let mut dispatcher = Dispatcher::new(Arc::new(client_for(&server)), ContextMode::LatestOnly);
    let mut state = ConversationState::new();
    state.set_draft_input("   ");

    assert!(!dispatcher.send(&mut state).await);
    assert!(state.is_empty());
    assert_eq!(state.draft(), "   ");
}

#[tokio::test]
async fn history_mode_sends_prior_turns() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "model": "gpt-3.5-turbo",
            "messages": [
                { "role": "user", "content": "first" },
                { "role": "assistant", "content": "Hello" },
                { "role": "user", "content": "second" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(hello_body()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(hello_body()))
        .mount(&server)
        .await;

    let mut dispatcher = Dispatcher::new(Arc::new(client_for(&server)), ContextMode::FullHistory);
    let mut state = ConversationState::new();
    state.set_draft_input("first");
    dispatcher.send(&mut state).await;
    state.set_draft_input("second");
    dispatcher.send(&mut state).await;

    assert_eq!(state.len(), 4);
}
