use std::collections::HashSet;

use aimodel_llm::{
    ChatModel, ChatOptions, ClientFactory, IncompleteToolCallPolicy, LlmError, Message,
    MoonshotClient, MoonshotConfig, Prompt, ProviderConfig, StreamConfig, ToolResponse,
};
use futures::StreamExt;
use mockito::{Matcher, Server, ServerGuard};
use serde_json::json;

const COMPLETIONS_PATH: &str = "/v1/chat/completions";

fn client(server: &ServerGuard) -> MoonshotClient {
    MoonshotClient::builder()
        .api_key("test-key")
        .base_url(server.url())
        .build()
        .unwrap()
}

fn sse(frames: &[serde_json::Value]) -> String {
    let mut body: String = frames
        .iter()
        .map(|frame| format!("data: {frame}\n\n"))
        .collect();
    body.push_str("data: [DONE]\n\n");
    body
}

#[tokio::test]
async fn test_call_returns_completion() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS_PATH)
        .match_header("authorization", "Bearer test-key")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({
            "model": "moonshot-v1-8k",
            "stream": false,
            "messages": [{ "role": "user", "content": "Hello" }]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "cmpl-1",
                "object": "chat.completion",
                "created": 1_700_000_000,
                "model": "moonshot-v1-8k",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "Hi there" },
                    "finish_reason": "stop"
                }],
                "usage": { "prompt_tokens": 5, "completion_tokens": 3, "total_tokens": 8 }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = client(&server).call(Prompt::from("Hello")).await.unwrap();
    mock.assert_async().await;

    assert_eq!(response.text(), "Hi there");
    assert_eq!(response.metadata.id, "cmpl-1");
    assert_eq!(response.metadata.usage.total_tokens, 8);
    assert!(response.has_finish_reasons(&HashSet::from(["stop"])));
    assert!(!response.has_tool_calls());
    let output = &response.result().unwrap().output;
    assert_eq!(output.property("role"), Some("assistant"));
}

#[tokio::test]
async fn test_call_with_previous_accumulates_usage() {
    let mut server = Server::new_async().await;
    let body = json!({
        "id": "cmpl-2",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": "ok" },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 2, "completion_tokens": 2, "total_tokens": 4 }
    })
    .to_string();
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(200)
        .with_body(body)
        .expect(2)
        .create_async()
        .await;

    let client = client(&server);
    let first = client.call_with_previous(Prompt::from("a"), None).await.unwrap();
    let second = client
        .call_with_previous(Prompt::from("b"), Some(&first))
        .await
        .unwrap();

    assert_eq!(first.metadata.usage.total_tokens, 4);
    assert_eq!(second.metadata.usage.input_tokens, 4);
    assert_eq!(second.metadata.usage.total_tokens, 8);
}

#[tokio::test]
async fn test_api_error_status_is_reported() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(401)
        .with_body(r#"{"error":{"message":"invalid key"}}"#)
        .create_async()
        .await;

    match client(&server).call(Prompt::from("hi")).await {
        Err(LlmError::Api { status, body }) => {
            assert_eq!(status, 401);
            assert!(body.contains("invalid key"));
        }
        other => panic!("unexpected result: {other:?}"),
    }

    assert!(matches!(
        client(&server).stream(Prompt::from("hi")).await,
        Err(LlmError::Api { status: 401, .. })
    ));
}

#[tokio::test]
async fn test_tool_results_are_sent_one_message_each() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS_PATH)
        .match_body(Matcher::PartialJson(json!({
            "messages": [
                { "role": "user", "content": "weather?" },
                {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "c1",
                        "type": "function",
                        "function": { "name": "weather", "arguments": "{}" }
                    }]
                },
                { "role": "tool", "tool_call_id": "c1", "name": "weather", "content": "sunny" },
                { "role": "tool", "tool_call_id": "c2", "name": "time", "content": "noon" }
            ]
        })))
        .with_status(200)
        .with_body(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"done"}}]}"#,
        )
        .create_async()
        .await;

    let prompt = Prompt::new(vec![
        Message::user("weather?"),
        Message::assistant_with_tools(vec![aimodel_llm::ToolCall::function("c1", "weather", "{}")]),
        Message::tool_responses(vec![
            ToolResponse::new("c1", "weather", "sunny"),
            ToolResponse::new("c2", "time", "noon"),
        ]),
    ]);

    let response = client(&server).call(prompt).await.unwrap();
    mock.assert_async().await;
    assert_eq!(response.text(), "done");
}

#[tokio::test]
async fn test_tool_result_without_id_fails_before_sending() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS_PATH)
        .expect(0)
        .create_async()
        .await;

    let prompt = Prompt::from(vec![Message::tool_result("", "weather", "sunny")]);
    let result = client(&server).call(prompt).await;

    assert!(matches!(result, Err(LlmError::InvalidRequest(_))));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_prompt_options_override_client_defaults() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", COMPLETIONS_PATH)
        .match_body(Matcher::PartialJson(json!({
            "model": "moonshot-v1-32k",
            "temperature": 0.5,
            "max_tokens": 64
        })))
        .with_status(200)
        .with_body(r#"{"id":"x","choices":[]}"#)
        .create_async()
        .await;

    let client = MoonshotClient::builder()
        .api_key("test-key")
        .base_url(server.url())
        .default_options(
            ChatOptions::new()
                .model("moonshot-v1-32k")
                .temperature(0.1)
                .max_tokens(64),
        )
        .build()
        .unwrap();

    let prompt = Prompt::from("hi").with_options(ChatOptions::new().temperature(0.5));
    let response = client.call(prompt).await.unwrap();
    mock.assert_async().await;
    assert!(response.result().is_none());
}

#[tokio::test]
async fn test_stream_emits_content_then_merged_tool_call() {
    let mut server = Server::new_async().await;
    let body = sse(&[
        json!({"id":"r1","model":"moonshot-v1-8k","choices":[{"index":0,"delta":{"role":"assistant","content":"Checking"}}]}),
        json!({"id":"r1","choices":[{"index":0,"delta":{"tool_calls":[{"id":"c1","type":"function","function":{"name":"get_weather","arguments":"{\"city\":"}}]}}]}),
        json!({"id":"r1","choices":[{"index":0,"delta":{"tool_calls":[{"function":{"arguments":"\"Paris\"}"}}]}}]}),
        json!({"id":"r1","choices":[{"index":0,"delta":{},"finish_reason":"tool_calls","usage":{"prompt_tokens":9,"completion_tokens":6,"total_tokens":15}}]}),
    ]);
    let mock = server
        .mock("POST", COMPLETIONS_PATH)
        .match_body(Matcher::PartialJson(json!({ "stream": true })))
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let stream = client(&server).stream(Prompt::from("weather in Paris?")).await.unwrap();
    let responses: Vec<_> = stream.collect().await;
    mock.assert_async().await;

    assert_eq!(responses.len(), 2);
    let first = responses[0].as_ref().unwrap();
    assert_eq!(first.text(), "Checking");
    assert_eq!(first.metadata.model, "moonshot-v1-8k");

    let second = responses[1].as_ref().unwrap();
    assert!(second.has_tool_calls());
    let generation = second.result().unwrap();
    let call = &generation.output.tool_calls[0];
    assert_eq!(call.id, "c1");
    assert_eq!(call.name(), "get_weather");
    assert_eq!(call.function.arguments, r#"{"city":"Paris"}"#);
    assert_eq!(generation.metadata.finish_reason, "tool_calls");
    // Role comes from the first fragment of the same response id.
    assert_eq!(generation.output.property("role"), Some("assistant"));
    assert_eq!(generation.output.property("id"), Some("r1"));
    assert_eq!(second.metadata.usage.total_tokens, 15);
}

#[tokio::test]
async fn test_stream_with_incomplete_tool_call_policy() {
    let body = sse(&[
        json!({"id":"r1","choices":[{"index":0,"delta":{"role":"assistant","content":"a"}}]}),
        json!({"id":"r1","choices":[{"index":0,"delta":{"tool_calls":[{"id":"c1","function":{"name":"f","arguments":"{"}}]}}]}),
    ]);

    let mut server = Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(200)
        .with_body(body)
        .expect(2)
        .create_async()
        .await;

    let lenient = client(&server);
    let responses: Vec<_> = lenient.stream(Prompt::from("x")).await.unwrap().collect().await;
    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].as_ref().unwrap().text(), "a");

    let strict = MoonshotClient::builder()
        .api_key("test-key")
        .base_url(server.url())
        .stream_config(StreamConfig {
            incomplete_tool_call: IncompleteToolCallPolicy::Error,
        })
        .build()
        .unwrap();
    let responses: Vec<_> = strict.stream(Prompt::from("x")).await.unwrap().collect().await;
    assert_eq!(responses.len(), 2);
    assert!(matches!(responses[1], Err(LlmError::IncompleteToolCall { .. })));
}

#[tokio::test]
async fn test_stream_with_previous_accumulates_usage() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", COMPLETIONS_PATH)
        .with_status(200)
        .with_body(sse(&[json!({
            "id": "r2",
            "choices": [{
                "index": 0,
                "delta": { "role": "assistant", "content": "x" },
                "finish_reason": "stop",
                "usage": { "prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2 }
            }]
        })]))
        .create_async()
        .await;

    let previous = aimodel_llm::ChatResponse::new(
        vec![],
        aimodel_llm::ChatResponseMetadata {
            usage: aimodel_llm::TokenUsage::new(10, 10),
            ..Default::default()
        },
    );

    let responses: Vec<_> = client(&server)
        .stream_with_previous(Prompt::from("x"), Some(previous))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(responses.len(), 1);
    assert_eq!(responses[0].as_ref().unwrap().metadata.usage.total_tokens, 22);
}

#[tokio::test]
async fn test_factory_model_uses_configured_endpoint() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/custom/completions")
        .match_body(Matcher::PartialJson(json!({ "model": "moonshot-v1-128k" })))
        .with_status(200)
        .with_body(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"pong"}}]}"#,
        )
        .create_async()
        .await;

    let config = ProviderConfig::from_moonshot(
        MoonshotConfig::new("test-key")
            .with_base_url(server.url())
            .with_completions_path("/custom/completions")
            .with_model("moonshot-v1-128k"),
    );
    let model = ClientFactory::create_chat_model(config).unwrap();

    assert_eq!(model.call_text("ping").await.unwrap(), "pong");
    mock.assert_async().await;
}
