use async_trait::async_trait;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, Message as BedrockMessage, StopReason,
};
use axum::body::Body;
use http_body_util::BodyExt;
use processor::{
    BedrockChatCompletion, BedrockChatProcessor, ConverseClient, ConverseReply, ProcessorConfig,
};
use server::{AppState, get_app};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

struct StubClient {
    content: Vec<ContentBlock>,
    prompts: Mutex<Vec<String>>,
}

#[async_trait]
impl ConverseClient for StubClient {
    async fn converse(&self, completion: BedrockChatCompletion) -> anyhow::Result<ConverseReply> {
        for message in &completion.messages {
            for block in message.content() {
                if let ContentBlock::Text(text) = block {
                    self.prompts.lock().unwrap().push(text.clone());
                }
            }
        }

        let message = BedrockMessage::builder()
            .role(ConversationRole::Assistant)
            .set_content(Some(self.content.clone()))
            .build()?;

        Ok(ConverseReply {
            output: Some(ConverseOutput::Message(message)),
            stop_reason: StopReason::EndTurn,
            usage: None,
        })
    }
}

struct FailingClient;

#[async_trait]
impl ConverseClient for FailingClient {
    async fn converse(&self, _completion: BedrockChatCompletion) -> anyhow::Result<ConverseReply> {
        Err(anyhow::anyhow!("Bedrock API error: throttled"))
    }
}

fn build_app(
    config: ProcessorConfig,
    content: Vec<ContentBlock>,
) -> (axum::Router, Arc<StubClient>) {
    let client = Arc::new(StubClient {
        content,
        prompts: Mutex::new(Vec::new()),
    });
    let processor = BedrockChatProcessor::new(config, client.clone()).unwrap();
    let state = Arc::new(AppState {
        processor: Arc::new(processor),
    });
    (get_app(state), client)
}

fn config() -> ProcessorConfig {
    ProcessorConfig {
        model: "amazon.titan-text-express-v1".to_string(),
        ..Default::default()
    }
}

fn post() -> axum::http::request::Builder {
    axum::http::Request::builder().method("POST").uri("/process")
}

async fn send(app: axum::Router, request: axum::http::Request<Body>) -> (u16, String) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status().as_u16();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body_bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn process_returns_generated_text() {
    let (app, client) = build_app(config(), vec![ContentBlock::Text("hello".to_string())]);

    let request = post()
        .header("content-type", "text/plain")
        .body(Body::from("Say hello"))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, 200);
    assert_eq!(body, "hello");
    assert_eq!(*client.prompts.lock().unwrap(), vec!["Say hello".to_string()]);
}

#[tokio::test]
async fn headers_are_available_to_prompt_templates() {
    let (app, client) = build_app(
        ProcessorConfig {
            prompt: Some("Translate to ${! @x-language }: ${! content() }".to_string()),
            ..config()
        },
        vec![ContentBlock::Text("Bonjour".to_string())],
    );

    let request = post()
        .header("x-language", "French")
        .body(Body::from("Good morning"))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, 200);
    assert_eq!(body, "Bonjour");
    assert_eq!(
        *client.prompts.lock().unwrap(),
        vec!["Translate to French: Good morning".to_string()]
    );
}

#[tokio::test]
async fn invalid_utf8_payload_is_a_bad_request() {
    let (app, client) = build_app(config(), vec![ContentBlock::Text("unused".to_string())]);

    let request = post()
        .body(Body::from(vec![0x61, 0xff, 0x62]))
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, 400);
    assert_eq!(body, "Error: message payload contained invalid UTF8");
    assert!(client.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unexpected_response_shape_is_a_bad_gateway() {
    let (app, _client) = build_app(
        config(),
        vec![
            ContentBlock::Text("one".to_string()),
            ContentBlock::Text("two".to_string()),
        ],
    );

    let request = post().body(Body::from("hi")).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, 502);
    assert_eq!(body, "Error: unexpected number of response content: 2");
}

#[tokio::test]
async fn client_failure_is_a_bad_gateway() {
    let processor = BedrockChatProcessor::new(config(), Arc::new(FailingClient)).unwrap();
    let app = get_app(Arc::new(AppState {
        processor: Arc::new(processor),
    }));

    let request = post().body(Body::from("hi")).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, 502);
    assert_eq!(body, "Error: Bedrock API error: throttled");
}

#[tokio::test]
async fn template_failure_is_a_bad_request() {
    let (app, client) = build_app(
        ProcessorConfig {
            prompt: Some(r#"${! json("a") }"#.to_string()),
            ..config()
        },
        vec![ContentBlock::Text("unused".to_string())],
    );

    let request = post().body(Body::from("plain text")).unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, 400);
    assert!(body.starts_with("Error: unable to interpolate `prompt`"), "{body}");
    assert!(client.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _client) = build_app(config(), vec![]);

    let request = axum::http::Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(app, request).await;

    assert_eq!(status, 200);
    assert_eq!(body, "ok");
}
