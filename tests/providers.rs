//! Integration tests for the upstream API clients, against mock HTTP servers.
//!
//! These pin the dispatcher-facing contracts: each operation issues exactly
//! one outbound request, and payloads pass through unaltered.

use paintbot::config::{GatewayConfig, ProviderConfig};
use paintbot::images::{self, GatewayClient, ImageGenError};
use paintbot::openai::{ChatClient, ChatMessage, ChatOptions};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider_for(server: &MockServer) -> ProviderConfig {
    ProviderConfig {
        key: "test-key".to_string(),
        base_url: server.uri(),
        models: "test-model".to_string(),
    }
}

fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        account_id: "acct-1".to_string(),
        gateway_id: "gw-1".to_string(),
        cloudflare_token: "cf-token".to_string(),
    }
}

fn chat_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    })
}

// ── Chat client ─────────────────────────────────────────────

#[tokio::test]
async fn chat_sends_one_request_and_returns_content_unmodified() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "messages": [{ "role": "user", "content": "a cat" }]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_body("a fluffy tabby cat, golden hour light")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&provider_for(&server)).unwrap();
    let reply = client
        .chat(vec![ChatMessage::user("a cat")], ChatOptions::default())
        .await
        .unwrap();

    assert_eq!(reply, "a fluffy tabby cat, golden hour light");
}

#[tokio::test]
async fn chat_non_success_status_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&provider_for(&server)).unwrap();
    let err = client
        .chat(vec![ChatMessage::user("a cat")], ChatOptions::default())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("401"));
}

// ── Prompt expansion ────────────────────────────────────────

#[tokio::test]
async fn expand_prompt_issues_one_request_with_cleaned_prompt() {
    let server = MockServer::start().await;

    // The ratio token must be stripped from the outgoing user message
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "max_tokens": 300,
            "messages": [
                { "role": "system" },
                { "role": "user", "content": "abstract ocean" }
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_body("vast abstract ocean, teal gradients")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&provider_for(&server)).unwrap();
    let expanded = images::expand_prompt(&client, "abstract ocean 16:9")
        .await
        .unwrap();

    assert_eq!(expanded.text, "vast abstract ocean, teal gradients");
    assert_eq!((expanded.width, expanded.height), (1024, 576));
}

#[tokio::test]
async fn expand_prompt_rejects_empty_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body("  ")))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&provider_for(&server)).unwrap();
    let err = images::expand_prompt(&client, "a cat").await.unwrap_err();
    assert!(matches!(err, ImageGenError::EmptyPrompt));
}

// ── Gateway (SDXL) ──────────────────────────────────────────

#[tokio::test]
async fn gateway_forwards_image_bytes_unaltered() {
    let server = MockServer::start().await;
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake image payload";

    Mock::given(method("POST"))
        .and(path("/acct-1/gw-1/"))
        .and(body_partial_json(serde_json::json!([{
            "provider": "workers-ai",
            "endpoint": "@cf/stabilityai/stable-diffusion-xl-base-1.0",
            "query": {
                "prompt": "a misty forest",
                "width": 1024,
                "height": 576,
                "num_steps": 20
            }
        }])))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png.to_vec(), "image/png"))
        .expect(1)
        .mount(&server)
        .await;

    let client = GatewayClient::with_base_url(&gateway_config(), &server.uri()).unwrap();
    let image = client.generate_sdxl("a misty forest", 1024, 576).await.unwrap();

    assert_eq!(image.data, png);
    assert_eq!(image.mime_type, "image/png");
}

#[tokio::test]
async fn gateway_decodes_base64_json_fallback() {
    use base64::{engine::general_purpose::STANDARD, Engine};

    let server = MockServer::start().await;
    let body = serde_json::json!({ "result": { "image": STANDARD.encode(b"pixels") } });

    Mock::given(method("POST"))
        .and(path("/acct-1/gw-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let client = GatewayClient::with_base_url(&gateway_config(), &server.uri()).unwrap();
    let image = client.generate_sdxl("anything", 1024, 1024).await.unwrap();

    assert_eq!(image.data, b"pixels");
}

#[tokio::test]
async fn gateway_non_success_yields_error_not_partial_image() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/acct-1/gw-1/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(1)
        .mount(&server)
        .await;

    let client = GatewayClient::with_base_url(&gateway_config(), &server.uri()).unwrap();
    let err = client.generate_sdxl("a cat", 1024, 1024).await.unwrap_err();

    assert!(matches!(err, ImageGenError::GatewayStatus(status) if status.as_u16() == 502));
}

// ── FLUX ────────────────────────────────────────────────────

#[tokio::test]
async fn flux_returns_provider_url_unaltered() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(serde_json::json!({
            "messages": [{ "role": "user", "content": "cute dog, watercolor" }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(
            "Here is your image: https://cdn.example.com/img/7.png",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&provider_for(&server)).unwrap();
    let url = images::generate_flux_url(&client, "cute dog, watercolor")
        .await
        .unwrap();

    assert_eq!(url.as_str(), "https://cdn.example.com/img/7.png");
}

#[tokio::test]
async fn flux_reply_without_url_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_body("sorry, no can do")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&provider_for(&server)).unwrap();
    let err = images::generate_flux_url(&client, "a cat").await.unwrap_err();

    assert!(matches!(err, ImageGenError::MissingUrl(_)));
}
