//! The reqwest-backed upstream against a local wiremock server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tailwind_relay::config::RelayConfig;
use tailwind_relay::error::RelayError;
use tailwind_relay::relay::ConversionRelay;
use tailwind_relay::upstream::gemini::{GeminiConfig, GeminiUpstream};
use tailwind_relay::upstream::{Upstream, UpstreamPayload};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-test";
const ENDPOINT: &str = "/v1beta/models/gemini-test:generateContent";
const CARD_CSS: &str = ".card { background: white; width: 100%; }";

fn gemini(server_uri: &str, timeout: Duration) -> GeminiUpstream {
    GeminiUpstream::new(GeminiConfig {
        api_base: format!("{}/v1beta", server_uri),
        model: MODEL.to_string(),
        timeout,
    })
    .unwrap()
}

fn relay(server_uri: &str, api_key: Option<&str>) -> ConversionRelay {
    let upstream = gemini(server_uri, Duration::from_secs(5));
    ConversionRelay::new(
        RelayConfig::new(api_key.map(str::to_string)).with_system_instruction("RULES"),
        Arc::new(upstream),
    )
}

fn text_body(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 120, "candidatesTokenCount": 30, "totalTokenCount": 150}
    })
}

#[tokio::test]
async fn sends_key_in_query_and_payload_as_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "secret-key"))
        .and(body_partial_json(json!({
            "contents": [{"role": "user", "parts": [{"text": CARD_CSS}]}],
            "systemInstruction": {"parts": [{"text": "RULES"}]},
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {"required": ["output", "analysis"]}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("{}")))
        .expect(1)
        .mount(&server)
        .await;

    let upstream = gemini(&server.uri(), Duration::from_secs(5));
    let payload = UpstreamPayload::new(CARD_CSS, "RULES");
    let reply = upstream.send("secret-key", &payload).await.unwrap();

    assert_eq!(reply.status, 200);
    assert!(reply.body.contains("candidates"));
}

#[tokio::test]
async fn error_status_is_a_reply_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let upstream = gemini(&server.uri(), Duration::from_secs(5));
    let reply = upstream
        .send("k", &UpstreamPayload::new("a {}", "RULES"))
        .await
        .unwrap();

    assert_eq!(reply.status, 429);
    assert_eq!(reply.body, "slow down");
}

#[tokio::test]
async fn end_to_end_card_conversion() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(query_param("key", "k"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body(
            r#"{"output": ".card: bg-white w-full", "analysis": "Converted background and width to utility classes."}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = relay(&server.uri(), Some("k"))
        .convert(Some(CARD_CSS))
        .await
        .unwrap();

    assert_eq!(result.output, ".card: bg-white w-full");
    assert_eq!(
        result.analysis,
        "Converted background and width to utility classes."
    );
}

#[tokio::test]
async fn no_request_without_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let err = relay(&server.uri(), None)
        .convert(Some(CARD_CSS))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Configuration));
}

#[tokio::test]
async fn no_request_without_css() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_body("{}")))
        .expect(0)
        .mount(&server)
        .await;

    let err = relay(&server.uri(), Some("k"))
        .convert(Some(""))
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Validation { .. }));
}

#[tokio::test]
async fn upstream_error_message_is_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {"code": 403, "message": "API key not valid.", "status": "PERMISSION_DENIED"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = relay(&server.uri(), Some("bad"))
        .convert(Some(CARD_CSS))
        .await
        .unwrap_err();

    match err {
        RelayError::UpstreamApi { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message.as_deref(), Some("API key not valid."));
        }
        other => panic!("expected UpstreamApi, got {:?}", other),
    }
}

#[tokio::test]
async fn unreachable_host_is_transport_error() {
    // Grab a free port, then close it so nothing is listening there
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = relay(&format!("http://127.0.0.1:{}", port), Some("never-logged"))
        .convert(Some(CARD_CSS))
        .await
        .unwrap_err();

    match err {
        RelayError::UpstreamTransport(e) => {
            let message = format!("{:#}", e);
            assert!(message.contains("request to Gemini failed"));
            assert!(!message.contains("never-logged"));
        }
        other => panic!("expected UpstreamTransport, got {:?}", other),
    }
}

#[tokio::test]
async fn slow_upstream_times_out_as_transport_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(text_body("{}"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let upstream = gemini(&server.uri(), Duration::from_millis(50));
    let relay = ConversionRelay::new(RelayConfig::new(Some("k".to_string())), Arc::new(upstream));

    let err = relay.convert(Some(CARD_CSS)).await.unwrap_err();
    assert!(matches!(err, RelayError::UpstreamTransport(_)));
}
