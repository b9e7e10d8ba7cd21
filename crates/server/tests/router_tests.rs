//! Router integration tests
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use pagedown_core::{Converter, ConverterConfig};
use pagedown_server::{ErrorBody, HealthResponse, router};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tower::ServiceExt;

/// Serves `response` verbatim to the first connection.
async fn serve_once(response: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    format!("http://{addr}/article")
}

fn html_response(status: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

async fn post_convert(app: axum::Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/convert")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn error_of(value: Value) -> String {
    serde_json::from_value::<ErrorBody>(value).unwrap().error
}

#[tokio::test]
async fn test_health() {
    for uri in ["/api/health", "/api/convert"] {
        let response = router(Converter::new())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(health.status, "healthy");
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
        assert!(time::OffsetDateTime::parse(&health.timestamp, &time::format_description::well_known::Rfc3339).is_ok());
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (status, body) = post_convert(router(Converter::new()), "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(body), "Invalid request data");
}

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let (status, _) = post_convert(router(Converter::new()), json!({ "options": {} }).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_option_value_is_bad_request() {
    let payload = json!({ "url": "https://example.com", "options": { "headingStyle": "fancy" } });
    let (status, _) = post_convert(router(Converter::new()), payload.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disallowed_scheme_is_bad_request() {
    let (status, body) = post_convert(router(Converter::new()), json!({ "url": "ftp://example.com" }).to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_of(body), "Please enter a valid URL");
}

#[tokio::test]
async fn test_convert_success() {
    let page = "<html><head><title>Greeting</title></head><body><article><h1>Hi</h1><p>World</p></article></body></html>";
    let url = serve_once(html_response("200 OK", page)).await;

    let payload = json!({ "url": url, "options": { "includeMetadata": false } });
    let (status, body) = post_convert(router(Converter::new()), payload.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["markdown"], "# Hi\n\nWorld");
    assert_eq!(body["metadata"]["title"], "Greeting");
    assert_eq!(body["metadata"]["url"], url);
}

#[tokio::test]
async fn test_upstream_error_is_bad_gateway() {
    let url = serve_once(html_response("500 Internal Server Error", "oops")).await;

    let (status, body) = post_convert(router(Converter::new()), json!({ "url": url }).to_string()).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_of(body), "Failed to fetch the webpage");
}

#[tokio::test]
async fn test_unreadable_page_is_unprocessable() {
    let page = "<html><body><nav><a href=\"/\">Home</a></nav><footer>(c)</footer></body></html>";
    let url = serve_once(html_response("200 OK", page)).await;

    let (status, body) = post_convert(router(Converter::new()), json!({ "url": url }).to_string()).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error_of(body), "Could not extract readable content from the page");
}

#[tokio::test]
async fn test_oversized_page_is_payload_too_large() {
    let page = "x".repeat(4096);
    let url = serve_once(html_response("200 OK", &page)).await;
    let converter = Converter::with_config(ConverterConfig::builder().max_bytes(1024).build());

    let (status, body) = post_convert(router(converter), json!({ "url": url }).to_string()).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(error_of(body), "Content is too large to process");
}

#[tokio::test]
async fn test_slow_page_is_gateway_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let Ok((_socket, _)) = listener.accept().await else {
            return;
        };
        tokio::time::sleep(Duration::from_secs(5)).await;
    });

    let converter = Converter::with_config(ConverterConfig::builder().timeout_ms(200).build());
    let payload = json!({ "url": format!("http://{addr}/") });
    let (status, body) = post_convert(router(converter), payload.to_string()).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(error_of(body), "Request timed out");
}
