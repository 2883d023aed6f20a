use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{debug, error};

use super::base::{TTSError, TTSResult};
use crate::utils::req_manager::ReqManager;

/// Longest error body excerpt kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Trait for creating HTTP requests for TTS providers
pub trait TTSRequestBuilder: Send + Sync {
    /// Build the HTTP request with provider-specific URL, headers and body
    ///
    /// # Arguments
    /// * `client` - The HTTP client to use for building the request
    /// * `text` - The text to synthesize
    ///
    /// # Returns
    /// A request builder ready to be sent
    fn build_http_request(&self, client: &reqwest::Client, text: &str) -> reqwest::RequestBuilder;
}

/// Body of a successful backend response.
#[derive(Debug, Clone)]
pub struct HttpAudioResponse {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Send one request through the shared manager.
///
/// Transport failures map to `TimeoutError` or `NetworkError`; a non-2xx
/// status maps to [`TTSError::Http`] with whatever code and message the
/// error body carries.
pub async fn send_request<R: TTSRequestBuilder + ?Sized>(
    req_manager: &ReqManager,
    request_builder: &R,
    text: &str,
) -> TTSResult<HttpAudioResponse> {
    let guard = req_manager.acquire().await?;
    let request = request_builder.build_http_request(guard.client(), text);

    let response = guard.send(request).await.map_err(map_transport_error)?;
    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = response.bytes().await.map_err(map_transport_error)?;
    drop(guard);

    if !status.is_success() {
        let body_text = String::from_utf8_lossy(&body);
        error!("TTS API error ({}): {}", status, truncate(&body_text));
        return Err(http_error(status.as_u16(), &body_text));
    }

    debug!(
        "TTS API returned {} bytes ({})",
        body.len(),
        content_type.as_deref().unwrap_or("no content-type")
    );

    Ok(HttpAudioResponse {
        content_type,
        body: body.to_vec(),
    })
}

/// Map a reqwest failure, keeping the full cause chain in the message so
/// that socket-level causes such as a connection reset stay visible.
pub(crate) fn map_transport_error(e: reqwest::Error) -> TTSError {
    let message = error_chain(&e);
    if e.is_timeout() {
        TTSError::TimeoutError(format!("Request timed out: {message}"))
    } else {
        TTSError::NetworkError(format!("Request failed: {message}"))
    }
}

fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let cause_text = cause.to_string();
        if !message.contains(&cause_text) {
            message.push_str(": ");
            message.push_str(&cause_text);
        }
        source = cause.source();
    }
    message
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
    base_resp: Option<BaseRespDetail>,
    message: Option<String>,
    code: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    code: Option<serde_json::Value>,
    message: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BaseRespDetail {
    status_code: Option<i64>,
    status_msg: Option<String>,
}

fn value_to_code(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build an [`TTSError::Http`] from a status and a raw error body.
///
/// Understands `{"error": {"status", "message"}}`, `{"base_resp": {...}}` and
/// flat `{"code", "message"}` shapes. Anything else becomes the message as-is.
pub fn http_error(status: u16, body: &str) -> TTSError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();

    let (code, message) = if let Some(detail) = envelope.error {
        (
            detail
                .status
                .filter(|s| !s.is_empty())
                .or_else(|| detail.code.as_ref().and_then(value_to_code)),
            detail.message,
        )
    } else if let Some(base) = envelope.base_resp {
        (base.status_code.map(|c| c.to_string()), base.status_msg)
    } else {
        (
            envelope.code.as_ref().and_then(value_to_code),
            envelope.message,
        )
    };

    let message = message
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {status}")
            } else {
                truncate(trimmed)
            }
        });

    TTSError::Http {
        status,
        code,
        message,
    }
}

pub(crate) fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct PostJson {
        url: String,
    }

    impl TTSRequestBuilder for PostJson {
        fn build_http_request(
            &self,
            client: &reqwest::Client,
            text: &str,
        ) -> reqwest::RequestBuilder {
            client
                .post(&self.url)
                .header("X-Test", "1")
                .json(&serde_json::json!({ "input": text }))
        }
    }

    #[test]
    fn test_http_error_google_shape() {
        let body = r#"{"error":{"code":503,"message":"The model is overloaded.","status":"UNAVAILABLE"}}"#;
        match http_error(503, body) {
            TTSError::Http {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 503);
                assert_eq!(code.as_deref(), Some("UNAVAILABLE"));
                assert_eq!(message, "The model is overloaded.");
            }
            other => panic!("Expected Http, got: {:?}", other),
        }
    }

    #[test]
    fn test_http_error_base_resp_shape() {
        let body = r#"{"base_resp":{"status_code":1002,"status_msg":"rate limit exceeded"}}"#;
        let err = http_error(429, body);
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(err.error_code(), Some("1002"));
        assert!(err.to_string().contains("rate limit exceeded"));
    }

    #[test]
    fn test_http_error_flat_and_plain_bodies() {
        let err = http_error(400, r#"{"code":20015,"message":"bad voice"}"#);
        assert_eq!(err.error_code(), Some("20015"));
        assert!(err.to_string().contains("bad voice"));

        let err = http_error(502, "<html>Bad Gateway</html>");
        assert!(err.to_string().contains("Bad Gateway"));
        assert_eq!(err.error_code(), None);

        let err = http_error(500, "");
        assert!(err.to_string().contains("HTTP 500"));
    }

    #[test]
    fn test_truncate_long_bodies() {
        let long = "x".repeat(MAX_ERROR_BODY_CHARS + 10);
        let cut = truncate(&long);
        assert_eq!(cut.len(), MAX_ERROR_BODY_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[tokio::test]
    async fn test_send_request_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/speech"))
            .and(header("X-Test", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .expect(1)
            .mount(&server)
            .await;

        let manager = ReqManager::new(2).unwrap();
        let builder = PostJson {
            url: format!("{}/speech", server.uri()),
        };
        let response = send_request(&manager, &builder, "hello").await.unwrap();
        assert_eq!(response.body, vec![1, 2, 3]);
        assert_eq!(response.content_type.as_deref(), Some("audio/mpeg"));
        assert_eq!(manager.active_requests(), 0);
    }

    #[tokio::test]
    async fn test_send_request_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"error":{"code":401,"message":"API key not valid","status":"UNAUTHENTICATED"}}"#,
            ))
            .mount(&server)
            .await;

        let manager = ReqManager::new(1).unwrap();
        let builder = PostJson {
            url: format!("{}/speech", server.uri()),
        };
        let err = send_request(&manager, &builder, "hello").await.unwrap_err();
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(err.error_code(), Some("UNAUTHENTICATED"));
    }

    #[tokio::test]
    async fn test_send_request_connection_refused_is_network_error() {
        let manager = ReqManager::new(1).unwrap();
        let builder = PostJson {
            url: "http://127.0.0.1:9/speech".to_string(),
        };
        let err = send_request(&manager, &builder, "hello").await.unwrap_err();
        assert!(matches!(err, TTSError::NetworkError(_)), "got {:?}", err);
    }

    #[tokio::test]
    #[allow(deprecated)]
    async fn test_send_request_connection_reset_is_retryable() {
        use tokio::io::AsyncReadExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await;
            // Zero linger turns the close into a RST.
            stream.set_linger(Some(std::time::Duration::ZERO)).unwrap();
            drop(stream);
        });

        let manager = ReqManager::new(1).unwrap();
        let builder = PostJson {
            url: format!("http://{addr}/speech"),
        };
        let err = send_request(&manager, &builder, "hello").await.unwrap_err();
        server.await.unwrap();

        assert!(matches!(err, TTSError::NetworkError(_)), "got {:?}", err);
        assert!(
            err.to_string().to_lowercase().contains("connection reset"),
            "cause chain missing from {err}"
        );
        let classified = crate::core::retry::classify_error(&err);
        assert!(classified.retryable, "got {:?}", classified);
    }
}
