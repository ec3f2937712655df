use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;

use crate::config::Config;

/// Failures of the HTTP collaborator, or a response the library cannot use.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Network-level error (DNS, connection, TLS, redirect loop, etc.)
    #[error("Request failed: {0}")]
    Request(String),
    /// Connect or read timeout elapsed
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    Status(u16),
    /// Successful status but nothing to parse
    #[error("Empty response body")]
    EmptyBody,
    /// Response body exceeded the configured size limit
    #[error("Response too large (limit {0} bytes)")]
    TooLarge(usize),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Status and decoded body of a GET request.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP collaborator used to download feed documents.
///
/// Implementations follow redirects and send a fixed identifying User-Agent.
/// A non-2xx status is reported through [`HttpResponse::status`], not as an
/// error; `Err` is reserved for requests that produced no response.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;
}

/// [`HttpClient`] backed by `reqwest`.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    max_body_bytes: usize,
}

impl ReqwestClient {
    /// Builds a client with the timeouts, redirect limit and User-Agent from `config`.
    pub fn new(config: &Config) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: config.max_feed_bytes,
        })
    }

    /// The underlying client, shared with the directory search.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();

        if !response.status().is_success() {
            tracing::debug!(url = %url, status = status, "Non-success response");
            return Ok(HttpResponse {
                status,
                body: String::new(),
            });
        }

        let body = match declared_charset(&response) {
            Some(charset) if !is_utf8_charset(&charset) => {
                tracing::debug!(url = %url, charset = %charset, "Decoding non-UTF-8 body");
                read_limited_text(response, self.max_body_bytes).await?
            }
            _ => {
                let bytes = read_limited_bytes(response, self.max_body_bytes).await?;
                String::from_utf8_lossy(&bytes).into_owned()
            }
        };
        Ok(HttpResponse { status, body })
    }
}

/// Lowercased `charset` parameter of the Content-Type header, if any.
fn declared_charset(response: &reqwest::Response) -> Option<String> {
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)?
        .to_str()
        .ok()?;
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_ascii_lowercase())
    })
}

fn is_utf8_charset(charset: &str) -> bool {
    matches!(charset, "utf-8" | "utf8" | "us-ascii")
}

/// Decodes the body with the charset from Content-Type.
///
/// The limit is enforced on Content-Length up front and on the decoded text
/// afterwards, since decoding needs the whole body.
async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, TransportError> {
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(TransportError::TooLarge(limit));
        }
    }

    let text = response.text().await?;
    if text.len() > limit {
        return Err(TransportError::TooLarge(limit));
    }
    Ok(text)
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, TransportError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(TransportError::TooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(TransportError::TooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_with_limit(max_feed_bytes: usize) -> ReqwestClient {
        let config = Config {
            max_feed_bytes,
            ..Config::default()
        };
        ReqwestClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_user_agent_and_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .and(header("user-agent", Config::default().user_agent.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_with_limit(1024)
            .get(&format!("{}/feed.xml", server.uri()))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.body, "<rss/>");
    }

    #[tokio::test]
    async fn test_follows_redirects() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(301).insert_header("Location", "/new".to_string()),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let response = client_with_limit(1024)
            .get(&format!("{}/old", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, "moved");
    }

    #[tokio::test]
    async fn test_error_status_is_not_an_err() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let response = client_with_limit(1024)
            .get(&format!("{}/missing", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_body_over_limit_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(64)))
            .mount(&server)
            .await;

        let result = client_with_limit(16)
            .get(&format!("{}/big", server.uri()))
            .await;
        assert!(matches!(result, Err(TransportError::TooLarge(16))));
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        // Port 9 (discard) is not served in test environments
        let result = client_with_limit(1024).get("http://127.0.0.1:9/feed").await;
        assert!(matches!(
            result,
            Err(TransportError::Request(_)) | Err(TransportError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_declared_latin1_body_is_decoded() {
        let server = MockServer::start().await;
        // "Café" in ISO-8859-1
        let body = b"<rss><channel><title>Caf\xe9</title></channel></rss>".to_vec();
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(body)
                    .insert_header("content-type", "application/rss+xml; charset=ISO-8859-1"),
            )
            .mount(&server)
            .await;

        let response = client_with_limit(1024)
            .get(&format!("{}/latin1.xml", server.uri()))
            .await
            .unwrap();
        assert_eq!(
            response.body,
            "<rss><channel><title>Caf\u{e9}</title></channel></rss>"
        );
    }

    #[tokio::test]
    async fn test_declared_latin1_body_over_limit_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![b'x'; 64])
                    .insert_header("content-type", "text/xml; charset=\"iso-8859-1\""),
            )
            .mount(&server)
            .await;

        let result = client_with_limit(16)
            .get(&format!("{}/big", server.uri()))
            .await;
        assert!(matches!(result, Err(TransportError::TooLarge(16))));
    }

    #[test]
    fn test_utf8_charset_labels() {
        assert!(is_utf8_charset("utf-8"));
        assert!(is_utf8_charset("us-ascii"));
        assert!(!is_utf8_charset("iso-8859-1"));
        assert!(!is_utf8_charset("windows-1252"));
    }
}
