use crate::config::Config;
use crate::error::{GitCorpusError, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, LINK};
use reqwest::Client;
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

/// What the core needs from an HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// Target of the `rel="next"` link, if the response is paginated.
    pub next_link: Option<String>,
}

impl HttpResponse {
    pub fn ok<S: Into<String>>(body: S) -> Self {
        Self {
            status: 200,
            body: body.into(),
            next_link: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_next_link<S: Into<String>>(mut self, next: S) -> Self {
        self.next_link = Some(next.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A GET-only client. `Err` is reserved for failures to obtain any response at all;
/// non-success statuses come back as `Ok` with the status set.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );

        if let Some(token) = config.resolve_token() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.trim()))
                .map_err(|e| GitCorpusError::Config {
                    message: format!("Invalid API token: {}", e),
                })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.api_timeout_duration())
            .user_agent(config.api.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| GitCorpusError::Config {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send().await?;

        let status = response.status().as_u16();
        let next_link = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link);
        let body = response.text().await?;

        Ok(HttpResponse {
            status,
            body,
            next_link,
        })
    }
}

/// Serves canned responses keyed by exact URL; anything else is a 404.
/// Records every requested URL.
#[derive(Default)]
pub struct StaticTransport {
    responses: HashMap<String, HttpResponse>,
    delays: HashMap<String, Duration>,
    requests: Mutex<Vec<String>>,
}

impl StaticTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response<S: Into<String>>(mut self, url: S, response: HttpResponse) -> Self {
        self.responses.insert(url.into(), response);
        self
    }

    pub fn with_json<S: Into<String>, B: Into<String>>(self, url: S, body: B) -> Self {
        self.with_response(url, HttpResponse::ok(body))
    }

    /// Holds the response for `url` back by `delay`.
    pub fn with_delay<S: Into<String>>(mut self, url: S, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }

        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }

        Ok(self.responses.get(url).cloned().unwrap_or_else(|| {
            HttpResponse::ok(r#"{"message": "Not Found"}"#).with_status(404)
        }))
    }
}

fn link_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r#"<([^>]+)>\s*;\s*rel="?([^";,]+)"?"#).ok())
        .as_ref()
}

/// Extracts the `rel="next"` target from an RFC 8288 `Link` header value.
pub fn parse_next_link(header: &str) -> Option<String> {
    link_pattern()?
        .captures_iter(header)
        .find(|caps| caps[2].split_whitespace().any(|rel| rel == "next"))
        .map(|caps| caps[1].to_string())
}
