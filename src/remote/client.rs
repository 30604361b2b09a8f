use crate::error::{GitCorpusError, Result};
use crate::remote::repository::RepositoryRef;
use crate::remote::transport::{HttpResponse, Transport};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

/// Repository list page size.
pub const REPOS_PER_PAGE: u32 = 100;

/// Request policy shared by every fetcher: address scheme, timeout, a bound on
/// requests in flight and status handling.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl ApiClient {
    pub fn new<S: Into<String>>(transport: Arc<dyn Transport>, base_url: S) -> Self {
        let base_url: String = base_url.into();
        Self {
            transport,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(30),
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_in_flight.max(1)));
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Address of a node in the contents API. Every path segment is
    /// percent-encoded, so names like `C#` or `docs?old` stay in the path.
    pub fn contents_url(&self, repo: &RepositoryRef, path: &str) -> String {
        let segments = path.split('/').filter(|segment| !segment.is_empty());

        match Url::parse(&self.base_url) {
            Ok(mut url) if !url.cannot_be_a_base() => {
                if let Ok(mut path_segments) = url.path_segments_mut() {
                    path_segments
                        .pop_if_empty()
                        .extend(["repos", repo.owner(), repo.name(), "contents"])
                        .extend(segments);
                }
                url.to_string()
            }
            // Unusable base; the transport reports the failure.
            _ => {
                let mut address = format!(
                    "{}/repos/{}/{}/contents",
                    self.base_url,
                    repo.owner(),
                    repo.name()
                );
                for segment in segments {
                    address.push('/');
                    address.push_str(segment);
                }
                address
            }
        }
    }

    pub fn user_repos_url(&self, owner: &str) -> String {
        format!(
            "{}/users/{}/repos?per_page={}",
            self.base_url, owner, REPOS_PER_PAGE
        )
    }

    /// Issues one GET under the timeout and the in-flight bound.
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| GitCorpusError::Cancelled)?;

        debug!(url, "GET");
        let response = match tokio::time::timeout(self.timeout, self.transport.get(url)).await {
            Ok(Ok(response)) => response,
            Ok(Err(GitCorpusError::Timeout { .. })) | Err(_) => {
                return Err(GitCorpusError::Timeout {
                    url: url.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
            Ok(Err(e)) => return Err(e),
        };
        debug!(url, status = response.status, "response");

        if !response.is_success() {
            return Err(GitCorpusError::Http {
                url: url.to_string(),
                status: response.status,
                body: response.body,
            });
        }

        Ok(response)
    }

    /// Like [`ApiClient::get`], decoding the body as JSON. Also returns the next-page link.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<(T, Option<String>)> {
        let response = self.get(url).await?;
        let value = serde_json::from_str(&response.body).map_err(|e| {
            GitCorpusError::UnexpectedPayload {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok((value, response.next_link))
    }
}
