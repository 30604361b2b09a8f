use crate::error::{GitCorpusError, Result};
use crate::remote::client::ApiClient;
use crate::remote::repository::RepositoryRef;
use crate::ui::progress::ProgressReporter;
use crate::ui::signals::GracefulShutdown;
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct RawRepo {
    #[serde(default)]
    name: Option<String>,
}

/// Lists every repository of an owner by following `rel="next"` links.
pub struct RepoListFetcher {
    client: ApiClient,
    reporter: ProgressReporter,
    shutdown: GracefulShutdown,
}

impl RepoListFetcher {
    pub fn new(client: ApiClient, reporter: ProgressReporter, shutdown: GracefulShutdown) -> Self {
        Self {
            client,
            reporter,
            shutdown,
        }
    }

    /// Pages are accumulated in order. Any failing page fails the whole listing.
    pub async fn list_repositories(&self, owner: &str) -> Result<Vec<RepositoryRef>> {
        let mut next = Some(self.client.user_repos_url(owner));
        let mut repositories = Vec::new();
        let mut page = 0usize;

        while let Some(url) = next.take() {
            self.shutdown.check_shutdown()?;
            page += 1;
            debug!(owner, page, url = %url, "fetching repository list page");

            let (entries, next_link) = self
                .client
                .get_json::<Vec<RawRepo>>(&url)
                .await
                .map_err(|e| match e {
                    GitCorpusError::UnexpectedPayload { url, message } => {
                        GitCorpusError::UnexpectedPayload {
                            url,
                            message: format!("expected a repository list: {}", message),
                        }
                    }
                    other => other,
                })?;

            for (index, entry) in entries.into_iter().enumerate() {
                match entry
                    .name
                    .as_deref()
                    .map(|name| RepositoryRef::new(owner, name))
                {
                    Some(Ok(repo)) => repositories.push(repo),
                    _ => {
                        let message = format!(
                            "Skipping repository entry {} on page {} for user {}: missing name",
                            index + 1,
                            page,
                            owner
                        );
                        warn!("{}", message);
                        self.reporter.emit(&message);
                    }
                }
            }

            next = next_link;
        }

        debug!(owner, count = repositories.len(), pages = page, "repository list complete");
        Ok(repositories)
    }
}
