use crate::config::Config;
use crate::corpus::assembler::{AssembleOptions, CorpusAssembler, RunHeader};
use crate::corpus::walker::{RepoCorpus, RepoWalker};
use crate::error::{GitCorpusError, Result, UserFriendlyError};
use crate::remote::client::ApiClient;
use crate::remote::repo_list::RepoListFetcher;
use crate::remote::repository::{parse_owner, parse_repo_url, RepositoryRef};
use crate::remote::transport::Transport;
use crate::remote::tree_fetcher::TreeFetcher;
use crate::ui::progress::{ProgressReporter, ProgressSink};
use crate::ui::signals::GracefulShutdown;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Single,
    AllForOwner,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionOutcome {
    Completed,
    /// The run worked but produced no textual content.
    NothingToSave,
    InvalidInput,
    ListingFailed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub text: String,
    pub success: bool,
    pub message: String,
    pub outcome: ExtractionOutcome,
    /// Per-node problems absorbed during traversal.
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    fn failure(outcome: ExtractionOutcome, message: String) -> Self {
        Self {
            text: String::new(),
            success: false,
            message,
            outcome,
            warnings: Vec::new(),
        }
    }
}

/// The entry point: resolves the input, drives listing and traversal, and
/// assembles the final text.
///
/// Input problems are reported before any request is made. Listing failures
/// end the run. Everything below the listing is absorbed into warnings.
pub struct ExtractionOrchestrator {
    config: Config,
    transport: Arc<dyn Transport>,
    reporter: ProgressReporter,
    shutdown: GracefulShutdown,
}

impl ExtractionOrchestrator {
    pub fn new(
        config: &Config,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config: config.clone(),
            transport,
            reporter: ProgressReporter::new(sink),
            shutdown: GracefulShutdown::detached(),
        }
    }

    pub fn with_shutdown(mut self, shutdown: GracefulShutdown) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub async fn run(
        &self,
        mode: ExtractionMode,
        input: &str,
        options: AssembleOptions,
    ) -> ExtractionResult {
        info!(?mode, input, ?options, "extraction requested");

        let started_at = Utc::now();
        let result = match mode {
            ExtractionMode::Single => self.run_single(input, options, started_at).await,
            ExtractionMode::AllForOwner => self.run_owner(input, options, started_at).await,
        };

        info!(
            outcome = ?result.outcome,
            success = result.success,
            bytes = result.text.len(),
            warnings = result.warnings.len(),
            "extraction finished"
        );
        self.reporter.emit(&result.message);
        result
    }

    /// Drives [`ExtractionOrchestrator::run`] to completion on a private runtime.
    /// Must not be called from inside an async context.
    pub fn run_blocking(
        &self,
        mode: ExtractionMode,
        input: &str,
        options: AssembleOptions,
    ) -> Result<ExtractionResult> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.run(mode, input, options)))
    }

    async fn run_single(
        &self,
        input: &str,
        options: AssembleOptions,
        started_at: DateTime<Utc>,
    ) -> ExtractionResult {
        let repo = match parse_repo_url(input) {
            Ok(repo) => repo,
            Err(e) => return invalid(e),
        };

        self.reporter
            .emit(&format!("Starting extraction for single repo: {}", repo));

        let walker = self.walker(self.client());
        let outcome = walker.walk(&repo, "").await;
        let cancelled = outcome.cancelled;

        let header = RunHeader::Single {
            source: input.trim().to_string(),
        };
        let corpora = vec![(repo, outcome.items)];
        let assembler = CorpusAssembler::new(options).with_generated_at(started_at);
        finish(&assembler, header, corpora, outcome.warnings, cancelled)
    }

    async fn run_owner(
        &self,
        input: &str,
        options: AssembleOptions,
        started_at: DateTime<Utc>,
    ) -> ExtractionResult {
        let owner = match parse_owner(input) {
            Ok(owner) => owner,
            Err(e) => return invalid(e),
        };

        self.reporter
            .emit(&format!("Starting extraction for user: {}", owner));
        self.reporter
            .emit(&format!("Fetching repository list for user: {}", owner));

        let client = self.client();
        let lister =
            RepoListFetcher::new(client.clone(), self.reporter.clone(), self.shutdown.clone());
        let repositories = match lister.list_repositories(&owner).await {
            Ok(repositories) => repositories,
            Err(GitCorpusError::Cancelled) => {
                return ExtractionResult::failure(
                    ExtractionOutcome::Cancelled,
                    "Extraction cancelled before any content was collected.".to_string(),
                )
            }
            Err(e) => {
                error!(owner = %owner, error = %e, "repository listing failed");
                return ExtractionResult::failure(
                    ExtractionOutcome::ListingFailed,
                    format!("Error fetching repositories for user {}: {}", owner, e.user_message()),
                );
            }
        };

        let total = repositories.len();
        info!(owner = %owner, total, "repositories listed");

        let walker = self.walker(client);
        let mut corpora: Vec<(RepositoryRef, RepoCorpus)> = Vec::with_capacity(total);
        let mut warnings = Vec::new();
        let mut cancelled = false;

        for (index, repo) in repositories.into_iter().enumerate() {
            if self.shutdown.is_cancelled() {
                cancelled = true;
                break;
            }

            self.reporter.emit(&format!(
                "Processing repository {}/{}: {}",
                index + 1,
                total,
                repo
            ));

            let outcome = walker.walk(&repo, "").await;
            warnings.extend(outcome.warnings);

            if outcome.cancelled {
                cancelled = true;
                corpora.push((repo, outcome.items));
                break;
            }

            if outcome.items.is_empty() {
                self.reporter.emit(&format!(
                    "Skipping empty or non-textual repository: {}",
                    repo.name()
                ));
            }
            corpora.push((repo, outcome.items));
        }

        let header = RunHeader::Owner {
            owner,
            repository_count: total,
        };
        let assembler = CorpusAssembler::new(options).with_generated_at(started_at);
        finish(&assembler, header, corpora, warnings, cancelled)
    }

    fn client(&self) -> ApiClient {
        ApiClient::new(self.transport.clone(), self.config.api.base_url.as_str())
            .with_timeout(self.config.api_timeout_duration())
            .with_max_in_flight(self.config.walk.concurrency)
    }

    fn walker(&self, client: ApiClient) -> RepoWalker {
        RepoWalker::new(TreeFetcher::new(client), self.reporter.clone(), self.shutdown.clone())
            .with_concurrency(self.config.walk.concurrency)
    }
}

/// Assembles whatever was collected and decides the outcome.
fn finish(
    assembler: &CorpusAssembler,
    header: RunHeader,
    corpora: Vec<(RepositoryRef, RepoCorpus)>,
    warnings: Vec<String>,
    cancelled: bool,
) -> ExtractionResult {
    let files: usize = corpora.iter().map(|(_, items)| items.len()).sum();
    let repositories = corpora.iter().filter(|(_, items)| !items.is_empty()).count();

    // Banners alone are not content.
    let text = if files > 0 {
        assembler.assemble(&header, &corpora)
    } else {
        String::new()
    };
    let has_text = !text.trim().is_empty();

    let (outcome, success, message) = if cancelled {
        let message = if has_text {
            format!(
                "Extraction cancelled. Returning partial output from {} files.",
                files
            )
        } else {
            "Extraction cancelled before any content was collected.".to_string()
        };
        (ExtractionOutcome::Cancelled, has_text, message)
    } else if !has_text {
        (
            ExtractionOutcome::NothingToSave,
            false,
            "No textual content found to save.".to_string(),
        )
    } else {
        (
            ExtractionOutcome::Completed,
            true,
            format!(
                "Extraction complete: {} files from {} repositories ({} warnings).",
                files,
                repositories,
                warnings.len()
            ),
        )
    };

    ExtractionResult {
        text: if has_text { text } else { String::new() },
        success,
        message,
        outcome,
        warnings,
    }
}

fn invalid(error: GitCorpusError) -> ExtractionResult {
    warn!(error = %error, "rejected input");
    ExtractionResult::failure(ExtractionOutcome::InvalidInput, error.user_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::transport::{HttpResponse, MockTransport, StaticTransport};
    use crate::ui::progress::MemorySink;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;

    const BASE: &str = "https://api.test";

    fn config() -> Config {
        let mut config = Config::default();
        config.api.base_url = BASE.to_string();
        config.walk.concurrency = 4;
        config
    }

    fn file_json(path: &str, text: &str) -> String {
        format!(
            r#"{{"type": "file", "path": "{}", "encoding": "base64", "content": "{}"}}"#,
            path,
            STANDARD.encode(text)
        )
    }

    fn single_file_repo(
        transport: StaticTransport,
        owner: &str,
        name: &str,
        path: &str,
        text: &str,
    ) -> StaticTransport {
        let root = format!("{}/repos/{}/{}/contents", BASE, owner, name);
        let file = format!("{}/{}", root, path);
        transport
            .with_json(
                root,
                format!(r#"[{{"type": "file", "path": "{}", "url": "{}"}}]"#, path, file),
            )
            .with_json(file, file_json(path, text))
    }

    fn orchestrator(transport: Arc<StaticTransport>) -> (ExtractionOrchestrator, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let orchestrator = ExtractionOrchestrator::new(&config(), transport, sink.clone());
        (orchestrator, sink)
    }

    #[tokio::test]
    async fn test_single_repository_end_to_end() {
        let transport = Arc::new(single_file_repo(
            StaticTransport::new(),
            "alice",
            "proj",
            "README.md",
            "hi",
        ));
        let (orchestrator, sink) = orchestrator(transport);

        let result = orchestrator
            .run(
                ExtractionMode::Single,
                "https://example.com/alice/proj",
                AssembleOptions::default(),
            )
            .await;

        assert!(result.success);
        assert_eq!(result.outcome, ExtractionOutcome::Completed);
        assert!(result.text.contains("REPOSITORY: alice/proj"));
        assert!(result.text.contains("FILE: README.md"));
        assert!(result.text.contains("hi"));
        assert!(result.text.contains("Source: https://example.com/alice/proj"));

        let messages = sink.messages();
        assert_eq!(messages[0], "Starting extraction for single repo: alice/proj");
        assert_eq!(messages.last(), Some(&result.message));
    }

    #[tokio::test]
    async fn test_empty_owner_makes_no_requests() {
        let mut transport = MockTransport::new();
        transport.expect_get().times(0);
        let sink = Arc::new(MemorySink::new());
        let orchestrator =
            ExtractionOrchestrator::new(&config(), Arc::new(transport), sink.clone());

        let result = orchestrator
            .run(ExtractionMode::AllForOwner, "   ", AssembleOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(result.outcome, ExtractionOutcome::InvalidInput);
        assert!(result.message.contains("Invalid input"));
        assert!(result.text.is_empty());
        assert_eq!(sink.messages(), vec![result.message.clone()]);
    }

    #[tokio::test]
    async fn test_malformed_repository_url_is_invalid_input() {
        let transport = Arc::new(StaticTransport::new());
        let (orchestrator, _) = orchestrator(transport.clone());

        for input in ["https://github.com/alice", "https://github.com/a/b/c", ""] {
            let result = orchestrator
                .run(ExtractionMode::Single, input, AssembleOptions::default())
                .await;
            assert_eq!(result.outcome, ExtractionOutcome::InvalidInput, "{}", input);
            assert!(!result.success);
        }
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_owner_mode_skips_empty_repository() {
        let transport = StaticTransport::new()
            .with_json(
                format!("{}/users/bob/repos?per_page=100", BASE),
                r#"[{"name": "one"}, {"name": "empty"}, {"name": "two"}]"#,
            )
            .with_json(format!("{}/repos/bob/empty/contents", BASE), "[]");
        let transport = single_file_repo(transport, "bob", "one", "a.txt", "first");
        let transport = single_file_repo(transport, "bob", "two", "b.txt", "second");
        let (orchestrator, sink) = orchestrator(Arc::new(transport));

        let result = orchestrator
            .run(ExtractionMode::AllForOwner, " bob ", AssembleOptions::default())
            .await;

        assert!(result.success);
        assert!(result.text.contains("ALL REPOS FOR USER: bob"));
        assert!(result.text.contains("Number of repositories: 3"));
        assert!(!result.text.contains("bob/empty"));
        let one = result.text.find("REPOSITORY: bob/one").unwrap();
        let two = result.text.find("REPOSITORY: bob/two").unwrap();
        assert!(one < two);

        let messages = sink.messages();
        assert!(messages.contains(&"Processing repository 2/3: bob/empty".to_string()));
        assert!(messages.contains(&"Skipping empty or non-textual repository: empty".to_string()));
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_run() {
        let transport = StaticTransport::new().with_response(
            format!("{}/users/bob/repos?per_page=100", BASE),
            HttpResponse::ok("API rate limit exceeded").with_status(403),
        );
        let transport = Arc::new(transport);
        let (orchestrator, _) = orchestrator(transport.clone());

        let result = orchestrator
            .run(ExtractionMode::AllForOwner, "bob", AssembleOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(result.outcome, ExtractionOutcome::ListingFailed);
        assert!(result.message.contains("403"));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_repository_with_only_binary_files_is_nothing_to_save() {
        let root = format!("{}/repos/alice/proj/contents", BASE);
        let file = format!("{}/img.png", root);
        let transport = StaticTransport::new()
            .with_json(
                root,
                format!(r#"[{{"type": "file", "path": "img.png", "url": "{}"}}]"#, file),
            )
            .with_json(
                file,
                format!(
                    r#"{{"type": "file", "path": "img.png", "content": "{}"}}"#,
                    STANDARD.encode(b"PNG\0\x01")
                ),
            );
        let (orchestrator, _) = orchestrator(Arc::new(transport));

        let result = orchestrator
            .run(ExtractionMode::Single, "alice/proj", AssembleOptions::default())
            .await;

        assert!(!result.success);
        assert_eq!(result.outcome, ExtractionOutcome::NothingToSave);
        assert!(result.text.is_empty());
        assert_eq!(result.warnings, vec!["Skipping binary file img.png".to_string()]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_returns_no_text() {
        let transport = Arc::new(single_file_repo(
            StaticTransport::new(),
            "alice",
            "proj",
            "README.md",
            "hi",
        ));
        let (orchestrator, _) = orchestrator(transport.clone());
        let shutdown = GracefulShutdown::new_for_test();
        shutdown.request_shutdown();
        let orchestrator = orchestrator.with_shutdown(shutdown);

        let result = orchestrator
            .run(ExtractionMode::Single, "alice/proj", AssembleOptions::default())
            .await;

        assert_eq!(result.outcome, ExtractionOutcome::Cancelled);
        assert!(!result.success);
        assert_eq!(transport.request_count(), 0);
    }

    /// Requests shutdown when a status line starts with `prefix`.
    struct CancelOnEmit {
        shutdown: GracefulShutdown,
        prefix: &'static str,
    }

    impl ProgressSink for CancelOnEmit {
        fn emit(&self, message: &str) {
            if message.starts_with(self.prefix) {
                self.shutdown.request_shutdown();
            }
        }
    }

    #[tokio::test]
    async fn test_cancel_between_repositories_keeps_partial_output() {
        let transport = StaticTransport::new().with_json(
            format!("{}/users/bob/repos?per_page=100", BASE),
            r#"[{"name": "one"}, {"name": "two"}]"#,
        );
        let transport = single_file_repo(transport, "bob", "one", "a.txt", "first");
        let transport = single_file_repo(transport, "bob", "two", "b.txt", "second");

        let shutdown = GracefulShutdown::new_for_test();
        let orchestrator = ExtractionOrchestrator::new(
            &config(),
            Arc::new(transport),
            Arc::new(CancelOnEmit {
                shutdown: shutdown.clone(),
                prefix: "Processing repository 2/",
            }),
        )
        .with_shutdown(shutdown);

        let result = orchestrator
            .run(ExtractionMode::AllForOwner, "bob", AssembleOptions::default())
            .await;

        assert_eq!(result.outcome, ExtractionOutcome::Cancelled);
        assert!(result.success);
        assert!(result.text.contains("first"));
        assert!(!result.text.contains("second"));
    }

    #[tokio::test]
    async fn test_cancel_inside_single_repository_keeps_partial_output() {
        let root = format!("{}/repos/alice/proj/contents", BASE);
        let entry = |path: &str| {
            format!(
                r#"{{"type": "file", "path": "{}", "url": "{}/{}"}}"#,
                path, root, path
            )
        };
        let transport = Arc::new(
            StaticTransport::new()
                .with_json(
                    root.clone(),
                    format!(
                        "[{},{},{}]",
                        entry("a.txt"),
                        entry("logo.png"),
                        entry("z.txt")
                    ),
                )
                .with_json(format!("{}/a.txt", root), file_json("a.txt", "kept"))
                .with_json(
                    format!("{}/logo.png", root),
                    format!(
                        r#"{{"type": "file", "path": "logo.png", "content": "{}"}}"#,
                        STANDARD.encode(b"PNG\0")
                    ),
                )
                .with_json(format!("{}/z.txt", root), file_json("z.txt", "dropped")),
        );

        let mut config = config();
        config.walk.concurrency = 1;
        let shutdown = GracefulShutdown::new_for_test();
        let orchestrator = ExtractionOrchestrator::new(
            &config,
            transport.clone(),
            Arc::new(CancelOnEmit {
                shutdown: shutdown.clone(),
                prefix: "Skipping binary file",
            }),
        )
        .with_shutdown(shutdown);

        let result = orchestrator
            .run(ExtractionMode::Single, "alice/proj", AssembleOptions::default())
            .await;

        assert_eq!(result.outcome, ExtractionOutcome::Cancelled);
        assert!(result.success);
        assert!(result.message.contains("partial output from 1 files"));
        assert!(result.text.contains("--- FILE: a.txt ---\nkept\n"));
        assert!(!result.text.contains("dropped"));
        assert_eq!(result.warnings, vec!["Skipping binary file logo.png".to_string()]);
        assert!(!transport.requests().contains(&format!("{}/z.txt", root)));
    }

    #[test]
    fn test_run_blocking_compact_output() {
        let transport = Arc::new(single_file_repo(
            StaticTransport::new(),
            "alice",
            "proj",
            "notes.txt",
            "a b\nc",
        ));
        let (orchestrator, _) = orchestrator(transport);
        let options = AssembleOptions {
            framed: false,
            compact: true,
        };

        let result = orchestrator
            .run_blocking(ExtractionMode::Single, "https://github.com/alice/proj.git", options)
            .unwrap();

        assert!(result.success);
        assert_eq!(result.text, "abc");
    }
}
