use crate::corpus::classifier::decode_text;
use crate::error::{GitCorpusError, Result};
use crate::remote::repository::RepositoryRef;
use crate::remote::tree_fetcher::{
    decode_descriptor, EntryKind, FetchedFile, NodeContent, TreeEntry, TreeFetcher,
};
use crate::ui::progress::ProgressReporter;
use crate::ui::signals::GracefulShutdown;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn};

/// One extracted text file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CorpusItem {
    pub path: String,
    pub text: String,
}

/// Items of one repository in traversal order.
pub type RepoCorpus = Vec<CorpusItem>;

#[derive(Debug, Default)]
pub struct WalkOutcome {
    pub items: RepoCorpus,
    pub warnings: Vec<String>,
    /// Set when cancellation cut the traversal short.
    pub cancelled: bool,
}

impl WalkOutcome {
    fn item(item: CorpusItem) -> Self {
        Self {
            items: vec![item],
            ..Self::default()
        }
    }

    fn warning(message: String) -> Self {
        Self {
            warnings: vec![message],
            ..Self::default()
        }
    }

    fn absorb(&mut self, other: WalkOutcome) {
        self.items.extend(other.items);
        self.warnings.extend(other.warnings);
        self.cancelled |= other.cancelled;
    }
}

/// Depth-first traversal of a repository's content tree.
///
/// Siblings within one listing are fetched up to `concurrency` at a time, and
/// their results are stitched back together in listing order. A failing node
/// contributes one warning and no items; it never stops its siblings.
pub struct RepoWalker {
    fetcher: TreeFetcher,
    reporter: ProgressReporter,
    shutdown: GracefulShutdown,
    concurrency: usize,
}

impl RepoWalker {
    pub fn new(
        fetcher: TreeFetcher,
        reporter: ProgressReporter,
        shutdown: GracefulShutdown,
    ) -> Self {
        Self {
            fetcher,
            reporter,
            shutdown,
            concurrency: 1,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub async fn walk(&self, repo: &RepositoryRef, path: &str) -> WalkOutcome {
        let path = path.trim_matches('/').to_string();
        let mut outcome = self.walk_path(repo, path).await;
        outcome.cancelled |= self.shutdown.is_cancelled();

        info!(
            repository = %repo,
            files = outcome.items.len(),
            warnings = outcome.warnings.len(),
            cancelled = outcome.cancelled,
            "walk finished"
        );
        outcome
    }

    fn walk_path<'a>(
        &'a self,
        repo: &'a RepositoryRef,
        path: String,
    ) -> BoxFuture<'a, WalkOutcome> {
        async move {
            if self.shutdown.is_cancelled() {
                return Self::cancelled();
            }

            debug!(repository = %repo, path = %path, "listing");
            match self.fetcher.list_or_fetch(repo, &path).await {
                Err(e) => self.warn(format!(
                    "Error fetching contents of {}: {}",
                    describe(repo, &path),
                    e
                )),
                Ok(NodeContent::File(descriptor)) => {
                    let path = descriptor.path.clone();
                    self.file_outcome(&path, decode_descriptor(&descriptor))
                }
                Ok(NodeContent::Listing(entries)) => {
                    debug!(path = %path, entries = entries.len(), "directory listing");
                    let children = entries.into_iter().map(|entry| match entry.kind {
                        EntryKind::Directory => self.walk_path(repo, entry.path),
                        EntryKind::File => self.collect_file(entry).boxed(),
                    });

                    // `buffered` yields in input order regardless of completion order.
                    let results: Vec<WalkOutcome> = stream::iter(children)
                        .buffered(self.concurrency)
                        .collect()
                        .await;

                    let mut outcome = WalkOutcome::default();
                    for child in results {
                        outcome.absorb(child);
                    }
                    outcome
                }
            }
        }
        .boxed()
    }

    async fn collect_file(&self, entry: TreeEntry) -> WalkOutcome {
        if self.shutdown.is_cancelled() {
            return Self::cancelled();
        }

        let fetched = self.fetcher.fetch_file(&entry).await;
        self.file_outcome(&entry.path, fetched)
    }

    fn file_outcome(&self, path: &str, fetched: Result<FetchedFile>) -> WalkOutcome {
        match fetched {
            Ok(file) if file.is_text => {
                debug!(path = %file.path, bytes = file.raw_bytes.len(), "text file");
                WalkOutcome::item(CorpusItem {
                    text: decode_text(&file.raw_bytes),
                    path: file.path,
                })
            }
            Ok(file) => self.warn(format!("Skipping binary file {}", file.path)),
            Err(e @ GitCorpusError::UnsupportedEncoding { .. })
            | Err(e @ GitCorpusError::Decode { .. }) => self.warn(e.to_string()),
            Err(e) => self.warn(format!("Error fetching file {}: {}", path, e)),
        }
    }

    fn warn(&self, message: String) -> WalkOutcome {
        warn!("{}", message);
        self.reporter.emit(&message);
        WalkOutcome::warning(message)
    }

    fn cancelled() -> WalkOutcome {
        WalkOutcome {
            cancelled: true,
            ..WalkOutcome::default()
        }
    }
}

fn describe(repo: &RepositoryRef, path: &str) -> String {
    if path.is_empty() {
        repo.full_name()
    } else {
        format!("{}/{}", repo.full_name(), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::client::ApiClient;
    use crate::remote::transport::{HttpResponse, StaticTransport, Transport};
    use async_trait::async_trait;
    use crate::ui::progress::MemorySink;
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use std::sync::Arc;
    use std::time::Duration;

    const BASE: &str = "https://api.test";

    fn repo() -> RepositoryRef {
        RepositoryRef::new("alice", "proj").unwrap()
    }

    fn contents(path: &str) -> String {
        if path.is_empty() {
            format!("{}/repos/alice/proj/contents", BASE)
        } else {
            format!("{}/repos/alice/proj/contents/{}", BASE, path)
        }
    }

    fn file_json(path: &str, bytes: &[u8]) -> String {
        format!(
            r#"{{"type": "file", "path": "{}", "encoding": "base64", "content": "{}"}}"#,
            path,
            STANDARD.encode(bytes)
        )
    }

    fn listing(entries: &[(&str, &str)]) -> String {
        let items: Vec<String> = entries
            .iter()
            .map(|(kind, path)| {
                format!(
                    r#"{{"type": "{}", "path": "{}", "url": "{}"}}"#,
                    kind,
                    path,
                    contents(path)
                )
            })
            .collect();
        format!("[{}]", items.join(","))
    }

    fn walker(
        transport: StaticTransport,
        concurrency: usize,
    ) -> (RepoWalker, Arc<MemorySink>, GracefulShutdown) {
        let sink = Arc::new(MemorySink::new());
        let shutdown = GracefulShutdown::new_for_test();
        let client = ApiClient::new(Arc::new(transport), BASE).with_max_in_flight(concurrency);
        let walker = RepoWalker::new(
            TreeFetcher::new(client),
            ProgressReporter::new(sink.clone()),
            shutdown.clone(),
        )
        .with_concurrency(concurrency);
        (walker, sink, shutdown)
    }

    fn paths(outcome: &WalkOutcome) -> Vec<&str> {
        outcome.items.iter().map(|i| i.path.as_str()).collect()
    }

    fn nested_tree() -> StaticTransport {
        StaticTransport::new()
            .with_json(
                contents(""),
                listing(&[("file", "README.md"), ("dir", "src"), ("file", "zz.txt")]),
            )
            .with_json(contents("README.md"), file_json("README.md", b"hi"))
            .with_json(
                contents("src"),
                listing(&[("dir", "src/deep"), ("file", "src/lib.rs")]),
            )
            .with_json(contents("src/deep"), listing(&[("file", "src/deep/a.rs")]))
            .with_json(contents("src/deep/a.rs"), file_json("src/deep/a.rs", b"// a"))
            .with_json(contents("src/lib.rs"), file_json("src/lib.rs", b"pub fn x() {}"))
            .with_json(contents("zz.txt"), file_json("zz.txt", b"end"))
    }

    #[tokio::test]
    async fn test_depth_first_listing_order() {
        let (walker, sink, _) = walker(nested_tree(), 1);
        let outcome = walker.walk(&repo(), "").await;

        assert_eq!(
            paths(&outcome),
            vec!["README.md", "src/deep/a.rs", "src/lib.rs", "zz.txt"]
        );
        assert_eq!(outcome.items[0].text, "hi");
        assert!(outcome.warnings.is_empty());
        assert!(sink.messages().is_empty());
        assert!(!outcome.cancelled);
    }

    #[tokio::test]
    async fn test_parallel_walk_keeps_listing_order() {
        // The first entries are the slowest, so completion order is reversed.
        let transport = nested_tree()
            .with_delay(contents("README.md"), Duration::from_millis(60))
            .with_delay(contents("src/deep"), Duration::from_millis(40));

        let (walker, _, _) = walker(transport, 8);
        let outcome = walker.walk(&repo(), "").await;

        assert_eq!(
            paths(&outcome),
            vec!["README.md", "src/deep/a.rs", "src/lib.rs", "zz.txt"]
        );
    }

    #[tokio::test]
    async fn test_failed_directory_yields_one_warning_and_siblings_survive() {
        let transport = StaticTransport::new()
            .with_json(
                contents(""),
                listing(&[("dir", "broken"), ("file", "ok.txt")]),
            )
            .with_response(
                contents("broken"),
                HttpResponse::ok("API rate limit exceeded").with_status(403),
            )
            .with_json(contents("ok.txt"), file_json("ok.txt", b"fine"));

        let (walker, sink, _) = walker(transport, 4);
        let outcome = walker.walk(&repo(), "").await;

        assert_eq!(paths(&outcome), vec!["ok.txt"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("alice/proj/broken"));
        assert!(outcome.warnings[0].contains("403"));
        assert_eq!(sink.messages(), outcome.warnings);
    }

    #[tokio::test]
    async fn test_binary_and_undecodable_files_are_skipped() {
        let transport = StaticTransport::new()
            .with_json(
                contents(""),
                listing(&[
                    ("file", "logo.png"),
                    ("file", "big.bin"),
                    ("file", "bad.txt"),
                    ("file", "gone.txt"),
                    ("file", "good.txt"),
                ]),
            )
            .with_json(contents("logo.png"), file_json("logo.png", b"\x89PNG\0\0"))
            .with_json(
                contents("big.bin"),
                r#"{"type": "file", "path": "big.bin", "encoding": "none", "content": ""}"#,
            )
            .with_json(
                contents("bad.txt"),
                r#"{"type": "file", "path": "bad.txt", "encoding": "base64", "content": "%%%"}"#,
            )
            .with_json(contents("good.txt"), file_json("good.txt", b"caf\xc3\xa9 \xff"));

        let (walker, _, _) = walker(transport, 2);
        let outcome = walker.walk(&repo(), "").await;

        assert_eq!(paths(&outcome), vec!["good.txt"]);
        assert_eq!(outcome.items[0].text, "café \u{FFFD}");
        assert_eq!(outcome.warnings.len(), 4);
        assert_eq!(outcome.warnings[0], "Skipping binary file logo.png");
        assert_eq!(outcome.warnings[1], "Unsupported encoding none for file big.bin");
        assert!(outcome.warnings[2].starts_with("Error decoding file bad.txt"));
        assert!(outcome.warnings[3].starts_with("Error fetching file gone.txt: HTTP 404"));
    }

    #[tokio::test]
    async fn test_empty_repository() {
        let transport = StaticTransport::new().with_json(contents(""), "[]");
        let (walker, _, _) = walker(transport, 1);
        let outcome = walker.walk(&repo(), "").await;

        assert!(outcome.items.is_empty());
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_root_failure_is_a_warning_not_an_error() {
        let (walker, _, _) = walker(StaticTransport::new(), 1);
        let outcome = walker.walk(&repo(), "").await;

        assert!(outcome.items.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("Error fetching contents of alice/proj:"));
    }

    #[tokio::test]
    async fn test_path_naming_a_single_file() {
        let transport = StaticTransport::new()
            .with_json(contents("docs/guide.md"), file_json("docs/guide.md", b"# Guide"));
        let (walker, _, _) = walker(transport, 1);
        let outcome = walker.walk(&repo(), "/docs/guide.md").await;

        assert_eq!(paths(&outcome), vec!["docs/guide.md"]);
        assert_eq!(outcome.items[0].text, "# Guide");
    }

    #[tokio::test]
    async fn test_cancelled_walk_fetches_nothing() {
        let transport = Arc::new(nested_tree());
        let sink = Arc::new(MemorySink::new());
        let shutdown = GracefulShutdown::new_for_test();
        let walker = RepoWalker::new(
            TreeFetcher::new(ApiClient::new(transport.clone(), BASE)),
            ProgressReporter::new(sink),
            shutdown.clone(),
        );

        shutdown.request_shutdown();
        let outcome = walker.walk(&repo(), "").await;

        assert!(outcome.cancelled);
        assert!(outcome.items.is_empty());
        assert_eq!(transport.request_count(), 0);
    }

    /// Requests shutdown once `trigger` has been served, as Ctrl+C would mid-walk.
    struct CancelAfter {
        inner: Arc<StaticTransport>,
        trigger: String,
        shutdown: GracefulShutdown,
    }

    #[async_trait]
    impl Transport for CancelAfter {
        async fn get(&self, url: &str) -> Result<HttpResponse> {
            let response = self.inner.get(url).await;
            if url == self.trigger {
                self.shutdown.request_shutdown();
            }
            response
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_walk_keeps_collected_items() {
        let inner = Arc::new(
            StaticTransport::new()
                .with_json(
                    contents(""),
                    listing(&[("file", "a.txt"), ("dir", "docs"), ("file", "c.txt")]),
                )
                .with_json(contents("a.txt"), file_json("a.txt", b"first"))
                .with_json(contents("docs"), listing(&[("file", "docs/b.txt")]))
                .with_json(contents("docs/b.txt"), file_json("docs/b.txt", b"second"))
                .with_json(contents("c.txt"), file_json("c.txt", b"third")),
        );
        let shutdown = GracefulShutdown::new_for_test();
        let transport = CancelAfter {
            inner: inner.clone(),
            trigger: contents("a.txt"),
            shutdown: shutdown.clone(),
        };
        let walker = RepoWalker::new(
            TreeFetcher::new(ApiClient::new(Arc::new(transport), BASE)),
            ProgressReporter::new(Arc::new(MemorySink::new())),
            shutdown,
        );

        let outcome = walker.walk(&repo(), "").await;

        assert!(outcome.cancelled);
        assert_eq!(paths(&outcome), vec!["a.txt"]);
        assert_eq!(outcome.items[0].text, "first");
        assert!(outcome.warnings.is_empty());
        assert_eq!(inner.requests(), vec![contents(""), contents("a.txt")]);
    }

    #[tokio::test]
    async fn test_stalled_file_times_out_and_siblings_survive() {
        let transport = StaticTransport::new()
            .with_json(
                contents(""),
                listing(&[("file", "a.txt"), ("file", "slow.txt"), ("file", "z.txt")]),
            )
            .with_json(contents("a.txt"), file_json("a.txt", b"a"))
            .with_json(contents("slow.txt"), file_json("slow.txt", b"never"))
            .with_delay(contents("slow.txt"), Duration::from_secs(5))
            .with_json(contents("z.txt"), file_json("z.txt", b"z"));

        let client = ApiClient::new(Arc::new(transport), BASE)
            .with_timeout(Duration::from_millis(50))
            .with_max_in_flight(4);
        let walker = RepoWalker::new(
            TreeFetcher::new(client),
            ProgressReporter::new(Arc::new(MemorySink::new())),
            GracefulShutdown::new_for_test(),
        )
        .with_concurrency(4);

        let outcome = walker.walk(&repo(), "").await;

        assert_eq!(paths(&outcome), vec!["a.txt", "z.txt"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].starts_with("Error fetching file slow.txt: Request timed out"));
        assert!(!outcome.cancelled);
    }

    #[tokio::test]
    async fn test_directory_names_with_reserved_characters() {
        let transport = StaticTransport::new()
            .with_json(contents(""), listing(&[("dir", "C#"), ("file", "ok.txt")]))
            .with_json(
                contents("C%23"),
                format!(
                    r#"[{{"type": "file", "path": "C#/Program.cs", "url": "{}"}}]"#,
                    contents("C%23/Program.cs")
                ),
            )
            .with_json(
                contents("C%23/Program.cs"),
                file_json("C#/Program.cs", b"class Program {}"),
            )
            .with_json(contents("ok.txt"), file_json("ok.txt", b"fine"));

        let (walker, _, _) = walker(transport, 2);
        let outcome = walker.walk(&repo(), "").await;

        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        assert_eq!(paths(&outcome), vec!["C#/Program.cs", "ok.txt"]);
        assert_eq!(outcome.items[0].text, "class Program {}");
    }
}
