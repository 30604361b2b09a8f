pub mod client;
pub mod repo_list;
pub mod repository;
pub mod transport;
pub mod tree_fetcher;

pub use client::{ApiClient, REPOS_PER_PAGE};
pub use repo_list::RepoListFetcher;
pub use repository::{parse_owner, parse_repo_url, RepositoryRef};
pub use transport::{parse_next_link, HttpResponse, ReqwestTransport, StaticTransport, Transport};
pub use tree_fetcher::{EntryKind, FetchedFile, FileDescriptor, NodeContent, TreeEntry, TreeFetcher};
