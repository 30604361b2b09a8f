use crate::corpus::classifier::{classify, ContentKind};
use crate::error::{GitCorpusError, Result};
use crate::remote::client::ApiClient;
use crate::remote::repository::RepositoryRef;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One node of a directory listing.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
    /// Address the file's descriptor is fetched from.
    pub content_ref: String,
}

/// A single-file response, still transport-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct FileDescriptor {
    pub path: String,
    pub encoding: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeContent {
    Listing(Vec<TreeEntry>),
    File(FileDescriptor),
}

#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub path: String,
    pub raw_bytes: Vec<u8>,
    pub is_text: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsPayload {
    Listing(Vec<RawEntry>),
    Single(RawFile),
}

#[derive(Deserialize)]
struct RawEntry {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct RawFile {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

pub struct TreeFetcher {
    client: ApiClient,
}

impl TreeFetcher {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetches one directory level, or the descriptor of a single file when `path` names one.
    pub async fn list_or_fetch(&self, repo: &RepositoryRef, path: &str) -> Result<NodeContent> {
        let url = self.client.contents_url(repo, path);
        let (payload, _) = self.client.get_json::<ContentsPayload>(&url).await?;

        match payload {
            ContentsPayload::Listing(entries) => {
                let entries = entries
                    .into_iter()
                    .filter_map(|raw| self.to_entry(repo, raw))
                    .collect();
                Ok(NodeContent::Listing(entries))
            }
            ContentsPayload::Single(raw) => Ok(NodeContent::File(to_descriptor(&url, raw)?)),
        }
    }

    /// Fetches and decodes the file behind a listing entry.
    pub async fn fetch_file(&self, entry: &TreeEntry) -> Result<FetchedFile> {
        let (payload, _) = self
            .client
            .get_json::<ContentsPayload>(&entry.content_ref)
            .await?;

        match payload {
            ContentsPayload::Single(raw) => {
                let descriptor = to_descriptor(&entry.content_ref, raw)?;
                decode_descriptor(&descriptor)
            }
            ContentsPayload::Listing(_) => Err(GitCorpusError::UnexpectedPayload {
                url: entry.content_ref.clone(),
                message: format!("expected a file descriptor for {}", entry.path),
            }),
        }
    }

    fn to_entry(&self, repo: &RepositoryRef, raw: RawEntry) -> Option<TreeEntry> {
        let kind = match raw.kind.as_str() {
            "file" => EntryKind::File,
            "dir" => EntryKind::Directory,
            other => {
                debug!(kind = other, path = %raw.path, "skipping tree entry");
                return None;
            }
        };

        let content_ref = raw
            .url
            .unwrap_or_else(|| self.client.contents_url(repo, &raw.path));

        Some(TreeEntry {
            path: raw.path,
            kind,
            content_ref,
        })
    }
}

fn to_descriptor(url: &str, raw: RawFile) -> Result<FileDescriptor> {
    if raw.kind != "file" {
        return Err(GitCorpusError::UnexpectedPayload {
            url: url.to_string(),
            message: format!("{} is a {}, not a file", raw.path, raw.kind),
        });
    }

    Ok(FileDescriptor {
        path: raw.path,
        encoding: raw.encoding.unwrap_or_else(|| "base64".to_string()),
        content: raw.content.unwrap_or_default(),
    })
}

/// Turns a descriptor into raw bytes and classifies them. Only `base64` is supported.
pub fn decode_descriptor(descriptor: &FileDescriptor) -> Result<FetchedFile> {
    if descriptor.encoding != "base64" {
        return Err(GitCorpusError::UnsupportedEncoding {
            path: descriptor.path.clone(),
            encoding: descriptor.encoding.clone(),
        });
    }

    // The API wraps base64 bodies at 60 columns.
    let compact: String = descriptor
        .content
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let raw_bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| GitCorpusError::Decode {
            path: descriptor.path.clone(),
            message: e.to_string(),
        })?;

    let is_text = classify(&raw_bytes) == ContentKind::Text;

    Ok(FetchedFile {
        path: descriptor.path.clone(),
        raw_bytes,
        is_text,
    })
}
