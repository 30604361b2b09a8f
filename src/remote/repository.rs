use crate::error::{GitCorpusError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// An (owner, name) pair identifying a remote repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    pub fn new<O: AsRef<str>, N: AsRef<str>>(owner: O, name: N) -> Result<Self> {
        let owner = owner.as_ref().trim();
        let name = name.as_ref().trim();

        if owner.is_empty() || name.is_empty() {
            return Err(GitCorpusError::invalid_input(
                format!("{}/{}", owner, name),
                "both owner and repository names must be non-empty",
            ));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Parses a repository URL whose path has exactly two non-empty segments.
///
/// Any scheme and host are accepted. Input without a scheme is read as a bare
/// path, so `alice/proj` parses while `github.com/alice/proj` does not.
pub fn parse_repo_url(input: &str) -> Result<RepositoryRef> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(GitCorpusError::invalid_input(
            input,
            "a repository URL is required",
        ));
    }

    let path = match Url::parse(trimmed) {
        Ok(url) => url.path().to_string(),
        Err(url::ParseError::RelativeUrlWithoutBase) => trimmed
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
        Err(e) => {
            return Err(GitCorpusError::invalid_input(
                input,
                format!("not a valid URL ({})", e),
            ))
        }
    };

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    if segments.len() != 2 || segments.iter().any(|s| s.trim().is_empty()) {
        return Err(GitCorpusError::invalid_input(
            input,
            "expected a URL like https://github.com/user/repo",
        ));
    }

    let owner = segments[0];
    let name = segments[1].strip_suffix(".git").unwrap_or(segments[1]);

    RepositoryRef::new(owner, name)
}

/// Normalises an owner identifier for owner-wide extraction.
pub fn parse_owner(input: &str) -> Result<String> {
    let owner = input.trim();
    if owner.is_empty() {
        return Err(GitCorpusError::invalid_input(
            input,
            "a GitHub username is required",
        ));
    }
    if owner.contains('/') || owner.chars().any(char::is_whitespace) {
        return Err(GitCorpusError::invalid_input(
            input,
            "a username cannot contain '/' or whitespace",
        ));
    }
    Ok(owner.to_string())
}
