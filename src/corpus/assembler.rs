use crate::corpus::walker::RepoCorpus;
use crate::remote::repository::RepositoryRef;
use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Emit run, repository and file delimiters.
    pub framed: bool,
    /// Strip all whitespace from the final text.
    pub compact: bool,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            framed: true,
            compact: false,
        }
    }
}

/// What kind of run produced the corpora, for the banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunHeader {
    Single { source: String },
    Owner { owner: String, repository_count: usize },
}

pub struct CorpusAssembler {
    options: AssembleOptions,
    generated_at: DateTime<Utc>,
}

impl CorpusAssembler {
    pub fn new(options: AssembleOptions) -> Self {
        Self {
            options,
            generated_at: Utc::now(),
        }
    }

    /// Pins the banner timestamp.
    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn options(&self) -> AssembleOptions {
        self.options
    }

    /// Concatenates the corpora in the given order. Empty corpora are left out
    /// entirely, header included.
    pub fn assemble(&self, header: &RunHeader, corpora: &[(RepositoryRef, RepoCorpus)]) -> String {
        let mut out = String::new();

        if self.options.framed {
            out.push_str(&self.banner(header));
        }

        for (repo, items) in corpora.iter().filter(|(_, items)| !items.is_empty()) {
            if self.options.framed {
                out.push_str(&format!("========== REPOSITORY: {} ==========\n\n", repo));
            }
            for item in items {
                if self.options.framed {
                    out.push_str(&format!("--- FILE: {} ---\n{}\n\n", item.path, item.text));
                } else {
                    out.push_str(&item.text);
                }
            }
        }

        if self.options.compact {
            compact(&out)
        } else {
            out
        }
    }

    fn banner(&self, header: &RunHeader) -> String {
        let ts = self.generated_at.format(TIMESTAMP_FORMAT);
        match header {
            RunHeader::Single { source } => format!(
                "GitCorpus Output (Single Repository)\nGenerated on: {}\nSource: {}\n\n",
                ts, source
            ),
            RunHeader::Owner {
                owner,
                repository_count,
            } => format!(
                "GitCorpus Output (All Repositories for User: {owner})\nGenerated on: {ts}\n\n\
                 ========== ALL REPOS FOR USER: {owner} ==========\nGenerated on: {ts}\n\
                 Number of repositories: {count}\n\n",
                owner = owner,
                ts = ts,
                count = repository_count
            ),
        }
    }
}

/// Removes every Unicode whitespace character.
pub fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}
