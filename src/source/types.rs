//! Wire types returned by the registry and repository host.
use serde::Deserialize;
use std::collections::HashMap;

/// `info` object of a registry JSON document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProjectInfo {
    /// Latest published version.
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub project_urls: Option<HashMap<String, String>>,
    #[serde(default)]
    pub home_page: Option<String>,
}

/// Top level registry JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectDocument {
    pub info: ProjectInfo,
}

/// A published repository release.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RepoRelease {
    pub tag_name: String,
    #[serde(default)]
    pub body: Option<String>,
}

/// Repository contents API response for a single file.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentFile {
    #[serde(default)]
    pub content: Option<String>,
}

/// A repository on the source host, optionally narrowed to a subdirectory
/// for monorepos.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
    pub subdirectory: Option<String>,
}

impl RepoRef {
    pub fn new(owner: &str, repo: &str) -> Self {
        Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            subdirectory: None,
        }
    }

    pub fn with_subdirectory(mut self, subdirectory: &str) -> Self {
        let trimmed = subdirectory.trim_matches('/');
        self.subdirectory = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };
        self
    }

    /// `owner/repo` slug.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Path of `file` relative to the repository root, honoring the
    /// subdirectory.
    pub fn path_in_repo(&self, file: &str) -> String {
        let file = file.trim_start_matches("./").trim_start_matches('/');
        match &self.subdirectory {
            Some(dir) => format!("{dir}/{file}"),
            None => file.to_string(),
        }
    }
}
