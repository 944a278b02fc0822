//! Collaborator traits for the remote changelog sources.
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::{
    Result,
    source::types::{ProjectInfo, RepoRef, RepoRelease},
};

/// A package registry exposing project metadata.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Metadata for `package`, `None` when the registry has no such project.
    async fn project_info(&self, package: &str) -> Result<Option<ProjectInfo>>;
}

/// A source host exposing releases and file contents for a repository.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// All published releases, newest first as returned by the host.
    async fn list_releases(&self, repo: &RepoRef) -> Result<Vec<RepoRelease>>;

    /// A single release by exact tag name.
    async fn release_by_tag(
        &self,
        repo: &RepoRef,
        tag: &str,
    ) -> Result<Option<RepoRelease>>;

    /// Decoded text of the file at `path` (relative to the repository root).
    async fn file_content(
        &self,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<String>>;

    /// Decoded README of the repository or its subdirectory.
    async fn readme(&self, repo: &RepoRef) -> Result<Option<String>>;
}
