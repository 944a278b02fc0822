//! Package name to changelog facade.
use async_trait::async_trait;
use log::*;
use std::sync::Arc;
use url::Url;

#[cfg(test)]
use mockall::automock;

use crate::source::{
    changelog::{ChangelogFinder, VersionRange},
    metadata::RegistryMetadata,
    types::RepoRef,
};

/// Repository pages that never name a package subdirectory.
const NON_SOURCE_SEGMENTS: [&str; 6] =
    ["issues", "pulls", "wiki", "discussions", "releases", "actions"];

/// Anything that can produce changelog text for an upgrade range.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChangelogSource: Send + Sync {
    async fn get_changelog(
        &self,
        package: &str,
        current_version: &str,
        target_version: &str,
    ) -> Option<String>;
}

/// Resolves the source repository through registry metadata and runs the
/// [`ChangelogFinder`] strategies against it.
pub struct ChangelogResolver {
    metadata: Arc<RegistryMetadata>,
    finder: ChangelogFinder,
}

impl ChangelogResolver {
    pub fn new(metadata: Arc<RegistryMetadata>, finder: ChangelogFinder) -> Self {
        Self { metadata, finder }
    }
}

#[async_trait]
impl ChangelogSource for ChangelogResolver {
    async fn get_changelog(
        &self,
        package: &str,
        current_version: &str,
        target_version: &str,
    ) -> Option<String> {
        let Some(url) = self.metadata.get_source_url(package).await else {
            info!("{package}: no source repository known, skipping changelog");
            return None;
        };

        let Some(repo) = parse_repo_url(&url) else {
            warn!("{package}: unable to parse repository from {url}");
            return None;
        };

        debug!(
            "{package}: resolved repository {} (subdirectory: {:?})",
            repo.slug(),
            repo.subdirectory
        );

        self.finder
            .find(
                &repo,
                package,
                VersionRange {
                    current: current_version,
                    target: target_version,
                },
            )
            .await
    }
}

/// Split a repository URL into owner, name and optional subdirectory.
///
/// `/tree/<branch>/<path..>` (or `/blob/...`) yields `<path..>` as the
/// subdirectory; any other trailing segments are taken as the subdirectory
/// verbatim, except well known non-source pages such as `/issues`.
pub fn parse_repo_url(url: &str) -> Option<RepoRef> {
    let parsed = Url::parse(url.trim()).ok()?;
    let segments = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .collect::<Vec<&str>>();

    let [owner, repo, rest @ ..] = segments.as_slice() else {
        return None;
    };

    let repo = repo.strip_suffix(".git").unwrap_or(*repo);
    let repo_ref = RepoRef::new(owner, repo);

    let subdirectory = match rest {
        ["tree" | "blob", _branch, path @ ..] => path.join("/"),
        ["tree" | "blob", ..] => String::new(),
        [first, ..] if NON_SOURCE_SEGMENTS.contains(first) => String::new(),
        path => path.join("/"),
    };

    Some(repo_ref.with_subdirectory(&subdirectory))
}
