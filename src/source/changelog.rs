//! Changelog assembly for a single repository.
//!
//! Strategies run from most to least specific and the first non-empty
//! result wins:
//!
//! 1. every published release inside the upgrade range, newest first
//! 2. the release tagged with the target version
//! 3. a conventional changelog file
//! 4. a changelog file linked from the README
//!
//! Host errors never escape; a failing strategy simply hands over to the
//! next one.
use log::*;
use regex::Regex;
use std::sync::LazyLock;

use crate::{
    source::{
        config::CHANGELOG_FILES,
        tags::{tag_candidates, version_from_tag},
        traits::RepositoryHost,
        types::RepoRef,
    },
    version::LooseVersion,
};

static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\(([^)\s]+)(?:\s+[^)]*)?\)").unwrap()
});

static LINK_TEXT_KEYWORDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)change|history|release").unwrap());

/// Upgrade range a changelog should cover: strictly after `current`, up to
/// and including `target`.
#[derive(Debug, Clone, Copy)]
pub struct VersionRange<'a> {
    pub current: &'a str,
    pub target: &'a str,
}

/// Runs the changelog strategies against a [`RepositoryHost`].
pub struct ChangelogFinder {
    host: Box<dyn RepositoryHost>,
}

impl ChangelogFinder {
    pub fn new(host: Box<dyn RepositoryHost>) -> Self {
        Self { host }
    }

    /// Best available changelog text for `package` in `repo` covering
    /// `range`, or `None` when every strategy comes up empty.
    pub async fn find(
        &self,
        repo: &RepoRef,
        package: &str,
        range: VersionRange<'_>,
    ) -> Option<String> {
        if let Some(text) = self.release_range(repo, package, range).await {
            info!(
                "{package}: assembled changelog from releases in ({}, {}]",
                range.current, range.target
            );
            return Some(text);
        }

        if let Some(text) =
            self.single_release(repo, package, range.target).await
        {
            info!("{package}: using release notes for {}", range.target);
            return Some(text);
        }

        if let Some(text) = self.changelog_file(repo, &CHANGELOG_FILES).await {
            info!("{package}: using changelog file from {}", repo.slug());
            return Some(text);
        }

        if let Some(text) = self.readme_linked_file(repo).await {
            info!("{package}: using changelog linked from README");
            return Some(text);
        }

        debug!("{package}: no changelog found in {}", repo.slug());
        None
    }

    async fn release_range(
        &self,
        repo: &RepoRef,
        package: &str,
        range: VersionRange<'_>,
    ) -> Option<String> {
        let releases = match self.host.list_releases(repo).await {
            Ok(releases) => releases,
            Err(err) => {
                warn!("failed to list releases for {}: {err}", repo.slug());
                return None;
            }
        };

        let mut matched = releases
            .into_iter()
            .filter_map(|release| {
                let body = release.body.filter(|b| !b.trim().is_empty())?;
                let version = version_from_tag(&release.tag_name, package)?;
                if !crate::version::in_range(
                    &version,
                    range.current,
                    range.target,
                ) {
                    return None;
                }
                let version = LooseVersion::parse(&version)?;
                Some((version, release.tag_name, body))
            })
            .collect::<Vec<_>>();

        if matched.is_empty() {
            return None;
        }

        // newest first; the first listing of a version wins
        matched.sort_by(|a, b| b.0.cmp(&a.0));
        matched.dedup_by(|later, earlier| later.0 == earlier.0);

        debug!(
            "{}: {} release(s) in range for {package}",
            repo.slug(),
            matched.len()
        );

        let text = matched
            .iter()
            .map(|(_, tag, body)| format!("## {tag}\n\n{}", body.trim()))
            .collect::<Vec<String>>()
            .join("\n\n");

        Some(text)
    }

    async fn single_release(
        &self,
        repo: &RepoRef,
        package: &str,
        target: &str,
    ) -> Option<String> {
        for tag in tag_candidates(target, package) {
            match self.host.release_by_tag(repo, &tag).await {
                Ok(Some(release)) => {
                    if let Some(body) = release.body
                        && !body.trim().is_empty()
                    {
                        return Some(body);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    debug!("release lookup for tag {tag} failed: {err}");
                }
            }
        }

        None
    }

    /// First non-empty file among `files`, looked up under the
    /// subdirectory first and then at the repository root.
    async fn changelog_file(
        &self,
        repo: &RepoRef,
        files: &[&str],
    ) -> Option<String> {
        let mut paths = files
            .iter()
            .map(|file| repo.path_in_repo(file))
            .collect::<Vec<String>>();

        if repo.subdirectory.is_some() {
            paths.extend(files.iter().map(|file| file.to_string()));
        }

        for path in paths {
            match self.host.file_content(repo, &path).await {
                Ok(Some(content)) if !content.trim().is_empty() => {
                    debug!("found changelog file {path} in {}", repo.slug());
                    return Some(content);
                }
                Ok(_) => {}
                Err(err) => debug!("failed to fetch {path}: {err}"),
            }
        }

        None
    }

    async fn readme_linked_file(&self, repo: &RepoRef) -> Option<String> {
        let readme = match self.host.readme(repo).await {
            Ok(Some(readme)) => readme,
            Ok(None) => return None,
            Err(err) => {
                debug!("failed to fetch README for {}: {err}", repo.slug());
                return None;
            }
        };

        let path = find_changelog_link(&readme, repo)?;
        debug!("README for {} links changelog at {path}", repo.slug());
        let root = RepoRef {
            subdirectory: None,
            ..repo.clone()
        };
        self.changelog_file(&root, &[path.as_str()]).await
    }
}

/// Repository-root path of the first README link whose text mentions
/// changes, history or releases and that points inside the repository.
pub fn find_changelog_link(readme: &str, repo: &RepoRef) -> Option<String> {
    MARKDOWN_LINK
        .captures_iter(readme)
        .filter(|caps| LINK_TEXT_KEYWORDS.is_match(&caps[1]))
        .find_map(|caps| link_target_in_repo(&caps[2], repo))
}

fn link_target_in_repo(target: &str, repo: &RepoRef) -> Option<String> {
    let target = target
        .split(['#', '?'])
        .next()
        .filter(|t| !t.is_empty())?;

    if target.starts_with("mailto:") {
        return None;
    }

    if target.contains("://") {
        return blob_path(target, repo);
    }

    if let Some(absolute) = target.strip_prefix('/') {
        return normalize_path(None, absolute);
    }

    normalize_path(repo.subdirectory.as_deref(), target)
}

/// `https://github.com/{owner}/{repo}/blob/{branch}/{path}` of the same
/// repository, as a repository-root path.
fn blob_path(url: &str, repo: &RepoRef) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segments = parsed.path_segments()?.collect::<Vec<&str>>();

    match segments.as_slice() {
        [owner, name, "blob" | "raw", _branch, rest @ ..]
            if owner.eq_ignore_ascii_case(&repo.owner)
                && name.eq_ignore_ascii_case(&repo.repo)
                && !rest.is_empty() =>
        {
            normalize_path(None, &rest.join("/"))
        }
        _ => None,
    }
}

/// Join `link` onto `base`, resolving `.` and `..` segments. Returns `None`
/// when the link escapes the repository root.
fn normalize_path(base: Option<&str>, link: &str) -> Option<String> {
    let mut parts = base
        .map(|b| {
            b.split('/')
                .filter(|s| !s.is_empty())
                .collect::<Vec<&str>>()
        })
        .unwrap_or_default();

    for segment in link.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }

    if parts.is_empty() {
        return None;
    }

    Some(parts.join("/"))
}
