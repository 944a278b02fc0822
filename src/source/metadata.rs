//! Source repository discovery from registry metadata.
use log::*;
use std::collections::HashMap;
use tokio::sync::Mutex;
use url::Url;

use crate::source::{
    config::SUPPORTED_SOURCE_HOST, traits::PackageRegistry, types::ProjectInfo,
};

/// `project_urls` keys that may point at the source repository, in
/// priority order. Matched case-insensitively.
const SOURCE_URL_KEYS: [&str; 9] = [
    "source",
    "source code",
    "repository",
    "code",
    "homepage",
    "home",
    "issue tracker",
    "tracker",
    "bug tracker",
];

/// Pick the canonical source repository URL out of registry metadata.
pub fn source_url_from_info(info: &ProjectInfo) -> Option<String> {
    let urls = info
        .project_urls
        .as_ref()
        .map(|urls| {
            urls.iter()
                .map(|(key, value)| (key.to_lowercase(), value.as_str()))
                .collect::<HashMap<String, &str>>()
        })
        .unwrap_or_default();

    SOURCE_URL_KEYS
        .iter()
        .filter_map(|key| urls.get(*key).copied())
        .chain(info.home_page.as_deref())
        .find(|url| is_supported_host(url))
        .map(clean_source_url)
}

fn is_supported_host(url: &str) -> bool {
    Url::parse(url.trim())
        .ok()
        .and_then(|url| url.host_str().map(|h| h.to_lowercase()))
        .map(|host| {
            host == SUPPORTED_SOURCE_HOST
                || host == format!("www.{SUPPORTED_SOURCE_HOST}")
        })
        .unwrap_or(false)
}

/// Strip trailing slashes and a `.git` suffix.
pub fn clean_source_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    url.trim_end_matches('/').to_string()
}

/// Registry lookups memoized for the duration of a run. Every failure is
/// logged and reported as missing data.
pub struct RegistryMetadata {
    registry: Box<dyn PackageRegistry>,
    cache: Mutex<HashMap<String, Option<ProjectInfo>>>,
}

impl RegistryMetadata {
    pub fn new(registry: Box<dyn PackageRegistry>) -> Self {
        Self {
            registry,
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn project_info(&self, package: &str) -> Option<ProjectInfo> {
        let key = package.to_lowercase();

        if let Some(cached) = self.cache.lock().await.get(&key) {
            return cached.clone();
        }

        match self.registry.project_info(package).await {
            Ok(info) => {
                if info.is_none() {
                    debug!("registry has no entry for {package}");
                }
                self.cache.lock().await.insert(key, info.clone());
                info
            }
            Err(err) => {
                warn!("registry lookup failed for {package}: {err}");
                None
            }
        }
    }

    /// Canonical source repository URL for `package`.
    pub async fn get_source_url(&self, package: &str) -> Option<String> {
        let info = self.project_info(package).await?;
        let url = source_url_from_info(&info);
        if url.is_none() {
            debug!("no source repository url listed for {package}");
        }
        url
    }

    /// Latest published version of `package`.
    pub async fn get_latest_version(&self, package: &str) -> Option<String> {
        self.project_info(package)
            .await?
            .version
            .filter(|v| !v.trim().is_empty())
    }
}
