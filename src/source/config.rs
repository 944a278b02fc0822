//! Configuration for registry and repository host connections.
use secrecy::SecretString;
use std::time::Duration;

/// Default package registry JSON API root.
pub const DEFAULT_PYPI_URL: &str = "https://pypi.org/pypi";
/// Default GitHub REST API root.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
/// Default per-request timeout for registry and host calls.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;
/// Page size used when listing repository releases.
pub const RELEASES_PAGE_SIZE: u8 = 100;
/// Host accepted as a source repository.
pub const SUPPORTED_SOURCE_HOST: &str = "github.com";
/// Conventional changelog file names, tried in order.
pub const CHANGELOG_FILES: [&str; 4] =
    ["CHANGELOG.md", "History.md", "RELEASES.md", "CHANGES.md"];

/// Connection settings for the changelog sources.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Registry JSON API root (e.g. "https://pypi.org/pypi").
    pub registry_url: String,
    /// Repository host REST API root.
    pub github_api_url: String,
    /// Optional bearer token for the repository host.
    pub github_token: Option<SecretString>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            registry_url: DEFAULT_PYPI_URL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            github_token: None,
            timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}
