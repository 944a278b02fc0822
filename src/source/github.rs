//! Repository host client for the GitHub REST API.
use async_trait::async_trait;
use base64::{Engine, prelude::BASE64_STANDARD};
use log::*;
use reqwest::{
    Client, StatusCode, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT},
};
use secrecy::ExposeSecret;

use crate::{
    Result,
    source::{
        config::{RELEASES_PAGE_SIZE, SourceConfig},
        traits::RepositoryHost,
        types::{ContentFile, RepoRef, RepoRelease},
    },
};

/// GitHub client with optional bearer token authentication.
pub struct Github {
    base_url: Url,
    client: Client,
}

impl Github {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();

        headers.append(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.append(USER_AGENT, HeaderValue::from_static("anvil"));

        if let Some(token) = &config.github_token {
            let mut token_value = HeaderValue::from_str(
                format!("Bearer {}", token.expose_secret()).as_str(),
            )?;
            token_value.set_sensitive(true);
            headers.append(AUTHORIZATION, token_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let base_url = Url::parse(&format!(
            "{}/repos/",
            config.github_api_url.trim_end_matches('/')
        ))?;

        Ok(Self { base_url, client })
    }

    fn repo_url(&self, repo: &RepoRef, rest: &str) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("{}/{}/{rest}", repo.owner, repo.repo))?)
    }

    async fn get_content_file(&self, url: Url) -> Result<Option<String>> {
        debug!("fetching repository content: {url}");
        let request = self.client.get(url).build()?;
        let response = self.client.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let result = response.error_for_status()?;
        let file: ContentFile = result.json().await?;
        let Some(encoded) = file.content else {
            return Ok(None);
        };
        decode_content(&encoded).map(Some)
    }
}

/// Decode a contents API payload. The host wraps base64 at 60 columns, so
/// whitespace is removed before decoding.
pub fn decode_content(encoded: &str) -> Result<String> {
    let compact = encoded
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>();
    let bytes = BASE64_STANDARD.decode(compact)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[async_trait]
impl RepositoryHost for Github {
    // TODO: follow the Link header so ranges older than the first page of
    // releases can be assembled.
    async fn list_releases(&self, repo: &RepoRef) -> Result<Vec<RepoRelease>> {
        let url = self.repo_url(
            repo,
            &format!("releases?per_page={RELEASES_PAGE_SIZE}"),
        )?;
        debug!("listing releases: {url}");
        let request = self.client.get(url).build()?;
        let response = self.client.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(vec![]);
        }
        let result = response.error_for_status()?;
        let releases: Vec<RepoRelease> = result.json().await?;
        Ok(releases)
    }

    async fn release_by_tag(
        &self,
        repo: &RepoRef,
        tag: &str,
    ) -> Result<Option<RepoRelease>> {
        let url = self.repo_url(repo, &format!("releases/tags/{tag}"))?;
        debug!("fetching release by tag: {url}");
        let request = self.client.get(url).build()?;
        let response = self.client.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let result = response.error_for_status()?;
        let release: RepoRelease = result.json().await?;
        Ok(Some(release))
    }

    async fn file_content(
        &self,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<String>> {
        let url = self.repo_url(repo, &format!("contents/{path}"))?;
        self.get_content_file(url).await
    }

    async fn readme(&self, repo: &RepoRef) -> Result<Option<String>> {
        let rest = match &repo.subdirectory {
            Some(dir) => format!("readme/{dir}"),
            None => "readme".to_string(),
        };
        let url = self.repo_url(repo, &rest)?;
        self.get_content_file(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnvilError;
    use mockito::Matcher;
    use secrecy::SecretString;
    use std::time::Duration;

    fn config_for(
        server: &mockito::Server,
        token: Option<&str>,
    ) -> SourceConfig {
        SourceConfig {
            github_api_url: server.url(),
            github_token: token.map(|t| SecretString::from(t.to_string())),
            timeout: Duration::from_secs(2),
            ..SourceConfig::default()
        }
    }

    #[tokio::test]
    async fn lists_releases_with_page_size() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/psf/requests/releases")
            .match_query(Matcher::UrlEncoded("per_page".into(), "100".into()))
            .match_header("accept", "application/vnd.github.v3+json")
            .match_header("user-agent", "anvil")
            .with_status(200)
            .with_body(
                r#"[
                    {"tag_name": "v2.31.0", "body": "Fixes"},
                    {"tag_name": "v2.30.0", "body": null}
                ]"#,
            )
            .create_async()
            .await;

        let github = Github::new(&config_for(&server, None)).unwrap();
        let releases = github
            .list_releases(&RepoRef::new("psf", "requests"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(releases.len(), 2);
        assert_eq!(releases[0].tag_name, "v2.31.0");
        assert_eq!(releases[1].body, None);
    }

    #[tokio::test]
    async fn sends_bearer_token_when_configured() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/psf/requests/releases/tags/v2.31.0")
            .match_header("authorization", "Bearer secret-token")
            .with_status(200)
            .with_body(r#"{"tag_name": "v2.31.0", "body": "notes"}"#)
            .create_async()
            .await;

        let github =
            Github::new(&config_for(&server, Some("secret-token"))).unwrap();
        let release = github
            .release_by_tag(&RepoRef::new("psf", "requests"), "v2.31.0")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(release.unwrap().body.as_deref(), Some("notes"));
    }

    #[tokio::test]
    async fn missing_release_and_file_are_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/psf/requests/releases/tags/v9.9.9")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/repos/psf/requests/contents/CHANGES.md")
            .with_status(404)
            .create_async()
            .await;

        let github = Github::new(&config_for(&server, None)).unwrap();
        let repo = RepoRef::new("psf", "requests");

        assert!(
            github
                .release_by_tag(&repo, "v9.9.9")
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            github
                .file_content(&repo, "CHANGES.md")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn decodes_wrapped_base64_content() {
        let mut server = mockito::Server::new_async().await;
        // "# Changelog\n\n## 2.31.0\n" wrapped over two lines
        server
            .mock("GET", "/repos/org/mono/contents/pkgs/foo/CHANGELOG.md")
            .with_status(200)
            .with_body(r#"{"content": "IyBDaGFuZ2Vsb2cKCiMj\nIDIuMzEuMAo=\n"}"#)
            .create_async()
            .await;

        let github = Github::new(&config_for(&server, None)).unwrap();
        let repo = RepoRef::new("org", "mono");
        let content = github
            .file_content(&repo, "pkgs/foo/CHANGELOG.md")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(content, "# Changelog\n\n## 2.31.0\n");
    }

    #[tokio::test]
    async fn readme_uses_subdirectory_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/org/mono/readme/pkgs/foo")
            .with_status(200)
            .with_body(r#"{"content": "UkVBRE1F"}"#)
            .create_async()
            .await;

        let github = Github::new(&config_for(&server, None)).unwrap();
        let repo = RepoRef::new("org", "mono").with_subdirectory("pkgs/foo");
        let readme = github.readme(&repo).await.unwrap();

        mock.assert_async().await;
        assert_eq!(readme.as_deref(), Some("README"));
    }

    #[tokio::test]
    async fn rate_limit_is_classified() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/psf/requests/releases")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let github = Github::new(&config_for(&server, None)).unwrap();
        let result =
            github.list_releases(&RepoRef::new("psf", "requests")).await;

        assert!(matches!(result, Err(AnvilError::RateLimitExceeded)));
    }
}
