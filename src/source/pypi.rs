//! Package registry client for the PyPI JSON API.
use async_trait::async_trait;
use log::*;
use reqwest::{Client, StatusCode, Url};

use crate::{
    Result,
    source::{
        config::SourceConfig,
        traits::PackageRegistry,
        types::{ProjectDocument, ProjectInfo},
    },
};

/// Unauthenticated client for `{registry}/{package}/json`.
pub struct Pypi {
    base_url: Url,
    client: Client,
}

impl Pypi {
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let base_url = Url::parse(&format!(
            "{}/",
            config.registry_url.trim_end_matches('/')
        ))?;

        Ok(Self { base_url, client })
    }
}

#[async_trait]
impl PackageRegistry for Pypi {
    async fn project_info(&self, package: &str) -> Result<Option<ProjectInfo>> {
        let url = self.base_url.join(&format!("{package}/json"))?;
        debug!("fetching registry metadata: {url}");
        let request = self.client.get(url).build()?;
        let response = self.client.execute(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let result = response.error_for_status()?;
        let document: ProjectDocument = result.json().await?;
        Ok(Some(document.info))
    }
}
