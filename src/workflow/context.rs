use derive_builder::Builder;
use std::sync::Arc;

use crate::{
    Result,
    agent::orchestrator::UpgradeAnalyzer,
    error::AnvilError,
    manifest::ManifestReader,
    source::{metadata::RegistryMetadata, resolver::ChangelogSource},
    tools::{
        console::Console, environment::Environment, installer::PackageInstaller,
        runner::TestRunner,
    },
};

/// Collaborators the phase handlers talk to.
#[derive(Builder)]
#[builder(pattern = "owned", build_fn(private, name = "_build"))]
pub struct WorkflowContext {
    pub manifests: Box<dyn ManifestReader>,
    pub registry: Arc<RegistryMetadata>,
    pub environment: Box<dyn Environment>,
    pub changelogs: Box<dyn ChangelogSource>,
    pub analyzer: Box<dyn UpgradeAnalyzer>,
    pub installer: Box<dyn PackageInstaller>,
    pub tests: Box<dyn TestRunner>,
    pub console: Box<dyn Console>,
}

impl WorkflowContextBuilder {
    pub fn build(self) -> Result<WorkflowContext> {
        self._build().map_err(|e| {
            AnvilError::invalid_config(format!(
                "Failed to build workflow context: {}",
                e
            ))
        })
    }
}

impl WorkflowContext {
    pub fn builder() -> WorkflowContextBuilder {
        WorkflowContextBuilder::default()
    }
}
