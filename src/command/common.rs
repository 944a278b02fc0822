//! Common functionality shared between commands
use log::*;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    Result,
    agent::{backend::backend_from_config, orchestrator::Orchestrator},
    config::AnvilConfig,
    error::AnvilError,
    manifest::ProjectManifests,
    source::{
        changelog::ChangelogFinder, config::SourceConfig, github::Github,
        metadata::RegistryMetadata, pypi::Pypi, resolver::ChangelogResolver,
    },
    tools::{
        console::TerminalConsole, environment::PipEnvironment,
        installer::PipInstaller, runner::PytestRunner,
    },
    workflow::context::WorkflowContext,
};

/// Canonical project root, rejecting paths that are not directories.
pub fn resolve_root(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(AnvilError::InvalidArgs(format!(
            "project path is not a directory: {}",
            path.display()
        )));
    }

    let root = path.canonicalize()?;
    debug!("project root: {}", root.display());
    Ok(root)
}

/// Registry metadata and the changelog resolver sharing it.
pub fn build_sources(
    config: &SourceConfig,
) -> Result<(Arc<RegistryMetadata>, ChangelogResolver)> {
    let registry = Arc::new(RegistryMetadata::new(Box::new(Pypi::new(config)?)));
    let finder = ChangelogFinder::new(Box::new(Github::new(config)?));
    let resolver = ChangelogResolver::new(Arc::clone(&registry), finder);
    Ok((registry, resolver))
}

/// Production collaborators for a workflow run in `root`.
pub fn build_context(config: &AnvilConfig, root: &Path) -> Result<WorkflowContext> {
    let (registry, changelogs) = build_sources(&config.source)?;
    let backend = backend_from_config(&config.llm)?;

    WorkflowContext::builder()
        .manifests(Box::new(ProjectManifests))
        .registry(registry)
        .environment(Box::new(PipEnvironment::new(root)))
        .changelogs(Box::new(changelogs))
        .analyzer(Box::new(Orchestrator::new(backend, config.analysis)))
        .installer(Box::new(PipInstaller::new(root)))
        .tests(Box::new(PytestRunner::new(root)))
        .console(Box::new(TerminalConsole))
        .build()
}
