//! A single reviewer: one analysis kind bound to an optional backend.
//!
//! Every reviewer shares the same calling convention. The changelog is
//! truncated to a character budget, the kind's prompts are rendered, the
//! backend is called under a timeout and its JSON is decoded into the kind's
//! assessment. Any failure along the way is logged and becomes `None` so
//! that one reviewer can never take down the others.
use log::*;
use std::{sync::Arc, time::Duration};

use crate::{
    Result,
    agent::{
        assessment::Assessment,
        backend::{AnalysisBackend, AnalysisRequest},
        kind::AnalysisKind,
        prompts,
    },
    error::AnvilError,
};

/// Default changelog budget in characters.
pub const DEFAULT_MAX_CHANGELOG_CHARS: usize = 25_000;
/// Appended to a changelog cut down to the budget.
pub const TRUNCATION_MARKER: &str = "\n\n...(truncated)...";

/// Everything a reviewer knows about the upgrade under review.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisContext {
    pub package_name: String,
    pub current_version: String,
    pub target_version: String,
    pub changelog: String,
    /// Package symbols referenced by the project's source.
    pub usage_symbols: Vec<String>,
    /// Interpreter version of the project being upgraded.
    pub python_version: String,
    /// Excerpt of the project's configuration file.
    pub project_config: String,
}

/// Cut `changelog` to at most `max_chars` characters, appending
/// [`TRUNCATION_MARKER`] when anything was removed.
pub fn truncate_changelog(changelog: &str, max_chars: usize) -> String {
    match changelog.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &changelog[..cut]),
        None => changelog.to_string(),
    }
}

#[derive(Clone)]
pub struct Analyst {
    kind: AnalysisKind,
    backend: Option<Arc<dyn AnalysisBackend>>,
    max_changelog_chars: usize,
    timeout: Duration,
}

impl Analyst {
    pub fn new(
        kind: AnalysisKind,
        backend: Option<Arc<dyn AnalysisBackend>>,
        max_changelog_chars: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            kind,
            backend,
            max_changelog_chars,
            timeout,
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }

    /// Run the analysis. `None` when no backend is configured or the
    /// backend failed.
    pub async fn analyze(&self, ctx: &AnalysisContext) -> Option<Assessment> {
        let Some(backend) = &self.backend else {
            warn!("[{}] no analysis backend configured, skipping", self.kind);
            return None;
        };

        info!("[{}] analyzing {}", self.kind, ctx.package_name);

        match self.run(backend.as_ref(), ctx).await {
            Ok(assessment) => {
                info!("[{}] analysis complete", self.kind);
                Some(assessment)
            }
            Err(err) => {
                error!("[{}] analysis failed: {err}", self.kind);
                None
            }
        }
    }

    /// Blocking form of [`Analyst::analyze`] for callers outside a runtime.
    pub fn analyze_blocking(&self, ctx: &AnalysisContext) -> Option<Assessment> {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                error!("[{}] unable to start runtime: {err}", self.kind);
                return None;
            }
        };

        runtime.block_on(self.analyze(ctx))
    }

    async fn run(
        &self,
        backend: &dyn AnalysisBackend,
        ctx: &AnalysisContext,
    ) -> Result<Assessment> {
        let changelog = if ctx.changelog.chars().count() > self.max_changelog_chars
        {
            warn!(
                "[{}] truncating changelog to {} chars",
                self.kind, self.max_changelog_chars
            );
            truncate_changelog(&ctx.changelog, self.max_changelog_chars)
        } else {
            ctx.changelog.clone()
        };

        let (system_template, user_template) = self.kind.templates();
        let (system, user) =
            prompts::render(system_template, user_template, ctx, &changelog)?;

        let request = AnalysisRequest {
            kind: self.kind,
            system,
            user,
            schema: self.kind.schema()?,
        };

        let value = tokio::time::timeout(self.timeout, backend.complete(&request))
            .await
            .map_err(|_| AnvilError::Timeout)??;

        self.kind.parse(value)
    }
}
