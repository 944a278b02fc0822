use async_trait::async_trait;
use log::*;
use std::fs;

use crate::{
    Result,
    agent::analyst::AnalysisContext,
    manifest::pyproject,
    tools::{console::changelog_preview, usage::scan_package_usage},
    workflow::{
        context::WorkflowContext,
        phases::{PhaseHandler, Transition},
        python_version,
        state::{Phase, WorkflowState},
    },
};

/// Characters of project configuration handed to the reviewers.
pub const PROJECT_CONFIG_CHARS: usize = 5000;

fn project_config(state: &WorkflowState) -> String {
    fs::read_to_string(state.project_root.join(pyproject::FILE_NAME))
        .map(|content| content.chars().take(PROJECT_CONFIG_CHARS).collect())
        .unwrap_or_default()
}

/// Resolves the changelog and runs the reviewers. Always continues to
/// confirmation; the verdict informs the prompt, not the route.
pub struct AnalyzePhase;

#[async_trait]
impl PhaseHandler for AnalyzePhase {
    async fn run(
        &self,
        ctx: &WorkflowContext,
        state: &WorkflowState,
    ) -> Result<Transition> {
        let mut state = state.clone();
        let project_root = state.project_root.clone();
        let config = project_config(&state);
        let pkg = state.current_mut()?;

        ctx.console.show(&format!("\nAnalyzing {}...", pkg.name));

        pkg.dependents = ctx.environment.dependents(&pkg.name).await;
        if !pkg.dependents.is_empty() {
            ctx.console
                .show(&format!("  Dependents: {}", pkg.dependents.join(", ")));
        }

        pkg.changelog = ctx
            .changelogs
            .get_changelog(&pkg.name, &pkg.current_version, &pkg.target_version)
            .await;

        let Some(changelog) = pkg.changelog.clone() else {
            ctx.console.show("  No changelog found");
            pkg.assessment = None;
            return Ok(Transition::to(Phase::Confirm, state));
        };

        ctx.console.show(&changelog_preview(&changelog));

        let usage_symbols = scan_package_usage(&project_root, &pkg.name);
        if !usage_symbols.is_empty() {
            ctx.console
                .show(&format!("  Found {} usages", usage_symbols.len()));
        }

        let python_version =
            python_version::detect(&project_root, ctx.environment.as_ref()).await;
        debug!("analyzing against python {python_version}");

        let analysis = AnalysisContext {
            package_name: pkg.name.clone(),
            current_version: pkg.current_version.clone(),
            target_version: pkg.target_version.clone(),
            changelog,
            usage_symbols,
            python_version,
            project_config: config,
        };

        ctx.console.show("  Running analysis...");
        pkg.assessment = Some(ctx.analyzer.assess(&analysis).await);

        Ok(Transition::to(Phase::Confirm, state))
    }
}
