//! Dependency dashboard command.
use log::*;
use std::path::Path;

use crate::{
    Result,
    cli::AnalysisArgs,
    command::{common, upgrade},
    config::AnvilConfig,
    error::AnvilError,
    tools::console::{Console, TerminalConsole, render_dashboard},
    workflow::{
        controller::PhaseController,
        state::{Phase, WorkflowState},
    },
};

/// Print the dashboard for the project at `path`. With `apply` the scanned
/// state continues into the interactive upgrade.
pub async fn execute(
    path: &Path,
    apply: bool,
    analysis: &AnalysisArgs,
    mut config: AnvilConfig,
) -> Result<()> {
    analysis.apply(&mut config)?;
    let root = common::resolve_root(path)?;
    let controller = PhaseController::new(common::build_context(&config, &root)?);
    let console = TerminalConsole;

    let state = scan(&controller, WorkflowState::new(root)).await?;
    console.show(&render_dashboard(&state.dashboard_rows));

    if !apply {
        info!("dry run: no changes made");
        return Ok(());
    }

    let summary = upgrade::run(&controller, state).await;
    console.show(&summary.to_string());

    Ok(())
}

/// Run the scan phase only, surfacing a failed scan as an error.
pub async fn scan(
    controller: &PhaseController,
    state: WorkflowState,
) -> Result<WorkflowState> {
    let state = controller.step(state).await;

    if state.phase != Phase::Select {
        let message = state
            .errors
            .last()
            .cloned()
            .unwrap_or_else(|| "scan did not complete".to_string());
        return Err(AnvilError::workflow(message));
    }

    Ok(state)
}
