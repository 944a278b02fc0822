//! Interactive upgrade command.
use log::*;
use std::path::Path;

use crate::{
    Result,
    cli::AnalysisArgs,
    command::common,
    config::AnvilConfig,
    tools::console::{Console, TerminalConsole},
    workflow::{
        controller::PhaseController,
        state::{WorkflowState, WorkflowSummary},
    },
};

/// Run the full upgrade workflow for the project at `path` and print the
/// summary.
pub async fn execute(
    path: &Path,
    analysis: &AnalysisArgs,
    mut config: AnvilConfig,
) -> Result<()> {
    analysis.apply(&mut config)?;
    let root = common::resolve_root(path)?;
    let controller = PhaseController::new(common::build_context(&config, &root)?);

    let summary = run(&controller, WorkflowState::new(root)).await;
    TerminalConsole.show(&summary.to_string());

    Ok(())
}

/// Drive `state` to completion.
pub async fn run(
    controller: &PhaseController,
    state: WorkflowState,
) -> WorkflowSummary {
    info!("starting upgrade workflow in {}", state.project_root.display());
    controller.execute(state).await
}
