use async_trait::async_trait;

use crate::{
    Result,
    tools::console::render_assessment,
    workflow::{
        context::WorkflowContext,
        phases::{PhaseHandler, Transition},
        state::{Phase, WorkflowState},
    },
};

/// Asks whether to go ahead with the upgrade.
pub struct ConfirmPhase;

#[async_trait]
impl PhaseHandler for ConfirmPhase {
    async fn run(
        &self,
        ctx: &WorkflowContext,
        state: &WorkflowState,
    ) -> Result<Transition> {
        let mut state = state.clone();
        let pkg = state.current_mut()?;

        ctx.console.show(&format!(
            "\nUpgrade {}: {} -> {}",
            pkg.name, pkg.current_version, pkg.target_version
        ));
        if let Some(assessment) = &pkg.assessment {
            ctx.console.show(&render_assessment(assessment));
        }

        pkg.approved = ctx.console.confirm("Proceed with installation?")?;

        if pkg.approved {
            return Ok(Transition::to(Phase::Install, state));
        }

        let name = pkg.name.clone();
        state.skipped.push(name);
        Ok(Transition::to(Phase::Next, state))
    }
}
