use async_trait::async_trait;

use crate::{
    Result,
    workflow::{
        context::WorkflowContext,
        phases::{PhaseHandler, Transition},
        state::{Phase, WorkflowState},
    },
};

/// Trial install of the target version, environment only.
pub struct InstallPhase;

#[async_trait]
impl PhaseHandler for InstallPhase {
    async fn run(
        &self,
        ctx: &WorkflowContext,
        state: &WorkflowState,
    ) -> Result<Transition> {
        let mut state = state.clone();
        let pkg = state.current_mut()?;

        ctx.console.show(&format!(
            "  Installing {}=={} (trial)...",
            pkg.name, pkg.target_version
        ));

        pkg.installed = ctx
            .installer
            .install(&pkg.name, &pkg.target_version, false)
            .await;

        if pkg.installed {
            ctx.console.show("  Trial installation successful");
            return Ok(Transition::to(Phase::Test, state));
        }

        ctx.console.show("  Installation failed");
        pkg.error = Some("Installation failed".into());
        let name = pkg.name.clone();
        state.failed.push(name);
        Ok(Transition::to(Phase::Next, state))
    }
}
