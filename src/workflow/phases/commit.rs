use async_trait::async_trait;
use log::*;

use crate::{
    Result,
    workflow::{
        context::WorkflowContext,
        phases::{PhaseHandler, Transition},
        state::{Phase, WorkflowState},
    },
};

/// Persists the upgrade into the manifest. The package counts as completed
/// even when only the manifest write fails, since the install itself works.
pub struct CommitPhase;

#[async_trait]
impl PhaseHandler for CommitPhase {
    async fn run(
        &self,
        ctx: &WorkflowContext,
        state: &WorkflowState,
    ) -> Result<Transition> {
        let mut state = state.clone();
        let pkg = state.current_mut()?;

        ctx.console.show("  Updating manifest...");
        pkg.committed = ctx
            .installer
            .install(&pkg.name, &pkg.target_version, true)
            .await;

        if pkg.committed {
            ctx.console.show("  Upgrade committed");
        } else {
            warn!("{}: manifest update failed", pkg.name);
            ctx.console
                .show("  Manifest update failed, but package is installed");
            pkg.error = Some("Manifest update failed".into());
        }

        let name = pkg.name.clone();
        state.completed.push(name);
        Ok(Transition::to(Phase::Next, state))
    }
}
