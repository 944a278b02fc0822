use async_trait::async_trait;
use log::*;

use crate::{
    Result,
    workflow::{
        context::WorkflowContext,
        phases::{PhaseHandler, Transition, select::MISSING_VERSION},
        state::{Phase, WorkflowState},
    },
};

/// Offers to restore the previous version after a failed test run. The
/// package is failed either way.
pub struct RollbackPhase;

#[async_trait]
impl PhaseHandler for RollbackPhase {
    async fn run(
        &self,
        ctx: &WorkflowContext,
        state: &WorkflowState,
    ) -> Result<Transition> {
        let mut state = state.clone();
        let pkg = state.current_mut()?;

        let revert = ctx.console.confirm(&format!(
            "Tests failed. Rollback to {}?",
            pkg.current_version
        ))?;

        pkg.error = if !revert {
            ctx.console.show("  Keeping failed upgrade");
            Some(format!("Tests failed, kept {}", pkg.target_version))
        } else if pkg.current_version == MISSING_VERSION {
            ctx.console.show("  No previous version to restore");
            Some(format!(
                "Tests failed, no previous version to restore, environment \
                 left at {}",
                pkg.target_version
            ))
        } else {
            ctx.console.show(&format!(
                "  Rolling back to {}=={}...",
                pkg.name, pkg.current_version
            ));

            if ctx
                .installer
                .install(&pkg.name, &pkg.current_version, false)
                .await
            {
                ctx.console.show("  Rollback successful");
                pkg.installed = false;
                Some(format!("Tests failed, rolled back to {}", pkg.current_version))
            } else {
                error!(
                    "{}: rollback to {} failed, environment left at {}",
                    pkg.name, pkg.current_version, pkg.target_version
                );
                ctx.console.show("  Rollback failed!");
                Some(format!(
                    "Rollback failed, environment left at {}",
                    pkg.target_version
                ))
            }
        };

        let name = pkg.name.clone();
        state.failed.push(name);
        Ok(Transition::to(Phase::Next, state))
    }
}
