use async_trait::async_trait;
use log::*;

use crate::{
    Result,
    manifest::same_package,
    workflow::{
        context::WorkflowContext,
        phases::{PhaseHandler, Transition},
        state::{PackageUpgradeState, Phase, WorkflowState},
    },
};

/// Shown as the current version of a package that is not installed.
pub const MISSING_VERSION: &str = "missing";

/// Lets the user choose packages and prepares one upgrade state per choice.
pub struct SelectPhase;

#[async_trait]
impl PhaseHandler for SelectPhase {
    async fn run(
        &self,
        ctx: &WorkflowContext,
        state: &WorkflowState,
    ) -> Result<Transition> {
        let mut state = state.clone();

        let selected = match ctx.console.select_packages(&state.dashboard_rows) {
            Ok(selected) => selected,
            Err(err) => {
                error!("package selection failed: {err}");
                state.errors.push(err.to_string());
                state.selected_package_names = vec![];
                return Ok(Transition::to(Phase::Done, state));
            }
        };

        let mut packages = vec![];
        for name in &selected {
            let Some(row) = state
                .dashboard_rows
                .iter()
                .find(|row| same_package(&row.name, name))
            else {
                warn!("{name} is not a declared dependency, ignoring");
                continue;
            };

            let Some(target) = &row.latest else {
                state
                    .errors
                    .push(format!("{name}: latest version unknown, not upgraded"));
                continue;
            };

            let pinned = state
                .dependencies
                .iter()
                .find(|dep| same_package(&dep.name, name))
                .and_then(|dep| dep.current_version.clone());

            let current = row
                .installed
                .clone()
                .or(pinned)
                .unwrap_or_else(|| MISSING_VERSION.to_string());

            packages.push(PackageUpgradeState::new(&row.name, &current, target));
        }

        state.selected_package_names = selected;

        if packages.is_empty() {
            info!("no packages selected");
            state.packages = vec![];
            return Ok(Transition::to(Phase::Done, state));
        }

        state.packages = packages;
        state.current_index = 0;

        Ok(Transition::to(Phase::Analyze, state))
    }
}
