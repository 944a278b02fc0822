use async_trait::async_trait;
use log::*;
use std::collections::HashSet;

use crate::{
    Result,
    workflow::{
        context::WorkflowContext,
        phases::{PhaseHandler, Transition},
        state::{DashboardRow, DependencyStatus, Phase, WorkflowState},
    },
};

/// Reads the manifests and builds the dashboard.
pub struct ScanPhase;

#[async_trait]
impl PhaseHandler for ScanPhase {
    async fn run(
        &self,
        ctx: &WorkflowContext,
        state: &WorkflowState,
    ) -> Result<Transition> {
        let mut state = state.clone();
        let dependencies = ctx.manifests.parse(&state.project_root)?;
        info!("found {} dependencies", dependencies.len());

        let mut seen = HashSet::new();
        let mut rows = vec![];

        for dep in &dependencies {
            // declared in more than one manifest
            if !seen.insert(dep.key()) {
                continue;
            }

            let latest = ctx.registry.get_latest_version(&dep.name).await;
            let installed = ctx.environment.installed_version(&dep.name).await;
            let status =
                DependencyStatus::classify(installed.as_deref(), latest.as_deref());

            debug!("{}: installed={installed:?} latest={latest:?} {status}", dep.name);

            rows.push(DashboardRow {
                name: dep.name.clone(),
                specifier: dep.specifier.clone(),
                installed,
                latest,
                status,
            });
        }

        state.dependencies = dependencies;
        state.dashboard_rows = rows;

        Ok(Transition::to(Phase::Select, state))
    }
}
