use log::*;

use crate::workflow::{
    context::WorkflowContext,
    phases::{RoutingTable, default_routes},
    state::{Phase, WorkflowState, WorkflowSummary},
};

/// Drives a [`WorkflowState`] through the phase handlers one step at a time
/// until it reaches [`Phase::Done`].
pub struct PhaseController {
    ctx: WorkflowContext,
    routes: RoutingTable,
}

impl PhaseController {
    pub fn new(ctx: WorkflowContext) -> Self {
        Self::with_routes(ctx, default_routes())
    }

    pub fn with_routes(ctx: WorkflowContext, routes: RoutingTable) -> Self {
        Self { ctx, routes }
    }

    /// Run exactly one phase handler and apply its transition. A failing
    /// per-package handler fails that package and moves on; any other
    /// failure ends the run.
    pub async fn step(&self, state: WorkflowState) -> WorkflowState {
        if state.phase.is_terminal() {
            return state;
        }

        if let Err(err) = state.validate() {
            return abort(state, err.to_string());
        }

        let Some(handler) = self.routes.get(&state.phase) else {
            let message = format!("no handler registered for phase {}", state.phase);
            return abort(state, message);
        };

        debug!("entering phase {}", state.phase);

        match handler.run(&self.ctx, &state).await {
            Ok(transition) => {
                let mut next = transition.state;
                next.phase = transition.next;
                next
            }
            Err(err) => fail_package(state, err.to_string()),
        }
    }

    /// Step until done and return the final state.
    pub async fn run(&self, mut state: WorkflowState) -> WorkflowState {
        while !state.phase.is_terminal() {
            state = self.step(state).await;
        }
        info!(
            "workflow finished: {} completed, {} failed, {} skipped",
            state.completed.len(),
            state.failed.len(),
            state.skipped.len()
        );
        state
    }

    /// Run `state` to completion and summarize.
    pub async fn execute(&self, state: WorkflowState) -> WorkflowSummary {
        self.run(state).await.summary()
    }
}

fn abort(mut state: WorkflowState, message: String) -> WorkflowState {
    error!("workflow aborted in phase {}: {message}", state.phase);
    state.errors.push(message);
    state.phase = Phase::Done;
    state
}

fn fail_package(mut state: WorkflowState, message: String) -> WorkflowState {
    let phase = state.phase;

    if !phase.is_per_package() || phase == Phase::Next {
        return abort(state, message);
    }

    let index = state.current_index;
    let Some(pkg) = state.packages.get_mut(index) else {
        return abort(state, message);
    };

    error!("{}: {phase} failed: {message}", pkg.name);
    pkg.error = Some(format!("{phase} failed: {message}"));
    let name = pkg.name.clone();

    if !state.is_settled(&name) {
        state.failed.push(name);
    }
    state.phase = Phase::Next;
    state
}
