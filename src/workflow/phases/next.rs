use async_trait::async_trait;

use crate::{
    Result,
    workflow::{
        context::WorkflowContext,
        phases::{PhaseHandler, Transition},
        state::{Phase, WorkflowState},
    },
};

/// Advances to the next selected package or finishes.
pub struct NextPhase;

#[async_trait]
impl PhaseHandler for NextPhase {
    async fn run(
        &self,
        _ctx: &WorkflowContext,
        state: &WorkflowState,
    ) -> Result<Transition> {
        let mut state = state.clone();
        let next_index = state.current_index + 1;

        if next_index < state.packages.len() {
            state.current_index = next_index;
            return Ok(Transition::to(Phase::Analyze, state));
        }

        Ok(Transition::to(Phase::Done, state))
    }
}
