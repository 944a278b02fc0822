//! Phase handlers and the routing table that connects them.
//!
//! Each handler is a function of the current state: it receives a snapshot,
//! calls whichever collaborators it needs, and returns a complete new state
//! together with the phase to run next. Handlers never see each other; all
//! sequencing comes from the phase each one names and the [`RoutingTable`]
//! lookup performed by the controller.
use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::{
    Result,
    workflow::{
        context::WorkflowContext,
        state::{Phase, WorkflowState},
    },
};

mod analyze;
mod commit;
mod confirm;
mod install;
mod next;
mod rollback;
mod scan;
mod select;

pub use analyze::AnalyzePhase;
pub use commit::CommitPhase;
pub use confirm::ConfirmPhase;
pub use install::InstallPhase;
pub use next::NextPhase;
pub use rollback::RollbackPhase;
pub use scan::ScanPhase;
pub use select::SelectPhase;
pub use test::TestPhase;

/// New state produced by a handler and the phase to route to.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: WorkflowState,
    pub next: Phase,
}

impl Transition {
    pub fn to(next: Phase, state: WorkflowState) -> Self {
        Self { state, next }
    }
}

#[async_trait]
pub trait PhaseHandler: Send + Sync {
    async fn run(
        &self,
        ctx: &WorkflowContext,
        state: &WorkflowState,
    ) -> Result<Transition>;
}

/// Handler for every non-terminal phase.
pub type RoutingTable = BTreeMap<Phase, Box<dyn PhaseHandler>>;

pub fn default_routes() -> RoutingTable {
    let mut routes: RoutingTable = BTreeMap::new();
    routes.insert(Phase::Scan, Box::new(ScanPhase));
    routes.insert(Phase::Select, Box::new(SelectPhase));
    routes.insert(Phase::Analyze, Box::new(AnalyzePhase));
    routes.insert(Phase::Confirm, Box::new(ConfirmPhase));
    routes.insert(Phase::Install, Box::new(InstallPhase));
    routes.insert(Phase::Test, Box::new(TestPhase));
    routes.insert(Phase::Commit, Box::new(CommitPhase));
    routes.insert(Phase::Rollback, Box::new(RollbackPhase));
    routes.insert(Phase::Next, Box::new(NextPhase));
    routes
}
