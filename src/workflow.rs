//! The interactive upgrade workflow.
//!
//! A run starts in [`state::Phase::Scan`] and walks the selected packages
//! one at a time through analysis, confirmation, a trial install, the test
//! suite and finally commit or rollback:
//!
//! ```text
//! scan -> select -> analyze -> confirm -> install -> test -> commit -> next
//!            |                    |          |          \-> rollback -> next
//!            v                    \-> next   \-> next
//!          done                                     next -> analyze | done
//! ```
//!
//! Each phase handler returns the complete next state and the phase to run
//! next; the [`controller::PhaseController`] owns the loop and the routing
//! table. A failure while handling one package marks that package failed
//! and moves on, it never ends the run.

/// Collaborators available to phase handlers.
pub mod context;

/// Step loop and failure handling.
pub mod controller;

/// One handler per phase plus the routing table.
pub mod phases;

/// Detection of the project's interpreter version.
pub mod python_version;

/// Workflow, package and dashboard state.
pub mod state;
