//! Changelog analysis by independent AI reviewers and the aggregation of
//! their verdicts into one upgrade recommendation.

/// Per-package aggregation of reviewer results.
pub mod aggregate;

/// One reviewer bound to a backend.
pub mod analyst;

/// Structured verdicts returned by the reviewers.
pub mod assessment;

/// Model backends that produce structured JSON.
pub mod backend;

/// The closed set of review kinds and their schemas.
pub mod kind;

/// Runs every reviewer for a package and aggregates the results.
pub mod orchestrator;

/// Prompt templates for each review kind.
pub mod prompts;
