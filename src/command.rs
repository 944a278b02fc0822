//! Command execution for Anvil.
//!
//! Each subcommand lives in its own module and follows the same shape:
//! resolve the project root, wire the production collaborators from the
//! [`crate::config::AnvilConfig`], run, and report through the console.
//! Upgrade outcomes are reported in the printed summary rather than the
//! exit status, since a partially successful run is the normal case.

/// Collaborator wiring shared by the commands.
pub mod common;

/// Dependency dashboard, optionally followed by the upgrade workflow.
pub mod check;

/// Interactive upgrade of selected dependencies.
pub mod upgrade;

/// Changelog lookup for a single package range.
pub mod changelog;
