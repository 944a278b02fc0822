//! Anvil: changelog-aware, AI assisted dependency upgrades for Python
//! projects.
pub mod agent;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod manifest;
pub mod source;
pub mod tools;
pub mod version;
pub mod workflow;

pub use cli::{Args, Command};
pub use error::{AnvilError, Result};
