//! Adapters around the local Python toolchain and the terminal.
//!
//! Everything the upgrade workflow does to the outside world besides HTTP
//! lives here behind a trait so the workflow can be driven by mocks in
//! tests: installing packages, running the test suite, inspecting the
//! installed environment, and talking to the user.

/// Terminal prompts and rendering.
pub mod console;
/// Installed package and interpreter inspection via pip.
pub mod environment;
/// Trial and persisted package installation.
pub mod installer;
/// Subprocess execution with timeouts.
pub mod process;
/// Test suite execution.
pub mod runner;
/// Source scan for how a project uses a package.
pub mod usage;
