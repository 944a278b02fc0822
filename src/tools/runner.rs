use async_trait::async_trait;
use log::*;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

#[cfg(test)]
use mockall::automock;

use crate::tools::{environment::project_interpreter, process::run_command};

pub const TEST_TIMEOUT: Duration = Duration::from_secs(300);
pub const LAUNCH_FAILURE: &str = "Could not launch pytest. Is it installed?";

/// Launch commands in order: pytest as a module of the project's
/// interpreter, then a `pytest` executable on `PATH`.
pub fn pytest_commands(project_root: &Path) -> Vec<Vec<String>> {
    vec![
        vec![
            project_interpreter(project_root),
            "-m".to_string(),
            "pytest".to_string(),
        ],
        vec!["pytest".to_string()],
    ]
}

/// Runs the project's test suite.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Whether the suite passed, plus its combined output.
    async fn run_tests(&self) -> (bool, String);
}

/// Runs pytest, trying each launch command until one starts.
pub struct PytestRunner {
    project_root: PathBuf,
    commands: Vec<Vec<String>>,
    timeout: Duration,
}

impl PytestRunner {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            commands: pytest_commands(project_root),
            timeout: TEST_TIMEOUT,
        }
    }
}

#[async_trait]
impl TestRunner for PytestRunner {
    async fn run_tests(&self) -> (bool, String) {
        for command in &self.commands {
            let Some((program, args)) = command.split_first() else {
                continue;
            };

            match run_command(program, args, &self.project_root, self.timeout)
                .await
            {
                // interpreter present but pytest module missing
                Ok(output) if output.stderr.contains("No module named pytest") => {
                    debug!("{program} has no pytest module");
                }
                Ok(output) => {
                    info!(
                        "test run finished: {}",
                        if output.success { "passed" } else { "failed" }
                    );
                    return (output.success, output.combined());
                }
                Err(err) => {
                    warn!("`{}` did not complete: {err}", command.join(" "));
                }
            }
        }

        (false, LAUNCH_FAILURE.to_string())
    }
}
