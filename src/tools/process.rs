use log::*;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};
use tokio::process::Command;

use crate::{Result, error::AnvilError};

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Run `program` with `args` in `cwd`, capturing output. Fails when the
/// program cannot be launched or does not finish within `timeout`; a
/// non-zero exit is reported through [`CommandOutput::success`]. The child
/// is killed if the timeout elapses.
pub async fn run_command<S: AsRef<str>>(
    program: &str,
    args: &[S],
    cwd: &Path,
    timeout: Duration,
) -> Result<CommandOutput> {
    let args = args.iter().map(AsRef::as_ref).collect::<Vec<&str>>();
    debug!("running `{} {}` in {}", program, args.join(" "), cwd.display());

    let child = Command::new(program)
        .args(&args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| {
            AnvilError::command(format!("failed to launch {program}: {err}"))
        })?;

    let output = tokio::time::timeout(timeout, child.wait_with_output()).await??;

    let result = CommandOutput {
        success: output.status.success(),
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    if !result.success {
        debug!("`{program}` exited with {:?}", result.code);
    }

    Ok(result)
}

/// Locate an executable on `PATH`. Files without execute permission are
/// skipped.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
