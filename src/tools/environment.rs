use async_trait::async_trait;
use log::*;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

#[cfg(test)]
use mockall::automock;

use crate::tools::process::run_command;

const PIP_TIMEOUT: Duration = Duration::from_secs(30);
const VIRTUALENV_DIRS: [&str; 2] = [".venv", "venv"];
/// Interpreter used when the project has no virtualenv.
pub const SYSTEM_PYTHON: &str = "python3";

/// Interpreters of the project's virtualenvs, in preference order.
pub fn virtualenv_interpreters(project_root: &Path) -> Vec<PathBuf> {
    VIRTUALENV_DIRS
        .iter()
        .map(|dir| project_root.join(dir).join("bin").join("python"))
        .filter(|path| path.is_file())
        .collect()
}

/// The interpreter whose environment anvil inspects, installs into and
/// tests with: the project's virtualenv when it has one, else
/// [`SYSTEM_PYTHON`].
pub fn project_interpreter(project_root: &Path) -> String {
    virtualenv_interpreters(project_root)
        .first()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| SYSTEM_PYTHON.to_string())
}

/// Read-only view of the project's installed environment.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Environment: Send + Sync {
    /// Installed version of `name`, `None` when not installed.
    async fn installed_version(&self, name: &str) -> Option<String>;
    /// Installed packages that declare a dependency on `name`.
    async fn dependents(&self, name: &str) -> Vec<String>;
    /// Version reported by the project's own interpreter.
    async fn interpreter_version(&self) -> Option<String>;
}

/// Field from `pip show` output, `None` when absent or empty.
pub fn pip_show_field(output: &str, field: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let (key, value) = line.split_once(':')?;
        if key.trim().eq_ignore_ascii_case(field) {
            Some(value.trim().to_string()).filter(|v| !v.is_empty())
        } else {
            None
        }
    })
}

/// Version from `python --version` output such as `Python 3.12.1`.
pub fn parse_interpreter_version(output: &str) -> Option<String> {
    output
        .split_whitespace()
        .skip_while(|word| !word.eq_ignore_ascii_case("python"))
        .nth(1)
        .map(String::from)
}

/// Inspects the environment through the project's interpreter and pip.
pub struct PipEnvironment {
    project_root: PathBuf,
}

impl PipEnvironment {
    pub fn new(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
        }
    }

    /// Virtualenv interpreters first, then `python3` on `PATH`.
    fn interpreters(&self) -> Vec<String> {
        virtualenv_interpreters(&self.project_root)
            .iter()
            .map(|path| path.display().to_string())
            .chain(std::iter::once(SYSTEM_PYTHON.to_string()))
            .collect()
    }

    async fn pip_show(&self, name: &str) -> Option<String> {
        let python = project_interpreter(&self.project_root);
        let output = run_command(
            &python,
            &["-m", "pip", "show", name],
            &self.project_root,
            PIP_TIMEOUT,
        )
        .await;

        match output {
            Ok(output) if output.success => Some(output.stdout),
            Ok(_) => {
                debug!("{name} is not installed");
                None
            }
            Err(err) => {
                warn!("failed to inspect {name}: {err}");
                None
            }
        }
    }
}

#[async_trait]
impl Environment for PipEnvironment {
    async fn installed_version(&self, name: &str) -> Option<String> {
        let output = self.pip_show(name).await?;
        pip_show_field(&output, "Version")
    }

    async fn dependents(&self, name: &str) -> Vec<String> {
        let Some(output) = self.pip_show(name).await else {
            return vec![];
        };

        pip_show_field(&output, "Required-by")
            .map(|list| {
                list.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    async fn interpreter_version(&self) -> Option<String> {
        for python in self.interpreters() {
            match run_command(
                &python,
                &["--version"],
                &self.project_root,
                PIP_TIMEOUT,
            )
            .await
            {
                // older interpreters print the version on stderr
                Ok(output) if output.success => {
                    if let Some(version) =
                        parse_interpreter_version(&output.combined())
                    {
                        return Some(version);
                    }
                }
                Ok(_) => {}
                Err(err) => debug!("{python} unavailable: {err}"),
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PIP_SHOW: &str = "\
Name: requests
Version: 2.31.0
Summary: Python HTTP for Humans.
Requires: certifi, charset-normalizer, idna, urllib3
Required-by: httpx-auth, responses
";

    #[test]
    fn reads_pip_show_fields() {
        assert_eq!(
            pip_show_field(PIP_SHOW, "version").as_deref(),
            Some("2.31.0")
        );
        assert_eq!(
            pip_show_field(PIP_SHOW, "Required-by").as_deref(),
            Some("httpx-auth, responses")
        );
        assert_eq!(pip_show_field("Required-by:\n", "Required-by"), None);
        assert_eq!(pip_show_field(PIP_SHOW, "License"), None);
    }

    #[test]
    fn parses_interpreter_version_output() {
        assert_eq!(
            parse_interpreter_version("Python 3.12.1\n").as_deref(),
            Some("3.12.1")
        );
        assert_eq!(parse_interpreter_version("command not found"), None);
    }

    #[test]
    fn prefers_virtualenv_interpreter() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join(".venv").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("python"), "").unwrap();

        let env = PipEnvironment::new(dir.path());
        let interpreters = env.interpreters();

        assert_eq!(interpreters.len(), 2);
        assert!(interpreters[0].ends_with(".venv/bin/python"));
        assert_eq!(interpreters[1], "python3");
        assert_eq!(project_interpreter(dir.path()), interpreters[0]);
    }

    #[test]
    fn falls_back_to_system_python() {
        let dir = TempDir::new().unwrap();
        assert_eq!(project_interpreter(dir.path()), SYSTEM_PYTHON);
    }
}
