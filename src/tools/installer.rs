use async_trait::async_trait;
use log::*;
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

#[cfg(test)]
use mockall::automock;

use crate::{
    manifest::{pyproject, requirements},
    tools::{
        environment::project_interpreter,
        process::{find_executable, run_command},
    },
};

/// Upper bound on a single install command.
pub const INSTALL_TIMEOUT: Duration = Duration::from_secs(600);

/// Installs a pinned version of a package into the project environment.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Install `name==version`. With `persist` the version is also written
    /// to the project's manifest. Returns whether everything succeeded.
    async fn install(&self, name: &str, version: &str, persist: bool) -> bool;
}

/// What is available in and around the project, decides the install
/// command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectLayout {
    /// Interpreter of the environment being upgraded.
    pub python: String,
    pub has_uv: bool,
    pub has_poetry: bool,
    pub poetry_project: bool,
    pub has_pyproject: bool,
}

impl ProjectLayout {
    pub fn detect(project_root: &Path) -> Self {
        let pyproject_path = project_root.join(pyproject::FILE_NAME);
        let pyproject_content = fs::read_to_string(&pyproject_path).ok();

        let poetry_project = project_root.join("poetry.lock").exists()
            || pyproject_content
                .as_deref()
                .is_some_and(pyproject::is_poetry_project);

        Self {
            python: project_interpreter(project_root),
            has_uv: find_executable("uv").is_some(),
            has_poetry: find_executable("poetry").is_some(),
            poetry_project,
            has_pyproject: pyproject_content.is_some(),
        }
    }
}

/// Command to run plus whether manifest pins must be rewritten afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    pub command: Vec<String>,
    pub rewrite_pins: bool,
}

fn trial_command(layout: &ProjectLayout, requirement: &str) -> Vec<String> {
    let python = layout.python.as_str();
    let command: &[&str] = if layout.has_uv {
        &["uv", "pip", "install", "--python", python, requirement]
    } else {
        &[python, "-m", "pip", "install", requirement]
    };
    command.iter().map(|s| s.to_string()).collect()
}

/// Decide how to install `name==version`.
///
/// Trial installs only touch the environment. Persisted installs prefer the
/// project's own manager (`poetry add`, `uv add`) which updates the manifest
/// itself, otherwise they fall back to the trial command and rewrite pins.
pub fn plan_install(
    layout: &ProjectLayout,
    name: &str,
    version: &str,
    persist: bool,
) -> InstallPlan {
    let requirement = format!("{name}=={version}");

    if !persist {
        return InstallPlan {
            command: trial_command(layout, &requirement),
            rewrite_pins: false,
        };
    }

    if layout.poetry_project && layout.has_poetry {
        return InstallPlan {
            command: vec!["poetry".into(), "add".into(), requirement],
            rewrite_pins: false,
        };
    }

    if layout.has_uv && layout.has_pyproject {
        return InstallPlan {
            command: vec!["uv".into(), "add".into(), requirement],
            rewrite_pins: false,
        };
    }

    InstallPlan {
        command: trial_command(layout, &requirement),
        rewrite_pins: true,
    }
}

/// Installs through uv, pip or poetry depending on the project.
pub struct PipInstaller {
    project_root: PathBuf,
    layout: ProjectLayout,
    timeout: Duration,
}

impl PipInstaller {
    pub fn new(project_root: &Path) -> Self {
        let layout = ProjectLayout::detect(project_root);
        debug!("detected project layout: {layout:?}");
        Self {
            project_root: project_root.to_path_buf(),
            layout,
            timeout: INSTALL_TIMEOUT,
        }
    }

    /// Rewrite `name==old` pins in the manifests. Missing pins are fine,
    /// only I/O and parse failures count as failure.
    fn rewrite_pins(&self, name: &str, version: &str) -> bool {
        let requirements_path = self.project_root.join(requirements::FILE_NAME);
        let pyproject_path = self.project_root.join(pyproject::FILE_NAME);

        let results = [
            requirements::update_pin_in_file(&requirements_path, name, version),
            pyproject::update_pin_in_file(&pyproject_path, name, version),
        ];

        let mut ok = true;
        for result in results {
            if let Err(err) = result {
                error!("failed to update pin for {name}: {err}");
                ok = false;
            }
        }
        ok
    }
}

#[async_trait]
impl PackageInstaller for PipInstaller {
    async fn install(&self, name: &str, version: &str, persist: bool) -> bool {
        let plan = plan_install(&self.layout, name, version, persist);
        info!("installing with: {}", plan.command.join(" "));

        let Some((program, args)) = plan.command.split_first() else {
            return false;
        };

        match run_command(program, args, &self.project_root, self.timeout).await
        {
            Ok(output) if output.success => {}
            Ok(output) => {
                warn!(
                    "install of {name}=={version} failed: {}",
                    output.stderr.trim()
                );
                return false;
            }
            Err(err) => {
                warn!("install of {name}=={version} failed: {err}");
                return false;
            }
        }

        if plan.rewrite_pins {
            return self.rewrite_pins(name, version);
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn layout() -> ProjectLayout {
        ProjectLayout {
            python: "python3".into(),
            ..Default::default()
        }
    }

    #[test]
    fn trial_install_prefers_uv() {
        let with_uv = ProjectLayout {
            has_uv: true,
            ..layout()
        };

        let plan = plan_install(&with_uv, "requests", "2.31.0", false);
        assert_eq!(
            plan.command,
            ["uv", "pip", "install", "--python", "python3", "requests==2.31.0"]
        );
        assert!(!plan.rewrite_pins);

        let plan = plan_install(&layout(), "requests", "2.31.0", false);
        assert_eq!(
            plan.command,
            ["python3", "-m", "pip", "install", "requests==2.31.0"]
        );
    }

    #[test]
    fn persisted_install_uses_project_manager() {
        let poetry = ProjectLayout {
            has_uv: true,
            has_poetry: true,
            poetry_project: true,
            has_pyproject: true,
            ..layout()
        };
        let plan = plan_install(&poetry, "httpx", "0.28.1", true);
        assert_eq!(plan.command, ["poetry", "add", "httpx==0.28.1"]);

        let uv = ProjectLayout {
            has_uv: true,
            has_pyproject: true,
            ..layout()
        };
        let plan = plan_install(&uv, "httpx", "0.28.1", true);
        assert_eq!(plan.command, ["uv", "add", "httpx==0.28.1"]);
        assert!(!plan.rewrite_pins);
    }

    #[test]
    fn persisted_install_falls_back_to_pin_rewrite() {
        // poetry project but no poetry binary
        let no_poetry = ProjectLayout {
            poetry_project: true,
            has_pyproject: true,
            ..layout()
        };

        let plan = plan_install(&no_poetry, "requests", "2.31.0", true);
        assert_eq!(
            plan.command,
            ["python3", "-m", "pip", "install", "requests==2.31.0"]
        );
        assert!(plan.rewrite_pins);
    }

    #[test]
    fn installs_with_the_project_virtualenv() {
        let dir = TempDir::new().unwrap();
        let bin = dir.path().join(".venv").join("bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("python"), "").unwrap();
        let venv_python = bin.join("python").display().to_string();

        let detected = ProjectLayout::detect(dir.path());
        assert_eq!(detected.python, venv_python);

        let pip = ProjectLayout {
            has_uv: false,
            ..detected.clone()
        };
        let plan = plan_install(&pip, "requests", "2.30.0", false);
        assert_eq!(
            plan.command,
            [venv_python.as_str(), "-m", "pip", "install", "requests==2.30.0"]
        );

        let uv = ProjectLayout {
            has_uv: true,
            ..detected
        };
        let plan = plan_install(&uv, "requests", "2.30.0", false);
        assert_eq!(
            plan.command[..5],
            ["uv", "pip", "install", "--python", venv_python.as_str()]
        );
    }

    #[test]
    fn detects_poetry_project_from_lock_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("poetry.lock"), "").unwrap();

        let detected = ProjectLayout::detect(dir.path());
        assert!(detected.poetry_project);
        assert!(!detected.has_pyproject);
    }

    #[test]
    fn rewrites_requirements_pin() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(requirements::FILE_NAME);
        fs::write(&path, "requests==2.30.0\nrich\n").unwrap();

        let installer = PipInstaller::new(dir.path());
        assert!(installer.rewrite_pins("requests", "2.31.0"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "requests==2.31.0\nrich\n"
        );
    }
}
