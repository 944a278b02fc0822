//! Interpreter version of the project being upgraded (not anvil's own).
use log::*;
use regex::Regex;
use std::{fs, path::Path, sync::LazyLock};

use crate::{
    manifest::pyproject, tools::environment::Environment, version::LooseVersion,
};

pub const VERSION_FILE: &str = ".python-version";

/// Reported when nothing better is known. Never treated as a concrete
/// version by compatibility checks.
pub const FALLBACK_PYTHON_VERSION: &str = "3.x";

static LOWER_BOUND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:>=|~=|==|\^|~)\s*(\d+(?:\.\d+)*)").unwrap()
});

/// First usable line of a `.python-version` file.
pub fn from_version_file(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.strip_prefix("python-").unwrap_or(line))
        .find(|line| LooseVersion::parse(line).is_some())
        .map(String::from)
}

/// Lower bound of an interpreter constraint such as `>=3.9,<4`.
pub fn lower_bound(constraint: &str) -> Option<String> {
    LOWER_BOUND
        .captures(constraint)
        .map(|caps| caps[1].to_string())
}

/// Detect in order: `.python-version`, the lower bound of the declared
/// interpreter constraint, the project's interpreter, then
/// [`FALLBACK_PYTHON_VERSION`].
pub async fn detect(project_root: &Path, environment: &dyn Environment) -> String {
    if let Ok(content) = fs::read_to_string(project_root.join(VERSION_FILE))
        && let Some(version) = from_version_file(&content)
    {
        debug!("python {version} from {VERSION_FILE}");
        return version;
    }

    if let Ok(content) =
        fs::read_to_string(project_root.join(pyproject::FILE_NAME))
        && let Some(constraint) = pyproject::python_constraint(&content)
        && let Some(version) = lower_bound(&constraint)
    {
        debug!("python {version} from constraint {constraint}");
        return version;
    }

    if let Some(version) = environment.interpreter_version().await {
        debug!("python {version} from project interpreter");
        return version;
    }

    warn!("unable to determine project python version");
    FALLBACK_PYTHON_VERSION.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::environment::MockEnvironment;
    use tempfile::TempDir;

    fn no_interpreter() -> MockEnvironment {
        let mut env = MockEnvironment::new();
        env.expect_interpreter_version().returning(|| None);
        env
    }

    #[test]
    fn extracts_lower_bounds() {
        assert_eq!(lower_bound(">=3.9,<4").as_deref(), Some("3.9"));
        assert_eq!(lower_bound("<4, >=3.10").as_deref(), Some("3.10"));
        assert_eq!(lower_bound("^3.11").as_deref(), Some("3.11"));
        assert_eq!(lower_bound("~=3.8.1").as_deref(), Some("3.8.1"));
        assert_eq!(lower_bound("<3.13"), None);
    }

    #[test]
    fn reads_version_file() {
        assert_eq!(
            from_version_file("# pyenv\n3.12.1\n").as_deref(),
            Some("3.12.1")
        );
        assert_eq!(from_version_file("system\n"), None);
    }

    #[tokio::test]
    async fn version_file_wins() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(VERSION_FILE), "3.11.4\n").unwrap();
        fs::write(
            dir.path().join(pyproject::FILE_NAME),
            "[project]\nrequires-python = \">=3.9\"\n",
        )
        .unwrap();

        let mut env = MockEnvironment::new();
        env.expect_interpreter_version().times(0);

        assert_eq!(detect(dir.path(), &env).await, "3.11.4");
    }

    #[tokio::test]
    async fn falls_back_to_constraint_then_interpreter() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(pyproject::FILE_NAME),
            "[project]\nrequires-python = \">=3.9\"\n",
        )
        .unwrap();
        assert_eq!(detect(dir.path(), &no_interpreter()).await, "3.9");

        let empty = TempDir::new().unwrap();
        let mut env = MockEnvironment::new();
        env.expect_interpreter_version()
            .returning(|| Some("3.13.0".into()));
        assert_eq!(detect(empty.path(), &env).await, "3.13.0");

        assert_eq!(
            detect(empty.path(), &no_interpreter()).await,
            FALLBACK_PYTHON_VERSION
        );
    }
}
