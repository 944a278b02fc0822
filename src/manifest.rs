//! Dependency declarations read from a project's manifests.
use std::path::{Path, PathBuf};

#[cfg(test)]
use mockall::automock;

use crate::Result;

/// `pyproject.toml` reader and editor.
pub mod pyproject;

/// `requirements.txt` reader and editor.
pub mod requirements;

/// A declared dependency. Identity is the lowercase name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    /// Declared version specifier, empty when unconstrained.
    pub specifier: String,
    /// Version pinned with `==`, if any.
    pub current_version: Option<String>,
    pub source_file: PathBuf,
    /// 1-based line of the declaration when the format preserves it.
    pub line_number: Option<usize>,
}

impl Dependency {
    pub fn key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Reads every dependency declared by the project at `root`.
#[cfg_attr(test, automock)]
pub trait ManifestReader: Send + Sync {
    fn parse(&self, root: &Path) -> Result<Vec<Dependency>>;
}

/// Reads `requirements.txt` and then `pyproject.toml` from the project
/// root. Missing files contribute nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProjectManifests;

impl ManifestReader for ProjectManifests {
    fn parse(&self, root: &Path) -> Result<Vec<Dependency>> {
        let mut dependencies =
            requirements::parse_file(&root.join(requirements::FILE_NAME))?;
        dependencies
            .extend(pyproject::parse_file(&root.join(pyproject::FILE_NAME))?);
        Ok(dependencies)
    }
}

/// Split a PEP 508 style requirement into name and specifier, extracting
/// the `==` pinned version. Returns `None` when no name can be found.
pub fn parse_requirement(
    line: &str,
    source_file: &Path,
    line_number: Option<usize>,
) -> Option<Dependency> {
    let line = line.trim();
    let name_len = line
        .find(|c: char| !(c.is_ascii_alphanumeric() || "_-.".contains(c)))
        .unwrap_or(line.len());

    if name_len == 0 {
        return None;
    }

    let (name, rest) = line.split_at(name_len);
    let specifier = rest.trim().to_string();

    let current_version = specifier
        .split_once("==")
        .map(|(_, version)| {
            version
                .split([';', '#'])
                .next()
                .unwrap_or_default()
                .trim()
                .to_string()
        })
        .filter(|version| !version.is_empty());

    Some(Dependency {
        name: name.to_string(),
        specifier,
        current_version,
        source_file: source_file.to_path_buf(),
        line_number,
    })
}

/// Registry names compare case-insensitively with `-`, `_` and `.`
/// treated alike.
pub fn same_package(a: &str, b: &str) -> bool {
    let normalize = |s: &str| {
        s.trim()
            .chars()
            .map(|c| match c {
                '_' | '.' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect::<String>()
    };
    normalize(a) == normalize(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn parses_name_specifier_and_pin() {
        let dep = parse_requirement(
            "requests==2.30.0 ; python_version >= '3.8'  # http",
            Path::new("requirements.txt"),
            Some(3),
        )
        .unwrap();

        assert_eq!(dep.name, "requests");
        assert_eq!(dep.specifier, "==2.30.0 ; python_version >= '3.8'  # http");
        assert_eq!(dep.current_version.as_deref(), Some("2.30.0"));
        assert_eq!(dep.line_number, Some(3));
        assert_eq!(dep.key(), "requests");
    }

    #[test]
    fn unpinned_requirements_have_no_current_version() {
        let dep =
            parse_requirement("Django>=4.2,<5", Path::new("r.txt"), None).unwrap();
        assert_eq!(dep.key(), "django");
        assert_eq!(dep.specifier, ">=4.2,<5");
        assert_eq!(dep.current_version, None);

        let dep = parse_requirement("pytest", Path::new("r.txt"), None).unwrap();
        assert_eq!(dep.specifier, "");
    }

    #[test]
    fn rejects_lines_without_a_name() {
        assert!(parse_requirement("==1.0", Path::new("r.txt"), None).is_none());
        assert!(parse_requirement("", Path::new("r.txt"), None).is_none());
    }

    #[test]
    fn package_names_normalize() {
        assert!(same_package("Typing_Extensions", "typing-extensions"));
        assert!(same_package("zope.interface", "zope-interface"));
        assert!(!same_package("requests", "requests-oauthlib"));
    }

    #[test]
    fn reads_both_manifests_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("requirements.txt"),
            "requests==2.30.0\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("pyproject.toml"),
            "[project]\nname = \"demo\"\ndependencies = [\"rich>=13\"]\n",
        )
        .unwrap();

        let deps = ProjectManifests.parse(dir.path()).unwrap();

        let names = deps.iter().map(|d| d.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["requests", "rich"]);
    }

    #[test]
    fn empty_project_has_no_dependencies() {
        let dir = TempDir::new().unwrap();
        assert!(ProjectManifests.parse(dir.path()).unwrap().is_empty());
    }
}
