use log::*;
use serde::Deserialize;
use std::{fs, path::Path};
use toml_edit::{DocumentMut, Item, Value, value};

use crate::{
    Result,
    manifest::{Dependency, parse_requirement, same_package},
};

pub const FILE_NAME: &str = "pyproject.toml";

/// Dependencies from `[project].dependencies` and
/// `[tool.poetry.dependencies]`. The `python` entry of poetry is the
/// interpreter constraint, not a package.
pub fn parse_content(content: &str, source_file: &Path) -> Result<Vec<Dependency>> {
    let doc = content.parse::<DocumentMut>()?;
    let mut dependencies = vec![];

    if let Some(array) = doc
        .get("project")
        .and_then(|project| project.get("dependencies"))
        .and_then(Item::as_array)
    {
        dependencies.extend(
            array
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|spec| parse_requirement(spec, source_file, None)),
        );
    }

    if let Some(table) = doc
        .get("tool")
        .and_then(|tool| tool.get("poetry"))
        .and_then(|poetry| poetry.get("dependencies"))
        .and_then(Item::as_table_like)
    {
        for (name, spec) in table.iter() {
            if name.eq_ignore_ascii_case("python") {
                continue;
            }

            let specifier = match spec {
                Item::Value(Value::String(s)) => s.value().to_string(),
                other => other
                    .as_table_like()
                    .and_then(|t| t.get("version"))
                    .and_then(Item::as_str)
                    .unwrap_or_default()
                    .to_string(),
            };

            dependencies.push(Dependency {
                name: name.to_string(),
                specifier,
                current_version: None,
                source_file: source_file.to_path_buf(),
                line_number: None,
            });
        }
    }

    Ok(dependencies)
}

pub fn parse_file(path: &Path) -> Result<Vec<Dependency>> {
    if !path.exists() {
        debug!("no {} found at {}", FILE_NAME, path.display());
        return Ok(vec![]);
    }

    let content = fs::read_to_string(path)?;
    let dependencies = parse_content(&content, path)?;
    info!(
        "found {} dependencies in {}",
        dependencies.len(),
        path.display()
    );
    Ok(dependencies)
}

#[derive(Debug, Default, Deserialize)]
struct PyProject {
    #[serde(default)]
    project: Option<ProjectTable>,
    #[serde(default)]
    tool: Option<ToolTable>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectTable {
    #[serde(default, rename = "requires-python")]
    requires_python: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ToolTable {
    #[serde(default)]
    poetry: Option<toml::Table>,
}

impl PyProject {
    fn parse(content: &str) -> Option<Self> {
        toml::from_str(content)
            .inspect_err(|e| warn!("unable to read {FILE_NAME}: {e}"))
            .ok()
    }

    fn poetry(&self) -> Option<&toml::Table> {
        self.tool.as_ref().and_then(|tool| tool.poetry.as_ref())
    }
}

/// Interpreter constraint declared by the project: `requires-python`, or
/// poetry's `python` dependency.
pub fn python_constraint(content: &str) -> Option<String> {
    let pyproject = PyProject::parse(content)?;

    pyproject
        .project
        .as_ref()
        .and_then(|project| project.requires_python.clone())
        .or_else(|| {
            pyproject
                .poetry()
                .and_then(|poetry| poetry.get("dependencies"))
                .and_then(|deps| deps.get("python"))
                .and_then(toml::Value::as_str)
                .map(String::from)
        })
}

/// Whether the project is managed by poetry.
pub fn is_poetry_project(content: &str) -> bool {
    PyProject::parse(content)
        .is_some_and(|pyproject| pyproject.poetry().is_some())
}

/// Rewrite `==` pins of `package` in `[project].dependencies`. Returns the
/// updated document text when anything changed.
pub fn update_pin(
    content: &str,
    package: &str,
    version: &str,
) -> Result<Option<String>> {
    let mut doc = content.parse::<DocumentMut>()?;
    let mut changed = false;

    if let Some(array) = doc
        .get_mut("project")
        .and_then(|project| project.get_mut("dependencies"))
        .and_then(Item::as_array_mut)
    {
        for entry in array.iter_mut() {
            let Some(spec) = entry.as_str() else {
                continue;
            };
            let Some(dep) = parse_requirement(spec, Path::new(""), None) else {
                continue;
            };
            if !same_package(&dep.name, package) || dep.current_version.is_none()
            {
                continue;
            }

            let (updated, did_change) =
                super::requirements::update_pin(spec, package, version);
            if did_change {
                let decor = entry.decor().clone();
                *entry = Value::from(updated);
                *entry.decor_mut() = decor;
                changed = true;
            }
        }
    }

    if let Some(table) = doc
        .get_mut("tool")
        .and_then(|tool| tool.get_mut("poetry"))
        .and_then(|poetry| poetry.get_mut("dependencies"))
        .and_then(Item::as_table_like_mut)
    {
        let key = table
            .iter()
            .map(|(name, _)| name.to_string())
            .find(|name| same_package(name, package));

        if let Some(key) = key
            && let Some(item) = table.get_mut(&key)
            && let Some(current) = item.as_str()
            && is_exact_pin(current)
        {
            let pinned = if current.trim_start().starts_with("==") {
                format!("=={version}")
            } else {
                version.to_string()
            };
            *item = value(pinned);
            changed = true;
        }
    }

    if changed {
        Ok(Some(doc.to_string()))
    } else {
        Ok(None)
    }
}

/// Poetry treats a bare version or `==version` as an exact pin.
fn is_exact_pin(spec: &str) -> bool {
    let spec = spec.trim();
    let spec = spec.strip_prefix("==").unwrap_or(spec);
    spec.starts_with(|c: char| c.is_ascii_digit())
        && !spec.contains([',', '<', '>', '*', '^', '~'])
}

/// Apply [`update_pin`] to the file at `path`.
pub fn update_pin_in_file(
    path: &Path,
    package: &str,
    version: &str,
) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let content = fs::read_to_string(path)?;
    match update_pin(&content, package, version)? {
        Some(updated) => {
            info!("updating {package} pin to {version} in {}", path.display());
            fs::write(path, updated)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
