use log::*;
use regex::Regex;
use std::{
    collections::{BTreeSet, HashSet},
    fs,
    path::Path,
    sync::LazyLock,
};
use walkdir::{DirEntry, WalkDir};

pub const SKIP_DIRS: [&str; 7] = [
    ".venv",
    "venv",
    ".git",
    "__pycache__",
    "node_modules",
    "dist",
    "build",
];

static IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(.+)$").unwrap());

static FROM_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*from\s+([\w.]+)\s+import\s+(.+)$").unwrap()
});

fn skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIP_DIRS.contains(&name))
}

/// Python import name of a distribution: lowercase with `-` as `_`.
fn module_name(package: &str) -> String {
    package.trim().to_lowercase().replace(['-', '.'], "_")
}

fn is_target(module: &str, target: &str) -> bool {
    let module = module.to_lowercase();
    module == target || module.starts_with(&format!("{target}."))
}

/// Split `a as b` into the bound name.
fn bound_name<'a>(item: &'a str, default: &'a str) -> &'a str {
    match item.split_once(" as ") {
        Some((_, alias)) => alias.trim(),
        None => default,
    }
}

/// Source lines with parenthesized continuations joined, so that
/// multi-line `from x import (a, b)` reads as one statement.
fn logical_lines(source: &str) -> Vec<String> {
    let mut lines = vec![];
    let mut pending = String::new();
    let mut depth = 0i32;

    for line in source.lines() {
        if !pending.is_empty() {
            pending.push(' ');
        }
        pending.push_str(line);
        depth += line.matches('(').count() as i32;
        depth -= line.matches(')').count() as i32;

        if depth <= 0 {
            lines.push(std::mem::take(&mut pending));
            depth = 0;
        }
    }

    if !pending.is_empty() {
        lines.push(pending);
    }

    lines
}

/// Names bound in `source` by imports of `target`.
fn imported_names(lines: &[String], target: &str) -> HashSet<String> {
    let mut names = HashSet::new();

    for line in lines {
        if let Some(caps) = FROM_IMPORT.captures(line) {
            if !is_target(&caps[1], target) {
                continue;
            }
            for item in caps[2].split(',') {
                let item = item.trim_matches(|c: char| {
                    c.is_whitespace() || "()\\".contains(c)
                });
                let name = item.split_whitespace().next().unwrap_or_default();
                if name.is_empty() || name == "*" {
                    continue;
                }
                names.insert(bound_name(item, name).to_string());
            }
        } else if let Some(caps) = IMPORT.captures(line) {
            for item in caps[1].split(',') {
                let item = item.trim();
                let module = item.split_whitespace().next().unwrap_or_default();
                if !is_target(module, target) {
                    continue;
                }
                // `import a.b` binds `a`
                let root = module.split('.').next().unwrap_or(module);
                names.insert(bound_name(item, root).to_string());
            }
        }
    }

    names
}

/// `alias.attr` and `name()` usages of the bound names.
fn usages(lines: &[String], names: &HashSet<String>) -> BTreeSet<String> {
    let mut found = BTreeSet::new();

    let patterns = names
        .iter()
        .filter_map(|name| {
            let escaped = regex::escape(name);
            Regex::new(&format!(
                r"(?:^|[^\w.]){escaped}(?:\.(\w+)|\s*(\())"
            ))
            .ok()
            .map(|re| (name, re))
        })
        .collect::<Vec<_>>();

    for line in lines {
        if IMPORT.is_match(line) || FROM_IMPORT.is_match(line) {
            continue;
        }
        for (name, re) in &patterns {
            for caps in re.captures_iter(line) {
                if let Some(attr) = caps.get(1) {
                    found.insert(format!("{name}.{}", attr.as_str()));
                } else if caps.get(2).is_some() {
                    found.insert(format!("{name}()"));
                }
            }
        }
    }

    found
}

/// Usages of `package` in one Python source.
pub fn scan_source(source: &str, package: &str) -> BTreeSet<String> {
    let lines = logical_lines(source);
    let names = imported_names(&lines, &module_name(package));
    if names.is_empty() {
        return BTreeSet::new();
    }
    usages(&lines, &names)
}

/// Walk the project's `.py` files and collect how `package` is used, sorted
/// and unique. Unreadable files are skipped.
pub fn scan_package_usage(root: &Path, package: &str) -> Vec<String> {
    debug!("scanning {} for usage of {package}", root.display());

    let mut found = BTreeSet::new();

    let files = WalkDir::new(root)
        .into_iter()
        .filter_entry(|entry| !skipped(entry))
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "py")
        });

    for entry in files {
        match fs::read_to_string(entry.path()) {
            Ok(source) => found.extend(scan_source(&source, package)),
            Err(err) => debug!("skipping {}: {err}", entry.path().display()),
        }
    }

    found.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SOURCE: &str = r#"
import os
import requests as rq
from requests.adapters import HTTPAdapter
from requests import (Session,
    get as fetch)

def main():
    session = Session()
    session.mount("https://", HTTPAdapter())
    resp = rq.get("https://example.com")
    fetch("https://example.com")
    os.path.join("a", "b")
    return rq.codes.ok
"#;

    #[test]
    fn collects_attribute_and_call_usages() {
        let found = scan_source(SOURCE, "requests")
            .into_iter()
            .collect::<Vec<_>>();

        assert_eq!(
            found,
            vec![
                "HTTPAdapter()",
                "Session()",
                "fetch()",
                "rq.codes",
                "rq.get",
            ]
        );
    }

    #[test]
    fn ignores_files_that_do_not_import_the_package() {
        assert!(scan_source("import os\nos.getcwd()\n", "requests").is_empty());
        assert!(scan_source("import requests_mock\n", "requests").is_empty());
    }

    #[test]
    fn normalizes_distribution_names() {
        let found = scan_source(
            "import typing_extensions as te\nte.Self\n",
            "typing-extensions",
        );
        assert!(found.contains("te.Self"));
    }

    #[test]
    fn walks_project_skipping_virtualenvs() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("app.py"),
            "import requests\nrequests.get('x')\n",
        )
        .unwrap();
        let pkg = dir.path().join("pkg");
        fs::create_dir_all(&pkg).unwrap();
        fs::write(pkg.join("client.py"), "import requests\nrequests.post('x')\n")
            .unwrap();
        let venv = dir.path().join(".venv").join("lib");
        fs::create_dir_all(&venv).unwrap();
        fs::write(venv.join("vendored.py"), "import requests\nrequests.put('x')\n")
            .unwrap();

        let found = scan_package_usage(dir.path(), "requests");

        assert_eq!(found, vec!["requests.get", "requests.post"]);
    }
}
