use log::*;
use std::{fs, path::Path};

use crate::{
    Result,
    manifest::{Dependency, parse_requirement, same_package},
};

pub const FILE_NAME: &str = "requirements.txt";

/// Parse requirement lines, skipping blanks, comments and option lines
/// such as `-r other.txt`.
pub fn parse_content(content: &str, source_file: &Path) -> Vec<Dependency> {
    content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('-')
            {
                return None;
            }
            parse_requirement(line, source_file, Some(index + 1))
        })
        .collect()
}

pub fn parse_file(path: &Path) -> Result<Vec<Dependency>> {
    if !path.exists() {
        debug!("no {} found at {}", FILE_NAME, path.display());
        return Ok(vec![]);
    }

    let content = fs::read_to_string(path)?;
    let dependencies = parse_content(&content, path);
    info!(
        "found {} dependencies in {}",
        dependencies.len(),
        path.display()
    );
    Ok(dependencies)
}

/// Rewrite the `==` pin of `package` in `content`. Returns the new content
/// and whether anything changed.
pub fn update_pin(content: &str, package: &str, version: &str) -> (String, bool) {
    let mut changed = false;

    let lines = content
        .split_inclusive('\n')
        .map(|line| {
            let trimmed = line.trim_start();
            let Some(dep) = parse_requirement(trimmed, Path::new(""), None)
            else {
                return line.to_string();
            };
            if trimmed.starts_with('#') || !same_package(&dep.name, package) {
                return line.to_string();
            }
            let Some(eq) = line.find("==") else {
                return line.to_string();
            };

            let start = eq + 2;
            let rest = &line[start..];
            let leading = rest.len() - rest.trim_start().len();
            let token_len = rest
                .trim_start()
                .find(|c: char| c.is_whitespace() || ";#,".contains(c))
                .unwrap_or(rest.trim_start().len());
            let token_start = start + leading;

            changed = true;
            format!(
                "{}{}{}",
                &line[..token_start],
                version,
                &line[token_start + token_len..]
            )
        })
        .collect::<String>();

    (lines, changed)
}

/// Apply [`update_pin`] to the requirements file at `path`.
pub fn update_pin_in_file(
    path: &Path,
    package: &str,
    version: &str,
) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }

    let content = fs::read_to_string(path)?;
    let (updated, changed) = update_pin(&content, package, version);

    if changed {
        info!("updating {package} pin to {version} in {}", path.display());
        fs::write(path, updated)?;
    }

    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const CONTENT: &str = "\
# runtime
requests==2.30.0  # http client
-r dev.txt

urllib3>=1.26
Flask==2.3.2; python_version >= '3.8'
";

    #[test]
    fn parses_lines_with_numbers() {
        let deps = parse_content(CONTENT, Path::new("requirements.txt"));

        assert_eq!(deps.len(), 3);
        assert_eq!(deps[0].name, "requests");
        assert_eq!(deps[0].line_number, Some(2));
        assert_eq!(deps[0].current_version.as_deref(), Some("2.30.0"));
        assert_eq!(deps[1].name, "urllib3");
        assert_eq!(deps[1].line_number, Some(5));
        assert_eq!(deps[2].current_version.as_deref(), Some("2.3.2"));
        assert_eq!(deps[2].source_file, PathBuf::from("requirements.txt"));
    }

    #[test]
    fn updates_only_the_matching_pin() {
        let (updated, changed) = update_pin(CONTENT, "requests", "2.31.0");

        assert!(changed);
        assert!(updated.contains("requests==2.31.0  # http client\n"));
        assert!(updated.contains("Flask==2.3.2; python_version"));
        assert!(updated.starts_with("# runtime\n"));
    }

    #[test]
    fn keeps_environment_markers() {
        let (updated, changed) = update_pin(CONTENT, "flask", "3.0.0");

        assert!(changed);
        assert!(updated.contains("Flask==3.0.0; python_version >= '3.8'\n"));
    }

    #[test]
    fn leaves_unpinned_and_unknown_packages_alone() {
        let (updated, changed) = update_pin(CONTENT, "urllib3", "2.0.0");
        assert!(!changed);
        assert_eq!(updated, CONTENT);

        let (_, changed) = update_pin(CONTENT, "numpy", "2.0.0");
        assert!(!changed);
    }

    #[test]
    fn rewrites_file_on_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "requests==2.30.0\n").unwrap();

        assert!(update_pin_in_file(&path, "requests", "2.31.0").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "requests==2.31.0\n");

        let missing = dir.path().join("missing.txt");
        assert!(!update_pin_in_file(&missing, "requests", "2.31.0").unwrap());
    }
}
