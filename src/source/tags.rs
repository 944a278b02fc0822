//! Release tag naming conventions.
//!
//! Single-package repositories usually tag `1.2.0` or `v1.2.0`. Monorepos
//! prefix the package name (`foo==1.2.0`, `foo@1.2.0`, `foo-1.2.0`,
//! `foo-v1.2.0`) so that each package can be released independently.
use crate::version::LooseVersion;

/// Separators placed between a package name and its version in monorepo
/// tags, longest first so `-v` wins over `-`.
const PACKAGE_TAG_SEPARATORS: [&str; 5] = ["-v", "==", "@", "-", "_"];

/// Parse the version a tag refers to, stripping a `name`-based prefix and a
/// leading `v`. Returns `None` when the remainder is not a version.
pub fn version_from_tag(tag: &str, package: &str) -> Option<String> {
    let tag = tag.trim();
    let rest = strip_package_prefix(tag, package).unwrap_or(tag);
    let rest = rest
        .strip_prefix('v')
        .or_else(|| rest.strip_prefix('V'))
        .unwrap_or(rest);

    LooseVersion::parse(rest)?;

    Some(rest.to_string())
}

fn strip_package_prefix<'a>(tag: &'a str, package: &str) -> Option<&'a str> {
    if package.is_empty() || tag.len() <= package.len() {
        return None;
    }

    let (head, tail) = tag.split_at_checked(package.len())?;

    if !names_match(head, package) {
        return None;
    }

    PACKAGE_TAG_SEPARATORS
        .iter()
        .find_map(|sep| tail.strip_prefix(sep))
}

/// Registry names treat `-`, `_` and `.` as equivalent and ignore case.
fn names_match(a: &str, b: &str) -> bool {
    let normalize = |s: &str| {
        s.chars()
            .map(|c| match c {
                '_' | '.' => '-',
                c => c.to_ascii_lowercase(),
            })
            .collect::<String>()
    };
    normalize(a) == normalize(b)
}

/// Tag names to try when looking up the release for `version` directly,
/// in order of likelihood.
pub fn tag_candidates(version: &str, package: &str) -> Vec<String> {
    let mut candidates = vec![version.to_string(), format!("v{version}")];

    if !package.is_empty() {
        candidates.extend([
            format!("{package}=={version}"),
            format!("{package}@{version}"),
            format!("{package}-v{version}"),
            format!("{package}-{version}"),
        ]);
    }

    candidates.dedup();
    candidates
}
