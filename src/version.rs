//! Permissive version parsing and range comparison.
//!
//! Package and interpreter versions in the wild rarely follow strict semver
//! (`2.31`, `1.0.0rc1`, `2024.1`, `v3.12.1`). Versions are parsed leniently:
//! the leading run of dot separated numbers forms the release, missing parts
//! compare as zero, and whatever trails the release is kept as a qualifier
//! that only breaks ties between otherwise equal releases. Qualifiers order
//! by PEP 440 phase (`dev < a < b < rc < final < post`) and then by their
//! number. Anything that does not start with a number is unparsable and
//! never falls inside a range.
use std::{cmp::Ordering, fmt::Display};

/// Version parsed leniently from a free-form version string.
#[derive(Debug, Clone)]
pub struct LooseVersion {
    /// Original text as given.
    pub original: String,
    /// Numeric release components.
    pub release: Vec<u64>,
    /// Prerelease or local qualifier following the release (e.g. `rc1`).
    pub qualifier: Option<String>,
}

impl LooseVersion {
    /// Parse a version string, returning `None` when no numeric release can
    /// be found at its start (after an optional `v` prefix).
    pub fn parse(input: &str) -> Option<Self> {
        let original = input.trim();
        let text = original
            .strip_prefix('v')
            .or_else(|| original.strip_prefix('V'))
            .unwrap_or(original);
        // build metadata never participates in ordering
        let text = text.split('+').next().unwrap_or_default();

        let mut release = vec![];
        let mut rest = text;

        loop {
            let digits = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());

            if digits == 0 {
                break;
            }

            let number = rest[..digits].parse::<u64>().ok()?;
            release.push(number);
            rest = &rest[digits..];

            match rest.strip_prefix('.') {
                Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => {
                    rest = next;
                }
                _ => break,
            }
        }

        if release.is_empty() {
            return None;
        }

        let qualifier = rest
            .trim_start_matches(['.', '-', '_'])
            .to_ascii_lowercase();

        Some(Self {
            original: original.to_string(),
            release,
            qualifier: if qualifier.is_empty() {
                None
            } else {
                Some(qualifier)
            },
        })
    }

    /// Release components padded with zeros to `len`.
    fn padded(&self, len: usize) -> impl Iterator<Item = u64> + '_ {
        self.release
            .iter()
            .copied()
            .chain(std::iter::repeat(0))
            .take(len)
    }

    fn cmp_release(&self, other: &Self) -> Ordering {
        let len = self.release.len().max(other.release.len());
        self.padded(len).cmp(other.padded(len))
    }
}

/// Release phase a qualifier denotes, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Stage {
    Dev,
    Alpha,
    Beta,
    Candidate,
    /// Qualifier text that names no known phase.
    Unrecognized,
    Final,
    Post,
}

/// Spellings of each phase, longest first so `alpha` wins over `a`.
const STAGE_PREFIXES: [(&str, Stage); 12] = [
    ("preview", Stage::Candidate),
    ("alpha", Stage::Alpha),
    ("beta", Stage::Beta),
    ("post", Stage::Post),
    ("pre", Stage::Candidate),
    ("rev", Stage::Post),
    ("dev", Stage::Dev),
    ("rc", Stage::Candidate),
    ("a", Stage::Alpha),
    ("b", Stage::Beta),
    ("c", Stage::Candidate),
    ("r", Stage::Post),
];

/// Sort key of a qualifier: phase, its number, then any remaining text.
fn qualifier_key(qualifier: Option<&str>) -> (Stage, u64, &str) {
    let Some(text) = qualifier else {
        return (Stage::Final, 0, "");
    };

    for (prefix, stage) in STAGE_PREFIXES {
        let Some(rest) = text.strip_prefix(prefix) else {
            continue;
        };
        // `custom` is not a candidate release
        if rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
            continue;
        }

        let rest = rest.trim_start_matches(['.', '-', '_']);
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let number = rest[..digits].parse::<u64>().unwrap_or(0);

        return (stage, number, &rest[digits..]);
    }

    (Stage::Unrecognized, 0, text)
}

impl Display for LooseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.original)
    }
}

impl PartialEq for LooseVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LooseVersion {}

impl PartialOrd for LooseVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LooseVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Qualifiers only decide between equal releases so that 1.0.0rc1 is
        // never mistaken for an exact match of 1.0.0.
        self.cmp_release(other).then_with(|| {
            qualifier_key(self.qualifier.as_deref())
                .cmp(&qualifier_key(other.qualifier.as_deref()))
        })
    }
}

/// Order two version strings. Unparsable input falls back to comparing the
/// trimmed text so that identical strings still compare equal.
pub fn compare(a: &str, b: &str) -> Ordering {
    match (LooseVersion::parse(a), LooseVersion::parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.trim().cmp(b.trim()),
    }
}

/// Whether `version` falls in the half-open range `(low, high]`. Any
/// unparsable input excludes the version rather than failing.
pub fn in_range(version: &str, exclusive_low: &str, inclusive_high: &str) -> bool {
    let (Some(version), Some(low), Some(high)) = (
        LooseVersion::parse(version),
        LooseVersion::parse(exclusive_low),
        LooseVersion::parse(inclusive_high),
    ) else {
        return false;
    };

    version > low && version <= high
}

/// Whether `version` satisfies an optional minimum and maximum bound
/// (both inclusive). Returns `None` when the version or a supplied bound
/// cannot be parsed, since no verdict can be made.
///
/// Only the components a bound spells out are compared, so a maximum of
/// `3.12` admits `3.12.4`.
pub fn within_bounds(
    version: &str,
    minimum: Option<&str>,
    maximum: Option<&str>,
) -> Option<bool> {
    let version = LooseVersion::parse(version)?;

    if let Some(minimum) = minimum {
        let minimum = LooseVersion::parse(minimum)?;
        if version.cmp_release(&minimum) == Ordering::Less {
            return Some(false);
        }
    }

    if let Some(maximum) = maximum {
        let maximum = LooseVersion::parse(maximum)?;
        let truncated = LooseVersion {
            original: version.original.clone(),
            release: version
                .padded(maximum.release.len())
                .collect::<Vec<u64>>(),
            qualifier: None,
        };
        if truncated.cmp_release(&maximum) == Ordering::Greater {
            return Some(false);
        }
    }

    Some(true)
}
