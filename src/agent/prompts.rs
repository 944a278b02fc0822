//! Prompt templates for each analysis kind, rendered with tera.
use tera::{Context, Tera};

use crate::{Result, agent::analyst::AnalysisContext};

const NO_USAGE: &str = "(No usage found)";
const NO_CONFIG: &str = "(No config available)";

const PYTHON_VERSION_RULES: &str = r#"## Python version comparison

Higher Python versions are newer. "Requires Python >= 3.10" means 3.10,
3.11, 3.12 and later are all supported, so a user on 3.13 is compatible.
"Dropped support for Python 3.8" only affects users on 3.8 or older.
Only treat the interpreter as unsupported when the user's version is lower
than the minimum or higher than an explicit maximum."#;

pub const RISK_SYSTEM: &str = r#"You are a principal software engineer reviewing dependency upgrades.

Identify breaking changes and behavioral shifts in the changelog that could
affect production code.

- Only cite risks that appear in the changelog.
- Breaking changes hide in renamed functions or arguments, changed default
  values, modified return types and "bug fixes" that change behavior.
- Risk levels:
  - positive: security fixes, performance work, additive features only
  - low: docs, tests, additive changes, interpreter drops that do not
    affect the user
  - medium: behavior changes, deprecations, minor API tweaks
  - high: removed or changed APIs that the user's code actually calls
- Build tooling changes are not runtime risks.
- Vague changelogs warrant lower confidence.

{{ python_rules }}"#;

pub const RISK_USER: &str = r#"Analyze the upgrade risk for `{{ package_name }}` from `{{ current_version }}` to `{{ target_version }}`.

## Environment
- Python version: {{ python_version }}
- Project config:
{{ project_config }}

## Symbols used by the project
{{ usage_context }}

## Changelog
{{ changelog_text }}

---
Identify breaking changes that affect this project. The user runs Python
{{ python_version }}. Only mark high risk for changes to symbols the project
uses."#;

pub const SECURITY_SYSTEM: &str = r#"You are a security engineer specializing in software supply chain security.

Analyze the changelog for security implications of the upgrade:

1. Security fixes: CVEs, vulnerability patches, XSS, injection, CSRF.
2. Hardening: input validation, authentication or encryption changes.
3. Concerns: new network calls, permission changes, removed checks, new
   runtime dependencies.
4. Supply chain: dependencies added, removed or re-constrained.

Scores:
- safe: no security impact, stable upgrade
- improved: fixes vulnerabilities or adds security features
- neutral: no significant impact either way
- concerning: needs review before upgrading

Build tools, dev dependencies, test frameworks and documentation are not
security concerns."#;

pub const SECURITY_USER: &str = r#"Analyze the security implications of upgrading `{{ package_name }}` from `{{ current_version }}` to `{{ target_version }}`.

## Environment
- Python version: {{ python_version }}
- Project config:
{{ project_config }}

## Changelog
{{ changelog_text }}

---
Flag every CVE, security fix or concern."#;

pub const COMPATIBILITY_SYSTEM: &str = r#"You are a Python compatibility expert.

Analyze the changelog for issues that could prevent a successful upgrade:
interpreter requirements, dependency changes and conflicts, platform or
architecture requirements, and deprecations with their removal timelines.

{{ python_rules }}

- Set python_compatible=false only for an actual interpreter mismatch.
- Flag blocking issues only for real incompatibilities.
- When support is unclear, assume compatible."#;

pub const COMPATIBILITY_USER: &str = r#"Analyze the compatibility of upgrading `{{ package_name }}` from `{{ current_version }}` to `{{ target_version }}`.

## Environment
- Python version: {{ python_version }}
- Project config:
{{ project_config }}

## Symbols used by the project
{{ usage_context }}

## Changelog
{{ changelog_text }}

---
1. Check whether the target version supports Python {{ python_version }}.
2. Identify dependency conflicts or requirement changes.
3. Flag deprecations that affect the project's code.
4. Decide whether the upgrade will work in this environment."#;

fn template_context(ctx: &AnalysisContext, changelog: &str) -> Context {
    let usage = if ctx.usage_symbols.is_empty() {
        NO_USAGE.to_string()
    } else {
        ctx.usage_symbols
            .iter()
            .map(|symbol| format!("- {symbol}"))
            .collect::<Vec<String>>()
            .join("\n")
    };

    let config = if ctx.project_config.trim().is_empty() {
        NO_CONFIG
    } else {
        ctx.project_config.as_str()
    };

    let mut context = Context::new();
    context.insert("package_name", &ctx.package_name);
    context.insert("current_version", &ctx.current_version);
    context.insert("target_version", &ctx.target_version);
    context.insert("python_version", &ctx.python_version);
    context.insert("project_config", config);
    context.insert("usage_context", &usage);
    context.insert("changelog_text", changelog);
    context.insert("python_rules", PYTHON_VERSION_RULES);
    context
}

/// Render a system/user template pair. `changelog` is the already
/// truncated changelog text.
pub fn render(
    system: &str,
    user: &str,
    ctx: &AnalysisContext,
    changelog: &str,
) -> Result<(String, String)> {
    let context = template_context(ctx, changelog);
    let system = Tera::one_off(system, &context, false)?;
    let user = Tera::one_off(user, &context, false)?;
    Ok((system, user))
}
