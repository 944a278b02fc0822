//! Changelog lookup command.
use crate::{
    Result,
    command::common,
    config::AnvilConfig,
    source::resolver::ChangelogSource,
    tools::console::{Console, TerminalConsole},
};

/// Print the changelog covering `from` (exclusive) to `to` (inclusive).
pub async fn execute(
    package: &str,
    from: &str,
    to: &str,
    config: &AnvilConfig,
) -> Result<()> {
    let (_, resolver) = common::build_sources(&config.source)?;
    let text = lookup(&resolver, package, from, to).await;
    TerminalConsole.show(&text);
    Ok(())
}

/// Changelog text, or a notice when none could be resolved.
pub async fn lookup(
    source: &dyn ChangelogSource,
    package: &str,
    from: &str,
    to: &str,
) -> String {
    match source.get_changelog(package, from, to).await {
        Some(text) => text,
        None => format!("No changelog found for {package} {from} -> {to}"),
    }
}
