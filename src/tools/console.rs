use dialoguer::{Confirm, MultiSelect};
use std::io::{IsTerminal, stdin};

#[cfg(test)]
use mockall::automock;

use crate::{
    Result,
    agent::aggregate::AggregatedAssessment,
    error::AnvilError,
    workflow::state::DashboardRow,
};

/// Characters of changelog shown before analysis output.
pub const CHANGELOG_PREVIEW_CHARS: usize = 2000;

/// Interaction with the person running the upgrade.
#[cfg_attr(test, automock)]
pub trait Console: Send + Sync {
    /// Let the user pick packages from the dashboard. An empty selection is
    /// a valid answer.
    fn select_packages(&self, rows: &[DashboardRow]) -> Result<Vec<String>>;
    fn confirm(&self, prompt: &str) -> Result<bool>;
    fn show(&self, message: &str);
}

/// Interactive console on stdin/stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConsole;

impl TerminalConsole {
    fn require_terminal() -> Result<()> {
        if stdin().is_terminal() {
            Ok(())
        } else {
            Err(AnvilError::UiUnavailable(
                "stdin is not an interactive terminal".into(),
            ))
        }
    }
}

impl Console for TerminalConsole {
    fn select_packages(&self, rows: &[DashboardRow]) -> Result<Vec<String>> {
        if rows.is_empty() {
            return Ok(vec![]);
        }

        Self::require_terminal()?;

        let items = dashboard_lines(rows);
        let header = items.first().cloned().unwrap_or_default();

        let chosen = MultiSelect::new()
            .with_prompt(format!(
                "Select packages to upgrade (space toggles, enter confirms)\n  {header}"
            ))
            .items(&items[1..])
            .interact()
            .map_err(|err| AnvilError::UiUnavailable(err.to_string()))?;

        Ok(chosen
            .into_iter()
            .filter_map(|index| rows.get(index).map(|row| row.name.clone()))
            .collect())
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        Self::require_terminal()?;
        Ok(Confirm::new().with_prompt(prompt).default(false).interact()?)
    }

    fn show(&self, message: &str) {
        println!("{message}");
    }
}

fn pad(text: &str, width: usize) -> String {
    format!("{text:<width$}")
}

/// Header line followed by one aligned line per row.
fn dashboard_lines(rows: &[DashboardRow]) -> Vec<String> {
    let headers = ["Package", "Range", "Installed", "Latest", "Status"];

    let cells = rows
        .iter()
        .map(|row| {
            [
                row.name.clone(),
                row.range_display().to_string(),
                row.installed_display().to_string(),
                row.latest_display().to_string(),
                row.status.to_string(),
            ]
        })
        .collect::<Vec<_>>();

    let mut widths = headers.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |values: Vec<String>| {
        values
            .iter()
            .zip(widths.iter())
            .map(|(value, width)| pad(value, *width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    std::iter::once(line(headers.iter().map(|h| h.to_string()).collect()))
        .chain(cells.into_iter().map(|row| line(row.to_vec())))
        .collect()
}

/// Dependency dashboard as an aligned text table.
pub fn render_dashboard(rows: &[DashboardRow]) -> String {
    if rows.is_empty() {
        return "No dependencies found.".to_string();
    }
    dashboard_lines(rows).join("\n")
}

/// First [`CHANGELOG_PREVIEW_CHARS`] characters of a changelog.
pub fn changelog_preview(changelog: &str) -> String {
    match changelog.char_indices().nth(CHANGELOG_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &changelog[..cut]),
        None => changelog.to_string(),
    }
}

/// Human readable aggregated verdict.
pub fn render_assessment(assessment: &AggregatedAssessment) -> String {
    let mut out = vec![format!(
        "Risk: {}",
        assessment.overall_risk.to_string().to_uppercase()
    )];
    out.push(assessment.overall_summary.clone());

    let sections = [
        ("Blocking issues", &assessment.blocking_issues),
        ("Warnings", &assessment.warnings),
        ("Improvements", &assessment.improvements),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        out.push(format!("{title}:"));
        out.extend(items.iter().map(|item| format!("  - {item}")));
    }

    if !assessment.agents_failed.is_empty() {
        out.push(format!(
            "Analyses unavailable: {}",
            assessment.agents_failed.join(", ")
        ));
    }

    out.join("\n")
}
