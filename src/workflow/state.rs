use serde::Serialize;
use std::{cmp::Ordering, fmt::Display, path::PathBuf};
use strum::{Display as StrumDisplay, EnumIter, IntoStaticStr};

use crate::{
    Result, agent::aggregate::AggregatedAssessment, error::AnvilError,
    manifest::Dependency, version,
};

/// Phases of the upgrade workflow. `Done` is the only terminal phase.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    StrumDisplay,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Phase {
    Scan,
    Select,
    Analyze,
    Confirm,
    Install,
    Test,
    Commit,
    Rollback,
    Next,
    Done,
}

impl Phase {
    /// Phases that operate on `packages[current_index]`.
    pub fn is_per_package(self) -> bool {
        matches!(
            self,
            Phase::Analyze
                | Phase::Confirm
                | Phase::Install
                | Phase::Test
                | Phase::Commit
                | Phase::Rollback
                | Phase::Next
        )
    }

    pub fn is_terminal(self) -> bool {
        self == Phase::Done
    }
}

/// How a declared dependency relates to what is installed and published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, StrumDisplay)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyStatus {
    Missing,
    UpToDate,
    Outdated,
    Unknown,
}

impl DependencyStatus {
    pub fn classify(installed: Option<&str>, latest: Option<&str>) -> Self {
        match (installed, latest) {
            (None, _) => DependencyStatus::Missing,
            (Some(_), None) => DependencyStatus::Unknown,
            (Some(installed), Some(latest)) => {
                if version::compare(installed, latest) == Ordering::Equal {
                    DependencyStatus::UpToDate
                } else {
                    DependencyStatus::Outdated
                }
            }
        }
    }
}

/// One line of the dependency dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardRow {
    pub name: String,
    pub specifier: String,
    pub installed: Option<String>,
    pub latest: Option<String>,
    pub status: DependencyStatus,
}

impl DashboardRow {
    pub fn range_display(&self) -> &str {
        if self.specifier.is_empty() {
            "any"
        } else {
            &self.specifier
        }
    }

    pub fn installed_display(&self) -> &str {
        self.installed.as_deref().unwrap_or("missing")
    }

    pub fn latest_display(&self) -> &str {
        self.latest.as_deref().unwrap_or("N/A")
    }
}

/// Progress of one selected package through the workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageUpgradeState {
    pub name: String,
    pub current_version: String,
    pub target_version: String,
    pub changelog: Option<String>,
    /// `None` when no changelog was found or analysis never ran.
    pub assessment: Option<AggregatedAssessment>,
    /// Installed packages that depend on this one.
    pub dependents: Vec<String>,
    pub approved: bool,
    pub installed: bool,
    pub tests_passed: Option<bool>,
    pub committed: bool,
    pub error: Option<String>,
}

impl PackageUpgradeState {
    pub fn new(name: &str, current_version: &str, target_version: &str) -> Self {
        Self {
            name: name.to_string(),
            current_version: current_version.to_string(),
            target_version: target_version.to_string(),
            changelog: None,
            assessment: None,
            dependents: vec![],
            approved: false,
            installed: false,
            tests_passed: None,
            committed: false,
            error: None,
        }
    }
}

/// State of one workflow run, owned by the phase controller.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowState {
    pub project_root: PathBuf,
    pub dependencies: Vec<Dependency>,
    pub dashboard_rows: Vec<DashboardRow>,
    pub selected_package_names: Vec<String>,
    pub current_index: usize,
    pub packages: Vec<PackageUpgradeState>,
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    pub phase: Phase,
    pub errors: Vec<String>,
}

impl WorkflowState {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            dependencies: vec![],
            dashboard_rows: vec![],
            selected_package_names: vec![],
            current_index: 0,
            packages: vec![],
            completed: vec![],
            failed: vec![],
            skipped: vec![],
            phase: Phase::Scan,
            errors: vec![],
        }
    }

    pub fn current(&self) -> Option<&PackageUpgradeState> {
        self.packages.get(self.current_index)
    }

    /// The package under work, or an error when the index is out of range.
    pub fn current_mut(&mut self) -> Result<&mut PackageUpgradeState> {
        let index = self.current_index;
        let len = self.packages.len();
        self.packages.get_mut(index).ok_or_else(|| {
            AnvilError::workflow(format!(
                "package index {index} out of range for {len} packages"
            ))
        })
    }

    /// Per-package phases require a valid `current_index`.
    pub fn validate(&self) -> Result<()> {
        if self.phase.is_per_package() && self.current().is_none() {
            return Err(AnvilError::workflow(format!(
                "phase {} requires a package but index {} is out of range \
                 for {} packages",
                self.phase,
                self.current_index,
                self.packages.len()
            )));
        }
        Ok(())
    }

    /// Whether `name` has already reached a terminal list.
    pub fn is_settled(&self, name: &str) -> bool {
        [&self.completed, &self.failed, &self.skipped]
            .iter()
            .any(|list| list.iter().any(|n| n == name))
    }

    pub fn summary(&self) -> WorkflowSummary {
        WorkflowSummary {
            completed: self.completed.clone(),
            failed: self.failed.clone(),
            skipped: self.skipped.clone(),
            errors: self.errors.clone(),
            package_errors: self
                .packages
                .iter()
                .filter_map(|p| {
                    p.error.as_ref().map(|e| (p.name.clone(), e.clone()))
                })
                .collect(),
        }
    }
}

/// Final tallies of a workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowSummary {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    pub errors: Vec<String>,
    /// `(package, error)` notes, including non-fatal ones on completed
    /// packages.
    pub package_errors: Vec<(String, String)>,
}

impl Display for WorkflowSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let list = |names: &[String]| {
            if names.is_empty() {
                "-".to_string()
            } else {
                names.join(", ")
            }
        };

        writeln!(f, "Upgrade summary")?;
        writeln!(f, "  completed: {}", list(&self.completed))?;
        writeln!(f, "  failed:    {}", list(&self.failed))?;
        write!(f, "  skipped:   {}", list(&self.skipped))?;

        for (name, error) in &self.package_errors {
            write!(f, "\n  {name}: {error}")?;
        }
        for error in &self.errors {
            write!(f, "\n  error: {error}")?;
        }

        Ok(())
    }
}
