//! Common fixtures for workflow tests.

use std::{path::Path, sync::Arc};

use crate::{
    agent::{
        aggregate::{
            AgentResults, AggregatedAssessment, AggregationPolicy, Subject,
            aggregate,
        },
        assessment::{RiskAssessment, RiskLevel},
        kind::AnalysisKind,
        orchestrator::MockUpgradeAnalyzer,
    },
    manifest::{Dependency, MockManifestReader},
    source::{
        metadata::RegistryMetadata, resolver::MockChangelogSource,
        traits::MockPackageRegistry, types::ProjectInfo,
    },
    tools::{
        console::MockConsole, environment::MockEnvironment,
        installer::MockPackageInstaller, runner::MockTestRunner,
    },
    workflow::{
        context::WorkflowContext,
        state::{
            DashboardRow, DependencyStatus, PackageUpgradeState, Phase,
            WorkflowState,
        },
    },
};

pub const PACKAGE: &str = "requests";
pub const CURRENT: &str = "2.30.0";
pub const TARGET: &str = "2.31.0";
pub const PROCEED_PROMPT: &str = "Proceed with installation?";

/// Every collaborator as a mock so each test only scripts what it needs.
pub struct Mocks {
    pub manifests: MockManifestReader,
    pub registry: MockPackageRegistry,
    pub environment: MockEnvironment,
    pub changelogs: MockChangelogSource,
    pub analyzer: MockUpgradeAnalyzer,
    pub installer: MockPackageInstaller,
    pub tests: MockTestRunner,
    pub console: MockConsole,
}

impl Mocks {
    pub fn new() -> Self {
        let mut console = MockConsole::new();
        console.expect_show().returning(|_| ());

        Self {
            manifests: MockManifestReader::new(),
            registry: MockPackageRegistry::new(),
            environment: MockEnvironment::new(),
            changelogs: MockChangelogSource::new(),
            analyzer: MockUpgradeAnalyzer::new(),
            installer: MockPackageInstaller::new(),
            tests: MockTestRunner::new(),
            console,
        }
    }

    pub fn into_context(self) -> WorkflowContext {
        WorkflowContext::builder()
            .manifests(Box::new(self.manifests))
            .registry(Arc::new(RegistryMetadata::new(Box::new(self.registry))))
            .environment(Box::new(self.environment))
            .changelogs(Box::new(self.changelogs))
            .analyzer(Box::new(self.analyzer))
            .installer(Box::new(self.installer))
            .tests(Box::new(self.tests))
            .console(Box::new(self.console))
            .build()
            .unwrap()
    }
}

pub fn dependency(name: &str, pin: &str) -> Dependency {
    Dependency {
        name: name.into(),
        specifier: format!("=={pin}"),
        current_version: Some(pin.into()),
        source_file: Path::new("requirements.txt").to_path_buf(),
        line_number: Some(1),
    }
}

pub fn project_info(version: &str) -> ProjectInfo {
    ProjectInfo {
        version: Some(version.into()),
        ..ProjectInfo::default()
    }
}

pub fn outdated_row(name: &str) -> DashboardRow {
    DashboardRow {
        name: name.into(),
        specifier: format!("=={CURRENT}"),
        installed: Some(CURRENT.into()),
        latest: Some(TARGET.into()),
        status: DependencyStatus::Outdated,
    }
}

/// State positioned at `phase` for the given packages.
pub fn state_at(
    root: &Path,
    phase: Phase,
    names: &[&str],
    index: usize,
) -> WorkflowState {
    let mut state = WorkflowState::new(root);
    state.dashboard_rows = names.iter().map(|n| outdated_row(n)).collect();
    state.selected_package_names = names.iter().map(|n| n.to_string()).collect();
    state.packages = names
        .iter()
        .map(|n| PackageUpgradeState::new(n, CURRENT, TARGET))
        .collect();
    state.current_index = index;
    state.phase = phase;
    state
}

pub fn low_risk_assessment() -> AggregatedAssessment {
    let mut results = AgentResults::default();
    results.record(AnalysisKind::Risk, None);
    results.risk = Some(RiskAssessment {
        summary: "Bug fix release".into(),
        risk_level: RiskLevel::Low,
        breaking_changes: vec![],
        behavioral_changes: vec![],
        migration_required: false,
        migration_guide: None,
        confidence: 0.9,
    });

    aggregate(
        results,
        Subject {
            package_name: PACKAGE,
            current_version: CURRENT,
            target_version: TARGET,
            python_version: "3.12.1",
        },
        AggregationPolicy::default(),
    )
}
