//! Complete runs against a real project directory with scripted remotes.

use mockall::predicate::eq;
use serde_json::json;
use std::{collections::HashMap, fs, sync::Arc};
use tempfile::TempDir;

use super::common::*;
use crate::{
    agent::{
        assessment::RiskLevel,
        backend::{AnalysisRequest, MockAnalysisBackend},
        kind::AnalysisKind,
        orchestrator::{AnalysisSettings, ExecutionMode, Orchestrator},
    },
    error::AnvilError,
    manifest::ProjectManifests,
    source::{
        changelog::ChangelogFinder,
        metadata::RegistryMetadata,
        resolver::{ChangelogResolver, ChangelogSource},
        traits::{MockPackageRegistry, MockRepositoryHost},
        types::{ProjectInfo, RepoRelease},
    },
    tools::{
        console::MockConsole, environment::MockEnvironment,
        installer::MockPackageInstaller, runner::MockTestRunner,
    },
    workflow::{
        context::WorkflowContext,
        controller::PhaseController,
        state::{Phase, WorkflowState},
    },
};

const ROLLBACK_PROMPT: &str = "Tests failed. Rollback to 2.30.0?";
const RELEASE_NOTES: &str = "### Bugfixes\n- Proxy-Authorization header no \
                             longer leaked on redirect";

struct Scenario {
    registry: MockPackageRegistry,
    host: MockRepositoryHost,
    backend: MockAnalysisBackend,
    environment: MockEnvironment,
    installer: MockPackageInstaller,
    tests: MockTestRunner,
    console: MockConsole,
}

impl Scenario {
    /// Registry, host, environment and reviewers for a low risk
    /// `requests` 2.30.0 -> 2.31.0 upgrade.
    fn requests_upgrade() -> Self {
        let mut registry = MockPackageRegistry::new();
        registry
            .expect_project_info()
            .with(eq(PACKAGE))
            .times(1)
            .returning(|_| {
                Ok(Some(ProjectInfo {
                    version: Some(TARGET.into()),
                    project_urls: Some(HashMap::from([(
                        "Source".to_string(),
                        "https://github.com/psf/requests".to_string(),
                    )])),
                    home_page: None,
                }))
            });

        let mut host = MockRepositoryHost::new();
        host.expect_list_releases().returning(|_| {
            Ok(vec![
                RepoRelease {
                    tag_name: "v2.31.0".into(),
                    body: Some(RELEASE_NOTES.into()),
                },
                RepoRelease {
                    tag_name: "v2.30.0".into(),
                    body: Some("Already installed".into()),
                },
            ])
        });

        let mut backend = MockAnalysisBackend::new();
        backend
            .expect_complete()
            .returning(|request: &AnalysisRequest| match request.kind {
                AnalysisKind::Risk => Ok(json!({
                    "summary": "Bug fix release",
                    "risk_level": "low",
                    "migration_required": false,
                    "confidence": 0.9
                })),
                _ => Err(AnvilError::backend("model unavailable")),
            });

        let mut environment = MockEnvironment::new();
        environment
            .expect_installed_version()
            .returning(|_| Some(CURRENT.into()));
        environment.expect_dependents().returning(|_| vec![]);
        environment
            .expect_interpreter_version()
            .returning(|| Some("3.12.1".into()));

        let mut console = MockConsole::new();
        console.expect_show().returning(|_| ());
        console
            .expect_select_packages()
            .times(1)
            .returning(|_| Ok(vec![PACKAGE.into()]));
        console
            .expect_confirm()
            .withf(|prompt| prompt == PROCEED_PROMPT)
            .times(1)
            .returning(|_| Ok(true));

        let mut installer = MockPackageInstaller::new();
        installer
            .expect_install()
            .with(eq(PACKAGE), eq(TARGET), eq(false))
            .times(1)
            .returning(|_, _, _| true);

        Self {
            registry,
            host,
            backend,
            environment,
            installer,
            tests: MockTestRunner::new(),
            console,
        }
    }

    fn into_context(self) -> WorkflowContext {
        let metadata = Arc::new(RegistryMetadata::new(Box::new(self.registry)));
        let resolver = ChangelogResolver::new(
            Arc::clone(&metadata),
            ChangelogFinder::new(Box::new(self.host)),
        );
        let orchestrator = Orchestrator::new(
            Some(Arc::new(self.backend)),
            AnalysisSettings {
                mode: ExecutionMode::Sequential,
                ..AnalysisSettings::default()
            },
        );

        WorkflowContext::builder()
            .manifests(Box::new(ProjectManifests))
            .registry(metadata)
            .environment(Box::new(self.environment))
            .changelogs(Box::new(resolver))
            .analyzer(Box::new(orchestrator))
            .installer(Box::new(self.installer))
            .tests(Box::new(self.tests))
            .console(Box::new(self.console))
            .build()
            .unwrap()
    }
}

fn project_with_requirements() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("requirements.txt"), "requests==2.30.0\n").unwrap();
    dir
}

#[test_log::test(tokio::test)]
async fn passing_upgrade_is_completed() {
    let dir = project_with_requirements();
    let mut scenario = Scenario::requests_upgrade();
    scenario
        .tests
        .expect_run_tests()
        .times(1)
        .returning(|| (true, "1 passed".into()));
    scenario
        .installer
        .expect_install()
        .with(eq(PACKAGE), eq(TARGET), eq(true))
        .times(1)
        .returning(|_, _, _| true);

    let controller = PhaseController::new(scenario.into_context());
    let state = controller.run(WorkflowState::new(dir.path())).await;

    assert_eq!(state.phase, Phase::Done);
    assert_eq!(state.completed, vec![PACKAGE]);
    assert!(state.failed.is_empty());
    assert!(state.skipped.is_empty());

    let pkg = &state.packages[0];
    assert_eq!(
        pkg.changelog.as_deref(),
        Some(format!("## v2.31.0\n\n{RELEASE_NOTES}").as_str())
    );
    assert!(pkg.approved && pkg.installed && pkg.committed);
    assert_eq!(pkg.tests_passed, Some(true));

    let assessment = pkg.assessment.as_ref().unwrap();
    assert_eq!(assessment.overall_risk, RiskLevel::Low);
    assert!(assessment.upgrade_recommended);
    assert_eq!(assessment.agents_succeeded, vec!["risk_assessor"]);
    assert_eq!(assessment.agents_failed.len(), 2);

    let summary = state.summary();
    assert_eq!(summary.completed, vec![PACKAGE]);
    assert!(summary.package_errors.is_empty());
}

#[test_log::test(tokio::test)]
async fn failing_tests_roll_back_and_fail() {
    let dir = project_with_requirements();
    let mut scenario = Scenario::requests_upgrade();
    scenario
        .tests
        .expect_run_tests()
        .times(1)
        .returning(|| (false, "FAILED tests/test_api.py::test_get".into()));
    scenario
        .console
        .expect_confirm()
        .withf(|prompt| prompt == ROLLBACK_PROMPT)
        .times(1)
        .returning(|_| Ok(true));
    scenario
        .installer
        .expect_install()
        .with(eq(PACKAGE), eq(CURRENT), eq(false))
        .times(1)
        .returning(|_, _, _| true);
    scenario
        .installer
        .expect_install()
        .with(eq(PACKAGE), eq(TARGET), eq(true))
        .times(0);

    let controller = PhaseController::new(scenario.into_context());

    let mut state = WorkflowState::new(dir.path());
    let mut visited = vec![];
    while state.phase != Phase::Done {
        visited.push(state.phase);
        state = controller.step(state).await;
    }

    assert!(visited.contains(&Phase::Rollback));
    assert!(!visited.contains(&Phase::Commit));
    assert_eq!(state.failed, vec![PACKAGE]);
    assert!(state.completed.is_empty());

    let pkg = &state.packages[0];
    assert_eq!(pkg.tests_passed, Some(false));
    assert_eq!(
        pkg.error.as_deref(),
        Some("Tests failed, rolled back to 2.30.0")
    );
}

#[test_log::test(tokio::test)]
async fn failed_rollback_is_surfaced() {
    let dir = TempDir::new().unwrap();
    let mut mocks = Mocks::new();
    mocks
        .console
        .expect_confirm()
        .withf(|prompt| prompt == ROLLBACK_PROMPT)
        .returning(|_| Ok(true));
    mocks
        .installer
        .expect_install()
        .with(eq(PACKAGE), eq(CURRENT), eq(false))
        .returning(|_, _, _| false);

    let state = state_at(dir.path(), Phase::Rollback, &[PACKAGE], 0);
    let state = PhaseController::new(mocks.into_context()).step(state).await;

    assert_eq!(state.phase, Phase::Next);
    assert_eq!(state.failed, vec![PACKAGE]);
    assert_eq!(
        state.packages[0].error.as_deref(),
        Some("Rollback failed, environment left at 2.31.0")
    );
}

#[test_log::test(tokio::test)]
async fn unknown_package_skips_analysis() {
    let mut registry = MockPackageRegistry::new();
    registry.expect_project_info().returning(|_| Ok(None));
    let metadata = Arc::new(RegistryMetadata::new(Box::new(registry)));

    // no host expectations: any repository call would panic
    let resolver = ChangelogResolver::new(
        Arc::clone(&metadata),
        ChangelogFinder::new(Box::new(MockRepositoryHost::new())),
    );

    assert_eq!(metadata.get_source_url(PACKAGE).await, None);
    assert_eq!(resolver.get_changelog(PACKAGE, CURRENT, TARGET).await, None);

    let mut environment = MockEnvironment::new();
    environment.expect_dependents().returning(|_| vec![]);
    let mut backend = MockAnalysisBackend::new();
    backend.expect_complete().times(0);
    let mut console = MockConsole::new();
    console.expect_show().returning(|_| ());

    let ctx = WorkflowContext::builder()
        .manifests(Box::new(ProjectManifests))
        .registry(Arc::clone(&metadata))
        .environment(Box::new(environment))
        .changelogs(Box::new(resolver))
        .analyzer(Box::new(Orchestrator::new(
            Some(Arc::new(backend)),
            AnalysisSettings::default(),
        )))
        .installer(Box::new(MockPackageInstaller::new()))
        .tests(Box::new(MockTestRunner::new()))
        .console(Box::new(console))
        .build()
        .unwrap();

    let dir = TempDir::new().unwrap();
    let state = state_at(dir.path(), Phase::Analyze, &[PACKAGE], 0);
    let state = PhaseController::new(ctx).step(state).await;

    assert_eq!(state.phase, Phase::Confirm);
    assert_eq!(state.packages[0].changelog, None);
    assert!(state.packages[0].assessment.is_none());
}

#[test_log::test(tokio::test)]
async fn nothing_declared_ends_after_empty_selection() {
    let dir = TempDir::new().unwrap();
    let mut mocks = Mocks::new();
    mocks.manifests.expect_parse().returning(|_| Ok(vec![]));
    mocks
        .console
        .expect_select_packages()
        .withf(|rows| rows.is_empty())
        .returning(|_| Ok(vec![]));

    let controller = PhaseController::new(mocks.into_context());
    let summary = controller.execute(WorkflowState::new(dir.path())).await;

    assert!(summary.completed.is_empty());
    assert!(summary.failed.is_empty());
    assert!(summary.errors.is_empty());
}
