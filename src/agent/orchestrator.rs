//! Runs every reviewer for a package and aggregates their verdicts.
use async_trait::async_trait;
use log::*;
use std::{sync::Arc, time::Duration};

#[cfg(test)]
use mockall::automock;

use crate::{
    agent::{
        aggregate::{
            AgentResults, AggregatedAssessment, AggregationPolicy, Subject,
            aggregate,
        },
        analyst::{AnalysisContext, Analyst, DEFAULT_MAX_CHANGELOG_CHARS},
        assessment::{CompatibilityAssessment, IssueSeverity},
        backend::{AnalysisBackend, DEFAULT_ANALYSIS_TIMEOUT_SECS},
        kind::AnalysisKind,
    },
    version::{LooseVersion, within_bounds},
};

/// How the reviewers are scheduled.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One reviewer at a time, in [`AnalysisKind::ALL`] order.
    Sequential,
    /// All reviewers at once on the runtime's worker threads.
    #[default]
    Concurrent,
}

/// Tunables for the analysis stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSettings {
    pub max_changelog_chars: usize,
    pub mode: ExecutionMode,
    pub policy: AggregationPolicy,
    /// Upper bound for one reviewer call.
    pub timeout: Duration,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            max_changelog_chars: DEFAULT_MAX_CHANGELOG_CHARS,
            mode: ExecutionMode::default(),
            policy: AggregationPolicy::default(),
            timeout: Duration::from_secs(DEFAULT_ANALYSIS_TIMEOUT_SECS),
        }
    }
}

/// Produces an aggregated verdict for an upgrade.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UpgradeAnalyzer: Send + Sync {
    async fn assess(&self, ctx: &AnalysisContext) -> AggregatedAssessment;
}

/// Schedules the three reviewers and aggregates what they return.
pub struct Orchestrator {
    analysts: Vec<Analyst>,
    mode: ExecutionMode,
    policy: AggregationPolicy,
}

impl Orchestrator {
    pub fn new(
        backend: Option<Arc<dyn AnalysisBackend>>,
        settings: AnalysisSettings,
    ) -> Self {
        let analysts = AnalysisKind::ALL
            .iter()
            .map(|kind| {
                Analyst::new(
                    *kind,
                    backend.clone(),
                    settings.max_changelog_chars,
                    settings.timeout,
                )
            })
            .collect();

        Self {
            analysts,
            mode: settings.mode,
            policy: settings.policy,
        }
    }

    async fn run_sequential(&self, ctx: &AnalysisContext) -> AgentResults {
        let mut results = AgentResults::default();
        for analyst in &self.analysts {
            let outcome = analyst.analyze(ctx).await;
            results.record(analyst.kind(), outcome);
        }
        results
    }

    async fn run_concurrent(&self, ctx: &AnalysisContext) -> AgentResults {
        let shared = Arc::new(ctx.clone());

        let handles = self
            .analysts
            .iter()
            .map(|analyst| {
                let analyst = analyst.clone();
                let ctx = Arc::clone(&shared);
                let kind = analyst.kind();
                (
                    kind,
                    tokio::spawn(async move { analyst.analyze(&ctx).await }),
                )
            })
            .collect::<Vec<_>>();

        let mut results = AgentResults::default();
        for (kind, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!("[{kind}] analysis task aborted: {err}");
                    None
                }
            };
            results.record(kind, outcome);
        }
        results
    }
}

#[async_trait]
impl UpgradeAnalyzer for Orchestrator {
    async fn assess(&self, ctx: &AnalysisContext) -> AggregatedAssessment {
        info!(
            "running {} reviewers for {} ({:?})",
            self.analysts.len(),
            ctx.package_name,
            self.mode
        );

        let mut results = match self.mode {
            ExecutionMode::Sequential => self.run_sequential(ctx).await,
            ExecutionMode::Concurrent => self.run_concurrent(ctx).await,
        };

        if let Some(compat) = results.compatibility.as_mut() {
            reconcile_python_support(compat, &ctx.python_version);
        }

        aggregate(
            results,
            Subject {
                package_name: &ctx.package_name,
                current_version: &ctx.current_version,
                target_version: &ctx.target_version,
                python_version: &ctx.python_version,
            },
            self.policy,
        )
    }
}

/// Re-check the backend's interpreter verdict against the version bounds it
/// reported. A decidable numeric comparison replaces the model's own
/// judgement; undecidable input leaves the verdict untouched.
pub fn reconcile_python_support(
    compat: &mut CompatibilityAssessment,
    python_version: &str,
) {
    if compat.min_python_version.is_none() && compat.max_python_version.is_none()
    {
        return;
    }

    // placeholders such as "3.x" carry no comparable minor version
    let concrete = LooseVersion::parse(python_version)
        .is_some_and(|v| v.qualifier.is_none() && v.release.len() >= 2);
    if !concrete {
        return;
    }

    let Some(supported) = within_bounds(
        python_version,
        compat.min_python_version.as_deref(),
        compat.max_python_version.as_deref(),
    ) else {
        return;
    };

    if supported != compat.python_compatible {
        warn!(
            "python {python_version} against bounds {:?}..{:?}: overriding \
             reported python_compatible={}",
            compat.min_python_version,
            compat.max_python_version,
            compat.python_compatible
        );
        compat.python_compatible = supported;
    }

    if supported {
        for issue in compat.issues.iter_mut() {
            if issue.category.eq_ignore_ascii_case("python_version")
                && issue.severity == IssueSeverity::Blocking
            {
                issue.severity = IssueSeverity::Info;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        agent::{
            assessment::{CompatibilityIssue, RiskLevel},
            backend::{AnalysisRequest, MockAnalysisBackend},
        },
        error::AnvilError,
    };
    use serde_json::{Value, json};

    fn context() -> AnalysisContext {
        AnalysisContext {
            package_name: "requests".into(),
            current_version: "2.30.0".into(),
            target_version: "2.31.0".into(),
            changelog: "## v2.31.0\n\nSecurity fix".into(),
            python_version: "3.12.1".into(),
            ..AnalysisContext::default()
        }
    }

    fn risk_json() -> Value {
        json!({
            "summary": "Patch release",
            "risk_level": "low",
            "migration_required": false,
            "confidence": 0.9
        })
    }

    fn security_json() -> Value {
        json!({
            "summary": "Fixes proxy credential leak",
            "security_score": "improved",
            "upgrade_recommended": true,
            "confidence": 0.9
        })
    }

    fn compat_json(python_compatible: bool) -> Value {
        json!({
            "summary": "Works",
            "compatible": true,
            "python_compatible": python_compatible,
            "min_python_version": "3.7",
            "confidence": 0.9
        })
    }

    fn scripted_backend(
        fail: Option<AnalysisKind>,
    ) -> Arc<dyn AnalysisBackend> {
        let mut backend = MockAnalysisBackend::new();
        backend
            .expect_complete()
            .times(3)
            .returning(move |request: &AnalysisRequest| {
                if Some(request.kind) == fail {
                    return Err(AnvilError::backend("boom"));
                }
                Ok(match request.kind {
                    AnalysisKind::Risk => risk_json(),
                    AnalysisKind::Security => security_json(),
                    AnalysisKind::Compatibility => compat_json(true),
                })
            });
        Arc::new(backend)
    }

    fn settings(mode: ExecutionMode) -> AnalysisSettings {
        AnalysisSettings {
            mode,
            ..AnalysisSettings::default()
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn one_failure_does_not_affect_siblings() {
        for mode in [ExecutionMode::Sequential, ExecutionMode::Concurrent] {
            for failing in AnalysisKind::ALL {
                let orchestrator = Orchestrator::new(
                    Some(scripted_backend(Some(failing))),
                    settings(mode),
                );

                let verdict = orchestrator.assess(&context()).await;

                assert_eq!(verdict.agents_failed, vec![failing.name()]);
                assert_eq!(verdict.agents_succeeded.len(), 2, "{mode:?}");
                assert!(
                    !verdict
                        .agents_succeeded
                        .contains(&failing.name().to_string())
                );
            }
        }
    }

    #[tokio::test]
    async fn all_succeed_and_aggregate() {
        let orchestrator = Orchestrator::new(
            Some(scripted_backend(None)),
            settings(ExecutionMode::Concurrent),
        );

        let verdict = orchestrator.assess(&context()).await;

        assert_eq!(verdict.agents_failed, Vec::<String>::new());
        assert_eq!(verdict.overall_risk, RiskLevel::Low);
        assert!(verdict.upgrade_recommended);
        assert_eq!(
            verdict.improvements,
            vec!["Security improved: Fixes proxy credential leak"]
        );
        assert!(verdict.results.risk.is_some());
    }

    #[tokio::test]
    async fn no_backend_reports_every_reviewer_failed() {
        let orchestrator =
            Orchestrator::new(None, settings(ExecutionMode::Sequential));

        let verdict = orchestrator.assess(&context()).await;

        assert_eq!(verdict.agents_failed.len(), 3);
        assert_eq!(verdict.overall_risk, RiskLevel::Medium);
    }

    #[tokio::test]
    async fn wrong_python_verdict_is_corrected() {
        let mut backend = MockAnalysisBackend::new();
        backend.expect_complete().returning(|request| {
            Ok(match request.kind {
                AnalysisKind::Risk => risk_json(),
                AnalysisKind::Security => security_json(),
                AnalysisKind::Compatibility => compat_json(false),
            })
        });

        let orchestrator = Orchestrator::new(
            Some(Arc::new(backend)),
            settings(ExecutionMode::Sequential),
        );

        let verdict = orchestrator.assess(&context()).await;

        assert!(verdict.blocking_issues.is_empty());
        assert!(verdict.upgrade_recommended);
    }

    fn compat(
        python_compatible: bool,
        min: Option<&str>,
        max: Option<&str>,
    ) -> CompatibilityAssessment {
        CompatibilityAssessment {
            summary: String::new(),
            compatible: true,
            python_compatible,
            min_python_version: min.map(String::from),
            max_python_version: max.map(String::from),
            issues: vec![],
            deprecated_features_used: vec![],
            dependency_changes: vec![],
            confidence: 0.5,
        }
    }

    #[test]
    fn reconciles_against_known_version_pairs() {
        // (python, min, max, expected)
        let cases = [
            ("3.13.2", Some("3.10"), None, true),
            ("3.13.2", Some("3.8"), None, true),
            ("3.9.18", Some("3.10"), None, false),
            ("3.13.2", None, Some("3.12"), false),
            ("3.12.4", None, Some("3.12"), true),
            ("3.11.0", Some("3.11"), Some("3.13"), true),
        ];

        for (python, min, max, expected) in cases {
            for reported in [true, false] {
                let mut assessment = compat(reported, min, max);
                reconcile_python_support(&mut assessment, python);
                assert_eq!(
                    assessment.python_compatible, expected,
                    "{python} {min:?} {max:?}"
                );
            }
        }
    }

    #[test]
    fn undecidable_bounds_keep_reported_verdict() {
        let mut assessment = compat(false, None, None);
        reconcile_python_support(&mut assessment, "3.12.1");
        assert!(!assessment.python_compatible);

        let mut assessment = compat(true, Some("3.10"), None);
        reconcile_python_support(&mut assessment, "3.x");
        assert!(assessment.python_compatible);
    }

    #[test]
    fn downgrades_python_blockers_once_supported() {
        let mut assessment = compat(false, Some("3.9"), None);
        assessment.issues = vec![
            CompatibilityIssue {
                category: "python_version".into(),
                description: "Requires Python >= 3.9".into(),
                severity: IssueSeverity::Blocking,
                workaround: None,
            },
            CompatibilityIssue {
                category: "platform".into(),
                description: "Drops 32-bit Windows".into(),
                severity: IssueSeverity::Blocking,
                workaround: None,
            },
        ];

        reconcile_python_support(&mut assessment, "3.12.1");

        assert!(assessment.python_compatible);
        assert_eq!(assessment.issues[0].severity, IssueSeverity::Info);
        assert_eq!(assessment.issues[1].severity, IssueSeverity::Blocking);
    }
}
