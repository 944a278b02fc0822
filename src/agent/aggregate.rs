//! Deterministic aggregation of reviewer results into one verdict.
use serde::Serialize;

use crate::agent::{
    assessment::{
        Assessment, CompatibilityAssessment, IssueSeverity, RiskAssessment,
        RiskLevel, SecurityAssessment, SecurityScore,
    },
    kind::AnalysisKind,
};

/// Raw per-kind results for one package. `None` means the reviewer failed
/// or was skipped, which is different from a clean review.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentResults {
    pub risk: Option<RiskAssessment>,
    pub security: Option<SecurityAssessment>,
    pub compatibility: Option<CompatibilityAssessment>,
    /// Kinds that were run, in completion-independent reporting order.
    pub attempted: Vec<AnalysisKind>,
}

impl AgentResults {
    /// Record the outcome of `kind`. An assessment of a different kind than
    /// requested is treated as a failure.
    pub fn record(&mut self, kind: AnalysisKind, result: Option<Assessment>) {
        if !self.attempted.contains(&kind) {
            self.attempted.push(kind);
        }

        match (kind, result) {
            (AnalysisKind::Risk, Some(Assessment::Risk(a))) => {
                self.risk = Some(a)
            }
            (AnalysisKind::Security, Some(Assessment::Security(a))) => {
                self.security = Some(a)
            }
            (
                AnalysisKind::Compatibility,
                Some(Assessment::Compatibility(a)),
            ) => self.compatibility = Some(a),
            _ => {}
        }
    }

    fn succeeded(&self, kind: AnalysisKind) -> bool {
        match kind {
            AnalysisKind::Risk => self.risk.is_some(),
            AnalysisKind::Security => self.security.is_some(),
            AnalysisKind::Compatibility => self.compatibility.is_some(),
        }
    }
}

/// Policy knobs for the recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationPolicy {
    /// Recommend upgrades whose overall risk is medium, leaving the
    /// warnings to the user.
    pub recommend_on_medium: bool,
}

impl Default for AggregationPolicy {
    fn default() -> Self {
        Self {
            recommend_on_medium: true,
        }
    }
}

/// Combined verdict for one package upgrade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedAssessment {
    #[serde(skip)]
    pub results: AgentResults,
    pub overall_risk: RiskLevel,
    pub overall_summary: String,
    pub upgrade_recommended: bool,
    pub blocking_issues: Vec<String>,
    pub warnings: Vec<String>,
    pub improvements: Vec<String>,
    pub agents_succeeded: Vec<String>,
    pub agents_failed: Vec<String>,
}

/// Package and versions the verdict is about, used only for display.
#[derive(Debug, Clone, Copy)]
pub struct Subject<'a> {
    pub package_name: &'a str,
    pub current_version: &'a str,
    pub target_version: &'a str,
    pub python_version: &'a str,
}

#[derive(Default)]
struct Findings {
    blocking: Vec<String>,
    warnings: Vec<String>,
    improvements: Vec<String>,
}

fn collect_findings(results: &AgentResults, python_version: &str) -> Findings {
    let mut findings = Findings::default();

    if let Some(risk) = &results.risk {
        match risk.risk_level {
            RiskLevel::High => findings
                .blocking
                .push(format!("High risk: {}", risk.summary)),
            RiskLevel::Medium => findings
                .warnings
                .push(format!("Medium risk: {}", risk.summary)),
            _ => {}
        }

        for change in &risk.breaking_changes {
            if change.is_critical() {
                findings
                    .blocking
                    .push(format!("Breaking: {}", change.description));
            } else {
                findings.warnings.push(format!(
                    "Breaking ({}): {}",
                    change.severity, change.description
                ));
            }
        }
    }

    if let Some(security) = &results.security {
        match security.security_score {
            SecurityScore::Improved => findings
                .improvements
                .push(format!("Security improved: {}", security.summary)),
            SecurityScore::Concerning => findings
                .warnings
                .push(format!("Security concern: {}", security.summary)),
            _ => {}
        }

        for vuln in &security.vulnerabilities_fixed {
            if vuln.fixed_in_upgrade && vuln.affects_current {
                findings.improvements.push(format!(
                    "Fixes {}: {}",
                    vuln.cve_id.as_deref().unwrap_or("vulnerability"),
                    vuln.description
                ));
            }
        }

        for concern in &security.security_concerns {
            findings.warnings.push(format!("Security: {concern}"));
        }
    }

    if let Some(compat) = &results.compatibility {
        if !compat.compatible {
            findings
                .blocking
                .push(format!("Incompatible: {}", compat.summary));
        }
        if !compat.python_compatible {
            findings
                .blocking
                .push(format!("Python {python_version} not supported"));
        }

        for issue in &compat.issues {
            if issue.severity == IssueSeverity::Blocking {
                findings
                    .blocking
                    .push(format!("Compatibility: {}", issue.description));
            } else {
                findings.warnings.push(format!(
                    "Compatibility ({}): {}",
                    issue.severity, issue.description
                ));
            }
        }
    }

    findings
}

fn overall_risk(results: &AgentResults, has_blocking: bool) -> RiskLevel {
    if has_blocking {
        return RiskLevel::High;
    }

    let mut signals = vec![];

    if let Some(risk) = &results.risk {
        signals.push(risk.risk_level);
    }

    if let Some(compat) = &results.compatibility
        && !compat.compatible
    {
        signals.push(RiskLevel::High);
    }

    if let Some(security) = &results.security {
        match security.security_score {
            SecurityScore::Concerning => signals.push(RiskLevel::Medium),
            SecurityScore::Improved => signals.push(RiskLevel::Positive),
            _ => {}
        }
    }

    signals
        .into_iter()
        .max_by_key(|level| level.rank())
        .unwrap_or(RiskLevel::Medium)
}

fn should_recommend(
    results: &AgentResults,
    risk: RiskLevel,
    has_blocking: bool,
    policy: AggregationPolicy,
) -> bool {
    if has_blocking || risk == RiskLevel::High {
        return false;
    }

    if results
        .security
        .as_ref()
        .is_some_and(|s| s.upgrade_recommended)
    {
        return true;
    }

    if matches!(risk, RiskLevel::Low | RiskLevel::Positive)
        && results.compatibility.as_ref().is_none_or(|c| c.compatible)
    {
        return true;
    }

    risk == RiskLevel::Medium && policy.recommend_on_medium
}

fn summarize(
    subject: Subject<'_>,
    findings: &Findings,
    recommended: bool,
) -> String {
    let mut parts = vec![format!(
        "Multi-agent analysis for {} {} → {}:",
        subject.package_name, subject.current_version, subject.target_version
    )];

    if !findings.improvements.is_empty() {
        parts.push(format!("{} improvement(s)", findings.improvements.len()));
    }
    if !findings.warnings.is_empty() {
        parts.push(format!("{} warning(s)", findings.warnings.len()));
    }
    if !findings.blocking.is_empty() {
        parts.push(format!("{} blocking issue(s)", findings.blocking.len()));
    }

    if recommended {
        parts.push("→ Upgrade RECOMMENDED".to_string());
    } else {
        parts.push("→ Review required before upgrade".to_string());
    }

    parts.join(" | ")
}

/// Combine the reviewer results. Pure: the same inputs always produce the
/// same verdict.
pub fn aggregate(
    results: AgentResults,
    subject: Subject<'_>,
    policy: AggregationPolicy,
) -> AggregatedAssessment {
    let findings = collect_findings(&results, subject.python_version);
    let has_blocking = !findings.blocking.is_empty();
    let overall_risk = overall_risk(&results, has_blocking);
    let upgrade_recommended =
        should_recommend(&results, overall_risk, has_blocking, policy);
    let overall_summary = summarize(subject, &findings, upgrade_recommended);

    let (succeeded, failed): (Vec<AnalysisKind>, Vec<AnalysisKind>) = results
        .attempted
        .iter()
        .partition(|kind| results.succeeded(**kind));

    AggregatedAssessment {
        overall_risk,
        overall_summary,
        upgrade_recommended,
        blocking_issues: findings.blocking,
        warnings: findings.warnings,
        improvements: findings.improvements,
        agents_succeeded: succeeded.iter().map(|k| k.name().into()).collect(),
        agents_failed: failed.iter().map(|k| k.name().into()).collect(),
        results,
    }
}
