//! Structured verdicts produced by the analysis backends.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Overall upgrade risk, ordered from most to least favorable.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RiskLevel {
    Positive,
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    /// Severity rank used when several signals compete. Higher is worse.
    pub fn rank(self) -> u8 {
        match self {
            RiskLevel::Positive => 0,
            RiskLevel::Low => 1,
            RiskLevel::Medium => 2,
            RiskLevel::High => 3,
        }
    }
}

/// A single breaking change called out in the changelog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BreakingChange {
    /// Kind of change, e.g. "API Removal" or "Signature Change".
    pub category: String,
    /// What changed and how it may break calling code.
    pub description: String,
    /// "critical", "major" or "minor".
    pub severity: String,
    /// Symbols from the project's own code that are affected.
    #[serde(default)]
    pub affected_symbols: Vec<String>,
}

impl BreakingChange {
    pub fn is_critical(&self) -> bool {
        self.severity.trim().eq_ignore_ascii_case("critical")
    }
}

/// Breaking change and behavior review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RiskAssessment {
    pub summary: String,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub breaking_changes: Vec<BreakingChange>,
    /// Subtle behavior changes that might affect calling code.
    #[serde(default)]
    pub behavioral_changes: Vec<String>,
    pub migration_required: bool,
    #[serde(default)]
    pub migration_guide: Option<String>,
    /// Confidence between 0.0 and 1.0.
    pub confidence: f64,
}

#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SecurityScore {
    Safe,
    Improved,
    Neutral,
    Concerning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Vulnerability {
    /// CVE identifier when the changelog mentions one.
    #[serde(default)]
    pub cve_id: Option<String>,
    /// "critical", "high", "medium" or "low".
    pub severity: String,
    pub description: String,
    pub fixed_in_upgrade: bool,
    pub affects_current: bool,
}

/// Security review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SecurityAssessment {
    pub summary: String,
    pub security_score: SecurityScore,
    #[serde(default)]
    pub vulnerabilities_fixed: Vec<Vulnerability>,
    /// New transitive runtime dependencies.
    #[serde(default)]
    pub new_dependencies: Vec<String>,
    #[serde(default)]
    pub security_improvements: Vec<String>,
    #[serde(default)]
    pub security_concerns: Vec<String>,
    pub upgrade_recommended: bool,
    pub confidence: f64,
}

#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IssueSeverity {
    Blocking,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompatibilityIssue {
    /// e.g. "python_version", "dependency_conflict", "platform".
    pub category: String,
    pub description: String,
    pub severity: IssueSeverity,
    #[serde(default)]
    pub workaround: Option<String>,
}

/// Environment compatibility review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CompatibilityAssessment {
    pub summary: String,
    pub compatible: bool,
    pub python_compatible: bool,
    #[serde(default)]
    pub min_python_version: Option<String>,
    #[serde(default)]
    pub max_python_version: Option<String>,
    #[serde(default)]
    pub issues: Vec<CompatibilityIssue>,
    #[serde(default)]
    pub deprecated_features_used: Vec<String>,
    #[serde(default)]
    pub dependency_changes: Vec<String>,
    pub confidence: f64,
}

/// Result of any one review kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Assessment {
    Risk(RiskAssessment),
    Security(SecurityAssessment),
    Compatibility(CompatibilityAssessment),
}
