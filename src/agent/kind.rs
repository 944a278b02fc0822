//! The closed set of analysis kinds. Each kind carries its own prompt pair
//! and result schema; everything else about calling a backend is shared.
use schemars::schema_for;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Display;

use crate::{
    Result,
    agent::{
        assessment::{
            Assessment, CompatibilityAssessment, RiskAssessment,
            SecurityAssessment,
        },
        prompts,
    },
    error::AnvilError,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AnalysisKind {
    Risk,
    Security,
    Compatibility,
}

impl AnalysisKind {
    /// Every kind, in reporting order.
    pub const ALL: [AnalysisKind; 3] = [
        AnalysisKind::Risk,
        AnalysisKind::Security,
        AnalysisKind::Compatibility,
    ];

    /// Stable reviewer name used in logs and in the aggregated report.
    pub fn name(self) -> &'static str {
        match self {
            AnalysisKind::Risk => "risk_assessor",
            AnalysisKind::Security => "security_auditor",
            AnalysisKind::Compatibility => "compatibility",
        }
    }

    /// Name of the structured output schema sent to the backend.
    pub fn schema_name(self) -> &'static str {
        match self {
            AnalysisKind::Risk => "RiskAssessment",
            AnalysisKind::Security => "SecurityAssessment",
            AnalysisKind::Compatibility => "CompatibilityAssessment",
        }
    }

    /// System and user prompt templates.
    pub fn templates(self) -> (&'static str, &'static str) {
        match self {
            AnalysisKind::Risk => (prompts::RISK_SYSTEM, prompts::RISK_USER),
            AnalysisKind::Security => {
                (prompts::SECURITY_SYSTEM, prompts::SECURITY_USER)
            }
            AnalysisKind::Compatibility => {
                (prompts::COMPATIBILITY_SYSTEM, prompts::COMPATIBILITY_USER)
            }
        }
    }

    /// JSON schema the backend must conform to.
    pub fn schema(self) -> Result<Value> {
        let schema = match self {
            AnalysisKind::Risk => schema_for!(RiskAssessment),
            AnalysisKind::Security => schema_for!(SecurityAssessment),
            AnalysisKind::Compatibility => schema_for!(CompatibilityAssessment),
        };
        Ok(serde_json::to_value(schema)?)
    }

    /// Decode a backend response into this kind's assessment.
    pub fn parse(self, value: Value) -> Result<Assessment> {
        let assessment = match self {
            AnalysisKind::Risk => Assessment::Risk(self.decode(value)?),
            AnalysisKind::Security => Assessment::Security(self.decode(value)?),
            AnalysisKind::Compatibility => {
                Assessment::Compatibility(self.decode(value)?)
            }
        };
        Ok(assessment)
    }

    fn decode<T: DeserializeOwned>(self, value: Value) -> Result<T> {
        serde_json::from_value(value)
            .map_err(|e| AnvilError::malformed(format!("{self}: {e}")))
    }
}

impl Display for AnalysisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
