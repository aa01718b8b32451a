use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Severity of a finding. Also the forced severity of a [`SeverityRule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    Moderate,
    Low,
}

impl Severity {
    pub const ALL: [Severity; 3] = [Severity::Critical, Severity::Moderate, Severity::Low];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::Moderate => "MODERATE",
            Severity::Low => "LOW",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueType {
    Contradiction,
    Ambiguity,
    Risk,
    Change,
    Missing,
}

impl IssueType {
    pub const ALL: [IssueType; 5] = [
        IssueType::Contradiction,
        IssueType::Ambiguity,
        IssueType::Risk,
        IssueType::Change,
        IssueType::Missing,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Contradiction => "CONTRADICTION",
            IssueType::Ambiguity => "AMBIGUITY",
            IssueType::Risk => "RISK",
            IssueType::Change => "CHANGE",
            IssueType::Missing => "MISSING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 4] = [
        RiskLevel::Low,
        RiskLevel::Moderate,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Moderate => "MODERATE",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

/// Whether the submitted documents are audited on their own or diffed as
/// original (first document) against revision (second document).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum AnalysisMode {
    #[default]
    Analysis,
    Comparison,
}

impl AnalysisMode {
    /// Documents required before a submission is accepted.
    pub fn min_documents(self) -> usize {
        match self {
            AnalysisMode::Analysis => 1,
            AnalysisMode::Comparison => 2,
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisMode::Analysis => f.write_str("ANALYSIS"),
            AnalysisMode::Comparison => f.write_str("COMPARISON"),
        }
    }
}

/// A single finding returned by the analysis service.
///
/// `severity` and `rule_applied` are the only fields the rule matcher rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: String,
    pub severity: Severity,
    #[serde(rename = "type")]
    pub kind: IssueType,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_doc1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_doc2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_applied: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// 0 (benign) to 100 (severe).
    pub score: u32,
    pub level: RiskLevel,
    pub financial_impact: String,
    pub legal_domain: String,
    pub primary_beneficiary: String,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub summary: String,
    pub risk_assessment: RiskAssessment,
    pub issues: Vec<Issue>,
}

/// User-defined keyword override.
///
/// `keywords` is the raw comma-separated list as entered; see
/// [`crate::rules::keyword_terms`] for how it is tokenized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeverityRule {
    pub id: String,
    pub name: String,
    pub keywords: String,
    pub severity: Severity,
    pub active: bool,
}

/// Match count per rule id. Rules without a match have no entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RuleStats(BTreeMap<String, usize>);

impl RuleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, rule_id: &str) {
        *self.0.entry(rule_id.to_string()).or_insert(0) += 1;
    }

    pub fn count(&self, rule_id: &str) -> usize {
        self.0.get(rule_id).copied().unwrap_or(0)
    }
}

/// Issue counts per effective severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SeverityBreakdown {
    pub critical: usize,
    pub moderate: usize,
    pub low: usize,
}

impl SeverityBreakdown {
    pub fn from_issues(issues: &[Issue]) -> Self {
        issues.iter().fold(Self::default(), |mut acc, issue| {
            match issue.severity {
                Severity::Critical => acc.critical += 1,
                Severity::Moderate => acc.moderate += 1,
                Severity::Low => acc.low += 1,
            }
            acc
        })
    }
}
