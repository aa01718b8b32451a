use schemars::JsonSchema;
use serde::Serialize;

use crate::model::{
    AnalysisMode, AnalysisResponse, Issue, RiskAssessment, RuleStats, SeverityBreakdown,
    SeverityRule,
};
use crate::rules::{apply_rules, compute_rule_stats, keyword_terms};

/// Results as shown to the user: the service response with the current rules applied.
///
/// Derived on every read, so rule edits are reflected without re-running the analysis.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AnalysisReport {
    pub mode: AnalysisMode,
    pub document_count: usize,
    pub summary: String,
    pub risk_assessment: RiskAssessment,
    pub issues: Vec<Issue>,
    pub severity_breakdown: SeverityBreakdown,
    pub rule_stats: RuleStats,
    /// Issues whose severity was forced by a rule.
    pub overridden_issues: usize,
}

impl AnalysisReport {
    pub fn build(
        response: &AnalysisResponse,
        rules: &[SeverityRule],
        mode: AnalysisMode,
        document_count: usize,
    ) -> Self {
        let issues = apply_rules(&response.issues, rules);
        let rule_stats = compute_rule_stats(&response.issues, rules);
        let overridden_issues = issues.iter().filter(|i| i.rule_applied.is_some()).count();
        Self {
            mode,
            document_count,
            summary: response.summary.clone(),
            risk_assessment: response.risk_assessment.clone(),
            severity_breakdown: SeverityBreakdown::from_issues(&issues),
            issues,
            rule_stats,
            overridden_issues,
        }
    }
}

/// A rule with its parsed keywords and, when results exist, its match count.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct RuleView {
    pub id: String,
    pub name: String,
    pub keywords: Vec<String>,
    pub severity: crate::model::Severity,
    pub active: bool,
    pub matches: Option<usize>,
}

impl RuleView {
    pub fn from_rule(rule: &SeverityRule, stats: Option<&RuleStats>) -> Self {
        Self {
            id: rule.id.clone(),
            name: rule.name.clone(),
            keywords: keyword_terms(&rule.keywords),
            severity: rule.severity,
            active: rule.active,
            matches: stats.map(|s| s.count(&rule.id)),
        }
    }
}

pub fn rule_views(rules: &[SeverityRule], results: Option<&AnalysisResponse>) -> Vec<RuleView> {
    let stats = results.map(|r| compute_rule_stats(&r.issues, rules));
    rules
        .iter()
        .map(|rule| RuleView::from_rule(rule, stats.as_ref()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IssueType, Severity};
    use crate::session::tests::response;

    fn issue(id: &str, title: &str, severity: Severity) -> Issue {
        Issue {
            id: id.to_string(),
            severity,
            kind: IssueType::Ambiguity,
            title: title.to_string(),
            description: String::new(),
            source_doc1: None,
            source_doc2: None,
            page_ref: None,
            recommendation: None,
            rule_applied: None,
        }
    }

    fn rule(id: &str, keywords: &str, severity: Severity, active: bool) -> SeverityRule {
        SeverityRule {
            id: id.to_string(),
            name: format!("rule {id}"),
            keywords: keywords.to_string(),
            severity,
            active,
        }
    }

    #[test]
    fn report_reflects_rule_overrides() {
        let mut resp = response();
        resp.issues = vec![
            issue("1", "Late fee", Severity::Low),
            issue("2", "Cancel anytime", Severity::Low),
            issue("3", "Formatting", Severity::Low),
        ];
        let rules = [
            rule("r1", "fee", Severity::Moderate, true),
            rule("r2", "cancel", Severity::Critical, true),
        ];

        let report = AnalysisReport::build(&resp, &rules, AnalysisMode::Analysis, 1);
        assert_eq!(report.overridden_issues, 2);
        assert_eq!(
            report.severity_breakdown,
            SeverityBreakdown {
                critical: 1,
                moderate: 1,
                low: 1
            }
        );
        assert_eq!(report.rule_stats.count("r1"), 1);
        assert_eq!(report.rule_stats.count("r2"), 1);
        assert_eq!(resp.issues[0].severity, Severity::Low, "response left untouched");
    }

    #[test]
    fn rule_views_report_matches_only_with_results() {
        let mut resp = response();
        resp.issues = vec![issue("1", "Late fee", Severity::Low)];
        let rules = [
            rule("r1", "Fee, Penalty", Severity::Moderate, true),
            rule("r2", "fee", Severity::Critical, false),
        ];

        let without = rule_views(&rules, None);
        assert!(without.iter().all(|v| v.matches.is_none()));
        assert_eq!(without[0].keywords, vec!["fee", "penalty"]);

        let with = rule_views(&rules, Some(&resp));
        assert_eq!(with[0].matches, Some(1));
        assert_eq!(with[1].matches, Some(0));
    }
}
