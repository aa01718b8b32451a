/// Keyword rule matching over analysis issues.
///
/// A rule matches an issue when any of its comma-separated keywords occurs as a whole
/// word (case-insensitive) in the issue's title, description or quoted source text.
/// "Whole word" means the keyword is bounded by a non-alphanumeric character or the
/// start/end of the text, so `fee` matches "the fee is due" but not "coffee".
///
/// Inactive rules are skipped entirely. When several rules match one issue, the last
/// one in sequence order decides the issue's severity and `rule_applied` label.
use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::model::{Issue, RuleStats, SeverityRule};

/// Split a raw keyword list into trimmed, lower-cased, non-empty terms.
pub fn keyword_terms(keywords: &str) -> Vec<String> {
    keywords
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Count, per active rule, the issues it matches. An issue matched by several rules
/// counts once for each of them.
pub fn compute_rule_stats(issues: &[Issue], rules: &[SeverityRule]) -> RuleStats {
    let mut stats = RuleStats::new();
    if issues.is_empty() {
        return stats;
    }

    let compiled = compile_active(rules);
    for issue in issues {
        let text = searchable_text(issue);
        for rule in &compiled {
            if rule.matches(&text) {
                stats.increment(&rule.rule.id);
            }
        }
    }
    stats
}

/// Return a copy of `issues` with matching rules applied. Inputs are left untouched.
pub fn apply_rules(issues: &[Issue], rules: &[SeverityRule]) -> Vec<Issue> {
    let compiled = compile_active(rules);
    if compiled.is_empty() {
        return issues.to_vec();
    }

    issues
        .iter()
        .map(|issue| {
            let text = searchable_text(issue);
            let winner = compiled.iter().rev().find(|rule| rule.matches(&text));
            match winner {
                Some(rule) => Issue {
                    severity: rule.rule.severity,
                    rule_applied: Some(rule.rule.name.clone()),
                    ..issue.clone()
                },
                None => issue.clone(),
            }
        })
        .collect()
}

struct CompiledRule<'a> {
    rule: &'a SeverityRule,
    /// `None` when the keyword list is empty; such a rule matches nothing.
    pattern: Option<Regex>,
}

impl CompiledRule<'_> {
    fn matches(&self, text: &str) -> bool {
        self.pattern.as_ref().is_some_and(|re| re.is_match(text))
    }
}

fn compile_active(rules: &[SeverityRule]) -> Vec<CompiledRule<'_>> {
    rules
        .iter()
        .filter(|r| r.active)
        .map(|rule| CompiledRule {
            rule,
            pattern: whole_word_pattern(&keyword_terms(&rule.keywords)).and_then(|src| {
                RegexBuilder::new(&src)
                    .case_insensitive(true)
                    .build()
                    .inspect_err(|e| {
                        warn!(rule = %rule.name, error = %e, "keyword pattern rejected, rule disabled")
                    })
                    .ok()
            }),
        })
        .collect()
}

/// `(?:^|[^\p{L}\p{N}])(?:kw1|kw2)(?:[^\p{L}\p{N}]|$)` with every term escaped.
fn whole_word_pattern(terms: &[String]) -> Option<String> {
    if terms.is_empty() {
        return None;
    }
    let alternation = terms
        .iter()
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    Some(format!(
        r"(?:^|[^\p{{L}}\p{{N}}])(?:{alternation})(?:[^\p{{L}}\p{{N}}]|$)"
    ))
}

fn searchable_text(issue: &Issue) -> String {
    let mut text = String::with_capacity(issue.title.len() + issue.description.len() + 1);
    text.push_str(&issue.title);
    text.push('\n');
    text.push_str(&issue.description);
    for quote in [&issue.source_doc1, &issue.source_doc2].into_iter().flatten() {
        text.push('\n');
        text.push_str(quote);
    }
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{IssueType, Severity};

    fn issue(id: &str, title: &str, description: &str, severity: Severity) -> Issue {
        Issue {
            id: id.to_string(),
            severity,
            kind: IssueType::Risk,
            title: title.to_string(),
            description: description.to_string(),
            source_doc1: None,
            source_doc2: None,
            page_ref: None,
            recommendation: None,
            rule_applied: None,
        }
    }

    fn rule(id: &str, name: &str, keywords: &str, severity: Severity) -> SeverityRule {
        SeverityRule {
            id: id.to_string(),
            name: name.to_string(),
            keywords: keywords.to_string(),
            severity,
            active: true,
        }
    }

    #[test]
    fn keyword_terms_trim_lowercase_and_drop_empties() {
        assert_eq!(
            keyword_terms(" Terminate, ,Cancel ,, End Agreement,"),
            vec!["terminate", "cancel", "end agreement"]
        );
        assert!(keyword_terms("").is_empty());
        assert!(keyword_terms(" , ,, ").is_empty());
    }

    #[test]
    fn whole_word_only() {
        let rules = [rule("r1", "Hidden Fees", "fee", Severity::Moderate)];
        let due = issue("1", "The fee is due", "", Severity::Low);
        let coffee = issue("2", "I drank coffee", "", Severity::Low);
        let feedback = issue("3", "feedback loop.", "", Severity::Low);

        let stats = compute_rule_stats(&[due, coffee, feedback], &rules);
        assert_eq!(stats.count("r1"), 1);
    }

    #[test]
    fn boundaries_at_punctuation_and_text_edges() {
        let rules = [rule("r1", "Fees", "fee", Severity::Moderate)];
        let issues = [
            issue("1", "fee", "", Severity::Low),
            issue("2", "Late-fee applies", "", Severity::Low),
            issue("3", "(fee)", "", Severity::Low),
            issue("4", "fees", "", Severity::Low),
            issue("5", "fee2", "", Severity::Low),
        ];
        let applied = apply_rules(&issues, &rules);
        let labelled: Vec<&str> = applied
            .iter()
            .filter(|i| i.rule_applied.is_some())
            .map(|i| i.id.as_str())
            .collect();
        assert_eq!(labelled, vec!["1", "2", "3"]);
    }

    #[test]
    fn matching_ignores_case() {
        let rules = [rule("r1", "Data Privacy", "Privacy", Severity::Critical)];
        let issues = [
            issue("1", "privacy policy missing", "", Severity::Low),
            issue("2", "NO PRIVACY CLAUSE", "", Severity::Low),
        ];
        assert_eq!(compute_rule_stats(&issues, &rules).count("r1"), 2);
    }

    #[test]
    fn multi_keyword_rule_counts_issue_once() {
        let rules = [rule("r1", "Termination", "Terminate, Cancel", Severity::Critical)];
        let both = issue("1", "Cancel clause", "Either party may terminate.", Severity::Low);
        let one = issue("2", "Terminate for convenience", "", Severity::Low);
        let none = issue("3", "Warranty", "As is.", Severity::Low);

        let stats = compute_rule_stats(&[both, one, none], &rules);
        assert_eq!(stats.count("r1"), 2);
    }

    #[test]
    fn multi_word_keywords_match_phrases() {
        let rules = [rule("r1", "No Jury Trial", "Jury Trial, Class Action", Severity::Moderate)];
        let issues = [issue("1", "Waiver", "Waives any right to a JURY TRIAL.", Severity::Low)];
        assert_eq!(compute_rule_stats(&issues, &rules).count("r1"), 1);
    }

    #[test]
    fn keywords_with_regex_metacharacters_are_literal() {
        let rules = [rule("r1", "Code", "c++, a.b", Severity::Low)];
        let issues = [
            issue("1", "Written in C++ only", "", Severity::Critical),
            issue("2", "axb", "", Severity::Critical),
        ];
        let stats = compute_rule_stats(&issues, &rules);
        assert_eq!(stats.count("r1"), 1);
    }

    #[test]
    fn source_quotes_are_searched() {
        let rules = [rule("r1", "IP Theft", "copyright", Severity::Critical)];
        let mut quoted = issue("1", "Ownership", "Conflicting grant.", Severity::Low);
        quoted.source_doc2 = Some("Vendor retains all Copyright.".to_string());
        assert_eq!(compute_rule_stats(&[quoted], &rules).count("r1"), 1);
    }

    #[test]
    fn inactive_rules_never_contribute() {
        let mut disabled = rule("r1", "Termination", "cancel", Severity::Critical);
        disabled.active = false;
        let issues = [issue("1", "They can cancel anytime", "", Severity::Low)];

        let stats = compute_rule_stats(&issues, &[disabled.clone()]);
        assert_eq!(stats, RuleStats::new());
        assert_eq!(apply_rules(&issues, &[disabled]), issues.to_vec());
    }

    #[test]
    fn empty_keyword_list_matches_nothing() {
        let rules = [rule("r1", "Broken", " , ,", Severity::Critical)];
        let issues = [issue("1", "anything", ", ,", Severity::Low)];
        assert_eq!(compute_rule_stats(&issues, &rules), RuleStats::new());
        assert_eq!(apply_rules(&issues, &rules), issues.to_vec());
    }

    #[test]
    fn last_matching_rule_wins() {
        let a = rule("a", "Fees", "fee", Severity::Moderate);
        let b = rule("b", "Penalties", "penalty", Severity::Critical);
        let issues = [issue("1", "Late fee", "A penalty of 1.5% applies.", Severity::Low)];

        let applied = apply_rules(&issues, &[a.clone(), b.clone()]);
        assert_eq!(applied[0].severity, Severity::Critical);
        assert_eq!(applied[0].rule_applied.as_deref(), Some("Penalties"));

        let reversed = apply_rules(&issues, &[b, a]);
        assert_eq!(reversed[0].severity, Severity::Moderate);
        assert_eq!(reversed[0].rule_applied.as_deref(), Some("Fees"));
    }

    #[test]
    fn later_inactive_rule_does_not_override() {
        let a = rule("a", "Fees", "fee", Severity::Moderate);
        let mut b = rule("b", "Penalties", "fee", Severity::Critical);
        b.active = false;
        let issues = [issue("1", "Late fee", "", Severity::Low)];

        let applied = apply_rules(&issues, &[a, b]);
        assert_eq!(applied[0].rule_applied.as_deref(), Some("Fees"));
        assert_eq!(applied[0].severity, Severity::Moderate);
    }

    #[test]
    fn apply_is_idempotent_and_does_not_mutate_input() {
        let rules = [
            rule("a", "Fees", "fee", Severity::Moderate),
            rule("b", "Privacy", "privacy", Severity::Critical),
        ];
        let issues = vec![
            issue("1", "Late fee", "", Severity::Low),
            issue("2", "Privacy gap", "", Severity::Low),
            issue("3", "Unrelated", "", Severity::Low),
        ];
        let snapshot = issues.clone();

        let once = apply_rules(&issues, &rules);
        let twice = apply_rules(&once, &rules);
        assert_eq!(once, twice);
        assert_eq!(issues, snapshot);
        assert!(once[2].rule_applied.is_none());
    }

    #[test]
    fn empty_inputs() {
        let rules = [rule("r1", "Fees", "fee", Severity::Moderate)];
        assert_eq!(compute_rule_stats(&[], &rules), RuleStats::new());

        let issues = vec![issue("1", "Late fee", "", Severity::Low)];
        assert_eq!(apply_rules(&issues, &[]), issues);
    }

    #[test]
    fn termination_scenario() {
        let issues = [issue(
            "1",
            "They can cancel anytime",
            "No notice required to terminate.",
            Severity::Moderate,
        )];
        let rules = [rule("r1", "Termination", "Terminate, Cancel", Severity::Critical)];

        let stats = compute_rule_stats(&issues, &rules);
        assert_eq!(serde_json::to_value(&stats).unwrap(), serde_json::json!({"r1": 1}));

        let applied = apply_rules(&issues, &rules);
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].id, "1");
        assert_eq!(applied[0].severity, Severity::Critical);
        assert_eq!(applied[0].rule_applied.as_deref(), Some("Termination"));
    }
}
