use knot_common::ids::new_id;

use crate::error::AppError;
use crate::model::{Severity, SeverityRule};

/// A ready-made rule the user can add with one action.
#[derive(Debug, Clone, Copy)]
pub struct Preset {
    pub name: &'static str,
    pub keywords: &'static str,
    pub severity: Severity,
}

pub const PRESETS: &[Preset] = &[
    Preset {
        name: "IP Theft",
        keywords: "Intellectual Property, Copyright, Patent",
        severity: Severity::Critical,
    },
    Preset {
        name: "Termination",
        keywords: "Terminate, Cancel, End Agreement, Termination",
        severity: Severity::Critical,
    },
    Preset {
        name: "Hidden Fees",
        keywords: "Penalty, Fee, Cost, Expense, Reimbursement",
        severity: Severity::Moderate,
    },
    Preset {
        name: "Data Privacy",
        keywords: "Privacy, Data, GDPR, Breach, Security",
        severity: Severity::Critical,
    },
    Preset {
        name: "Marketing Rights",
        keywords: "Publicity, Logo, Marketing, Case Study",
        severity: Severity::Moderate,
    },
    Preset {
        name: "No Jury Trial",
        keywords: "Arbitration, Jury Trial, Class Action",
        severity: Severity::Moderate,
    },
];

/// The user's severity rules in insertion order.
#[derive(Debug, Default)]
pub struct RuleBook {
    rules: Vec<SeverityRule>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[SeverityRule] {
        &self.rules
    }

    pub fn add_custom(
        &mut self,
        name: &str,
        keywords: &str,
        severity: Severity,
    ) -> Result<&SeverityRule, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("rule name must not be empty".to_string()));
        }
        let keywords = keywords.trim();
        if keywords.is_empty() {
            return Err(AppError::Validation("rule keywords must not be empty".to_string()));
        }
        Ok(self.push(name, keywords, severity))
    }

    /// Add a built-in preset by name (case-insensitive). A preset already present by
    /// name is rejected rather than added twice.
    pub fn add_preset(&mut self, name: &str) -> Result<&SeverityRule, AppError> {
        let wanted = name.trim();
        let preset = PRESETS
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AppError::UnknownPreset(wanted.to_string()))?;

        if self.rules.iter().any(|r| r.name == preset.name) {
            return Err(AppError::DuplicateRule(preset.name.to_string()));
        }
        Ok(self.push(preset.name, preset.keywords, preset.severity))
    }

    pub fn remove(&mut self, id: &str) -> Result<SeverityRule, AppError> {
        let idx = self.position(id)?;
        Ok(self.rules.remove(idx))
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> Result<&SeverityRule, AppError> {
        let idx = self.position(id)?;
        let rule = &mut self.rules[idx];
        rule.active = active;
        Ok(rule)
    }

    fn position(&self, id: &str) -> Result<usize, AppError> {
        self.rules
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::RuleNotFound(id.to_string()))
    }

    fn push(&mut self, name: &str, keywords: &str, severity: Severity) -> &SeverityRule {
        self.rules.push(SeverityRule {
            id: new_id(),
            name: name.to_string(),
            keywords: keywords.to_string(),
            severity,
            active: true,
        });
        &self.rules[self.rules.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_rules_keep_insertion_order() {
        let mut book = RuleBook::new();
        book.add_custom("Liability", "liable, damages", Severity::Critical)
            .unwrap();
        book.add_custom("  Notice ", " notice ", Severity::Low).unwrap();

        let names: Vec<&str> = book.rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Liability", "Notice"]);
        assert_eq!(book.rules()[1].keywords, "notice");
        assert!(book.rules().iter().all(|r| r.active));
        assert_ne!(book.rules()[0].id, book.rules()[1].id);
    }

    #[test]
    fn custom_rule_requires_name_and_keywords() {
        let mut book = RuleBook::new();
        assert!(matches!(
            book.add_custom(" ", "fee", Severity::Low),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            book.add_custom("Fees", "", Severity::Low),
            Err(AppError::Validation(_))
        ));
        assert!(book.rules().is_empty());
    }

    #[test]
    fn presets_cannot_be_added_twice() {
        let mut book = RuleBook::new();
        let added = book.add_preset("termination").unwrap();
        assert_eq!(added.name, "Termination");
        assert_eq!(added.severity, Severity::Critical);

        assert!(matches!(
            book.add_preset("Termination"),
            Err(AppError::DuplicateRule(name)) if name == "Termination"
        ));
        assert_eq!(book.rules().len(), 1);
    }

    #[test]
    fn custom_rule_may_share_a_name() {
        let mut book = RuleBook::new();
        book.add_preset("Hidden Fees").unwrap();
        book.add_custom("Hidden Fees", "surcharge", Severity::Low)
            .unwrap();
        assert_eq!(book.rules().len(), 2);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let mut book = RuleBook::new();
        assert!(matches!(
            book.add_preset("Force Majeure"),
            Err(AppError::UnknownPreset(_))
        ));
    }

    #[test]
    fn remove_and_toggle_by_id() {
        let mut book = RuleBook::new();
        let first = book.add_preset("IP Theft").unwrap().id.clone();
        let second = book.add_preset("Data Privacy").unwrap().id.clone();

        assert!(!book.set_active(&first, false).unwrap().active);
        assert!(!book.rules()[0].active);

        let removed = book.remove(&second).unwrap();
        assert_eq!(removed.name, "Data Privacy");
        assert!(matches!(book.remove(&second), Err(AppError::RuleNotFound(_))));
        assert!(matches!(
            book.set_active("missing", true),
            Err(AppError::RuleNotFound(_))
        ));
        assert_eq!(book.rules().len(), 1);
    }
}
