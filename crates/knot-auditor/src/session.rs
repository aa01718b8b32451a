/// Explicit session state for one audit.
///
/// All mutation goes through the named transitions below. Each one checks its
/// precondition and states which fields it resets:
///
/// | transition           | allowed when                      | effect                                   |
/// |----------------------|-----------------------------------|------------------------------------------|
/// | `select_mode`        | not processing                    | new mode clears documents, results, error |
/// | `add_files`          | not processing, no results        | append, truncate to 2, clear error       |
/// | `remove_file`        | not processing, no results        | drop one document, clear error           |
/// | `start_analysis`     | idle, enough documents for mode   | processing, clear results and error      |
/// | `analysis_succeeded` | processing                        | idle, store results                      |
/// | `analysis_failed`    | processing                        | idle, store error, results stay cleared  |
/// | `reset`              | not processing                    | clear documents, results, error          |
use schemars::JsonSchema;
use serde::Serialize;

use crate::documents::{DocumentRef, MAX_DOCUMENTS};
use crate::error::AppError;
use crate::model::{AnalysisMode, AnalysisResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    #[default]
    Idle,
    Processing,
}

#[derive(Debug, Default)]
pub struct Session {
    mode: AnalysisMode,
    status: SessionStatus,
    documents: Vec<DocumentRef>,
    results: Option<AnalysisResponse>,
    error: Option<String>,
}

/// Read-only view returned to callers.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SessionSnapshot {
    pub mode: AnalysisMode,
    pub status: SessionStatus,
    pub documents: Vec<DocumentRef>,
    pub has_results: bool,
    pub error: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub fn documents(&self) -> &[DocumentRef] {
        &self.documents
    }

    pub fn results(&self) -> Option<&AnalysisResponse> {
        self.results.as_ref()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode,
            status: self.status,
            documents: self.documents.clone(),
            has_results: self.results.is_some(),
            error: self.error.clone(),
        }
    }

    pub fn select_mode(&mut self, mode: AnalysisMode) -> Result<(), AppError> {
        self.ensure_idle("change mode")?;
        if mode != self.mode {
            self.mode = mode;
            self.documents.clear();
            self.results = None;
            self.error = None;
        }
        Ok(())
    }

    /// Append documents, keeping only the first [`MAX_DOCUMENTS`]. Returns how many of
    /// `documents` were actually kept.
    pub fn add_files(&mut self, documents: Vec<DocumentRef>) -> Result<usize, AppError> {
        self.ensure_editable("add documents")?;
        let before = self.documents.len();
        self.documents.extend(documents);
        self.documents.truncate(MAX_DOCUMENTS);
        self.error = None;
        Ok(self.documents.len() - before)
    }

    pub fn remove_file(&mut self, index: usize) -> Result<DocumentRef, AppError> {
        self.ensure_editable("remove documents")?;
        if index >= self.documents.len() {
            return Err(AppError::Validation(format!(
                "no document at index {index} ({} selected)",
                self.documents.len()
            )));
        }
        self.error = None;
        Ok(self.documents.remove(index))
    }

    /// Validate the selection for the current mode and enter `Processing`.
    ///
    /// On a validation failure the message is also stored as the session error and no
    /// state other than `error` changes.
    pub fn start_analysis(&mut self) -> Result<Vec<DocumentRef>, AppError> {
        self.ensure_idle("start an analysis")?;
        if self.results.is_some() {
            return Err(AppError::InvalidState(
                "results are already present; reset the session to analyze again".to_string(),
            ));
        }

        let required = self.mode.min_documents();
        if self.documents.len() < required {
            let message = match self.mode {
                AnalysisMode::Analysis => "select at least one PDF document to analyze".to_string(),
                AnalysisMode::Comparison => format!(
                    "comparison mode requires two documents (an original and a revision), {} selected",
                    self.documents.len()
                ),
            };
            self.error = Some(message.clone());
            return Err(AppError::Validation(message));
        }

        self.status = SessionStatus::Processing;
        self.results = None;
        self.error = None;
        Ok(self.documents.clone())
    }

    pub fn analysis_succeeded(&mut self, response: AnalysisResponse) -> Result<(), AppError> {
        self.ensure_processing()?;
        self.status = SessionStatus::Idle;
        self.results = Some(response);
        self.error = None;
        Ok(())
    }

    pub fn analysis_failed(&mut self, message: impl Into<String>) -> Result<(), AppError> {
        self.ensure_processing()?;
        self.status = SessionStatus::Idle;
        self.results = None;
        self.error = Some(message.into());
        Ok(())
    }

    /// Start over with an empty selection. The mode is kept.
    pub fn reset(&mut self) -> Result<(), AppError> {
        self.ensure_idle("reset the session")?;
        self.documents.clear();
        self.results = None;
        self.error = None;
        Ok(())
    }

    fn ensure_idle(&self, action: &str) -> Result<(), AppError> {
        match self.status {
            SessionStatus::Idle => Ok(()),
            SessionStatus::Processing => Err(AppError::InvalidState(format!(
                "cannot {action} while an analysis is in progress"
            ))),
        }
    }

    fn ensure_editable(&self, action: &str) -> Result<(), AppError> {
        self.ensure_idle(action)?;
        if self.results.is_some() {
            return Err(AppError::InvalidState(format!(
                "cannot {action} after analysis; reset the session first"
            )));
        }
        Ok(())
    }

    fn ensure_processing(&self) -> Result<(), AppError> {
        match self.status {
            SessionStatus::Processing => Ok(()),
            SessionStatus::Idle => Err(AppError::InvalidState(
                "no analysis is in progress".to_string(),
            )),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{RiskAssessment, RiskLevel};

    pub(crate) fn doc(name: &str) -> DocumentRef {
        DocumentRef::from_path(format!("/contracts/{name}")).unwrap()
    }

    pub(crate) fn response() -> AnalysisResponse {
        AnalysisResponse {
            summary: "One-sided IP terms.".to_string(),
            risk_assessment: RiskAssessment {
                score: 72,
                level: RiskLevel::High,
                financial_impact: "Up to $50k".to_string(),
                legal_domain: "Intellectual Property".to_string(),
                primary_beneficiary: "Vendor".to_string(),
                explanation: "Vendor keeps source code ownership.".to_string(),
            },
            issues: vec![],
        }
    }

    #[test]
    fn selection_is_truncated_to_two() {
        let mut session = Session::new();
        assert_eq!(session.add_files(vec![doc("a.pdf")]).unwrap(), 1);
        assert_eq!(
            session
                .add_files(vec![doc("b.pdf"), doc("c.pdf"), doc("d.pdf")])
                .unwrap(),
            1
        );
        let names: Vec<&str> = session.documents().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    }

    #[test]
    fn switching_mode_clears_selection_and_results() {
        let mut session = Session::new();
        session.add_files(vec![doc("a.pdf")]).unwrap();
        session.start_analysis().unwrap();
        session.analysis_succeeded(response()).unwrap();

        session.select_mode(AnalysisMode::Analysis).unwrap();
        assert!(session.results().is_some(), "same mode is a no-op");

        session.select_mode(AnalysisMode::Comparison).unwrap();
        assert_eq!(session.mode(), AnalysisMode::Comparison);
        assert!(session.documents().is_empty());
        assert!(session.results().is_none());
    }

    #[test]
    fn comparison_needs_two_documents() {
        let mut session = Session::new();
        session.select_mode(AnalysisMode::Comparison).unwrap();
        session.add_files(vec![doc("original.pdf")]).unwrap();

        let err = session.start_analysis().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(session.snapshot().status, SessionStatus::Idle);
        assert!(session.snapshot().error.unwrap().contains("two documents"));

        session.add_files(vec![doc("revised.pdf")]).unwrap();
        assert!(session.snapshot().error.is_none());
        assert_eq!(session.start_analysis().unwrap().len(), 2);
        assert_eq!(session.snapshot().status, SessionStatus::Processing);
    }

    #[test]
    fn analysis_needs_one_document() {
        let mut session = Session::new();
        assert!(matches!(
            session.start_analysis(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn processing_locks_the_session() {
        let mut session = Session::new();
        session.add_files(vec![doc("a.pdf")]).unwrap();
        session.start_analysis().unwrap();

        assert!(matches!(session.start_analysis(), Err(AppError::InvalidState(_))));
        assert!(matches!(
            session.add_files(vec![doc("b.pdf")]),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(session.remove_file(0), Err(AppError::InvalidState(_))));
        assert!(matches!(
            session.select_mode(AnalysisMode::Comparison),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(session.reset(), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn failure_records_error_and_returns_to_idle() {
        let mut session = Session::new();
        session.add_files(vec![doc("a.pdf")]).unwrap();
        session.start_analysis().unwrap();
        session.analysis_failed("network down").unwrap();

        assert_eq!(session.snapshot().status, SessionStatus::Idle);
        assert_eq!(session.snapshot().error.as_deref(), Some("network down"));
        assert!(session.results().is_none());
        assert_eq!(session.documents().len(), 1, "selection kept for resubmission");
    }

    #[test]
    fn completion_requires_processing() {
        let mut session = Session::new();
        assert!(matches!(
            session.analysis_succeeded(response()),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(
            session.analysis_failed("late"),
            Err(AppError::InvalidState(_))
        ));
    }

    #[test]
    fn results_freeze_selection_until_reset() {
        let mut session = Session::new();
        session.add_files(vec![doc("a.pdf")]).unwrap();
        session.start_analysis().unwrap();
        session.analysis_succeeded(response()).unwrap();

        assert!(matches!(
            session.add_files(vec![doc("b.pdf")]),
            Err(AppError::InvalidState(_))
        ));
        assert!(matches!(session.start_analysis(), Err(AppError::InvalidState(_))));

        session.reset().unwrap();
        let snapshot = session.snapshot();
        assert!(snapshot.documents.is_empty());
        assert!(!snapshot.has_results);
        assert!(snapshot.error.is_none());
        assert_eq!(snapshot.mode, AnalysisMode::Analysis);
    }

    #[test]
    fn remove_file_checks_index() {
        let mut session = Session::new();
        session.add_files(vec![doc("a.pdf"), doc("b.pdf")]).unwrap();
        assert_eq!(session.remove_file(0).unwrap().name, "a.pdf");
        assert!(matches!(session.remove_file(5), Err(AppError::Validation(_))));
        assert_eq!(session.documents()[0].name, "b.pdf");
    }
}
