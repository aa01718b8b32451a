/// MCP server for contract auditing.
///
/// Tools mirror the user actions of an audit session:
/// - document selection: `select_mode`, `add_documents`, `remove_document`
/// - analysis: `analyze_documents`, `get_report`, `get_session`, `reset_session`
/// - severity rules: `list_presets`, `add_preset`, `add_rule`, `remove_rule`,
///   `set_rule_active`, `list_rules`
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use crate::analysis::Analyzer;
use crate::documents::select_documents;
use crate::model::{AnalysisMode, AnalysisResponse, Severity};
use crate::rate_limit::RateLimiter;
use crate::report::{rule_views, AnalysisReport, RuleView};
use crate::rulebook::{RuleBook, PRESETS};
use crate::session::{Session, SessionSnapshot};
use crate::workflow::run_analysis;

#[derive(Clone)]
pub struct AuditorServer {
    session: Arc<Mutex<Session>>,
    rules: Arc<RwLock<RuleBook>>,
    analyzer: Arc<dyn Analyzer>,
    limiter: Option<RateLimiter>,
    tool_router: ToolRouter<AuditorServer>,
}

impl AuditorServer {
    pub fn new(analyzer: Arc<dyn Analyzer>, limiter: Option<RateLimiter>) -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::new())),
            rules: Arc::new(RwLock::new(RuleBook::new())),
            analyzer,
            limiter,
            tool_router: Self::tool_router(),
        }
    }

    async fn current_results(&self) -> Option<AnalysisResponse> {
        self.session.lock().await.results().cloned()
    }

    async fn view_of(&self, rule_id: &str) -> Result<RuleView, String> {
        let results = self.current_results().await;
        let rules = self.rules.read().await;
        rule_views(rules.rules(), results.as_ref())
            .into_iter()
            .find(|v| v.id == rule_id)
            .ok_or_else(|| format!("rule not found: {rule_id}"))
    }

    async fn build_report(&self) -> Result<AnalysisReport, String> {
        let (results, mode, document_count) = {
            let session = self.session.lock().await;
            let results = session
                .results()
                .cloned()
                .ok_or_else(|| "no analysis results yet; run analyze_documents first".to_string())?;
            (results, session.mode(), session.documents().len())
        };
        let rules = self.rules.read().await;
        Ok(AnalysisReport::build(
            &results,
            rules.rules(),
            mode,
            document_count,
        ))
    }
}

// --- tool parameters and responses ---

#[derive(Debug, Deserialize, JsonSchema)]
struct SelectModeParams {
    /// ANALYSIS audits the documents on their own; COMPARISON diffs an original
    /// (first document) against a revision (second document).
    mode: AnalysisMode,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AddDocumentsParams {
    /// Filesystem paths of PDF documents. At most two are kept per session.
    paths: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RemoveDocumentParams {
    /// Zero-based position in the current selection.
    index: usize,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AddPresetParams {
    /// Preset name as returned by list_presets.
    name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AddRuleParams {
    name: String,
    /// Comma-separated keywords. Matching is case-insensitive and whole-word only
    /// ("fee" does not match "coffee").
    keywords: String,
    severity: Severity,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct RuleIdParams {
    rule_id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SetRuleActiveParams {
    rule_id: String,
    active: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
struct AddDocumentsResponse {
    /// Documents appended to the selection.
    added: usize,
    /// Documents dropped because the selection already holds two.
    truncated: usize,
    /// Paths refused because they are not PDF files.
    rejected: Vec<String>,
    session: SessionSnapshot,
}

#[derive(Debug, Serialize, JsonSchema)]
struct PresetView {
    name: String,
    keywords: String,
    severity: Severity,
    /// Whether a rule with this name is already in the rule list.
    added: bool,
}

#[derive(Debug, Serialize, JsonSchema)]
struct PresetListResponse {
    presets: Vec<PresetView>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct RuleListResponse {
    rules: Vec<RuleView>,
    /// When true, each rule carries its match count against the current results.
    has_results: bool,
}

#[tool_router]
impl AuditorServer {
    #[tool(description = "Get the current audit session: mode, selected documents, status and last error.")]
    async fn get_session(&self) -> Result<Json<SessionSnapshot>, String> {
        Ok(Json(self.session.lock().await.snapshot()))
    }

    #[tool(description = "Switch between ANALYSIS and COMPARISON mode. Changing the mode clears the selected documents and any results.")]
    async fn select_mode(
        &self,
        Parameters(params): Parameters<SelectModeParams>,
    ) -> Result<Json<SessionSnapshot>, String> {
        let mut session = self.session.lock().await;
        session.select_mode(params.mode).map_err(|e| e.to_string())?;
        info!(mode = %params.mode, "mode selected");
        Ok(Json(session.snapshot()))
    }

    #[tool(description = "Add PDF documents to the session by path. Non-PDF paths are rejected; at most two documents are kept.")]
    async fn add_documents(
        &self,
        Parameters(params): Parameters<AddDocumentsParams>,
    ) -> Result<Json<AddDocumentsResponse>, String> {
        if params.paths.is_empty() {
            return Err("paths must not be empty".to_string());
        }
        let selection = select_documents(&params.paths);
        let offered = selection.accepted.len();

        let mut session = self.session.lock().await;
        let added = session
            .add_files(selection.accepted)
            .map_err(|e| e.to_string())?;
        info!(
            added,
            rejected = selection.rejected.len(),
            "documents selected"
        );
        Ok(Json(AddDocumentsResponse {
            added,
            truncated: offered - added,
            rejected: selection.rejected,
            session: session.snapshot(),
        }))
    }

    #[tool(description = "Remove a selected document by its zero-based index.")]
    async fn remove_document(
        &self,
        Parameters(params): Parameters<RemoveDocumentParams>,
    ) -> Result<Json<SessionSnapshot>, String> {
        let mut session = self.session.lock().await;
        session.remove_file(params.index).map_err(|e| e.to_string())?;
        Ok(Json(session.snapshot()))
    }

    #[tool(description = "Send the selected documents to the analysis service and return the report with severity rules applied. COMPARISON mode requires two documents.")]
    async fn analyze_documents(&self) -> Result<Json<AnalysisReport>, String> {
        run_analysis(&self.session, self.analyzer.as_ref(), self.limiter.as_ref())
            .await
            .map_err(|e| format!("analysis failed: {e}"))?;
        Ok(Json(self.build_report().await?))
    }

    #[tool(description = "Get the latest analysis report: summary, risk assessment, issues with rule overrides, per-rule match counts and a severity breakdown.")]
    async fn get_report(&self) -> Result<Json<AnalysisReport>, String> {
        Ok(Json(self.build_report().await?))
    }

    #[tool(description = "Clear the selected documents, results and error to start a new analysis. The mode and rules are kept.")]
    async fn reset_session(&self) -> Result<Json<SessionSnapshot>, String> {
        let mut session = self.session.lock().await;
        session.reset().map_err(|e| e.to_string())?;
        info!("session reset");
        Ok(Json(session.snapshot()))
    }

    #[tool(description = "List the built-in severity rule presets.")]
    async fn list_presets(&self) -> Result<Json<PresetListResponse>, String> {
        let rules = self.rules.read().await;
        let presets = PRESETS
            .iter()
            .map(|p| PresetView {
                name: p.name.to_string(),
                keywords: p.keywords.to_string(),
                severity: p.severity,
                added: rules.rules().iter().any(|r| r.name == p.name),
            })
            .collect();
        Ok(Json(PresetListResponse { presets }))
    }

    #[tool(description = "Add a built-in preset rule by name. A preset that is already in the rule list is rejected.")]
    async fn add_preset(
        &self,
        Parameters(params): Parameters<AddPresetParams>,
    ) -> Result<Json<RuleView>, String> {
        let id = {
            let mut rules = self.rules.write().await;
            let rule = rules.add_preset(&params.name).map_err(|e| e.to_string())?;
            info!(rule = %rule.name, "preset rule added");
            rule.id.clone()
        };
        Ok(Json(self.view_of(&id).await?))
    }

    #[tool(description = "Add a custom severity rule: issues whose text contains any of the keywords as a whole word are forced to the given severity. Later rules win over earlier ones.")]
    async fn add_rule(
        &self,
        Parameters(params): Parameters<AddRuleParams>,
    ) -> Result<Json<RuleView>, String> {
        let id = {
            let mut rules = self.rules.write().await;
            let rule = rules
                .add_custom(&params.name, &params.keywords, params.severity)
                .map_err(|e| e.to_string())?;
            info!(rule = %rule.name, severity = %rule.severity, "custom rule added");
            rule.id.clone()
        };
        Ok(Json(self.view_of(&id).await?))
    }

    #[tool(description = "Delete a severity rule by id.")]
    async fn remove_rule(
        &self,
        Parameters(params): Parameters<RuleIdParams>,
    ) -> Result<Json<RuleListResponse>, String> {
        {
            let mut rules = self.rules.write().await;
            let removed = rules.remove(&params.rule_id).map_err(|e| e.to_string())?;
            info!(rule = %removed.name, "rule removed");
        }
        self.list_rules().await
    }

    #[tool(description = "Enable or disable a severity rule without deleting it. Disabled rules never match.")]
    async fn set_rule_active(
        &self,
        Parameters(params): Parameters<SetRuleActiveParams>,
    ) -> Result<Json<RuleView>, String> {
        {
            let mut rules = self.rules.write().await;
            rules
                .set_active(&params.rule_id, params.active)
                .map_err(|e| e.to_string())?;
        }
        Ok(Json(self.view_of(&params.rule_id).await?))
    }

    #[tool(description = "List severity rules in evaluation order, with match counts when results are available.")]
    async fn list_rules(&self) -> Result<Json<RuleListResponse>, String> {
        let results = self.current_results().await;
        let rules = self.rules.read().await;
        Ok(Json(RuleListResponse {
            rules: rule_views(rules.rules(), results.as_ref()),
            has_results: results.is_some(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for AuditorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "knot-auditor".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Contract auditing MCP server. Pick a mode with select_mode (ANALYSIS or \
COMPARISON), add up to two PDFs with add_documents, then call analyze_documents. Severity \
rules (list_presets/add_preset/add_rule) override issue severities by whole-word keyword \
match and are applied to every report; get_report reflects rule edits without re-running \
the analysis. Use reset_session to start over."
                    .to_string(),
            ),
        }
    }
}
