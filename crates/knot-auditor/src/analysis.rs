use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use knot_common::gemini::{
    Content, GeminiClient, GenerateContentRequest, GenerationConfig, Part,
};

use crate::documents::EncodedDocument;
use crate::error::AppError;
use crate::model::{AnalysisMode, AnalysisResponse, IssueType, RiskLevel, Severity};

/// The remote analysis service. One call per submission; no retry or streaming.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(
        &self,
        documents: &[EncodedDocument],
        mode: AnalysisMode,
    ) -> Result<AnalysisResponse, AppError>;
}

pub struct GeminiAnalyzer {
    client: Arc<GeminiClient>,
    model: String,
    temperature: f32,
}

impl GeminiAnalyzer {
    pub fn new(client: Arc<GeminiClient>, model: String, temperature: f32) -> Self {
        Self {
            client,
            model,
            temperature,
        }
    }

    fn build_request(&self, documents: &[EncodedDocument], mode: AnalysisMode) -> GenerateContentRequest {
        let mut parts: Vec<Part> = documents
            .iter()
            .map(|d| Part::inline(d.mime_type, d.data.clone()))
            .collect();
        parts.push(Part::text(prompt(mode)));

        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(response_schema()),
                temperature: Some(self.temperature),
                max_output_tokens: None,
            }),
        }
    }
}

#[async_trait]
impl Analyzer for GeminiAnalyzer {
    async fn analyze(
        &self,
        documents: &[EncodedDocument],
        mode: AnalysisMode,
    ) -> Result<AnalysisResponse, AppError> {
        let request = self.build_request(documents, mode);
        let response = self
            .client
            .generate_content(&self.model, &request)
            .await?;

        if let Some(reason) = response.block_reason() {
            warn!(reason, "analysis request blocked");
            return Err(AppError::Blocked(reason.to_string()));
        }

        let text = response.text().ok_or(AppError::EmptyResponse)?;
        let parsed = parse_analysis_response(&text)?;

        info!(
            model = %self.model,
            issues = parsed.issues.len(),
            score = parsed.risk_assessment.score,
            total_tokens = response.usage_metadata.as_ref().and_then(|u| u.total_token_count),
            "analysis received"
        );
        Ok(parsed)
    }
}

/// Parse the service's JSON text and check it against the documented shape.
pub fn parse_analysis_response(text: &str) -> Result<AnalysisResponse, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::EmptyResponse);
    }

    let response: AnalysisResponse =
        serde_json::from_str(text).map_err(|e| AppError::Schema(e.to_string()))?;

    if response.risk_assessment.score > 100 {
        return Err(AppError::Schema(format!(
            "riskAssessment.score must be within 0..=100, got {}",
            response.risk_assessment.score
        )));
    }
    if let Some(pos) = response.issues.iter().position(|i| i.id.trim().is_empty()) {
        return Err(AppError::Schema(format!("issues[{pos}].id must not be empty")));
    }
    Ok(response)
}

pub fn prompt(mode: AnalysisMode) -> String {
    match mode {
        AnalysisMode::Analysis => format!(
            "You are an expert Senior Legal Auditor and Contract Analyst.\n\
Your task is to analyze the provided legal documents (contracts, policies, MSAs, SOWs) to identify:\n\
1. Logical contradictions between clauses (e.g., Clause A says X, Clause B says Y, and X != Y).\n\
2. Hidden liabilities or vague terms that pose a risk.\n\
3. Inconsistencies between a Master Agreement and a Statement of Work if two documents are provided.\n\n\
{}",
            shared_instructions()
        ),
        AnalysisMode::Comparison => format!(
            "You are an expert Senior Legal Auditor and Contract Analyst.\n\
Two documents are provided: the FIRST is the original version and the SECOND is the revised version.\n\
Your task is to compare them and identify:\n\
1. Substantive changes between the versions (type CHANGE), quoting the original in sourceDoc1 and the revision in sourceDoc2.\n\
2. Protections or obligations present in the original but missing from the revision (type MISSING).\n\
3. Contradictions, ambiguities and new risks introduced by the revision.\n\n\
{}",
            shared_instructions()
        ),
    }
}

fn shared_instructions() -> &'static str {
    "Classify each finding by Severity:\n\
- CRITICAL: Major legal risk, direct financial contradiction, or invalidating clause.\n\
- MODERATE: Ambiguity that could lead to disputes.\n\
- LOW: Minor formatting or slight inconsistency.\n\n\
Provide an overall risk assessment with a score from 0 (benign) to 100 (severe).\n\
Provide specific quotes to back up your findings."
}

/// Response schema in the service's OpenAPI subset.
pub fn response_schema() -> Value {
    let severities: Vec<&str> = Severity::ALL.iter().map(|s| s.as_str()).collect();
    let issue_types: Vec<&str> = IssueType::ALL.iter().map(|t| t.as_str()).collect();
    let risk_levels: Vec<&str> = RiskLevel::ALL.iter().map(|l| l.as_str()).collect();

    json!({
        "type": "OBJECT",
        "properties": {
            "summary": {
                "type": "STRING",
                "description": "A high-level executive summary of the contract analysis, highlighting major risks."
            },
            "riskAssessment": {
                "type": "OBJECT",
                "properties": {
                    "score": { "type": "INTEGER", "description": "Overall risk from 0 (benign) to 100 (severe)" },
                    "level": { "type": "STRING", "enum": risk_levels },
                    "financialImpact": { "type": "STRING", "description": "Estimated financial exposure" },
                    "legalDomain": { "type": "STRING", "description": "Primary area of law involved" },
                    "primaryBeneficiary": { "type": "STRING", "description": "Party the terms favor most" },
                    "explanation": { "type": "STRING", "description": "Why this score was given" }
                },
                "required": ["score", "level", "financialImpact", "legalDomain", "primaryBeneficiary", "explanation"]
            },
            "issues": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "severity": { "type": "STRING", "enum": severities },
                        "type": { "type": "STRING", "enum": issue_types },
                        "title": { "type": "STRING", "description": "Short title of the issue" },
                        "description": { "type": "STRING", "description": "Detailed explanation of the contradiction or ambiguity" },
                        "sourceDoc1": { "type": "STRING", "description": "Relevant quote from the first document (or earlier clause)" },
                        "sourceDoc2": { "type": "STRING", "description": "Relevant quote from the second document (or conflicting clause)" },
                        "pageRef": { "type": "STRING", "description": "Page numbers or section references" },
                        "recommendation": { "type": "STRING", "description": "Legal advice on how to resolve this" }
                    },
                    "required": ["id", "severity", "type", "title", "description"]
                }
            }
        },
        "required": ["summary", "riskAssessment", "issues"]
    })
}
