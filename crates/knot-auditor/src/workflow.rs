use tokio::sync::Mutex;
use tracing::{error, info};

use crate::analysis::Analyzer;
use crate::documents::encode_all;
use crate::error::AppError;
use crate::model::AnalysisResponse;
use crate::rate_limit::RateLimiter;
use crate::session::Session;

/// Run one submission end to end.
///
/// Validation failures return before anything is read or sent, and before a rate
/// limit token is taken. Once the session is `Processing`, every outcome (rate limit,
/// read failure, remote failure, success) is recorded on the session before returning.
/// The session lock is not held across the remote call.
pub async fn run_analysis(
    session: &Mutex<Session>,
    analyzer: &dyn Analyzer,
    limiter: Option<&RateLimiter>,
) -> Result<AnalysisResponse, AppError> {
    let (documents, mode) = {
        let mut guard = session.lock().await;
        let documents = guard.start_analysis()?;
        if let Some(limiter) = limiter {
            if let Err(e) = limiter.acquire().await {
                guard.analysis_failed(e.to_string())?;
                return Err(e);
            }
        }
        (documents, guard.mode())
    };
    info!(%mode, documents = documents.len(), "analysis started");

    let outcome = match encode_all(&documents).await {
        Ok(encoded) => analyzer.analyze(&encoded, mode).await,
        Err(e) => Err(e),
    };

    let mut guard = session.lock().await;
    match outcome {
        Ok(response) => {
            info!(issues = response.issues.len(), "analysis completed");
            guard.analysis_succeeded(response.clone())?;
            Ok(response)
        }
        Err(e) => {
            error!(error = %e, "analysis failed");
            guard.analysis_failed(e.to_string())?;
            Err(e)
        }
    }
}
