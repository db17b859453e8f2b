//! Route handlers.

use crate::analyze::analyze_bytes;
use crate::error::AnalystError;
use crate::output::AnalysisReport;
use crate::server::error::{ApiError, ApiResult, PageError};
use crate::server::views::{IndexPage, ResultPage};
use crate::server::AppState;
use askama::Template;
use axum::{
    body::Bytes,
    extract::{Multipart, State},
    response::Html,
    Json,
};
use serde::Serialize;
use tracing::{debug, info};

/// Multipart field carrying the PDF.
pub const UPLOAD_FIELD: &str = "file";

/// The uploaded file, read fully into memory.
struct Upload {
    file_name: String,
    bytes: Bytes,
}

/// Take the first `file` field of the form. Other fields are ignored.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), "BAD_UPLOAD", e.body_text()))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            debug!("Ignoring multipart field {:?}", field.name());
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), "BAD_UPLOAD", e.body_text()))?;

        // Submitting the form without choosing a file sends an empty, unnamed part.
        if file_name.is_empty() && bytes.is_empty() {
            return Err(AnalystError::EmptyUpload.into());
        }
        return Ok(Upload { file_name, bytes });
    }

    Err(AnalystError::EmptyUpload.into())
}

async fn run(state: &AppState, multipart: Multipart) -> ApiResult<AnalysisReport> {
    let upload = read_upload(multipart).await?;
    info!(
        "Upload received: '{}' ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );
    let report = analyze_bytes(&upload.bytes, &upload.file_name, &state.config).await?;
    Ok(report)
}

/// GET /
pub async fn index() -> Result<Html<String>, PageError> {
    let html = IndexPage::default()
        .render()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Html(html))
}

/// POST /analyze
pub async fn analyze_page(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Html<String>, PageError> {
    let report = run(&state, multipart).await?;
    let html = ResultPage::from(&report)
        .render()
        .map_err(|e| ApiError::internal(e.to_string()))?;
    Ok(Html(html))
}

/// POST /api/analyze
pub async fn analyze_json(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<AnalysisReport>> {
    Ok(Json(run(&state, multipart).await?))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
