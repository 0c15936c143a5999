//! Tabular import handlers
//!
//! Preview stores the upload in the session cache and returns headers,
//! sample rows and the default column mapping; commit imports by session id
//! with a possibly edited mapping. A one-shot endpoint imports directly
//! with the defaults.

use crate::AppState;
use axum::{
    extract::{Multipart, State},
    Json,
};
use paperdesk_common::{
    db::Repository,
    errors::{AppError, Result},
    import::{import_file, tabular, FieldMapping, ImportReport, TabularPreview},
    metrics,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

use super::read_file_field;

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub preview: TabularPreview,
    pub file_id: Uuid,
    pub default_mapping: FieldMapping,
}

#[derive(Debug, Deserialize)]
pub struct CommitImportRequest {
    pub file_id: Uuid,
    #[serde(default)]
    pub mapping: Option<FieldMapping>,
}

/// Preview an uploaded file and park it for a later commit
pub async fn preview_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PreviewResponse>> {
    let (file_name, bytes) = read_file_field(&mut multipart).await?;

    let preview = tabular::preview(&bytes, &file_name, state.config.import.preview_rows)?;
    let file_id = state.uploads.insert(file_name.clone(), bytes);

    tracing::info!(
        %file_id,
        file = %file_name,
        rows = preview.total_rows,
        "Import preview ready"
    );

    Ok(Json(PreviewResponse {
        preview,
        file_id,
        default_mapping: FieldMapping::default(),
    }))
}

/// Import a previously previewed file by session id
pub async fn import_committed(
    State(state): State<AppState>,
    Json(request): Json<CommitImportRequest>,
) -> Result<Json<ImportReport>> {
    let upload = state
        .uploads
        .take(&request.file_id)
        .ok_or_else(|| AppError::UploadNotFound {
            id: request.file_id.to_string(),
        })?;

    let mapping = request.mapping.unwrap_or_default();
    run_import(&state, &upload.bytes, &upload.file_name, &mapping).await
}

/// One-shot import with the default column mapping
pub async fn import_direct(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>> {
    let (file_name, bytes) = read_file_field(&mut multipart).await?;
    run_import(&state, &bytes, &file_name, &FieldMapping::default()).await
}

async fn run_import(
    state: &AppState,
    bytes: &[u8],
    file_name: &str,
    mapping: &FieldMapping,
) -> Result<Json<ImportReport>> {
    let start = Instant::now();
    let repo = Repository::new(state.db.clone());

    let report = import_file(&repo, bytes, file_name, mapping).await;

    metrics::record_import(
        report.total_rows,
        report.failed_imports,
        start.elapsed().as_secs_f64(),
    );

    tracing::info!(
        file = %file_name,
        total = report.total_rows,
        ok = report.successful_imports,
        failed = report.failed_imports,
        "Import finished"
    );

    Ok(Json(report))
}
