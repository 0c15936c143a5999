//! PDF storage and metadata handlers

use crate::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use paperdesk_common::{
    db::Repository,
    errors::{AppError, Result},
    metrics,
    pdfmeta::{parse_pdf_metadata, PdfMetadata},
};
use serde::Serialize;

use super::read_file_field;

#[derive(Debug, Serialize)]
pub struct UploadPdfResponse {
    pub message: String,
    pub file_url: String,
}

#[derive(Debug, Serialize)]
pub struct PresignedUrlResponse {
    pub url: String,
}

fn is_pdf_filename(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pdf")
}

/// Upload a paper's PDF to object storage and record its location
pub async fn upload_pdf(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<UploadPdfResponse>> {
    let repo = Repository::new(state.db.clone());
    repo.find_paper(paper_id)
        .await?
        .ok_or(AppError::PaperNotFound { id: paper_id })?;

    let (file_name, bytes) = read_file_field(&mut multipart).await?;
    if !is_pdf_filename(&file_name) {
        return Err(AppError::Validation {
            message: "only PDF files can be uploaded".to_string(),
            field: Some("file".to_string()),
        });
    }

    let path = format!("papers/{}/{}", paper_id, file_name);
    let size = bytes.len() as i64;

    let file_url = state.store.put(&path, bytes, "application/pdf").await?;
    repo.set_pdf_file(paper_id, &path, size).await?;

    metrics::record_pdf_upload();
    tracing::info!(paper_id, path = %path, size, "PDF uploaded");

    Ok(Json(UploadPdfResponse {
        message: "file uploaded".to_string(),
        file_url,
    }))
}

/// Download a paper's stored PDF
pub async fn download_pdf(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
) -> Result<Response> {
    let repo = Repository::new(state.db.clone());
    let details = repo
        .find_paper(paper_id)
        .await?
        .ok_or(AppError::PaperNotFound { id: paper_id })?;

    let path = details
        .paper
        .pdf_file_path
        .ok_or_else(|| AppError::FileNotFound {
            path: format!("papers/{}", paper_id),
        })?;

    let bytes = state.store.get(&path).await?;
    let file_name = path.rsplit('/').next().unwrap_or("paper.pdf").to_string();

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Short-lived presigned download URL for a paper's PDF
pub async fn presigned_pdf_url(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
) -> Result<Json<PresignedUrlResponse>> {
    let repo = Repository::new(state.db.clone());
    let details = repo
        .find_paper(paper_id)
        .await?
        .ok_or(AppError::PaperNotFound { id: paper_id })?;

    let path = details
        .paper
        .pdf_file_path
        .ok_or_else(|| AppError::FileNotFound {
            path: format!("papers/{}", paper_id),
        })?;

    let url = state.store.presigned_url(&path).await?;
    Ok(Json(PresignedUrlResponse { url }))
}

/// Extract best-effort metadata from an uploaded PDF without persisting
/// anything; used to prefill the create-paper form
pub async fn parse_pdf(mut multipart: Multipart) -> Result<Json<PdfMetadata>> {
    let (file_name, bytes) = read_file_field(&mut multipart).await?;
    if !is_pdf_filename(&file_name) {
        return Err(AppError::Validation {
            message: "only PDF files can be parsed".to_string(),
            field: Some("file".to_string()),
        });
    }

    let metadata = parse_pdf_metadata(&bytes)?;

    tracing::info!(
        file = %file_name,
        found_title = metadata.title.is_some(),
        found_doi = metadata.doi.is_some(),
        "PDF metadata extracted"
    );

    Ok(Json(metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_filename_check_is_case_insensitive() {
        assert!(is_pdf_filename("paper.pdf"));
        assert!(is_pdf_filename("PAPER.PDF"));
        assert!(!is_pdf_filename("paper.docx"));
        assert!(!is_pdf_filename("pdf"));
    }
}
