//! Duplicate detection and merge handlers

use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use paperdesk_common::{
    db::{models::Paper, PaperDraft, Repository},
    dedup::{merge::MergeMode, DuplicateResolver},
    errors::{AppError, Result},
};
use serde::{Deserialize, Serialize};

use super::papers::PaperResponse;

const DEFAULT_RELATED_LIMIT: u64 = 5;

#[derive(Debug, Deserialize)]
pub struct FindRelatedRequest {
    pub paper: PaperDraft,
    pub limit: Option<u64>,
}

/// Slim paper view for the duplicate-review UI
#[derive(Debug, Serialize)]
pub struct RelatedPaperResponse {
    pub id: i32,
    pub title: String,
    pub doi: Option<String>,
    pub publication_year: i32,
    pub citation_count: i32,
}

impl From<Paper> for RelatedPaperResponse {
    fn from(paper: Paper) -> Self {
        Self {
            id: paper.id,
            title: paper.title,
            doi: paper.doi,
            publication_year: paper.publication_year,
            citation_count: paper.citation_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FindRelatedResponse {
    /// False means the papers are the no-strong-match fallback list,
    /// not found duplicates
    pub matched: bool,
    pub papers: Vec<RelatedPaperResponse>,
}

#[derive(Debug, Deserialize)]
pub struct MergeRequest {
    pub paper: PaperDraft,
    /// keep_old | overwrite | merge_fields (unknown behaves as keep_old)
    pub mode: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Find records a candidate paper may duplicate
pub async fn find_related(
    State(state): State<AppState>,
    Json(request): Json<FindRelatedRequest>,
) -> Result<Json<FindRelatedResponse>> {
    let repo = Repository::new(state.db.clone());
    let resolver = DuplicateResolver::new(&repo);

    let limit = state
        .config
        .clamp_limit(Some(request.limit.unwrap_or(DEFAULT_RELATED_LIMIT)));
    let related = resolver.find_related(&request.paper, limit).await?;

    tracing::info!(
        matched = related.matched,
        candidates = related.papers.len(),
        "Related-record search completed"
    );

    Ok(Json(FindRelatedResponse {
        matched: related.matched,
        papers: related.papers.into_iter().map(Into::into).collect(),
    }))
}

/// Apply a merge policy to an existing paper
pub async fn merge_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
    Json(request): Json<MergeRequest>,
) -> Result<Json<PaperResponse>> {
    let repo = Repository::new(state.db.clone());
    let mode = MergeMode::parse(&request.mode);

    let details = repo
        .merge_paper(paper_id, &request.paper, mode, &request.fields)
        .await?
        .ok_or(AppError::PaperNotFound { id: paper_id })?;

    Ok(Json(details.into()))
}
