//! Citation handlers

use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use paperdesk_common::{
    db::{models::Citation, Repository},
    errors::Result,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateCitationRequest {
    pub citing_paper_id: i32,
    pub cited_paper_id: i32,
}

#[derive(Debug, Serialize)]
pub struct CitationResponse {
    pub id: i32,
    pub citing_paper_id: i32,
    pub cited_paper_id: i32,
}

impl From<Citation> for CitationResponse {
    fn from(citation: Citation) -> Self {
        Self {
            id: citation.id,
            citing_paper_id: citation.citing_paper_id,
            cited_paper_id: citation.cited_paper_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaperCitationsResponse {
    pub outgoing: Vec<CitationResponse>,
    pub incoming: Vec<CitationResponse>,
}

/// Record a citation edge between two papers
pub async fn create_citation(
    State(state): State<AppState>,
    Json(request): Json<CreateCitationRequest>,
) -> Result<(StatusCode, Json<CitationResponse>)> {
    let repo = Repository::new(state.db.clone());
    let citation = repo
        .create_citation(request.citing_paper_id, request.cited_paper_id)
        .await?;

    Ok((StatusCode::CREATED, Json(citation.into())))
}

/// Citations for a paper, both directions
pub async fn paper_citations(
    State(state): State<AppState>,
    Path(paper_id): Path<i32>,
) -> Result<Json<PaperCitationsResponse>> {
    let repo = Repository::new(state.db.clone());
    let (outgoing, incoming) = repo.citations_for_paper(paper_id).await?;

    Ok(Json(PaperCitationsResponse {
        outgoing: outgoing.into_iter().map(Into::into).collect(),
        incoming: incoming.into_iter().map(Into::into).collect(),
    }))
}
