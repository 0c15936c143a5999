//! Search handlers
//!
//! Two surfaces over the same filter compiler: a flat AND of named query
//! parameters, and a nested AND/OR filter tree document.

use crate::AppState;
use axum::{
    extract::{Query, State},
    Json,
};
use paperdesk_common::{
    db::{Repository, SearchFilters},
    errors::Result,
    metrics,
    query::ComplexSearchQuery,
};
use serde::Deserialize;
use std::time::Instant;

use super::papers::PaperResponse;

#[derive(Debug, Default, Deserialize)]
pub struct SimpleSearchParams {
    pub title_keyword: Option<String>,
    pub author_name: Option<String>,
    pub year_from: Option<i32>,
    pub year_to: Option<i32>,
    pub min_citations: Option<i32>,
    pub max_citations: Option<i32>,
    pub abstract_keyword: Option<String>,
    pub venue_id: Option<i32>,
    /// Comma-separated tag names
    pub tags: Option<String>,
    #[serde(default)]
    pub skip: u64,
    pub limit: Option<u64>,
}

impl SimpleSearchParams {
    fn into_filters(self) -> SearchFilters {
        SearchFilters {
            title_keyword: self.title_keyword,
            author_name: self.author_name,
            year_from: self.year_from,
            year_to: self.year_to,
            min_citations: self.min_citations,
            max_citations: self.max_citations,
            abstract_keyword: self.abstract_keyword,
            venue_id: self.venue_id,
            tags: self.tags.map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub skip: u64,
    pub limit: Option<u64>,
}

/// Flat AND search over named parameters
pub async fn search_simple(
    State(state): State<AppState>,
    Query(params): Query<SimpleSearchParams>,
) -> Result<Json<Vec<PaperResponse>>> {
    let start = Instant::now();

    let repo = Repository::new(state.db.clone());
    let skip = params.skip;
    let limit = state.config.clamp_limit(params.limit);

    let results = repo
        .search_papers(params.into_filters(), skip, limit)
        .await?;

    let elapsed = start.elapsed().as_secs_f64();
    metrics::record_search(elapsed, "simple", results.len());

    tracing::info!(
        results = results.len(),
        latency_ms = (elapsed * 1000.0) as u64,
        "Simple search completed"
    );

    Ok(Json(results.into_iter().map(Into::into).collect()))
}

/// Nested AND/OR filter tree search
pub async fn search_complex(
    State(state): State<AppState>,
    Query(page): Query<PageParams>,
    Json(request): Json<ComplexSearchQuery>,
) -> Result<Json<Vec<PaperResponse>>> {
    let start = Instant::now();

    let repo = Repository::new(state.db.clone());
    let limit = state.config.clamp_limit(page.limit);

    let results = repo
        .search_papers_complex(&request.root, page.skip, limit)
        .await?;

    let elapsed = start.elapsed().as_secs_f64();
    metrics::record_search(elapsed, "complex", results.len());

    tracing::info!(
        results = results.len(),
        latency_ms = (elapsed * 1000.0) as u64,
        "Complex search completed"
    );

    Ok(Json(results.into_iter().map(Into::into).collect()))
}
