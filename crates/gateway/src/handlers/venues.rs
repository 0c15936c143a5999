//! Venue management handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use paperdesk_common::{
    db::{
        models::{Venue, VenueKind},
        Repository,
    },
    errors::{AppError, Result},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVenueRequest {
    #[validate(length(min = 1, max = 500))]
    pub name: String,

    #[serde(rename = "type")]
    pub kind: VenueKind,

    #[serde(default)]
    pub impact_factor: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct VenueResponse {
    pub id: i32,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VenueKind,
    pub impact_factor: Option<Decimal>,
    pub created_at: String,
}

impl From<Venue> for VenueResponse {
    fn from(venue: Venue) -> Self {
        Self {
            id: venue.id,
            name: venue.name,
            kind: venue.kind,
            impact_factor: venue.impact_factor,
            created_at: venue.created_at.to_rfc3339(),
        }
    }
}

/// Create a new venue (journal or conference)
pub async fn create_venue(
    State(state): State<AppState>,
    Json(request): Json<CreateVenueRequest>,
) -> Result<(StatusCode, Json<VenueResponse>)> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })?;

    let repo = Repository::new(state.db.clone());
    let venue = repo
        .create_venue(request.name, request.kind, request.impact_factor)
        .await?;

    Ok((StatusCode::CREATED, Json(venue.into())))
}

/// List all venues
pub async fn list_venues(State(state): State<AppState>) -> Result<Json<Vec<VenueResponse>>> {
    let repo = Repository::new(state.db.clone());
    let venues = repo.list_venues().await?;
    Ok(Json(venues.into_iter().map(Into::into).collect()))
}
