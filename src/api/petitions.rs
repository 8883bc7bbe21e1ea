use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::petition::{NewPetition, Petition, PetitionStatus, PricingTier};
use crate::models::Principal;
use crate::services::moderation;

#[derive(Deserialize)]
struct CreatePetitionRequest {
    title: String,
    creator_name: String,
    creator_email: String,
    #[serde(default = "default_tier")]
    pricing_tier: PricingTier,
    /// Creation-time choice: start as a draft or go straight to review.
    #[serde(default = "default_status")]
    status: PetitionStatus,
}

fn default_tier() -> PricingTier {
    PricingTier::Free
}

fn default_status() -> PetitionStatus {
    PetitionStatus::Draft
}

async fn create_petition(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreatePetitionRequest>,
) -> Result<impl IntoResponse> {
    if !matches!(req.status, PetitionStatus::Draft | PetitionStatus::Pending) {
        return Err(AppError::Validation(
            "A petition starts as draft or pending".to_string(),
        ));
    }
    if req.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }

    let petition = Petition::create(
        &state.pool,
        NewPetition {
            creator_id: principal.user_id,
            creator_name: req.creator_name.trim().to_string(),
            creator_email: req.creator_email.trim().to_string(),
            title: req.title.trim().to_string(),
            pricing_tier: req.pricing_tier,
            status: req.status,
        },
    )
    .await?;

    tracing::info!(petition_id = %petition.id, "Petition created");

    Ok((StatusCode::CREATED, Json(petition)))
}

async fn get_petition(
    State(state): State<AppState>,
    _principal: Principal,
    Path(petition_id): Path<Uuid>,
) -> Result<Json<Petition>> {
    let petition = Petition::find_by_id(&state.pool, petition_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Petition not found".to_string()))?;

    Ok(Json(petition))
}

#[derive(Deserialize)]
struct StatusChangeRequest {
    status: PetitionStatus,
    reason: Option<String>,
}

/// Moderator/admin transition: approve, reject, pause or soft-delete.
async fn change_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(petition_id): Path<Uuid>,
    Json(req): Json<StatusChangeRequest>,
) -> Result<Json<Petition>> {
    let petition = moderation::transition(
        &state.pool,
        &state.notifier,
        &principal,
        petition_id,
        req.status,
        req.reason,
    )
    .await?;

    Ok(Json(petition))
}

async fn submit_petition(
    State(state): State<AppState>,
    principal: Principal,
    Path(petition_id): Path<Uuid>,
) -> Result<Json<Petition>> {
    let petition = moderation::submit(&state.pool, &principal, petition_id).await?;
    Ok(Json(petition))
}

async fn resubmit_petition(
    State(state): State<AppState>,
    principal: Principal,
    Path(petition_id): Path<Uuid>,
) -> Result<Json<Petition>> {
    let petition = moderation::resubmit(&state.pool, &principal, petition_id).await?;
    Ok(Json(petition))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/petitions", post(create_petition))
        .route("/petitions/:id", get(get_petition))
        .route("/petitions/:id/status", put(change_status))
        .route("/petitions/:id/submit", post(submit_petition))
        .route("/petitions/:id/resubmit", post(resubmit_petition))
}
