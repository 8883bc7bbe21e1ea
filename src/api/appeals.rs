use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::error::Result;
use crate::models::appeal::{Appeal, AppealStatus};
use crate::models::Principal;
use crate::services::appeals;

#[derive(Deserialize)]
struct CreateAppealRequest {
    petition_id: Uuid,
    message: String,
}

async fn create_appeal(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreateAppealRequest>,
) -> Result<impl IntoResponse> {
    let appeal = appeals::create_appeal(
        &state.pool,
        &principal,
        req.petition_id,
        &req.message,
        state.config.allow_multiple_open_appeals,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(appeal)))
}

#[derive(Deserialize)]
struct ReplyRequest {
    message: String,
    #[serde(default)]
    sender_name: String,
    #[serde(default)]
    is_internal: bool,
}

async fn reply(
    State(state): State<AppState>,
    principal: Principal,
    Path(appeal_id): Path<Uuid>,
    Json(req): Json<ReplyRequest>,
) -> Result<Json<Appeal>> {
    let appeal = appeals::reply(
        &state.pool,
        &principal,
        appeal_id,
        &req.sender_name,
        &req.message,
        req.is_internal,
    )
    .await?;

    Ok(Json(appeal))
}

#[derive(Deserialize)]
struct UpdateStatusRequest {
    status: AppealStatus,
    reason: Option<String>,
}

async fn update_status(
    State(state): State<AppState>,
    principal: Principal,
    Path(appeal_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<Appeal>> {
    let appeal =
        appeals::update_status(&state.pool, &principal, appeal_id, req.status, req.reason).await?;

    Ok(Json(appeal))
}

async fn get_appeal(
    State(state): State<AppState>,
    principal: Principal,
    Path(appeal_id): Path<Uuid>,
) -> Result<Json<Appeal>> {
    let appeal = appeals::get_appeal(&state.pool, &principal, appeal_id).await?;
    Ok(Json(appeal))
}

#[derive(Deserialize)]
struct ListQuery {
    status: Option<AppealStatus>,
}

async fn list_appeals(
    State(state): State<AppState>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Appeal>>> {
    let appeals = appeals::list_appeals(&state.pool, &principal, query.status).await?;
    Ok(Json(appeals))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/appeals", post(create_appeal).get(list_appeals))
        .route("/appeals/:id", get(get_appeal))
        .route("/appeals/:id/reply", post(reply))
        .route("/appeals/:id/status", patch(update_status))
}
