use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::coupon::NewCoupon;
use crate::models::Principal;
use crate::services::coupons;

#[derive(Deserialize)]
struct CreateCouponRequest {
    code: String,
    discount: i32,
    coupon_type: String,
    max_uses: Option<i32>,
    expires_at: Option<DateTime<Utc>>,
}

/// Operator tool: admins mint coupons.
async fn create_coupon(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CreateCouponRequest>,
) -> Result<impl IntoResponse> {
    if principal.role != crate::models::Role::Admin {
        return Err(AppError::Forbidden);
    }

    let coupon = coupons::create(
        &state.pool,
        NewCoupon {
            code: req.code,
            discount: req.discount,
            coupon_type: req.coupon_type,
            max_uses: req.max_uses,
            expires_at: req.expires_at,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(coupon)))
}

#[derive(Deserialize)]
struct CodeRequest {
    code: String,
}

#[derive(Serialize)]
struct ValidateResponse {
    valid: bool,
    discount: i32,
    #[serde(rename = "type")]
    coupon_type: String,
}

async fn validate_coupon(
    State(state): State<AppState>,
    _principal: Principal,
    Json(req): Json<CodeRequest>,
) -> Result<Json<ValidateResponse>> {
    let validated = coupons::validate(&state.pool, &req.code).await?;

    Ok(Json(ValidateResponse {
        valid: true,
        discount: validated.discount,
        coupon_type: validated.coupon_type,
    }))
}

/// Redeems a coupon for the acting principal during checkout.
async fn redeem_coupon(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<CodeRequest>,
) -> Result<impl IntoResponse> {
    let coupon = coupons::consume(&state.pool, &req.code, principal.user_id).await?;

    Ok(Json(json!({
        "code": coupon.code,
        "discount": coupon.discount,
        "used_count": coupon.used_count,
        "status": coupon.status,
    })))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/coupons", post(create_coupon))
        .route("/coupons/validate", post(validate_coupon))
        .route("/coupons/redeem", post(redeem_coupon))
}
