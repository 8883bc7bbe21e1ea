use axum::{
    extract::Path,
    routing::get,
    Json, Router,
};

use crate::api::AppState;
use crate::models::petition::PricingTier;
use crate::services::tiers::{self, TierFeatures};

/// Read-only feature table for the UI; the same lookup the services consult.
async fn tier_features(Path(tier): Path<PricingTier>) -> Json<TierFeatures> {
    Json(tiers::features_for(tier))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/tiers/:tier/features", get(tier_features))
}
