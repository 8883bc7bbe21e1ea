// API module - HTTP endpoints

pub mod appeals;
pub mod coupons;
pub mod health;
pub mod middleware;
pub mod petitions;
pub mod tiers;

use sqlx::PgPool;

use crate::config::Config;
use crate::services::notifier::Notifier;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub notifier: Notifier,
}
