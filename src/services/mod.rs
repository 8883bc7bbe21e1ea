// Services module - Business logic

pub mod appeals;
pub mod coupons;
pub mod moderation;
pub mod notifier;
pub mod tiers;
