use serde::Serialize;

use crate::models::petition::PricingTier;

/// Absolute ceiling on attached images, independent of tier.
pub const MAX_IMAGES_HARD_CAP: u32 = 10;

/// Feature set unlocked by a pricing tier. Stateless lookup; every component
/// that gates a feature on tier consults this instead of duplicating the
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierFeatures {
    pub can_view_total_signatures: bool,
    pub can_add_petition_updates: bool,
    pub can_access_appeals: bool,
    pub can_view_my_signatures: bool,
    pub can_use_comments: bool,
    pub can_generate_qr_code: bool,
    pub max_images: u32,
}

pub fn features_for(tier: PricingTier) -> TierFeatures {
    if tier.is_free() {
        TierFeatures {
            can_view_total_signatures: false,
            can_add_petition_updates: false,
            can_access_appeals: false,
            can_view_my_signatures: true,
            can_use_comments: true,
            can_generate_qr_code: true,
            max_images: 1,
        }
    } else {
        TierFeatures {
            can_view_total_signatures: true,
            can_add_petition_updates: true,
            can_access_appeals: true,
            can_view_my_signatures: true,
            can_use_comments: true,
            can_generate_qr_code: true,
            max_images: 5,
        }
    }
}
