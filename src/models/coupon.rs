use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "coupon_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    Active,
    Used,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String, // stored trimmed and upper-cased
    pub discount: i32, // percentage
    pub coupon_type: String,
    pub max_uses: Option<i32>, // None = unlimited
    pub used_count: i32,
    pub used_by: Vec<Uuid>,
    pub status: CouponStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCoupon {
    pub code: String,
    pub discount: i32,
    pub coupon_type: String,
    pub max_uses: Option<i32>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Coupon {
    pub async fn create(pool: &PgPool, data: NewCoupon) -> Result<Self, sqlx::Error> {
        let coupon = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO coupons (code, discount, coupon_type, max_uses, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&data.code)
        .bind(data.discount)
        .bind(&data.coupon_type)
        .bind(data.max_uses)
        .bind(data.expires_at)
        .fetch_one(pool)
        .await?;

        Ok(coupon)
    }

    pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Self>, sqlx::Error> {
        let coupon = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM coupons WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(pool)
        .await?;

        Ok(coupon)
    }

    /// Atomic redemption. All eligibility predicates live in the same
    /// statement as the increment, so two redemptions racing at the
    /// `max_uses` boundary cannot both pass, and the status flips to `used`
    /// in the same write that reaches the ceiling. Returns `None` when any
    /// predicate failed; the caller re-reads to classify.
    pub async fn try_consume(
        pool: &PgPool,
        code: &str,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let coupon = sqlx::query_as::<_, Self>(
            r#"
            UPDATE coupons
            SET used_count = used_count + 1,
                used_by = array_append(used_by, $2),
                last_used_at = NOW(),
                status = CASE
                    WHEN max_uses IS NOT NULL AND used_count + 1 >= max_uses THEN 'used'::coupon_status
                    ELSE status
                END
            WHERE code = $1
              AND status = 'active'
              AND (expires_at IS NULL OR expires_at > NOW())
              AND (max_uses IS NULL OR used_count < max_uses)
              AND NOT ($2 = ANY(used_by))
            RETURNING *
            "#,
        )
        .bind(code)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(coupon)
    }
}
