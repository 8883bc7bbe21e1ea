use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::coupon::{Coupon, CouponStatus, NewCoupon};

#[derive(thiserror::Error, Debug)]
pub enum CouponError {
    #[error("Coupon not found")]
    NotFound,

    #[error("Coupon is no longer active")]
    Inactive,

    #[error("Coupon has expired")]
    Expired,

    #[error("Coupon usage limit reached")]
    Exhausted,

    #[error("You have already used this coupon")]
    AlreadyUsed,

    #[error("Coupon redemption conflicted with another request; please retry")]
    Conflict,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Successful validation result: what the checkout flow needs to apply the
/// discount.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidatedCoupon {
    pub discount: i32,
    pub coupon_type: String,
}

/// Codes are matched trimmed and upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Eligibility checks, in contract order: active -> not expired -> not
/// exhausted. Existence is the lookup's concern.
fn check_eligibility(coupon: &Coupon, now: DateTime<Utc>) -> Result<(), CouponError> {
    if coupon.status != CouponStatus::Active {
        // A coupon that hit its ceiling reads `used`; report that as
        // exhaustion rather than a generic inactive error.
        if matches!(coupon.max_uses, Some(n) if coupon.used_count >= n) {
            return Err(CouponError::Exhausted);
        }
        return Err(CouponError::Inactive);
    }
    if let Some(expires_at) = coupon.expires_at {
        if expires_at <= now {
            return Err(CouponError::Expired);
        }
    }
    if let Some(max_uses) = coupon.max_uses {
        if coupon.used_count >= max_uses {
            return Err(CouponError::Exhausted);
        }
    }
    Ok(())
}

/// Explains why an atomic redemption attempt matched no row. The double-use
/// check comes first so a user who already redeemed gets the specific
/// message rather than a generic one.
fn classify_consume_failure(coupon: &Coupon, user_id: Uuid, now: DateTime<Utc>) -> CouponError {
    if coupon.used_by.contains(&user_id) {
        return CouponError::AlreadyUsed;
    }
    match check_eligibility(coupon, now) {
        Err(e) => e,
        // Guards passed on the re-read, so the miss was a lost race, not an
        // exhausted coupon; a retry of the redemption will settle it.
        Ok(()) => CouponError::Conflict,
    }
}

#[tracing::instrument(skip(pool))]
pub async fn validate(pool: &PgPool, code: &str) -> Result<ValidatedCoupon, CouponError> {
    let code = normalize_code(code);

    let coupon = Coupon::find_by_code(pool, &code)
        .await?
        .ok_or(CouponError::NotFound)?;

    check_eligibility(&coupon, Utc::now())?;

    Ok(ValidatedCoupon {
        discount: coupon.discount,
        coupon_type: coupon.coupon_type,
    })
}

/// Redeems a coupon for one user. The increment, the `used_by` append, the
/// `last_used_at` stamp and the conditional flip to `used` happen in a single
/// conditional UPDATE; this function only normalizes the code and classifies
/// a miss.
#[tracing::instrument(skip(pool))]
pub async fn consume(pool: &PgPool, code: &str, user_id: Uuid) -> Result<Coupon, CouponError> {
    let code = normalize_code(code);

    if let Some(coupon) = Coupon::try_consume(pool, &code, user_id).await? {
        tracing::info!(
            coupon_id = %coupon.id,
            used_count = coupon.used_count,
            "Coupon redeemed"
        );
        return Ok(coupon);
    }

    // Guard miss: re-read once to say why. The write above is the authority;
    // this read is only for the error message.
    let coupon = Coupon::find_by_code(pool, &code)
        .await?
        .ok_or(CouponError::NotFound)?;

    Err(classify_consume_failure(&coupon, user_id, Utc::now()))
}

/// Operator-facing creation (admin tool).
#[tracing::instrument(skip(pool, data), fields(code = %data.code))]
pub async fn create(pool: &PgPool, mut data: NewCoupon) -> Result<Coupon, CouponError> {
    data.code = normalize_code(&data.code);

    if data.code.is_empty() {
        return Err(CouponError::Validation("Coupon code is required".to_string()));
    }
    if !(0..=100).contains(&data.discount) {
        return Err(CouponError::Validation(
            "Discount must be a percentage between 0 and 100".to_string(),
        ));
    }
    if matches!(data.max_uses, Some(n) if n <= 0) {
        return Err(CouponError::Validation(
            "Maximum uses must be positive".to_string(),
        ));
    }

    match Coupon::create(pool, data).await {
        Ok(coupon) => Ok(coupon),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(CouponError::Validation(
            "A coupon with this code already exists".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(max_uses: Option<i32>, used_count: i32, used_by: Vec<Uuid>) -> Coupon {
        Coupon {
            id: Uuid::new_v4(),
            code: "INFL10-TEST".to_string(),
            discount: 10,
            coupon_type: "percentage".to_string(),
            max_uses,
            used_count,
            used_by,
            status: if matches!(max_uses, Some(n) if used_count >= n) {
                CouponStatus::Used
            } else {
                CouponStatus::Active
            },
            expires_at: None,
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  infl10-test "), "INFL10-TEST");
        assert_eq!(normalize_code("Summer25"), "SUMMER25");
    }

    #[test]
    fn test_eligibility_fresh_coupon() {
        let c = coupon(Some(5), 0, vec![]);
        assert!(check_eligibility(&c, Utc::now()).is_ok());
    }

    #[test]
    fn test_eligibility_unlimited_uses() {
        let c = coupon(None, 10_000, vec![]);
        assert!(check_eligibility(&c, Utc::now()).is_ok());
    }

    #[test]
    fn test_eligibility_exhausted() {
        let c = coupon(Some(5), 5, vec![]);
        assert!(matches!(
            check_eligibility(&c, Utc::now()),
            Err(CouponError::Exhausted)
        ));
    }

    #[test]
    fn test_eligibility_expired() {
        let mut c = coupon(Some(5), 0, vec![]);
        c.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(matches!(
            check_eligibility(&c, Utc::now()),
            Err(CouponError::Expired)
        ));
    }

    #[test]
    fn test_manually_deactivated_coupon() {
        let mut c = coupon(None, 2, vec![]);
        c.status = CouponStatus::Used;
        // No ceiling involved, so this is plain inactive.
        assert!(matches!(
            check_eligibility(&c, Utc::now()),
            Err(CouponError::Inactive)
        ));
    }

    #[test]
    fn test_double_redemption_classified_first() {
        let user = Uuid::new_v4();
        // Exhausted AND already used by this user: the user-specific error wins.
        let c = coupon(Some(5), 5, vec![user]);
        assert!(matches!(
            classify_consume_failure(&c, user, Utc::now()),
            CouponError::AlreadyUsed
        ));
    }

    #[test]
    fn test_lost_race_classified_as_conflict() {
        // A guard miss followed by a re-read that finds the coupon fully
        // eligible: another request won the write. The user must not be told
        // the coupon is exhausted.
        let c = coupon(Some(5), 2, vec![]);
        assert!(matches!(
            classify_consume_failure(&c, Uuid::new_v4(), Utc::now()),
            CouponError::Conflict
        ));
    }

    #[test]
    fn test_exhaustion_scenario_shape() {
        // INFL10-TEST with max_uses = 5 after five distinct redemptions:
        // status reads `used`, a sixth user is turned away, a repeat user gets
        // the already-used error.
        let users: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let c = coupon(Some(5), 5, users.clone());

        assert_eq!(c.status, CouponStatus::Used);
        assert!(matches!(
            classify_consume_failure(&c, Uuid::new_v4(), Utc::now()),
            CouponError::Exhausted
        ));
        assert!(matches!(
            classify_consume_failure(&c, users[0], Utc::now()),
            CouponError::AlreadyUsed
        ));
    }
}
