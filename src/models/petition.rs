use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "petition_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PetitionStatus {
    Draft,
    Pending,
    Approved,
    Paused,
    Rejected,
    Deleted,
}

impl fmt::Display for PetitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PetitionStatus::Draft => "draft",
            PetitionStatus::Pending => "pending",
            PetitionStatus::Approved => "approved",
            PetitionStatus::Paused => "paused",
            PetitionStatus::Rejected => "rejected",
            PetitionStatus::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "pricing_tier", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PricingTier {
    Free,
    Basic,
    Premium,
    Advanced,
    Enterprise,
}

impl PricingTier {
    pub fn is_free(self) -> bool {
        matches!(self, PricingTier::Free)
    }
}

/// The current moderation decision on a petition, stored as a single tagged
/// JSONB value. A transition replaces the whole value, so markers from a
/// previous decision can never leak into the new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    Approved {
        at: DateTime<Utc>,
        by: Uuid,
    },
    Rejected {
        at: DateTime<Utc>,
        by: Uuid,
        /// Moderation notes shown to the creator; carried into
        /// `resubmission_history` when the petition is resubmitted.
        notes: String,
    },
    Paused {
        at: DateTime<Utc>,
        by: Uuid,
        reason: String,
    },
    Deleted {
        at: DateTime<Utc>,
        by: Uuid,
        reason: String,
        /// The decision in force when the petition was soft-deleted. Keeps
        /// rejection notes and pause reasons on the record.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prior: Option<Box<Decision>>,
    },
}

/// One rejection/pause-then-resubmit cycle. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResubmissionEntry {
    pub rejected_at: DateTime<Utc>,
    pub reason: String,
    pub resubmitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Petition {
    pub id: Uuid,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub creator_email: String,
    pub title: String,
    pub pricing_tier: PricingTier,
    pub status: PetitionStatus,
    pub decision: Option<Json<Decision>>,
    pub resubmission_count: i32,
    pub resubmission_history: Json<Vec<ResubmissionEntry>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPetition {
    pub creator_id: Uuid,
    pub creator_name: String,
    pub creator_email: String,
    pub title: String,
    pub pricing_tier: PricingTier,
    pub status: PetitionStatus,
}

impl Petition {
    pub async fn create(pool: &PgPool, data: NewPetition) -> Result<Self, sqlx::Error> {
        let petition = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO petitions (creator_id, creator_name, creator_email, title, pricing_tier, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.creator_id)
        .bind(&data.creator_name)
        .bind(&data.creator_email)
        .bind(&data.title)
        .bind(data.pricing_tier)
        .bind(data.status)
        .fetch_one(pool)
        .await?;

        Ok(petition)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let petition = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM petitions WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(petition)
    }

    /// Conditional transition write. The status precondition is part of the
    /// statement itself, so a petition whose status changed since it was read
    /// yields no row instead of a lost update. Returns `None` on a guard miss.
    pub async fn apply_transition(
        pool: &PgPool,
        id: Uuid,
        expected: PetitionStatus,
        new_status: PetitionStatus,
        decision: Option<&Decision>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let petition = sqlx::query_as::<_, Self>(
            r#"
            UPDATE petitions
            SET status = $3, decision = $4, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new_status)
        .bind(decision.map(Json))
        .fetch_optional(pool)
        .await?;

        Ok(petition)
    }

    /// Resubmission write: back to `pending`, decision cleared, one history
    /// entry appended and the counter bumped, all in one guarded statement.
    pub async fn apply_resubmission(
        pool: &PgPool,
        id: Uuid,
        expected: PetitionStatus,
        entry: &ResubmissionEntry,
    ) -> Result<Option<Self>, sqlx::Error> {
        let petition = sqlx::query_as::<_, Self>(
            r#"
            UPDATE petitions
            SET status = 'pending',
                decision = NULL,
                resubmission_count = resubmission_count + 1,
                resubmission_history = resubmission_history || $3,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(Json(entry))
        .fetch_optional(pool)
        .await?;

        Ok(petition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_serializes_as_tagged_union() {
        let decision = Decision::Paused {
            at: Utc::now(),
            by: Uuid::new_v4(),
            reason: "Under review".to_string(),
        };

        let value = serde_json::to_value(&decision).unwrap();
        assert_eq!(value["kind"], "paused");
        assert_eq!(value["reason"], "Under review");
        // A tagged value carries exactly one decision's fields.
        assert!(value.get("notes").is_none());
    }

    #[test]
    fn test_decision_round_trips() {
        let decision = Decision::Rejected {
            at: Utc::now(),
            by: Uuid::new_v4(),
            notes: "Duplicate campaign".to_string(),
        };

        let json = serde_json::to_string(&decision).unwrap();
        let back: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, decision);
    }

    #[test]
    fn test_deleted_decision_keeps_prior_through_serde() {
        let deleted = Decision::Deleted {
            at: Utc::now(),
            by: Uuid::new_v4(),
            reason: "Spam account".to_string(),
            prior: Some(Box::new(Decision::Rejected {
                at: Utc::now(),
                by: Uuid::new_v4(),
                notes: "Duplicate campaign".to_string(),
            })),
        };

        let json = serde_json::to_string(&deleted).unwrap();
        let back: Decision = serde_json::from_str(&json).unwrap();
        assert_eq!(back, deleted);

        // Records written before the field existed still deserialize.
        let legacy = serde_json::json!({
            "kind": "deleted",
            "at": Utc::now(),
            "by": Uuid::new_v4(),
            "reason": "Spam account",
        });
        let decision: Decision = serde_json::from_value(legacy).unwrap();
        assert!(matches!(decision, Decision::Deleted { prior: None, .. }));
    }

    #[test]
    fn test_status_serde_names() {
        assert_eq!(
            serde_json::to_value(PetitionStatus::Pending).unwrap(),
            serde_json::json!("pending")
        );
        let status: PetitionStatus = serde_json::from_value(serde_json::json!("rejected")).unwrap();
        assert_eq!(status, PetitionStatus::Rejected);
    }
}
