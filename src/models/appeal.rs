use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "appeal_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppealStatus {
    Pending,
    InProgress,
    Resolved,
    Rejected,
}

impl AppealStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AppealStatus::Resolved | AppealStatus::Rejected)
    }

    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for AppealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppealStatus::Pending => "pending",
            AppealStatus::InProgress => "in_progress",
            AppealStatus::Resolved => "resolved",
            AppealStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Creator,
    Moderator,
}

/// One message in an appeal thread. `is_internal` messages are moderator
/// notes, filtered out at the read boundary for non-moderator requesters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppealMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_role: SenderRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub is_internal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: AppealStatus,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appeal {
    pub id: Uuid,
    pub petition_id: Uuid,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub creator_email: String,
    pub status: AppealStatus,
    pub messages: Json<Vec<AppealMessage>>,
    pub status_history: Json<Vec<StatusChange>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewAppeal {
    pub petition_id: Uuid,
    pub creator_id: Uuid,
    pub creator_name: String,
    pub creator_email: String,
    pub first_message: AppealMessage,
    pub opened: StatusChange,
}

impl Appeal {
    pub async fn create(pool: &PgPool, data: NewAppeal) -> Result<Self, sqlx::Error> {
        let appeal = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO appeals (petition_id, creator_id, creator_name, creator_email, status, messages, status_history)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.petition_id)
        .bind(data.creator_id)
        .bind(&data.creator_name)
        .bind(&data.creator_email)
        .bind(Json(vec![data.first_message]))
        .bind(Json(vec![data.opened]))
        .fetch_one(pool)
        .await?;

        Ok(appeal)
    }

    /// Creates an appeal only if the petition has no other open appeal. The
    /// existence check and the insert run in one transaction that locks the
    /// petition row, so two concurrent creates serialize instead of both
    /// passing the check. Returns `None` when an open appeal already exists.
    pub async fn create_exclusive(
        pool: &PgPool,
        data: NewAppeal,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        // Serializes appeal creation per petition.
        sqlx::query("SELECT id FROM petitions WHERE id = $1 FOR UPDATE")
            .bind(data.petition_id)
            .execute(&mut *tx)
            .await?;

        let open = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appeals
                WHERE petition_id = $1 AND status IN ('pending', 'in_progress')
            )
            "#,
        )
        .bind(data.petition_id)
        .fetch_one(&mut *tx)
        .await?;

        if open {
            return Ok(None);
        }

        let appeal = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO appeals (petition_id, creator_id, creator_name, creator_email, status, messages, status_history)
            VALUES ($1, $2, $3, $4, 'pending', $5, $6)
            RETURNING *
            "#,
        )
        .bind(data.petition_id)
        .bind(data.creator_id)
        .bind(&data.creator_name)
        .bind(&data.creator_email)
        .bind(Json(vec![data.first_message]))
        .bind(Json(vec![data.opened]))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Some(appeal))
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let appeal = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM appeals WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(appeal)
    }

    /// Appends via jsonb `||` so two concurrent replies are both kept.
    pub async fn append_message(
        pool: &PgPool,
        id: Uuid,
        message: &AppealMessage,
    ) -> Result<Option<Self>, sqlx::Error> {
        let appeal = sqlx::query_as::<_, Self>(
            r#"
            UPDATE appeals
            SET messages = messages || $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Json(message))
        .fetch_optional(pool)
        .await?;

        Ok(appeal)
    }

    /// Status change with its history entry in one guarded statement; the
    /// expected-status predicate catches a concurrent close.
    pub async fn set_status(
        pool: &PgPool,
        id: Uuid,
        expected: AppealStatus,
        new_status: AppealStatus,
        change: &StatusChange,
    ) -> Result<Option<Self>, sqlx::Error> {
        let appeal = sqlx::query_as::<_, Self>(
            r#"
            UPDATE appeals
            SET status = $3, status_history = status_history || $4, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(expected)
        .bind(new_status)
        .bind(Json(change))
        .fetch_optional(pool)
        .await?;

        Ok(appeal)
    }

    pub async fn list_for_creator(
        pool: &PgPool,
        creator_id: Uuid,
        status: Option<AppealStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let appeals = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM appeals
            WHERE creator_id = $1 AND ($2::appeal_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(creator_id)
        .bind(status)
        .fetch_all(pool)
        .await?;

        Ok(appeals)
    }

    pub async fn list_all(
        pool: &PgPool,
        status: Option<AppealStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let appeals = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM appeals
            WHERE $1::appeal_status IS NULL OR status = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .fetch_all(pool)
        .await?;

        Ok(appeals)
    }

    /// True when the petition already has an appeal in a non-terminal status.
    pub async fn has_open_for_petition(
        pool: &PgPool,
        petition_id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM appeals
                WHERE petition_id = $1 AND status IN ('pending', 'in_progress')
            )
            "#,
        )
        .bind(petition_id)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}
