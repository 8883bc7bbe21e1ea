use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::appeal::{
    Appeal, AppealMessage, AppealStatus, NewAppeal, SenderRole, StatusChange,
};
use crate::models::petition::{Petition, PetitionStatus};
use crate::models::{Principal, Role};
use crate::services::tiers;

#[derive(thiserror::Error, Debug)]
pub enum AppealError {
    #[error("Petition not found")]
    PetitionNotFound,

    #[error("Appeal not found")]
    NotFound,

    #[error("Not permitted")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Only a rejected or paused petition can be appealed")]
    PetitionNotAppealable,

    #[error("An appeal for this petition is already open")]
    OpenAppealExists,

    #[error("Appeal status change {from} -> {to} is not allowed")]
    InvalidStatusChange {
        from: AppealStatus,
        to: AppealStatus,
    },

    #[error("Appeal status changed concurrently; refresh and retry")]
    StaleStatus,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Appeal status machine: a pending appeal may be picked up or closed
/// directly; an in-progress one may only be closed. Closed is closed.
pub fn status_change_allowed(from: AppealStatus, to: AppealStatus) -> bool {
    use AppealStatus::*;

    matches!(
        (from, to),
        (Pending, InProgress)
            | (Pending, Resolved)
            | (Pending, Rejected)
            | (InProgress, Resolved)
            | (InProgress, Rejected)
    )
}

/// Read-boundary filter: internal moderator notes never leave the service
/// for a non-moderator requester.
pub fn visible_messages(messages: Vec<AppealMessage>, requester_is_moderator: bool) -> Vec<AppealMessage> {
    if requester_is_moderator {
        messages
    } else {
        messages.into_iter().filter(|m| !m.is_internal).collect()
    }
}

fn trimmed_message(content: &str) -> Result<String, AppealError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppealError::Validation("Message must not be empty".to_string()));
    }
    Ok(content.to_string())
}

/// Opens an appeal against a moderation decision.
///
/// Only the petition's creator may appeal, only while the petition is
/// rejected or paused, and only when the petition's tier includes appeal
/// access. Creator identity is snapshotted from the petition and never
/// re-synced afterwards.
#[tracing::instrument(skip(pool, principal, message), fields(actor = %principal.user_id))]
pub async fn create_appeal(
    pool: &PgPool,
    principal: &Principal,
    petition_id: Uuid,
    message: &str,
    allow_multiple_open: bool,
) -> Result<Appeal, AppealError> {
    let petition = Petition::find_by_id(pool, petition_id)
        .await?
        .ok_or(AppealError::PetitionNotFound)?;

    if !principal.owns(petition.creator_id) {
        return Err(AppealError::Forbidden);
    }
    if !tiers::features_for(petition.pricing_tier).can_access_appeals {
        return Err(AppealError::Forbidden);
    }
    if !matches!(
        petition.status,
        PetitionStatus::Rejected | PetitionStatus::Paused
    ) {
        return Err(AppealError::PetitionNotAppealable);
    }

    let content = trimmed_message(message)?;

    // Fast path; the transactional create below is the authority.
    if !allow_multiple_open && Appeal::has_open_for_petition(pool, petition_id).await? {
        return Err(AppealError::OpenAppealExists);
    }

    let now = Utc::now();
    let new_appeal = NewAppeal {
        petition_id,
        creator_id: petition.creator_id,
        creator_name: petition.creator_name.clone(),
        creator_email: petition.creator_email.clone(),
        first_message: AppealMessage {
            id: Uuid::new_v4(),
            sender_id: principal.user_id,
            sender_name: petition.creator_name,
            sender_role: SenderRole::Creator,
            content,
            created_at: now,
            is_internal: false,
        },
        opened: StatusChange {
            status: AppealStatus::Pending,
            changed_by: principal.user_id,
            changed_at: now,
            reason: None,
        },
    };

    let appeal = if allow_multiple_open {
        Appeal::create(pool, new_appeal).await?
    } else {
        Appeal::create_exclusive(pool, new_appeal)
            .await?
            .ok_or(AppealError::OpenAppealExists)?
    };

    tracing::info!(appeal_id = %appeal.id, petition_id = %petition_id, "Appeal opened");

    Ok(appeal)
}

/// Appends a reply to the thread. Creators may only write to their own
/// appeal; the internal flag is a moderator capability and is ignored for
/// creator messages. Replies never change the appeal status.
#[tracing::instrument(skip(pool, principal, message, sender_name), fields(actor = %principal.user_id))]
pub async fn reply(
    pool: &PgPool,
    principal: &Principal,
    appeal_id: Uuid,
    sender_name: &str,
    message: &str,
    is_internal: bool,
) -> Result<Appeal, AppealError> {
    let appeal = Appeal::find_by_id(pool, appeal_id)
        .await?
        .ok_or(AppealError::NotFound)?;

    let sender_role = match principal.role {
        Role::Moderator | Role::Admin => SenderRole::Moderator,
        Role::User => {
            if !principal.owns(appeal.creator_id) {
                return Err(AppealError::Forbidden);
            }
            SenderRole::Creator
        }
    };

    let content = trimmed_message(message)?;

    let sender_name = match sender_name.trim() {
        "" => match sender_role {
            SenderRole::Creator => appeal.creator_name.clone(),
            SenderRole::Moderator => "Moderator".to_string(),
        },
        name => name.to_string(),
    };

    let message = AppealMessage {
        id: Uuid::new_v4(),
        sender_id: principal.user_id,
        sender_name,
        sender_role,
        content,
        created_at: Utc::now(),
        is_internal: is_internal && sender_role == SenderRole::Moderator,
    };

    let updated = Appeal::append_message(pool, appeal_id, &message)
        .await?
        .ok_or(AppealError::NotFound)?;

    Ok(updated)
}

/// Moderator/admin status change, with its audit entry. A reason is required
/// when the appeal itself is being rejected.
#[tracing::instrument(skip(pool, principal, reason), fields(actor = %principal.user_id))]
pub async fn update_status(
    pool: &PgPool,
    principal: &Principal,
    appeal_id: Uuid,
    new_status: AppealStatus,
    reason: Option<String>,
) -> Result<Appeal, AppealError> {
    if !principal.is_moderator() {
        return Err(AppealError::Forbidden);
    }

    let appeal = Appeal::find_by_id(pool, appeal_id)
        .await?
        .ok_or(AppealError::NotFound)?;
    let observed = appeal.status;

    if !status_change_allowed(observed, new_status) {
        return Err(AppealError::InvalidStatusChange {
            from: observed,
            to: new_status,
        });
    }

    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());
    if new_status == AppealStatus::Rejected && reason.is_none() {
        return Err(AppealError::Validation(
            "A reason is required to reject an appeal".to_string(),
        ));
    }

    let change = StatusChange {
        status: new_status,
        changed_by: principal.user_id,
        changed_at: Utc::now(),
        reason,
    };

    let updated = Appeal::set_status(pool, appeal_id, observed, new_status, &change)
        .await?
        .ok_or(AppealError::StaleStatus)?;

    tracing::info!(
        appeal_id = %updated.id,
        from = %observed,
        to = %new_status,
        "Appeal status changed"
    );

    Ok(updated)
}

/// Fetches one appeal for the creator or a moderator, with internal messages
/// stripped for the creator.
#[tracing::instrument(skip(pool, principal), fields(actor = %principal.user_id))]
pub async fn get_appeal(
    pool: &PgPool,
    principal: &Principal,
    appeal_id: Uuid,
) -> Result<Appeal, AppealError> {
    let mut appeal = Appeal::find_by_id(pool, appeal_id)
        .await?
        .ok_or(AppealError::NotFound)?;

    if !principal.can_act_for(appeal.creator_id) {
        return Err(AppealError::Forbidden);
    }

    appeal.messages.0 = visible_messages(appeal.messages.0, principal.is_moderator());

    Ok(appeal)
}

/// Creators see their own appeals; moderators see all, optionally filtered.
/// Internal messages are stripped the same way as in `get_appeal`.
#[tracing::instrument(skip(pool, principal), fields(actor = %principal.user_id))]
pub async fn list_appeals(
    pool: &PgPool,
    principal: &Principal,
    status: Option<AppealStatus>,
) -> Result<Vec<Appeal>, AppealError> {
    let mut appeals = if principal.is_moderator() {
        Appeal::list_all(pool, status).await?
    } else {
        Appeal::list_for_creator(pool, principal.user_id, status).await?
    };

    if !principal.is_moderator() {
        for appeal in &mut appeals {
            appeal.messages.0 = visible_messages(std::mem::take(&mut appeal.messages.0), false);
        }
    }

    Ok(appeals)
}
