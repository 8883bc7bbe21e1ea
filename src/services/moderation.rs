use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::petition::{Decision, Petition, PetitionStatus, ResubmissionEntry};
use crate::models::Principal;
use crate::services::notifier::Notifier;

const DEFAULT_PAUSE_REASON: &str = "Paused by admin";
const DEFAULT_DELETE_REASON: &str = "Deleted by admin";

#[derive(thiserror::Error, Debug)]
pub enum TransitionError {
    #[error("Petition not found")]
    NotFound,

    #[error("Transition {from} -> {to} is not allowed")]
    InvalidTransition {
        from: PetitionStatus,
        to: PetitionStatus,
    },

    #[error("Petition status changed concurrently; refresh and retry")]
    StaleStatus,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not permitted")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// The transition table. Everything not listed here is rejected outright;
/// `deleted` is terminal.
pub fn is_allowed(from: PetitionStatus, to: PetitionStatus) -> bool {
    use PetitionStatus::*;

    match (from, to) {
        // Moderation decisions
        (Pending, Approved) => true,
        (Pending, Rejected) | (Approved, Rejected) => true,
        (Approved, Paused) => true,
        // Soft delete from any live status
        (Draft | Pending | Approved | Paused | Rejected, Deleted) => true,
        // Creator submission and resubmission
        (Draft, Pending) => true,
        (Rejected, Pending) | (Paused, Pending) => true,
        _ => false,
    }
}

/// Applies a moderator decision to a petition.
///
/// The petition's status is re-read here, never taken from the caller, and the
/// write carries the observed status as a guard: a concurrent moderation
/// action surfaces as `StaleStatus` instead of a lost update.
#[tracing::instrument(skip(pool, notifier, principal, reason), fields(actor = %principal.user_id))]
pub async fn transition(
    pool: &PgPool,
    notifier: &Notifier,
    principal: &Principal,
    petition_id: Uuid,
    target: PetitionStatus,
    reason: Option<String>,
) -> Result<Petition, TransitionError> {
    if !principal.is_moderator() {
        return Err(TransitionError::Forbidden);
    }

    let petition = Petition::find_by_id(pool, petition_id)
        .await?
        .ok_or(TransitionError::NotFound)?;
    let observed = petition.status;

    if !is_allowed(observed, target) {
        return Err(TransitionError::InvalidTransition {
            from: observed,
            to: target,
        });
    }

    let decision = decision_for(
        target,
        observed,
        principal.user_id,
        reason,
        petition.decision.as_deref(),
    )?;

    let updated = Petition::apply_transition(pool, petition_id, observed, target, Some(&decision))
        .await?
        .ok_or(TransitionError::StaleStatus)?;

    tracing::info!(
        petition_id = %updated.id,
        from = %observed,
        to = %target,
        "Petition status changed"
    );

    notifier.petition_status_changed(&updated);

    Ok(updated)
}

/// Builds the decision record for a moderator transition. Soft-delete keeps
/// the decision it replaces, so rejection notes and pause reasons survive
/// deletion.
fn decision_for(
    target: PetitionStatus,
    observed: PetitionStatus,
    by: Uuid,
    reason: Option<String>,
    prior: Option<&Decision>,
) -> Result<Decision, TransitionError> {
    let now = Utc::now();
    let reason = reason.map(|r| r.trim().to_string()).filter(|r| !r.is_empty());

    match target {
        PetitionStatus::Approved => Ok(Decision::Approved { at: now, by }),
        PetitionStatus::Rejected => {
            let notes = reason.ok_or_else(|| {
                TransitionError::Validation("A rejection reason is required".to_string())
            })?;
            Ok(Decision::Rejected { at: now, by, notes })
        }
        PetitionStatus::Paused => Ok(Decision::Paused {
            at: now,
            by,
            reason: reason.unwrap_or_else(|| DEFAULT_PAUSE_REASON.to_string()),
        }),
        PetitionStatus::Deleted => Ok(Decision::Deleted {
            at: now,
            by,
            reason: reason.unwrap_or_else(|| DEFAULT_DELETE_REASON.to_string()),
            prior: prior.cloned().map(Box::new),
        }),
        // Draft and pending are creator-side targets (submit/resubmit); they
        // never pass `is_allowed` for the statuses a moderator acts on.
        PetitionStatus::Draft | PetitionStatus::Pending => {
            Err(TransitionError::InvalidTransition {
                from: observed,
                to: target,
            })
        }
    }
}

/// Creator-initiated draft -> pending submission.
#[tracing::instrument(skip(pool, principal), fields(actor = %principal.user_id))]
pub async fn submit(
    pool: &PgPool,
    principal: &Principal,
    petition_id: Uuid,
) -> Result<Petition, TransitionError> {
    let petition = Petition::find_by_id(pool, petition_id)
        .await?
        .ok_or(TransitionError::NotFound)?;

    if !principal.owns(petition.creator_id) {
        return Err(TransitionError::Forbidden);
    }
    if petition.status != PetitionStatus::Draft {
        return Err(TransitionError::InvalidTransition {
            from: petition.status,
            to: PetitionStatus::Pending,
        });
    }

    Petition::apply_transition(
        pool,
        petition_id,
        PetitionStatus::Draft,
        PetitionStatus::Pending,
        None,
    )
    .await?
    .ok_or(TransitionError::StaleStatus)
}

/// Creator-initiated resubmission of a rejected or paused petition. Appends
/// one history entry capturing the decision being contested, bumps the
/// counter, and clears the moderation notes by clearing the decision.
#[tracing::instrument(skip(pool, principal), fields(actor = %principal.user_id))]
pub async fn resubmit(
    pool: &PgPool,
    principal: &Principal,
    petition_id: Uuid,
) -> Result<Petition, TransitionError> {
    let petition = Petition::find_by_id(pool, petition_id)
        .await?
        .ok_or(TransitionError::NotFound)?;

    if !principal.owns(petition.creator_id) {
        return Err(TransitionError::Forbidden);
    }

    let observed = petition.status;
    if !matches!(observed, PetitionStatus::Rejected | PetitionStatus::Paused) {
        return Err(TransitionError::InvalidTransition {
            from: observed,
            to: PetitionStatus::Pending,
        });
    }

    let entry = resubmission_entry(&petition);

    let updated = Petition::apply_resubmission(pool, petition_id, observed, &entry)
        .await?
        .ok_or(TransitionError::StaleStatus)?;

    tracing::info!(
        petition_id = %updated.id,
        resubmission_count = updated.resubmission_count,
        "Petition resubmitted"
    );

    Ok(updated)
}

/// Captures the decision being contested. A rejected/paused petition always
/// carries one; `updated_at` stands in for records that predate the decision
/// column.
fn resubmission_entry(petition: &Petition) -> ResubmissionEntry {
    let now = Utc::now();
    match petition.decision.as_deref() {
        Some(Decision::Rejected { at, notes, .. }) => ResubmissionEntry {
            rejected_at: *at,
            reason: notes.clone(),
            resubmitted_at: now,
        },
        Some(Decision::Paused { at, reason, .. }) => ResubmissionEntry {
            rejected_at: *at,
            reason: reason.clone(),
            resubmitted_at: now,
        },
        _ => ResubmissionEntry {
            rejected_at: petition.updated_at,
            reason: String::new(),
            resubmitted_at: now,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;

    #[test]
    fn test_moderation_transitions_allowed() {
        use PetitionStatus::*;
        assert!(is_allowed(Pending, Approved));
        assert!(is_allowed(Pending, Rejected));
        assert!(is_allowed(Approved, Rejected));
        assert!(is_allowed(Approved, Paused));
        assert!(is_allowed(Draft, Pending));
        assert!(is_allowed(Rejected, Pending));
        assert!(is_allowed(Paused, Pending));
    }

    #[test]
    fn test_soft_delete_from_any_live_status() {
        use PetitionStatus::*;
        for from in [Draft, Pending, Approved, Paused, Rejected] {
            assert!(is_allowed(from, Deleted), "delete from {:?}", from);
        }
    }

    #[test]
    fn test_invalid_transitions_rejected() {
        use PetitionStatus::*;
        // draft may not skip review
        assert!(!is_allowed(Draft, Approved));
        assert!(!is_allowed(Draft, Rejected));
        assert!(!is_allowed(Draft, Paused));
        // pausing requires an approved petition
        assert!(!is_allowed(Pending, Paused));
        assert!(!is_allowed(Rejected, Paused));
        // approval only out of pending
        assert!(!is_allowed(Rejected, Approved));
        assert!(!is_allowed(Paused, Approved));
        // self-transitions
        assert!(!is_allowed(Approved, Approved));
    }

    #[test]
    fn test_deleted_is_terminal() {
        use PetitionStatus::*;
        for to in [Draft, Pending, Approved, Paused, Rejected, Deleted] {
            assert!(!is_allowed(Deleted, to), "deleted -> {:?}", to);
        }
    }

    fn petition_with_decision(status: PetitionStatus, decision: Option<Decision>) -> Petition {
        let now = Utc::now();
        Petition {
            id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            creator_name: "Ada".to_string(),
            creator_email: "ada@example.org".to_string(),
            title: "Fix the bridge".to_string(),
            pricing_tier: crate::models::petition::PricingTier::Basic,
            status,
            decision: decision.map(Json),
            resubmission_count: 0,
            resubmission_history: Json(vec![]),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resubmission_entry_carries_rejection_notes() {
        let rejected_at = Utc::now();
        let petition = petition_with_decision(
            PetitionStatus::Rejected,
            Some(Decision::Rejected {
                at: rejected_at,
                by: Uuid::new_v4(),
                notes: "Duplicate campaign".to_string(),
            }),
        );

        let entry = resubmission_entry(&petition);
        assert_eq!(entry.rejected_at, rejected_at);
        assert_eq!(entry.reason, "Duplicate campaign");
        assert!(entry.resubmitted_at >= rejected_at);
    }

    #[test]
    fn test_rejection_requires_reason() {
        let by = Uuid::new_v4();
        assert!(matches!(
            decision_for(PetitionStatus::Rejected, PetitionStatus::Pending, by, None, None),
            Err(TransitionError::Validation(_))
        ));
        assert!(matches!(
            decision_for(
                PetitionStatus::Rejected,
                PetitionStatus::Pending,
                by,
                Some("   ".to_string()),
                None
            ),
            Err(TransitionError::Validation(_))
        ));
    }

    #[test]
    fn test_pause_and_delete_reason_defaults() {
        let by = Uuid::new_v4();

        match decision_for(PetitionStatus::Paused, PetitionStatus::Approved, by, None, None) {
            Ok(Decision::Paused { reason, .. }) => assert_eq!(reason, DEFAULT_PAUSE_REASON),
            other => panic!("unexpected: {:?}", other),
        }
        match decision_for(PetitionStatus::Deleted, PetitionStatus::Approved, by, None, None) {
            Ok(Decision::Deleted { reason, .. }) => assert_eq!(reason, DEFAULT_DELETE_REASON),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_soft_delete_preserves_contested_decision() {
        let by = Uuid::new_v4();
        let rejected = Decision::Rejected {
            at: Utc::now(),
            by: Uuid::new_v4(),
            notes: "Duplicate campaign".to_string(),
        };

        let deleted = decision_for(
            PetitionStatus::Deleted,
            PetitionStatus::Rejected,
            by,
            Some("Spam account".to_string()),
            Some(&rejected),
        )
        .unwrap();

        match deleted {
            Decision::Deleted { reason, prior, .. } => {
                assert_eq!(reason, "Spam account");
                // The rejection notes stay on the record through deletion.
                assert_eq!(prior.as_deref(), Some(&rejected));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_delete_without_prior_decision() {
        let by = Uuid::new_v4();
        match decision_for(PetitionStatus::Deleted, PetitionStatus::Pending, by, None, None) {
            Ok(Decision::Deleted { prior, .. }) => assert!(prior.is_none()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_resubmission_entry_carries_pause_reason() {
        let paused_at = Utc::now();
        let petition = petition_with_decision(
            PetitionStatus::Paused,
            Some(Decision::Paused {
                at: paused_at,
                by: Uuid::new_v4(),
                reason: DEFAULT_PAUSE_REASON.to_string(),
            }),
        );

        let entry = resubmission_entry(&petition);
        assert_eq!(entry.rejected_at, paused_at);
        assert_eq!(entry.reason, DEFAULT_PAUSE_REASON);
    }
}
