use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::enums::{
    agreement_statuses::AgreementStatus, subscription_statuses::SubscriptionStatus,
};

/// Per-user subscription state, embedded in the user record.
///
/// Invariants held by [`transition`]:
/// - `active == true` implies `status == Active`.
/// - `status == Inactive` implies `!active && !in_progress`.
/// - `in_progress` is true only between a submitted creation request and
///   the first terminal provider status for that agreement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub active: bool,
    pub status: SubscriptionStatus,
    pub preapproval_id: Option<String>,
    pub in_progress: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Agreement returned by the billing gateway on creation. `init_point`
/// is the provider-hosted checkout URL the client is redirected to.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedAgreement {
    pub id: String,
    pub status: AgreementStatus,
    pub init_point: String,
}

/// Events a subscription record can receive. All three entry points
/// (create flow, webhook handler, lazy reconciliation on read) go through
/// the same transition function with these events.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    CreateRequested { preapproval_id: String },
    ProviderUpdate { status: AgreementStatus },
    CancelRequested,
    ReactivateRequested { preapproval_id: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("a subscription request is already in progress")]
    AlreadyInProgress,
    #[error("subscription is already active")]
    AlreadyActive,
    #[error("no subscription agreement to cancel")]
    NothingToCancel,
}

/// Pure transition function over the subscription record.
///
/// Idempotent under repeated identical events: applying the same
/// `ProviderUpdate` twice yields the same record, and `updated_at` only
/// moves when some other field actually changed. Unknown provider
/// statuses are a no-op, never an error.
pub fn transition(
    record: &SubscriptionRecord,
    event: SubscriptionEvent,
    now: DateTime<Utc>,
) -> Result<SubscriptionRecord, TransitionError> {
    let mut next = record.clone();

    match event {
        SubscriptionEvent::CreateRequested { preapproval_id }
        | SubscriptionEvent::ReactivateRequested { preapproval_id } => {
            if record.in_progress || record.status == SubscriptionStatus::Pending {
                return Err(TransitionError::AlreadyInProgress);
            }
            if record.status == SubscriptionStatus::Active {
                return Err(TransitionError::AlreadyActive);
            }
            next.status = SubscriptionStatus::Pending;
            next.preapproval_id = Some(preapproval_id);
            next.in_progress = true;
            next.active = false;
        }
        SubscriptionEvent::ProviderUpdate { status } => match status {
            AgreementStatus::Authorized => {
                next.status = SubscriptionStatus::Active;
                next.active = true;
                next.in_progress = false;
                if next.created_at.is_none() {
                    next.created_at = Some(now);
                }
            }
            AgreementStatus::Paused | AgreementStatus::Cancelled => {
                next.status = SubscriptionStatus::Inactive;
                next.active = false;
                next.in_progress = false;
            }
            AgreementStatus::Pending | AgreementStatus::Unknown => {}
        },
        SubscriptionEvent::CancelRequested => {
            if record.status == SubscriptionStatus::Inactive {
                return Err(TransitionError::NothingToCancel);
            }
            next.status = SubscriptionStatus::Inactive;
            next.active = false;
            next.in_progress = false;
        }
    }

    if changed(record, &next) {
        next.updated_at = Some(now);
    }

    Ok(next)
}

fn changed(before: &SubscriptionRecord, after: &SubscriptionRecord) -> bool {
    before.active != after.active
        || before.status != after.status
        || before.preapproval_id != after.preapproval_id
        || before.in_progress != after.in_progress
        || before.created_at != after.created_at
}
