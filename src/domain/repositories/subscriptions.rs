use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::value_objects::subscriptions::SubscriptionRecord;

/// Persistence seam for the subscription record embedded in the user row.
///
/// `claim_creation` is the concurrency guard for the create/reactivate
/// path: it must be a conditional update that flips `in_progress` to true
/// only when it is currently false and the status is not pending, and
/// report whether the claim was won. The store is the sole arbiter of
/// concurrent writers; no other lock exists.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn load(&self, user_id: Uuid) -> Result<Option<SubscriptionRecord>>;
    async fn find_user_id_by_preapproval(&self, preapproval_id: &str) -> Result<Option<Uuid>>;
    async fn claim_creation(&self, user_id: Uuid) -> Result<bool>;
    async fn release_claim(&self, user_id: Uuid) -> Result<()>;
    async fn store(&self, user_id: Uuid, record: SubscriptionRecord) -> Result<()>;
}
