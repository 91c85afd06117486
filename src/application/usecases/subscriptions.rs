use std::sync::Arc;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{
    repositories::{subscriptions::SubscriptionRepository, users::UserRepository},
    value_objects::{
        enums::{
            agreement_statuses::AgreementStatus, subscription_statuses::SubscriptionStatus,
        },
        mercadopago_webhook::MercadoPagoWebhook,
        subscriptions::{
            CreatedAgreement, SubscriptionEvent, SubscriptionRecord, transition, TransitionError,
        },
        users::{SubscriptionCheckDto, UserProfileDto},
    },
};

/// Remote billing gateway, consumed as an opaque service. The concrete
/// implementation talks to Mercado Pago's preapproval API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BillingGateway: Send + Sync {
    async fn create_preapproval(
        &self,
        payer_email: &str,
        external_reference: &str,
    ) -> AnyResult<CreatedAgreement>;

    async fn get_preapproval_status(&self, preapproval_id: &str) -> AnyResult<AgreementStatus>;

    async fn cancel_preapproval(&self, preapproval_id: &str) -> AnyResult<()>;
}

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("cpf is required before subscribing")]
    MissingTaxId,
    #[error("a subscription request is already in progress")]
    AlreadyInProgress,
    #[error("subscription is already active")]
    AlreadyActive,
    #[error("no subscription agreement on file")]
    NoAgreement,
    #[error("user not found")]
    UserNotFound,
    #[error("billing gateway request failed")]
    Gateway(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SubscriptionError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            SubscriptionError::MissingTaxId
            | SubscriptionError::AlreadyInProgress
            | SubscriptionError::AlreadyActive
            | SubscriptionError::NoAgreement => StatusCode::BAD_REQUEST,
            SubscriptionError::UserNotFound => StatusCode::NOT_FOUND,
            SubscriptionError::Gateway(_) | SubscriptionError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<TransitionError> for SubscriptionError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::AlreadyInProgress => SubscriptionError::AlreadyInProgress,
            TransitionError::AlreadyActive => SubscriptionError::AlreadyActive,
            TransitionError::NothingToCancel => SubscriptionError::NoAgreement,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, SubscriptionError>;

/// Reconciliation coordinator: bridges the three entry points (create
/// flow, webhook handler, lazy reconciliation on read) to the state
/// machine, serializing against the gateway via the store's conditional
/// `claim_creation` update.
pub struct SubscriptionUseCase<U, S, G>
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: BillingGateway + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    subscription_repo: Arc<S>,
    gateway: Arc<G>,
}

impl<U, S, G> SubscriptionUseCase<U, S, G>
where
    U: UserRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    G: BillingGateway + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, subscription_repo: Arc<S>, gateway: Arc<G>) -> Self {
        Self {
            user_repo,
            subscription_repo,
            gateway,
        }
    }

    /// `POST /assinatura` — submits a new recurring agreement and returns
    /// the provider checkout URL.
    pub async fn subscribe(&self, user_id: Uuid) -> UseCaseResult<String> {
        self.begin_agreement(user_id, false).await
    }

    /// `POST /assinatura/reativar` — supersedes a cancelled agreement with
    /// a fresh one. Rejected while a previous request is still pending.
    pub async fn reactivate(&self, user_id: Uuid) -> UseCaseResult<String> {
        self.begin_agreement(user_id, true).await
    }

    async fn begin_agreement(&self, user_id: Uuid, reactivation: bool) -> UseCaseResult<String> {
        info!(%user_id, reactivation, "subscriptions: agreement creation requested");

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load user");
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::UserNotFound)?;

        if user.cpf.as_deref().map_or(true, |cpf| cpf.trim().is_empty()) {
            warn!(%user_id, "subscriptions: cpf missing, refusing to create agreement");
            return Err(SubscriptionError::MissingTaxId);
        }

        let record = user.subscription_record();
        if record.in_progress || record.status == SubscriptionStatus::Pending {
            warn!(%user_id, "subscriptions: agreement creation already in progress");
            return Err(SubscriptionError::AlreadyInProgress);
        }
        if record.status == SubscriptionStatus::Active {
            warn!(%user_id, "subscriptions: subscription already active");
            return Err(SubscriptionError::AlreadyActive);
        }

        // The conditional update is the actual guard; the checks above
        // only exist to answer fast without touching the gateway.
        let claimed = self
            .subscription_repo
            .claim_creation(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to claim creation");
                SubscriptionError::Internal(err)
            })?;
        if !claimed {
            warn!(%user_id, "subscriptions: lost creation race, another request in flight");
            return Err(SubscriptionError::AlreadyInProgress);
        }

        let agreement = match self
            .gateway
            .create_preapproval(&user.email, &user_id.to_string())
            .await
        {
            Ok(agreement) => agreement,
            Err(err) => {
                error!(%user_id, error = ?err, "subscriptions: gateway create failed");
                self.release_claim_best_effort(user_id).await;
                return Err(SubscriptionError::Gateway(err));
            }
        };

        let event = if reactivation {
            SubscriptionEvent::ReactivateRequested {
                preapproval_id: agreement.id.clone(),
            }
        } else {
            SubscriptionEvent::CreateRequested {
                preapproval_id: agreement.id.clone(),
            }
        };
        let next = transition(&record, event, Utc::now())?;

        if let Err(err) = self.subscription_repo.store(user_id, next).await {
            error!(
                %user_id,
                preapproval_id = %agreement.id,
                db_error = ?err,
                "subscriptions: failed to persist created agreement"
            );
            self.release_claim_best_effort(user_id).await;
            return Err(SubscriptionError::Internal(err));
        }

        info!(
            %user_id,
            preapproval_id = %agreement.id,
            agreement_status = %agreement.status,
            "subscriptions: agreement created, awaiting provider confirmation"
        );
        Ok(agreement.init_point)
    }

    async fn release_claim_best_effort(&self, user_id: Uuid) {
        if let Err(err) = self.subscription_repo.release_claim(user_id).await {
            error!(
                %user_id,
                db_error = ?err,
                "subscriptions: failed to release creation claim"
            );
        }
    }

    /// `POST /assinatura/cancelar` — cancels the agreement at the gateway
    /// first; the record is only touched after the gateway acknowledged.
    pub async fn cancel(&self, user_id: Uuid) -> UseCaseResult<()> {
        info!(%user_id, "subscriptions: cancellation requested");

        let record = self.load_record(user_id).await?;
        let preapproval_id = record
            .preapproval_id
            .clone()
            .ok_or(SubscriptionError::NoAgreement)?;

        let next = transition(&record, SubscriptionEvent::CancelRequested, Utc::now())?;

        self.gateway
            .cancel_preapproval(&preapproval_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %preapproval_id,
                    error = ?err,
                    "subscriptions: gateway cancel failed, record left unchanged"
                );
                SubscriptionError::Gateway(err)
            })?;

        self.subscription_repo
            .store(user_id, next)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to persist cancellation");
                SubscriptionError::Internal(err)
            })?;

        info!(%user_id, %preapproval_id, "subscriptions: agreement cancelled");
        Ok(())
    }

    /// `POST /user/verifica-assinatura` — reports the record as stored,
    /// without a gateway round-trip.
    pub async fn verify(&self, user_id: Uuid) -> UseCaseResult<SubscriptionCheckDto> {
        let record = self.load_record(user_id).await?;
        Ok(SubscriptionCheckDto {
            assinatura: record.active,
            status: record.status,
        })
    }

    /// `GET /user/perfil` — profile with lazy reconciliation: a pending
    /// record with an agreement on file is reconciled against the gateway
    /// before the profile is returned, masking webhook latency.
    pub async fn profile(&self, user_id: Uuid) -> UseCaseResult<UserProfileDto> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load user profile");
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::UserNotFound)?;

        let record = user.subscription_record();
        let record = self.reconcile_pending(user_id, record).await?;

        Ok(user.to_profile(&record))
    }

    async fn reconcile_pending(
        &self,
        user_id: Uuid,
        record: SubscriptionRecord,
    ) -> UseCaseResult<SubscriptionRecord> {
        let preapproval_id = match (&record.status, &record.preapproval_id) {
            (SubscriptionStatus::Pending, Some(id)) => id.clone(),
            _ => return Ok(record),
        };

        let status = self
            .gateway
            .get_preapproval_status(&preapproval_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %preapproval_id,
                    error = ?err,
                    "subscriptions: gateway fetch failed during lazy reconciliation"
                );
                SubscriptionError::Gateway(err)
            })?;

        let next = transition(&record, SubscriptionEvent::ProviderUpdate { status }, Utc::now())?;
        if next != record {
            self.subscription_repo
                .store(user_id, next.clone())
                .await
                .map_err(|err| {
                    error!(%user_id, db_error = ?err, "subscriptions: failed to persist reconciled record");
                    SubscriptionError::Internal(err)
                })?;
            info!(
                %user_id,
                %preapproval_id,
                agreement_status = %status,
                new_status = %next.status,
                "subscriptions: record reconciled on read"
            );
        }
        Ok(next)
    }

    /// `POST /webhook/mercadopago` — delivery is at-least-once and
    /// unordered; the agreement status is always fetched back from the
    /// gateway before transitioning, and a notification for an unknown or
    /// already-settled agreement is acknowledged as a no-op so the
    /// provider stops retrying. Only transient gateway/store failures
    /// propagate, which the router converts into a 500 to trigger
    /// redelivery.
    pub async fn handle_webhook(&self, payload: MercadoPagoWebhook) -> UseCaseResult<()> {
        let Some(preapproval_id) = payload.preapproval_id() else {
            debug!(
                notification_type = ?payload.type_,
                "subscriptions: webhook without agreement id, acknowledging"
            );
            return Ok(());
        };

        let status = self
            .gateway
            .get_preapproval_status(&preapproval_id)
            .await
            .map_err(|err| {
                error!(
                    %preapproval_id,
                    error = ?err,
                    "subscriptions: gateway fetch failed while handling webhook"
                );
                SubscriptionError::Gateway(err)
            })?;

        let user_id = match self
            .subscription_repo
            .find_user_id_by_preapproval(&preapproval_id)
            .await
            .map_err(|err| {
                error!(
                    %preapproval_id,
                    db_error = ?err,
                    "subscriptions: lookup by agreement id failed"
                );
                SubscriptionError::Internal(err)
            })? {
            Some(user_id) => user_id,
            None => {
                info!(
                    %preapproval_id,
                    agreement_status = %status,
                    "subscriptions: webhook for unknown agreement, acknowledging"
                );
                return Ok(());
            }
        };

        let record = match self.subscription_repo.load(user_id).await.map_err(|err| {
            error!(%user_id, db_error = ?err, "subscriptions: failed to load record for webhook");
            SubscriptionError::Internal(err)
        })? {
            Some(record) => record,
            None => return Ok(()),
        };

        let next = transition(&record, SubscriptionEvent::ProviderUpdate { status }, Utc::now())?;
        if next == record {
            debug!(
                %user_id,
                %preapproval_id,
                agreement_status = %status,
                "subscriptions: webhook is a no-op for current record"
            );
            return Ok(());
        }

        self.subscription_repo
            .store(user_id, next.clone())
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %preapproval_id,
                    db_error = ?err,
                    "subscriptions: failed to persist webhook transition"
                );
                SubscriptionError::Internal(err)
            })?;

        info!(
            %user_id,
            %preapproval_id,
            agreement_status = %status,
            new_status = %next.status,
            "subscriptions: record updated from webhook"
        );
        Ok(())
    }

    async fn load_record(&self, user_id: Uuid) -> UseCaseResult<SubscriptionRecord> {
        self.subscription_repo
            .load(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "subscriptions: failed to load record");
                SubscriptionError::Internal(err)
            })?
            .ok_or(SubscriptionError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::users::UserEntity,
        repositories::{
            subscriptions::MockSubscriptionRepository, users::MockUserRepository,
        },
        value_objects::enums::subscription_statuses::SubscriptionStatus,
    };
    use chrono::Utc;
    use mockall::predicate::eq;

    fn user_entity(cpf: Option<&str>, record: &SubscriptionRecord) -> UserEntity {
        UserEntity {
            id: Uuid::nil(),
            nome: "Maria".to_string(),
            email: "maria@example.com".to_string(),
            senha_hash: "$argon2id$stub".to_string(),
            telefone: None,
            cpf: cpf.map(str::to_string),
            subscription_active: record.active,
            subscription_status: record.status.to_string(),
            preapproval_id: record.preapproval_id.clone(),
            subscription_in_progress: record.in_progress,
            subscription_created_at: record.created_at,
            subscription_updated_at: record.updated_at,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn pending_record() -> SubscriptionRecord {
        SubscriptionRecord {
            active: false,
            status: SubscriptionStatus::Pending,
            preapproval_id: Some("mp-123".to_string()),
            in_progress: true,
            created_at: None,
            updated_at: Some(Utc::now()),
        }
    }

    fn usecase(
        user_repo: MockUserRepository,
        subscription_repo: MockSubscriptionRepository,
        gateway: MockBillingGateway,
    ) -> SubscriptionUseCase<MockUserRepository, MockSubscriptionRepository, MockBillingGateway>
    {
        SubscriptionUseCase::new(Arc::new(user_repo), Arc::new(subscription_repo), Arc::new(gateway))
    }

    #[tokio::test]
    async fn subscribe_returns_init_point_and_persists_pending() {
        let user_id = Uuid::nil();
        let record = SubscriptionRecord::default();

        let mut user_repo = MockUserRepository::new();
        let entity = user_entity(Some("12345678900"), &record);
        user_repo
            .expect_find_by_id()
            .with(eq(user_id))
            .returning(move |_| Ok(Some(entity.clone())));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_claim_creation()
            .with(eq(user_id))
            .times(1)
            .returning(|_| Ok(true));
        subscription_repo
            .expect_store()
            .withf(|_, record| {
                record.status == SubscriptionStatus::Pending
                    && record.in_progress
                    && record.preapproval_id.as_deref() == Some("mp-new")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_create_preapproval()
            .times(1)
            .returning(|_, _| {
                Ok(CreatedAgreement {
                    id: "mp-new".to_string(),
                    status: AgreementStatus::Pending,
                    init_point: "https://mercadopago.test/checkout".to_string(),
                })
            });

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let init_point = usecase.subscribe(user_id).await.unwrap();
        assert_eq!(init_point, "https://mercadopago.test/checkout");
    }

    #[tokio::test]
    async fn subscribe_without_cpf_is_rejected_before_gateway() {
        let user_id = Uuid::nil();
        let record = SubscriptionRecord::default();

        let mut user_repo = MockUserRepository::new();
        let entity = user_entity(None, &record);
        user_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entity.clone())));

        let subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockBillingGateway::new();

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let err = usecase.subscribe(user_id).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::MissingTaxId));
    }

    #[tokio::test]
    async fn losing_the_creation_claim_is_a_conflict_without_gateway_call() {
        let user_id = Uuid::nil();
        let record = SubscriptionRecord::default();

        let mut user_repo = MockUserRepository::new();
        let entity = user_entity(Some("12345678900"), &record);
        user_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entity.clone())));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_claim_creation()
            .returning(|_| Ok(false));

        // No expectations: any gateway call fails the test.
        let gateway = MockBillingGateway::new();

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let err = usecase.subscribe(user_id).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::AlreadyInProgress));
    }

    #[tokio::test]
    async fn subscribe_while_pending_is_a_conflict() {
        let user_id = Uuid::nil();
        let record = pending_record();

        let mut user_repo = MockUserRepository::new();
        let entity = user_entity(Some("12345678900"), &record);
        user_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entity.clone())));

        let subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockBillingGateway::new();

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let err = usecase.subscribe(user_id).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::AlreadyInProgress));
    }

    #[tokio::test]
    async fn reactivate_while_pending_is_rejected_without_gateway_call() {
        let user_id = Uuid::nil();
        let record = pending_record();

        let mut user_repo = MockUserRepository::new();
        let entity = user_entity(Some("12345678900"), &record);
        user_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entity.clone())));

        let subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockBillingGateway::new();

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let err = usecase.reactivate(user_id).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::AlreadyInProgress));
    }

    #[tokio::test]
    async fn gateway_failure_on_create_releases_the_claim() {
        let user_id = Uuid::nil();
        let record = SubscriptionRecord::default();

        let mut user_repo = MockUserRepository::new();
        let entity = user_entity(Some("12345678900"), &record);
        user_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entity.clone())));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_claim_creation()
            .returning(|_| Ok(true));
        subscription_repo
            .expect_release_claim()
            .with(eq(user_id))
            .times(1)
            .returning(|_| Ok(()));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_create_preapproval()
            .returning(|_, _| Err(anyhow::anyhow!("mercado pago is down")));

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let err = usecase.subscribe(user_id).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::Gateway(_)));
    }

    #[tokio::test]
    async fn cancel_gateway_failure_leaves_record_untouched() {
        let user_id = Uuid::nil();
        let record = SubscriptionRecord {
            active: true,
            status: SubscriptionStatus::Active,
            preapproval_id: Some("mp-123".to_string()),
            in_progress: false,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };

        let user_repo = MockUserRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let stored = record.clone();
        subscription_repo
            .expect_load()
            .returning(move |_| Ok(Some(stored.clone())));
        // Cancel must not persist anything when the gateway refused.

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_cancel_preapproval()
            .returning(|_| Err(anyhow::anyhow!("timeout")));

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let err = usecase.cancel(user_id).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::Gateway(_)));
    }

    #[tokio::test]
    async fn cancel_without_agreement_is_rejected() {
        let user_id = Uuid::nil();
        let user_repo = MockUserRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_load()
            .returning(|_| Ok(Some(SubscriptionRecord::default())));
        let gateway = MockBillingGateway::new();

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let err = usecase.cancel(user_id).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::NoAgreement));
    }

    #[tokio::test]
    async fn cancel_calls_gateway_before_persisting() {
        let user_id = Uuid::nil();
        let record = pending_record();

        let user_repo = MockUserRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        let stored = record.clone();
        subscription_repo
            .expect_load()
            .returning(move |_| Ok(Some(stored.clone())));
        subscription_repo
            .expect_store()
            .withf(|_, record| {
                record.status == SubscriptionStatus::Inactive
                    && !record.active
                    && !record.in_progress
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_cancel_preapproval()
            .with(eq("mp-123"))
            .times(1)
            .returning(|_| Ok(()));

        let usecase = usecase(user_repo, subscription_repo, gateway);
        usecase.cancel(user_id).await.unwrap();
    }

    #[tokio::test]
    async fn profile_reconciles_pending_record_to_active() {
        let user_id = Uuid::nil();
        let record = pending_record();

        let mut user_repo = MockUserRepository::new();
        let entity = user_entity(Some("12345678900"), &record);
        user_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entity.clone())));

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_store()
            .withf(|_, record| {
                record.active && record.status == SubscriptionStatus::Active && !record.in_progress
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_get_preapproval_status()
            .with(eq("mp-123"))
            .times(1)
            .returning(|_| Ok(AgreementStatus::Authorized));

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let profile = usecase.profile(user_id).await.unwrap();
        assert!(profile.assinatura);
        assert_eq!(profile.assinatura_status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn profile_skips_gateway_when_not_pending() {
        let user_id = Uuid::nil();
        let record = SubscriptionRecord::default();

        let mut user_repo = MockUserRepository::new();
        let entity = user_entity(Some("12345678900"), &record);
        user_repo
            .expect_find_by_id()
            .returning(move |_| Ok(Some(entity.clone())));

        let subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockBillingGateway::new();

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let profile = usecase.profile(user_id).await.unwrap();
        assert!(!profile.assinatura);
    }

    #[tokio::test]
    async fn webhook_for_unknown_agreement_is_acknowledged() {
        let user_repo = MockUserRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_user_id_by_preapproval()
            .with(eq("mp-foreign"))
            .returning(|_| Ok(None));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_get_preapproval_status()
            .returning(|_| Ok(AgreementStatus::Authorized));

        let payload: MercadoPagoWebhook =
            serde_json::from_str(r#"{"type":"subscription_preapproval","data":{"id":"mp-foreign"}}"#)
                .unwrap();

        let usecase = usecase(user_repo, subscription_repo, gateway);
        usecase.handle_webhook(payload).await.unwrap();
    }

    #[tokio::test]
    async fn webhook_without_id_is_acknowledged_without_gateway_call() {
        let user_repo = MockUserRepository::new();
        let subscription_repo = MockSubscriptionRepository::new();
        let gateway = MockBillingGateway::new();

        let payload: MercadoPagoWebhook = serde_json::from_str(r#"{"type":"test"}"#).unwrap();

        let usecase = usecase(user_repo, subscription_repo, gateway);
        usecase.handle_webhook(payload).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_cancelled_webhook_is_idempotent() {
        let user_id = Uuid::nil();
        let inactive = SubscriptionRecord {
            preapproval_id: Some("mp-123".to_string()),
            updated_at: Some(Utc::now()),
            ..SubscriptionRecord::default()
        };

        let user_repo = MockUserRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_user_id_by_preapproval()
            .returning(move |_| Ok(Some(user_id)));
        let stored = inactive.clone();
        subscription_repo
            .expect_load()
            .returning(move |_| Ok(Some(stored.clone())));
        // Already inactive: nothing may be stored.

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_get_preapproval_status()
            .returning(|_| Ok(AgreementStatus::Cancelled));

        let usecase = usecase(user_repo, subscription_repo, gateway);
        usecase
            .handle_webhook(
                serde_json::from_str(r#"{"data":{"id":"mp-123"}}"#).unwrap(),
            )
            .await
            .unwrap();
        usecase
            .handle_webhook(
                serde_json::from_str(r#"{"data":{"id":"mp-123"}}"#).unwrap(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn webhook_authorizes_pending_record() {
        let user_id = Uuid::nil();
        let record = pending_record();

        let user_repo = MockUserRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_user_id_by_preapproval()
            .with(eq("mp-123"))
            .returning(move |_| Ok(Some(user_id)));
        let stored = record.clone();
        subscription_repo
            .expect_load()
            .returning(move |_| Ok(Some(stored.clone())));
        subscription_repo
            .expect_store()
            .withf(|_, record| record.active && record.status == SubscriptionStatus::Active)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_get_preapproval_status()
            .returning(|_| Ok(AgreementStatus::Authorized));

        let usecase = usecase(user_repo, subscription_repo, gateway);
        usecase
            .handle_webhook(serde_json::from_str(r#"{"data":{"id":"mp-123"}}"#).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn webhook_gateway_failure_propagates_for_redelivery() {
        let user_repo = MockUserRepository::new();
        let subscription_repo = MockSubscriptionRepository::new();
        let mut gateway = MockBillingGateway::new();
        gateway
            .expect_get_preapproval_status()
            .returning(|_| Err(anyhow::anyhow!("502 from provider")));

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let err = usecase
            .handle_webhook(serde_json::from_str(r#"{"data":{"id":"mp-123"}}"#).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::Gateway(_)));
    }

    #[tokio::test]
    async fn verify_reports_record_without_gateway_call() {
        let user_id = Uuid::nil();
        let record = SubscriptionRecord {
            active: true,
            status: SubscriptionStatus::Active,
            preapproval_id: Some("mp-123".to_string()),
            in_progress: false,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };

        let user_repo = MockUserRepository::new();
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_load()
            .returning(move |_| Ok(Some(record.clone())));
        let gateway = MockBillingGateway::new();

        let usecase = usecase(user_repo, subscription_repo, gateway);
        let check = usecase.verify(user_id).await.unwrap();
        assert!(check.assinatura);
        assert_eq!(check.status, SubscriptionStatus::Active);
    }
}
