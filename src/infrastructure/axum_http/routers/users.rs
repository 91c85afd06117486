use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::warn;

use crate::{
    application::usecases::subscriptions::{
        BillingGateway, SubscriptionError, SubscriptionUseCase,
    },
    auth::AuthUser,
    config::config_model::DotEnvyConfig,
    domain::repositories::{
        subscriptions::SubscriptionRepository, users::UserRepository,
    },
    infrastructure::{
        axum_http::{error_responses::error_response, routers::subscriptions::build_usecase},
        postgres::postgres_connection::PgPoolSquad,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    Router::new()
        .route("/perfil", get(profile))
        .route("/verifica-assinatura", post(verify_subscription))
        .with_state(Arc::new(build_usecase(db_pool, config)))
}

/// Profile fetch runs lazy reconciliation first, so a user returning
/// from checkout sees `assinatura: true` even before the webhook lands.
pub async fn profile<U, S, G>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<U, S, G>>>,
    auth: AuthUser,
) -> Response
where
    U: UserRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    G: BillingGateway + Send + Sync,
{
    match subscriptions_usecase.profile(auth.user_id).await {
        Ok(profile) => Json(profile).into_response(),
        Err(err) => map_error("profile", err),
    }
}

pub async fn verify_subscription<U, S, G>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<U, S, G>>>,
    auth: AuthUser,
) -> Response
where
    U: UserRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    G: BillingGateway + Send + Sync,
{
    match subscriptions_usecase.verify(auth.user_id).await {
        Ok(check) => Json(check).into_response(),
        Err(err) => map_error("verify_subscription", err),
    }
}

fn map_error(label: &str, err: SubscriptionError) -> Response {
    let status = err.status_code();
    warn!(
        status = status.as_u16(),
        error = %err,
        "users: {} failed",
        label
    );
    error_response(status, err.to_string())
}
