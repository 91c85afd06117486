use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
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
        axum_http::error_responses::error_response,
        payments::mercadopago_client::MercadoPagoClient,
        postgres::{
            postgres_connection::PgPoolSquad,
            repositories::{subscriptions::SubscriptionPostgres, users::UserPostgres},
        },
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    Router::new()
        .route("/", post(subscribe))
        .route("/cancelar", post(cancel))
        .route("/reativar", post(reactivate))
        .with_state(Arc::new(build_usecase(db_pool, config)))
}

pub fn build_usecase(
    db_pool: Arc<PgPoolSquad>,
    config: Arc<DotEnvyConfig>,
) -> SubscriptionUseCase<UserPostgres, SubscriptionPostgres, MercadoPagoClient> {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let subscription_repository = SubscriptionPostgres::new(Arc::clone(&db_pool));
    let gateway = MercadoPagoClient::new(
        config.mercado_pago.clone(),
        config.frontend.url.clone(),
    );

    SubscriptionUseCase::new(
        Arc::new(user_repository),
        Arc::new(subscription_repository),
        Arc::new(gateway),
    )
}

pub async fn subscribe<U, S, G>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<U, S, G>>>,
    auth: AuthUser,
) -> Response
where
    U: UserRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    G: BillingGateway + Send + Sync,
{
    match subscriptions_usecase.subscribe(auth.user_id).await {
        Ok(init_point) => Json(json!({ "init_point": init_point })).into_response(),
        Err(err) => map_error("subscribe", err),
    }
}

pub async fn cancel<U, S, G>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<U, S, G>>>,
    auth: AuthUser,
) -> Response
where
    U: UserRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    G: BillingGateway + Send + Sync,
{
    match subscriptions_usecase.cancel(auth.user_id).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => map_error("cancel", err),
    }
}

pub async fn reactivate<U, S, G>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<U, S, G>>>,
    auth: AuthUser,
) -> Response
where
    U: UserRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    G: BillingGateway + Send + Sync,
{
    match subscriptions_usecase.reactivate(auth.user_id).await {
        Ok(init_point) => Json(json!({ "init_point": init_point })).into_response(),
        Err(err) => map_error("reactivate", err),
    }
}

fn map_error(label: &str, err: SubscriptionError) -> Response {
    let status = err.status_code();
    warn!(
        status = status.as_u16(),
        error = %err,
        "subscriptions: {} failed",
        label
    );
    error_response(status, err.to_string())
}
