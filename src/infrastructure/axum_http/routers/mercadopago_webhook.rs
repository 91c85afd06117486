use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use tracing::{error, info};

use crate::{
    application::usecases::subscriptions::{
        BillingGateway, SubscriptionUseCase,
    },
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::{subscriptions::SubscriptionRepository, users::UserRepository},
        value_objects::mercadopago_webhook::MercadoPagoWebhook,
    },
    infrastructure::{
        axum_http::routers::subscriptions::build_usecase,
        postgres::postgres_connection::PgPoolSquad,
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    Router::new()
        .route("/mercadopago", post(handle_mercadopago_webhook))
        .with_state(Arc::new(build_usecase(db_pool, config)))
}

/// Unauthenticated, provider-originated. Must answer 200 for every
/// processed or benign notification; a 500 tells the provider to
/// redeliver, so it is reserved for transient gateway/store failures.
pub async fn handle_mercadopago_webhook<U, S, G>(
    State(subscriptions_usecase): State<Arc<SubscriptionUseCase<U, S, G>>>,
    Json(payload): Json<MercadoPagoWebhook>,
) -> Response
where
    U: UserRepository + Send + Sync,
    S: SubscriptionRepository + Send + Sync,
    G: BillingGateway + Send + Sync,
{
    info!(
        notification_type = ?payload.type_,
        preapproval_id = ?payload.preapproval_id(),
        "mercadopago_webhook: notification received"
    );

    match subscriptions_usecase.handle_webhook(payload).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            error!(
                status = err.status_code().as_u16(),
                error = %err,
                "mercadopago_webhook: transient failure, provider will retry"
            );
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
