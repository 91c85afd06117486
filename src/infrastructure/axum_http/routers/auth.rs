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
    application::usecases::auth::{AuthError, AuthUseCase, MailSender},
    config::config_model::DotEnvyConfig,
    domain::{
        repositories::users::UserRepository,
        value_objects::users::{
            ForgotPasswordModel, LoginModel, RegisterUserModel, ResetPasswordModel,
        },
    },
    infrastructure::{
        axum_http::error_responses::error_response,
        email::LogMailSender,
        postgres::{postgres_connection::PgPoolSquad, repositories::users::UserPostgres},
    },
};

pub fn routes(db_pool: Arc<PgPoolSquad>, config: Arc<DotEnvyConfig>) -> Router {
    let user_repository = UserPostgres::new(Arc::clone(&db_pool));
    let mail_sender = LogMailSender::new(config.frontend.url.clone());
    let auth_usecase = AuthUseCase::new(
        Arc::new(user_repository),
        Arc::new(mail_sender),
        config.auth.jwt_secret.clone(),
    );

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/esqueci-senha", post(forgot_password))
        .route("/redefinir-senha", post(reset_password))
        .with_state(Arc::new(auth_usecase))
}

pub async fn register<U, M>(
    State(auth_usecase): State<Arc<AuthUseCase<U, M>>>,
    Json(model): Json<RegisterUserModel>,
) -> Response
where
    U: UserRepository + Send + Sync,
    M: MailSender + Send + Sync,
{
    match auth_usecase.register(model).await {
        Ok(token) => Json(json!({ "token": token })).into_response(),
        Err(err) => map_error("register", err),
    }
}

pub async fn login<U, M>(
    State(auth_usecase): State<Arc<AuthUseCase<U, M>>>,
    Json(model): Json<LoginModel>,
) -> Response
where
    U: UserRepository + Send + Sync,
    M: MailSender + Send + Sync,
{
    match auth_usecase.login(model).await {
        Ok(token) => Json(json!({ "token": token })).into_response(),
        Err(err) => map_error("login", err),
    }
}

pub async fn forgot_password<U, M>(
    State(auth_usecase): State<Arc<AuthUseCase<U, M>>>,
    Json(model): Json<ForgotPasswordModel>,
) -> Response
where
    U: UserRepository + Send + Sync,
    M: MailSender + Send + Sync,
{
    match auth_usecase.forgot_password(&model.email).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => map_error("forgot_password", err),
    }
}

pub async fn reset_password<U, M>(
    State(auth_usecase): State<Arc<AuthUseCase<U, M>>>,
    Json(model): Json<ResetPasswordModel>,
) -> Response
where
    U: UserRepository + Send + Sync,
    M: MailSender + Send + Sync,
{
    match auth_usecase.reset_password(&model.token, &model.senha).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => map_error("reset_password", err),
    }
}

fn map_error(label: &str, err: AuthError) -> Response {
    let status = err.status_code();
    warn!(
        status = status.as_u16(),
        error = %err,
        "auth: {} failed",
        label
    );
    error_response(status, err.to_string())
}
