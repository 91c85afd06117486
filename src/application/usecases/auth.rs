use std::sync::Arc;

use anyhow::{Context, Result as AnyResult, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
    auth,
    domain::{
        entities::users::RegisterUserEntity,
        repositories::users::UserRepository,
        value_objects::{
            enums::subscription_statuses::SubscriptionStatus,
            users::{LoginModel, RegisterUserModel},
        },
    },
};

const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Outbound mail collaborator. Template content and delivery mechanics
/// live behind this seam.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send_password_reset(&self, to: &str, token: &str) -> AnyResult<()>;
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email is already registered")]
    EmailTaken,
    #[error("user not found")]
    UserNotFound,
    #[error("invalid password")]
    InvalidPassword,
    #[error("invalid or expired reset token")]
    InvalidResetToken,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AuthError::EmailTaken => StatusCode::CONFLICT,
            AuthError::UserNotFound => StatusCode::NOT_FOUND,
            AuthError::InvalidPassword => StatusCode::UNAUTHORIZED,
            AuthError::InvalidResetToken => StatusCode::BAD_REQUEST,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

pub struct AuthUseCase<U, M>
where
    U: UserRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    user_repo: Arc<U>,
    mail_sender: Arc<M>,
    jwt_secret: String,
}

impl<U, M> AuthUseCase<U, M>
where
    U: UserRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    pub fn new(user_repo: Arc<U>, mail_sender: Arc<M>, jwt_secret: String) -> Self {
        Self {
            user_repo,
            mail_sender,
            jwt_secret,
        }
    }

    /// `POST /auth/register` — creates the user with a default inactive
    /// subscription record and returns a bearer token.
    pub async fn register(&self, model: RegisterUserModel) -> AuthResult<String> {
        let existing = self
            .user_repo
            .find_by_email(&model.email)
            .await
            .map_err(AuthError::Internal)?;
        if existing.is_some() {
            warn!(email = %model.email, "auth: registration with taken email");
            return Err(AuthError::EmailTaken);
        }

        let senha_hash = hash_password(&model.senha)?;
        let now = Utc::now();
        let user_id = self
            .user_repo
            .register(RegisterUserEntity {
                nome: model.nome,
                email: model.email.clone(),
                senha_hash,
                telefone: model.telefone,
                cpf: model.cpf,
                subscription_status: SubscriptionStatus::Inactive.to_string(),
                created_at: now,
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(email = %model.email, db_error = ?err, "auth: failed to register user");
                AuthError::Internal(err)
            })?;

        info!(%user_id, "auth: user registered");
        Ok(auth::issue_token(user_id, &self.jwt_secret)?)
    }

    /// `POST /auth/login`.
    pub async fn login(&self, model: LoginModel) -> AuthResult<String> {
        let user = self
            .user_repo
            .find_by_email(&model.email)
            .await
            .map_err(AuthError::Internal)?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(&model.senha, &user.senha_hash)?;

        info!(user_id = %user.id, "auth: user logged in");
        Ok(auth::issue_token(user.id, &self.jwt_secret)?)
    }

    /// `POST /auth/esqueci-senha` — always reports success so the
    /// endpoint does not reveal which emails exist. Only the sha256 of
    /// the token is stored.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let user = match self
            .user_repo
            .find_by_email(email)
            .await
            .map_err(AuthError::Internal)?
        {
            Some(user) => user,
            None => {
                info!("auth: reset requested for unknown email");
                return Ok(());
            }
        };

        let mut token_bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut token_bytes);
        let token = hex::encode(token_bytes);
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        self.user_repo
            .set_reset_token(user.id, &hash_reset_token(&token), expires_at)
            .await
            .map_err(|err| {
                error!(user_id = %user.id, db_error = ?err, "auth: failed to store reset token");
                AuthError::Internal(err)
            })?;

        if let Err(err) = self.mail_sender.send_password_reset(&user.email, &token).await {
            warn!(user_id = %user.id, error = ?err, "auth: reset mail delivery failed");
        }

        Ok(())
    }

    /// `POST /auth/redefinir-senha` — the token is single use; it is
    /// cleared on consumption and also when found expired.
    pub async fn reset_password(&self, token: &str, new_senha: &str) -> AuthResult<()> {
        let user = self
            .user_repo
            .find_by_reset_token_hash(&hash_reset_token(token))
            .await
            .map_err(AuthError::Internal)?
            .ok_or(AuthError::InvalidResetToken)?;

        let expired = user
            .reset_token_expires_at
            .map_or(true, |expires_at| expires_at < Utc::now());
        if expired {
            self.user_repo
                .clear_reset_token(user.id)
                .await
                .map_err(AuthError::Internal)?;
            warn!(user_id = %user.id, "auth: expired reset token rejected and cleared");
            return Err(AuthError::InvalidResetToken);
        }

        let senha_hash = hash_password(new_senha)?;
        self.user_repo
            .update_password(user.id, &senha_hash)
            .await
            .map_err(AuthError::Internal)?;
        self.user_repo
            .clear_reset_token(user.id)
            .await
            .map_err(AuthError::Internal)?;

        info!(user_id = %user.id, "auth: password reset");
        Ok(())
    }
}

fn hash_password(senha: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(senha.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

fn verify_password(senha: &str, senha_hash: &str) -> AuthResult<()> {
    let parsed = PasswordHash::new(senha_hash)
        .map_err(|err| anyhow!("stored password hash is invalid: {err}"))
        .context("password verification")?;
    Argon2::default()
        .verify_password(senha.as_bytes(), &parsed)
        .map_err(|_| AuthError::InvalidPassword)
}

fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entities::users::UserEntity, repositories::users::MockUserRepository,
    };
    use mockall::predicate::eq;
    use uuid::Uuid;

    const SECRET: &str = "unit-test-jwt-secret";

    fn user_entity(senha_hash: &str) -> UserEntity {
        UserEntity {
            id: Uuid::nil(),
            nome: "Maria".to_string(),
            email: "maria@example.com".to_string(),
            senha_hash: senha_hash.to_string(),
            telefone: None,
            cpf: None,
            subscription_active: false,
            subscription_status: "inactive".to_string(),
            preapproval_id: None,
            subscription_in_progress: false,
            subscription_created_at: None,
            subscription_updated_at: None,
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn usecase(
        user_repo: MockUserRepository,
        mail_sender: MockMailSender,
    ) -> AuthUseCase<MockUserRepository, MockMailSender> {
        AuthUseCase::new(Arc::new(user_repo), Arc::new(mail_sender), SECRET.to_string())
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let mut user_repo = MockUserRepository::new();
        user_repo
            .expect_find_by_email()
            .with(eq("maria@example.com"))
            .returning(|_| Ok(Some(user_entity("hash"))));

        let usecase = usecase(user_repo, MockMailSender::new());
        let err = usecase
            .register(RegisterUserModel {
                nome: "Maria".to_string(),
                email: "maria@example.com".to_string(),
                senha: "s3nh4-forte".to_string(),
                telefone: None,
                cpf: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::EmailTaken));
    }

    #[tokio::test]
    async fn register_stores_inactive_subscription_and_returns_token() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(|_| Ok(None));
        user_repo
            .expect_register()
            .withf(|entity| {
                entity.subscription_status == "inactive"
                    && entity.senha_hash != "s3nh4-forte"
                    && entity.senha_hash.starts_with("$argon2")
            })
            .times(1)
            .returning(|_| Ok(Uuid::nil()));

        let usecase = usecase(user_repo, MockMailSender::new());
        let token = usecase
            .register(RegisterUserModel {
                nome: "Maria".to_string(),
                email: "maria@example.com".to_string(),
                senha: "s3nh4-forte".to_string(),
                telefone: None,
                cpf: Some("12345678900".to_string()),
            })
            .await
            .unwrap();

        let claims = auth::validate_token(&token, SECRET).unwrap();
        assert_eq!(claims.sub, Uuid::nil().to_string());
    }

    #[tokio::test]
    async fn login_verifies_the_stored_hash() {
        let senha_hash = hash_password("s3nh4-forte").unwrap();
        let mut user_repo = MockUserRepository::new();
        let entity = user_entity(&senha_hash);
        user_repo
            .expect_find_by_email()
            .returning(move |_| Ok(Some(entity.clone())));

        let usecase = usecase(user_repo, MockMailSender::new());
        let token = usecase
            .login(LoginModel {
                email: "maria@example.com".to_string(),
                senha: "s3nh4-forte".to_string(),
            })
            .await
            .unwrap();
        assert!(auth::validate_token(&token, SECRET).is_ok());

        let err = usecase
            .login(LoginModel {
                email: "maria@example.com".to_string(),
                senha: "senha-errada".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword));
    }

    #[tokio::test]
    async fn forgot_password_for_unknown_email_still_succeeds() {
        let mut user_repo = MockUserRepository::new();
        user_repo.expect_find_by_email().returning(|_| Ok(None));

        let usecase = usecase(user_repo, MockMailSender::new());
        usecase.forgot_password("nobody@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn forgot_password_stores_hash_and_mails_plaintext_token() {
        let mut user_repo = MockUserRepository::new();
        let entity = user_entity("hash");
        user_repo
            .expect_find_by_email()
            .returning(move |_| Ok(Some(entity.clone())));
        user_repo
            .expect_set_reset_token()
            .withf(|_, token_hash, expires_at| {
                token_hash.len() == 64 && *expires_at > Utc::now()
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut mail_sender = MockMailSender::new();
        mail_sender
            .expect_send_password_reset()
            .withf(|to, token| to == "maria@example.com" && token.len() == 64)
            .times(1)
            .returning(|_, _| Ok(()));

        let usecase = usecase(user_repo, mail_sender);
        usecase.forgot_password("maria@example.com").await.unwrap();
    }

    #[tokio::test]
    async fn reset_password_with_expired_token_clears_it() {
        let mut user_repo = MockUserRepository::new();
        let mut entity = user_entity("hash");
        entity.reset_token_hash = Some(hash_reset_token("token"));
        entity.reset_token_expires_at = Some(Utc::now() - Duration::minutes(5));
        user_repo
            .expect_find_by_reset_token_hash()
            .returning(move |_| Ok(Some(entity.clone())));
        user_repo
            .expect_clear_reset_token()
            .with(eq(Uuid::nil()))
            .times(1)
            .returning(|_| Ok(()));

        let usecase = usecase(user_repo, MockMailSender::new());
        let err = usecase.reset_password("token", "nova-senha").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidResetToken));
    }

    #[tokio::test]
    async fn reset_password_consumes_the_token() {
        let mut user_repo = MockUserRepository::new();
        let mut entity = user_entity("hash");
        entity.reset_token_hash = Some(hash_reset_token("token"));
        entity.reset_token_expires_at = Some(Utc::now() + Duration::minutes(30));
        let expected_hash = hash_reset_token("token");
        user_repo
            .expect_find_by_reset_token_hash()
            .withf(move |token_hash| token_hash == expected_hash)
            .returning(move |_| Ok(Some(entity.clone())));
        user_repo
            .expect_update_password()
            .withf(|_, senha_hash| senha_hash.starts_with("$argon2"))
            .times(1)
            .returning(|_, _| Ok(()));
        user_repo
            .expect_clear_reset_token()
            .times(1)
            .returning(|_| Ok(()));

        let usecase = usecase(user_repo, MockMailSender::new());
        usecase.reset_password("token", "nova-senha").await.unwrap();
    }
}
