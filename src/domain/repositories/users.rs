use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::entities::users::{RegisterUserEntity, UserEntity};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn register(&self, register_user_entity: RegisterUserEntity) -> Result<Uuid>;
    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>>;
    async fn update_password(&self, user_id: Uuid, senha_hash: &str) -> Result<()>;
    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()>;
    async fn find_by_reset_token_hash(&self, token_hash: &str) -> Result<Option<UserEntity>>;
    async fn clear_reset_token(&self, user_id: Uuid) -> Result<()>;
}
