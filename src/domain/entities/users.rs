use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        enums::subscription_statuses::SubscriptionStatus, subscriptions::SubscriptionRecord,
        users::UserProfileDto,
    },
    infrastructure::postgres::schema::users,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserEntity {
    pub id: Uuid,
    pub nome: String,
    pub email: String,
    pub senha_hash: String,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
    pub subscription_active: bool,
    pub subscription_status: String,
    pub preapproval_id: Option<String>,
    pub subscription_in_progress: bool,
    pub subscription_created_at: Option<DateTime<Utc>>,
    pub subscription_updated_at: Option<DateTime<Utc>>,
    pub reset_token_hash: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct RegisterUserEntity {
    pub nome: String,
    pub email: String,
    pub senha_hash: String,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
    pub subscription_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserEntity {
    /// Subscription fields of this row as the in-memory record the state
    /// machine operates on.
    pub fn subscription_record(&self) -> SubscriptionRecord {
        SubscriptionRecord {
            active: self.subscription_active,
            status: SubscriptionStatus::from_str(&self.subscription_status),
            preapproval_id: self.preapproval_id.clone(),
            in_progress: self.subscription_in_progress,
            created_at: self.subscription_created_at,
            updated_at: self.subscription_updated_at,
        }
    }

    /// Profile DTO with subscription fields taken from `record`, so the
    /// caller can surface a freshly reconciled record instead of the one
    /// this row was loaded with.
    pub fn to_profile(&self, record: &SubscriptionRecord) -> UserProfileDto {
        UserProfileDto {
            id: self.id,
            nome: self.nome.clone(),
            email: self.email.clone(),
            telefone: self.telefone.clone(),
            cpf: self.cpf.clone(),
            assinatura: record.active,
            assinatura_status: record.status,
            assinatura_criada_em: record.created_at,
        }
    }
}
