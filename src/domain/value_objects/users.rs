use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::enums::subscription_statuses::SubscriptionStatus;

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterUserModel {
    pub nome: String,
    pub email: String,
    pub senha: String,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginModel {
    pub email: String,
    pub senha: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForgotPasswordModel {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetPasswordModel {
    pub token: String,
    pub senha: String,
}

/// Profile payload returned by `GET /user/perfil`. Never carries the
/// password hash.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserProfileDto {
    pub id: Uuid,
    pub nome: String,
    pub email: String,
    pub telefone: Option<String>,
    pub cpf: Option<String>,
    pub assinatura: bool,
    pub assinatura_status: SubscriptionStatus,
    pub assinatura_criada_em: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SubscriptionCheckDto {
    pub assinatura: bool,
    pub status: SubscriptionStatus,
}
