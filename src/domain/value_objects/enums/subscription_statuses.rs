use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Coarse subscription lifecycle stage stored on the user record.
/// This is the source of truth for business logic; the provider's
/// agreement vocabulary is mapped onto it by the state machine.
#[derive(Default, Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Inactive,
    Pending,
    Active,
}

impl Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
        };
        write!(f, "{}", status)
    }
}

impl SubscriptionStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "inactive" => SubscriptionStatus::Inactive,
            "pending" => SubscriptionStatus::Pending,
            "active" => SubscriptionStatus::Active,
            _ => SubscriptionStatus::Inactive,
        }
    }
}
