use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Mercado Pago preapproval status vocabulary.
///
/// `authorized` is the terminal success signal. Some provider responses
/// have been observed reporting `active` for an authorized agreement; it
/// is normalized to `Authorized` here so the rest of the system never
/// branches on raw status strings. Anything outside the known vocabulary
/// parses to `Unknown`, which the state machine treats as a no-op so the
/// provider can evolve its API without breaking us.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AgreementStatus {
    Authorized,
    Pending,
    Paused,
    Cancelled,
    Unknown,
}

impl Display for AgreementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = match self {
            AgreementStatus::Authorized => "authorized",
            AgreementStatus::Pending => "pending",
            AgreementStatus::Paused => "paused",
            AgreementStatus::Cancelled => "cancelled",
            AgreementStatus::Unknown => "unknown",
        };
        write!(f, "{}", status)
    }
}

impl AgreementStatus {
    pub fn from_str(value: &str) -> Self {
        match value {
            "authorized" | "active" => AgreementStatus::Authorized,
            "pending" => AgreementStatus::Pending,
            "paused" => AgreementStatus::Paused,
            "cancelled" => AgreementStatus::Cancelled,
            _ => AgreementStatus::Unknown,
        }
    }
}
