use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use crate::{
    application::usecases::subscriptions::BillingGateway,
    config::config_model::MercadoPago,
    domain::value_objects::{
        enums::agreement_statuses::AgreementStatus, subscriptions::CreatedAgreement,
    },
};

const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Minimal Mercado Pago preapproval client built on reqwest.
pub struct MercadoPagoClient {
    http: reqwest::Client,
    access_token: String,
    base_url: String,
    reason: String,
    amount: f64,
    currency: String,
    frontend_url: String,
}

#[derive(Debug, Deserialize)]
struct PreapprovalResponse {
    id: String,
    status: Option<String>,
    init_point: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PreapprovalStatusResponse {
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MercadoPagoErrorEnvelope {
    message: Option<String>,
    error: Option<String>,
    status: Option<i64>,
}

impl MercadoPagoClient {
    pub fn new(config: MercadoPago, frontend_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("reqwest client must build");

        Self {
            http,
            access_token: config.access_token,
            base_url: config.base_url,
            reason: config.reason,
            amount: config.amount,
            currency: config.currency,
            frontend_url,
        }
    }

    async fn ensure_success(resp: reqwest::Response, context: &str) -> Result<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let request_id = resp
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        let (mp_error, mp_message, mp_status) =
            match serde_json::from_str::<MercadoPagoErrorEnvelope>(&body) {
                Ok(envelope) => (envelope.error, envelope.message, envelope.status),
                Err(_) => (None, None, None),
            };

        error!(
            status = %status,
            mp_request_id = ?request_id,
            mp_error = ?mp_error,
            mp_message = ?mp_message,
            mp_status = ?mp_status,
            response_body = %body,
            context = %context,
            "mercado pago api request failed"
        );

        anyhow::bail!(
            "Mercado Pago API request failed: {} (status {}, request_id={:?})",
            context,
            status,
            request_id
        );
    }

    /// Creates a monthly recurring preapproval and returns the agreement
    /// with its checkout URL.
    /// https://www.mercadopago.com.br/developers/en/reference/subscriptions/_preapproval/post
    pub async fn create_preapproval(
        &self,
        payer_email: &str,
        external_reference: &str,
    ) -> Result<CreatedAgreement> {
        let body = json!({
            "reason": self.reason,
            "payer_email": payer_email,
            "auto_recurring": {
                "frequency": 1,
                "frequency_type": "months",
                "transaction_amount": self.amount,
                "currency_id": self.currency,
            },
            "back_urls": {
                "success": format!("{}/sucesso", self.frontend_url),
                "failure": format!("{}/erro", self.frontend_url),
                "pending": format!("{}/pendente", self.frontend_url),
            },
            "external_reference": external_reference,
        });

        let resp = self
            .http
            .post(format!("{}/preapproval", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .json(&body)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create preapproval").await?;

        let parsed: PreapprovalResponse = resp.json().await?;
        let init_point = parsed
            .init_point
            .ok_or_else(|| anyhow::anyhow!("Mercado Pago init_point is missing"))?;

        Ok(CreatedAgreement {
            id: parsed.id,
            status: parse_status(parsed.status.as_deref()),
            init_point,
        })
    }

    /// https://www.mercadopago.com.br/developers/en/reference/subscriptions/_preapproval_id/get
    pub async fn get_preapproval_status(&self, preapproval_id: &str) -> Result<AgreementStatus> {
        let resp = self
            .http
            .get(format!("{}/preapproval/{}", self.base_url, preapproval_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "get preapproval").await?;

        let parsed: PreapprovalStatusResponse = resp.json().await?;
        Ok(parse_status(parsed.status.as_deref()))
    }

    /// https://www.mercadopago.com.br/developers/en/reference/subscriptions/_preapproval_id/put
    pub async fn cancel_preapproval(&self, preapproval_id: &str) -> Result<()> {
        let resp = self
            .http
            .put(format!("{}/preapproval/{}", self.base_url, preapproval_id))
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token))
            .json(&json!({ "status": "cancelled" }))
            .send()
            .await?;
        Self::ensure_success(resp, "cancel preapproval").await?;

        Ok(())
    }
}

fn parse_status(status: Option<&str>) -> AgreementStatus {
    status
        .map(AgreementStatus::from_str)
        .unwrap_or(AgreementStatus::Unknown)
}

#[async_trait]
impl BillingGateway for MercadoPagoClient {
    async fn create_preapproval(
        &self,
        payer_email: &str,
        external_reference: &str,
    ) -> Result<CreatedAgreement> {
        self.create_preapproval(payer_email, external_reference).await
    }

    async fn get_preapproval_status(&self, preapproval_id: &str) -> Result<AgreementStatus> {
        self.get_preapproval_status(preapproval_id).await
    }

    async fn cancel_preapproval(&self, preapproval_id: &str) -> Result<()> {
        self.cancel_preapproval(preapproval_id).await
    }
}
