use serde::Deserialize;
use serde_json::Value;

/// Inbound Mercado Pago webhook notification.
///
/// The provider sends `{type, data: {id}}` for preapproval events, but
/// older notification formats carry the id at the top level, sometimes as
/// a number. Only the id is trusted; the agreement status is always
/// fetched from the provider before any transition is applied.
#[derive(Debug, Clone, Deserialize)]
pub struct MercadoPagoWebhook {
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub data: Option<MercadoPagoWebhookData>,
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MercadoPagoWebhookData {
    pub id: Option<Value>,
}

impl MercadoPagoWebhook {
    /// Agreement id carried by the notification, if any.
    pub fn preapproval_id(&self) -> Option<String> {
        self.data
            .as_ref()
            .and_then(|data| data.id.as_ref())
            .or(self.id.as_ref())
            .and_then(value_to_id)
    }
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_nested_data_id() {
        let webhook: MercadoPagoWebhook = serde_json::from_str(
            r#"{"type":"subscription_preapproval","data":{"id":"mp-123"},"id":999}"#,
        )
        .unwrap();
        assert_eq!(webhook.preapproval_id().as_deref(), Some("mp-123"));
    }

    #[test]
    fn falls_back_to_top_level_numeric_id() {
        let webhook: MercadoPagoWebhook =
            serde_json::from_str(r#"{"type":"payment","id":12345}"#).unwrap();
        assert_eq!(webhook.preapproval_id().as_deref(), Some("12345"));
    }

    #[test]
    fn missing_id_yields_none() {
        let webhook: MercadoPagoWebhook = serde_json::from_str(r#"{"type":"payment"}"#).unwrap();
        assert_eq!(webhook.preapproval_id(), None);
    }
}
