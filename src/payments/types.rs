//! Wire types for the Viva Wallet REST surface and its webhook notifications.
//!
//! Viva serialises identifiers and codes inconsistently (numbers in some
//! payloads, strings in others), so every inbound field goes through the
//! lenient helpers below. Webhook bodies are attacker-controlled: a field of an
//! unexpected shape decodes as absent instead of failing the whole payload.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::str::FromStr;

pub const IPN_CODE_TRANSACTION_CREATED: i64 = 1796;
pub const IPN_CODE_TRANSACTION_REVERSED: i64 = 1797;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    TransactionCreated,
    TransactionReversed,
    Other(i64),
}

impl EventKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            IPN_CODE_TRANSACTION_CREATED => EventKind::TransactionCreated,
            IPN_CODE_TRANSACTION_REVERSED => EventKind::TransactionReversed,
            other => EventKind::Other(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            EventKind::TransactionCreated => IPN_CODE_TRANSACTION_CREATED,
            EventKind::TransactionReversed => IPN_CODE_TRANSACTION_REVERSED,
            EventKind::Other(code) => *code,
        }
    }
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct CreateOrderRequest {
    pub email: String,
    pub full_name: String,
    pub request_lang: String,
    pub phone: String,
    pub merchant_trns: String,
    pub customer_trns: String,
    /// Minor units, integer string.
    pub amount: String,
    pub source_code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateOrderResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub error_code: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RemoteTransaction {
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Option<Decimal>,
}

/// Envelope of `GET /api/transactions/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionsResponse {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub error_code: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error_text: Option<String>,
    #[serde(default)]
    pub transactions: Option<Vec<RemoteTransaction>>,
}

/// Envelope of `DELETE /api/transactions/{id}?Amount=`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RefundResponse {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub error_code: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status_id: Option<String>,
}

/// Response of `GET /api/messages/config/token`.
///
/// `raw` is kept verbatim because the webhook verification handshake echoes
/// it back to Viva unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigToken {
    pub raw: String,
    pub key: Option<String>,
}

impl ConfigToken {
    pub fn from_raw(raw: String) -> Self {
        #[derive(Deserialize)]
        struct KeyEnvelope {
            #[serde(rename = "Key", default, deserialize_with = "lenient_string")]
            key: Option<String>,
        }

        let key = serde_json::from_str::<KeyEnvelope>(&raw)
            .ok()
            .and_then(|envelope| envelope.key)
            .filter(|key| !key.is_empty());
        Self { raw, key }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventData {
    #[serde(default, deserialize_with = "lenient_string")]
    pub merchant_trns: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub order_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub transaction_type_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub amount: Option<Decimal>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NotificationEvent {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub event_type_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_event_data")]
    pub event_data: EventData,
}

impl NotificationEvent {
    pub fn kind(&self) -> Option<EventKind> {
        self.event_type_id.map(EventKind::from_code)
    }
}

/// Normalise a scalar JSON value to a non-empty string.
pub fn json_scalar_to_string(value: &JsonValue) -> Option<String> {
    match value {
        JsonValue::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse a JSON number or numeric string into an exact decimal.
///
/// Numbers go through their textual form so `-19.99` stays `-19.99` instead of
/// picking up binary floating point noise.
pub fn json_to_decimal(value: &JsonValue) -> Option<Decimal> {
    let text = json_scalar_to_string(value)?;
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(json_scalar_to_string))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(|v| match v {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }))
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(json_to_decimal))
}

fn lenient_event_data<'de, D>(deserializer: D) -> Result<EventData, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value::<EventData>(v).ok())
        .unwrap_or_default())
}
