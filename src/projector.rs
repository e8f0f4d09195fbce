//! Projection of a gateway success payload into a display transaction.
//!
//! Total by design: whatever shape the payload has, a `TransactionRecord`
//! comes out. Gateway-provided fields win; session-known values fill the
//! gaps; a synthetic reference and a projection-time timestamp cover payloads
//! that omit both.

use crate::config::WizardConfig;
use crate::quote::Quote;
use crate::verification::VerificationResult;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Debit,
    Credit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: String,
    pub kind: String,
    pub status: String,
    pub direction: TransactionDirection,
    pub amount: BigDecimal,
    pub currency: String,
    pub reference: String,
    pub created_at: DateTime<Utc>,
    pub counterparty_name: Option<String>,
    pub counterparty_account: Option<String>,
    pub description: Option<String>,
}

/// Session data the projector may fall back on.
pub struct SessionView<'a> {
    pub config: &'a WizardConfig,
    pub fields: &'a BTreeMap<String, String>,
    pub quote: Option<&'a Quote>,
    pub verification: Option<&'a VerificationResult>,
}

pub fn project(payload: &JsonValue, view: &SessionView<'_>) -> TransactionRecord {
    let reference = string_field(payload, &["transactionRef", "reference", "id"])
        .unwrap_or_else(|| format!("vp_{}", Uuid::new_v4().simple()));

    let created_at = string_field(payload, &["createdAt", "timestamp", "created_at"])
        .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let status = string_field(payload, &["status"]).unwrap_or_else(|| "completed".to_string());

    let amount = amount_field(payload, &["amount", "amountCharged"])
        .or_else(|| view.quote.map(|quote| quote.total.clone()))
        .unwrap_or_else(|| BigDecimal::from(0));

    let currency =
        string_field(payload, &["currency"]).unwrap_or_else(|| view.config.currency.clone());

    let counterparty_name = string_field(
        payload,
        &["counterpartyName", "accountName", "customerName", "beneficiaryName"],
    )
    .or_else(|| view.verification.map(|v| v.label.clone()));

    let counterparty_account = string_field(
        payload,
        &["counterpartyAccount", "accountNumber", "recipient"],
    )
    .or_else(|| {
        for name in ["accountNumber", "phone", "smartcardNumber", "meterNumber", "customerId"] {
            if let Some(value) = view.fields.get(name) {
                if !value.is_empty() {
                    return Some(value.clone());
                }
            }
        }
        None
    });

    let description =
        string_field(payload, &["description", "narration", "message"]).or_else(|| {
            Some(format!("{} via ValarPay wallet", view.config.flow.as_str()))
        });

    debug!(
        flow = view.config.flow.as_str(),
        reference = %reference,
        "projected transaction record"
    );

    TransactionRecord {
        id: reference.clone(),
        kind: view.config.flow.as_str().to_string(),
        status,
        direction: if view.config.debits_wallet {
            TransactionDirection::Debit
        } else {
            TransactionDirection::Credit
        },
        amount,
        currency,
        reference,
        created_at,
        counterparty_name,
        counterparty_account,
        description,
    }
}

fn string_field(payload: &JsonValue, names: &[&str]) -> Option<String> {
    for name in names {
        match payload.get(name) {
            Some(JsonValue::String(value)) if !value.is_empty() => return Some(value.clone()),
            Some(JsonValue::Number(value)) => return Some(value.to_string()),
            _ => {}
        }
    }
    None
}

fn amount_field(payload: &JsonValue, names: &[&str]) -> Option<BigDecimal> {
    use std::str::FromStr;
    for name in names {
        let parsed = match payload.get(name) {
            Some(JsonValue::String(value)) => BigDecimal::from_str(value).ok(),
            Some(JsonValue::Number(value)) => BigDecimal::from_str(&value.to_string()).ok(),
            _ => None,
        };
        if parsed.is_some() {
            return parsed;
        }
    }
    None
}
