//! Verification support: the last-verified-key cache and the local
//! Nigerian-domain pre-checks (NUBAN check digits, phone format, network
//! detection). Re-verifying identical input is served from the cached
//! result, never a second network call.

use crate::error::GatewayError;
use crate::gateway::GatewayResult;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    pub label: String,
    pub raw: JsonValue,
}

/// Last-verified-key cache, one per session. The state machine runs the
/// precheck and the gateway call itself (with the session lock released)
/// and records the outcome here; a failure clears the key so a retry goes
/// back to the network.
#[derive(Debug, Default)]
pub struct Verifier {
    last_key: Option<String>,
    last_result: Option<VerificationResult>,
}

impl Verifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached result for a dedup key, if the last successful verification
    /// used exactly this key.
    pub fn cached(&self, key: &str) -> Option<VerificationResult> {
        if self.last_key.as_deref() == Some(key) {
            self.last_result.clone()
        } else {
            None
        }
    }

    pub fn store(&mut self, key: String, result: VerificationResult) {
        self.last_key = Some(key);
        self.last_result = Some(result);
    }

    /// A failed attempt clears the cache so a retry re-verifies.
    pub fn fail(&mut self) {
        self.reset();
    }

    pub fn last_result(&self) -> Option<&VerificationResult> {
        self.last_result.as_ref()
    }

    /// Drop the cached result, e.g. when a key field changes.
    pub fn reset(&mut self) {
        self.last_key = None;
        self.last_result = None;
    }
}

pub fn dedup_key(operation: &str, fields: &BTreeMap<String, String>) -> String {
    // BTreeMap iteration order makes the key canonical.
    let mut key = operation.to_string();
    for (name, value) in fields {
        key.push('|');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

/// Local checks before any network round trip, the same ones the platform's
/// bill processor runs server-side: NUBAN check digits for bank accounts and
/// the Nigerian phone format.
pub fn precheck(fields: &BTreeMap<String, String>) -> GatewayResult<()> {
    if let (Some(account), Some(bank_code)) = (fields.get("accountNumber"), fields.get("bankCode"))
    {
        if account.len() == 10
            && bank_code.len() == 3
            && bank_code.chars().all(|c| c.is_ascii_digit())
            && nuban::Nuban::new(bank_code, account).is_err()
        {
            return Err(GatewayError::single("Invalid NUBAN account number"));
        }
    }

    if let Some(phone) = fields.get("phone") {
        if !is_valid_nigerian_phone(phone) {
            return Err(GatewayError::single(
                "Invalid Nigerian phone format. Expected 080XXXXXXXX or 07XXXXXXXXX",
            ));
        }
    }

    Ok(())
}

pub fn is_valid_nigerian_phone(phone: &str) -> bool {
    let phone = phone.replace(' ', "").replace('-', "");
    if phone.len() == 11 {
        phone.starts_with('0') && phone.chars().all(char::is_numeric)
    } else if phone.len() == 13 && phone.starts_with("234") {
        phone.chars().all(char::is_numeric)
    } else {
        phone.len() == 10 && phone.chars().all(char::is_numeric)
    }
}

/// Detect the mobile network from a phone number prefix.
pub fn detect_network(phone: &str) -> &'static str {
    let phone = phone.trim();
    let phone = if let Some(rest) = phone.strip_prefix("+234") {
        rest
    } else if let Some(rest) = phone.strip_prefix("234") {
        rest
    } else if let Some(rest) = phone.strip_prefix('0') {
        rest
    } else {
        phone
    };

    let first_digits = phone.chars().take(2).collect::<String>();
    match first_digits.as_str() {
        "80" | "81" | "90" | "91" => "MTN",
        "70" | "71" => "Airtel",
        "76" | "77" => "Glo",
        "89" => "9Mobile",
        "75" => "Smile",
        "78" => "Spectranet",
        _ => "Unknown",
    }
}
