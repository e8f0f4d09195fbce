//! Field normalization and validation.
//!
//! Pure and total: any input string, including empty or garbage, yields a
//! normalized value and a validity flag. Nothing here panics or touches the
//! network; invalid input simply leaves dependent transitions disabled.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Static rule attached to a field in a `WizardConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Nigerian phone number, 10-11 digits after normalization.
    Phone,
    /// NUBAN bank account number, exactly 10 digits.
    BankAccount,
    /// Wallet PIN, exactly 4 digits.
    Pin,
    /// Bank Verification Number, exactly 11 digits.
    Bvn,
    /// Positive decimal amount, with an optional minimum in the flow's
    /// currency (e.g. a 100 NGN floor for bets).
    Amount { min: Option<BigDecimal> },
    /// Opaque payload handed to the wizard by a device collaborator
    /// (selfie capture). Required to be non-empty, otherwise unchecked.
    Opaque,
    /// Free-form selection (provider code, plan code). Non-empty.
    Text,
}

impl FieldKind {
    /// Human-readable rule, used when an invalid field is reported.
    pub fn requirement(&self) -> String {
        match self {
            FieldKind::Phone => "must be a 10-11 digit Nigerian phone number".to_string(),
            FieldKind::BankAccount => "must be a 10 digit account number".to_string(),
            FieldKind::Pin => "must be a 4 digit PIN".to_string(),
            FieldKind::Bvn => "must be an 11 digit BVN".to_string(),
            FieldKind::Amount { min } => match min {
                Some(floor) => format!("must be an amount of at least {floor}"),
                None => "must be a positive amount".to_string(),
            },
            FieldKind::Opaque | FieldKind::Text => "must not be empty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
        }
    }

    pub fn optional(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
        }
    }
}

/// A field's current value inside a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldValue {
    pub raw: String,
    pub normalized: String,
    pub valid: bool,
}

impl FieldValue {
    pub fn new(kind: &FieldKind, raw: &str) -> Self {
        let normalized = normalize(kind, raw);
        let valid = validate(kind, &normalized);
        Self {
            raw: raw.to_string(),
            normalized,
            valid,
        }
    }

    pub fn empty() -> Self {
        Self {
            raw: String::new(),
            normalized: String::new(),
            valid: false,
        }
    }
}

/// Normalize raw input for a field kind. Digit-bearing kinds are reduced to
/// their digits (spaces, dashes and a leading +234 on phones are tolerated);
/// amounts and text are trimmed.
pub fn normalize(kind: &FieldKind, raw: &str) -> String {
    match kind {
        FieldKind::Phone => {
            let digits = digits_only(raw);
            // Accept the international form and fold it back to local.
            if digits.len() == 13 && digits.starts_with("234") {
                format!("0{}", &digits[3..])
            } else {
                digits
            }
        }
        FieldKind::BankAccount | FieldKind::Pin | FieldKind::Bvn => digits_only(raw),
        FieldKind::Amount { .. } => raw.trim().to_string(),
        FieldKind::Opaque | FieldKind::Text => raw.trim().to_string(),
    }
}

/// Validate a normalized value against its kind's static rule.
pub fn validate(kind: &FieldKind, normalized: &str) -> bool {
    match kind {
        FieldKind::Phone => {
            (normalized.len() == 10 || normalized.len() == 11)
                && normalized.chars().all(|c| c.is_ascii_digit())
        }
        FieldKind::BankAccount => {
            normalized.len() == 10 && normalized.chars().all(|c| c.is_ascii_digit())
        }
        FieldKind::Pin => normalized.len() == 4 && normalized.chars().all(|c| c.is_ascii_digit()),
        FieldKind::Bvn => normalized.len() == 11 && normalized.chars().all(|c| c.is_ascii_digit()),
        FieldKind::Amount { min } => match BigDecimal::from_str(normalized) {
            Ok(amount) => {
                if amount <= BigDecimal::from(0) {
                    return false;
                }
                match min {
                    Some(floor) => amount >= *floor,
                    None => true,
                }
            }
            Err(_) => false,
        },
        FieldKind::Opaque | FieldKind::Text => !normalized.is_empty(),
    }
}

fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
