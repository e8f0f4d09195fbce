//! Per-flow wizard configuration.
//!
//! One `WizardConfig` value per ValarPay flow replaces a per-bill-type
//! component tree: the field list, the verification operation (if the flow
//! has one), the execute operation, the fee rule and the currency. Configs
//! are immutable; the session never writes to them.

use crate::fields::{FieldKind, FieldSpec};
use crate::quote::FeeRule;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowKind {
    Airtime,
    DataBundle,
    CableTv,
    Electricity,
    Betting,
    Transport,
    InternationalAirtime,
    BvnVerification,
    BankWithdrawal,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlowKind::Airtime => "airtime",
            FlowKind::DataBundle => "data_bundle",
            FlowKind::CableTv => "cable_tv",
            FlowKind::Electricity => "electricity",
            FlowKind::Betting => "betting",
            FlowKind::Transport => "transport",
            FlowKind::InternationalAirtime => "international_airtime",
            FlowKind::BvnVerification => "bvn_verification",
            FlowKind::BankWithdrawal => "bank_withdrawal",
        }
    }
}

/// Optional remote verification step of a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationSpec {
    /// Gateway operation name, e.g. "resolve_account".
    pub operation: String,
    /// Fields whose normalized values form the request (and the dedup key).
    pub key_fields: Vec<String>,
    /// Whether a successful verification advances straight to confirm.
    /// Some flows show the resolved name and wait for an explicit "Next".
    pub auto_advance: bool,
}

/// Read-only snapshot handed to the wizard when the modal opens. Replaces
/// ambient global stores: the wizard never reaches outside this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowContext {
    pub wallet_balance: BigDecimal,
    pub biometrics_enabled: bool,
}

impl FlowContext {
    pub fn new(wallet_balance: BigDecimal, biometrics_enabled: bool) -> Self {
        Self {
            wallet_balance,
            biometrics_enabled,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardConfig {
    pub flow: FlowKind,
    pub fields: Vec<FieldSpec>,
    pub verification: Option<VerificationSpec>,
    pub execute_operation: String,
    pub fee_rule: FeeRule,
    pub currency: String,
    /// Field the quote derives its base amount from, when the flow has one.
    pub amount_field: Option<String>,
    /// Whether the quote multiplies by a conversion rate supplied at runtime.
    pub uses_conversion_rate: bool,
    /// Whether the quote total must fit within the wallet balance snapshot.
    pub debits_wallet: bool,
}

impl WizardConfig {
    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }
}

// ---------------------------------------------------------------------------
// Flow catalog
// ---------------------------------------------------------------------------

fn flat_fee(value: &str) -> FeeRule {
    FeeRule::Flat(BigDecimal::from_str(value).expect("static fee value"))
}

/// Airtime top-up: phone + amount, network auto-detected, no remote
/// verification step.
pub fn airtime() -> WizardConfig {
    WizardConfig {
        flow: FlowKind::Airtime,
        fields: vec![
            FieldSpec::required("phone", FieldKind::Phone),
            FieldSpec::required("provider", FieldKind::Text),
            FieldSpec::required("amount", FieldKind::Amount { min: None }),
            FieldSpec::required("pin", FieldKind::Pin),
        ],
        verification: None,
        execute_operation: "pay_airtime".to_string(),
        fee_rule: FeeRule::None,
        currency: "NGN".to_string(),
        amount_field: Some("amount".to_string()),
        uses_conversion_rate: false,
        debits_wallet: true,
    }
}

pub fn data_bundle() -> WizardConfig {
    WizardConfig {
        flow: FlowKind::DataBundle,
        fields: vec![
            FieldSpec::required("phone", FieldKind::Phone),
            FieldSpec::required("provider", FieldKind::Text),
            FieldSpec::required("planCode", FieldKind::Text),
            FieldSpec::required("amount", FieldKind::Amount { min: None }),
            FieldSpec::required("pin", FieldKind::Pin),
        ],
        verification: None,
        execute_operation: "pay_data_bundle".to_string(),
        fee_rule: FeeRule::None,
        currency: "NGN".to_string(),
        amount_field: Some("amount".to_string()),
        uses_conversion_rate: false,
        debits_wallet: true,
    }
}

/// Cable TV: smartcard resolves to the subscriber name before payment.
pub fn cable_tv() -> WizardConfig {
    WizardConfig {
        flow: FlowKind::CableTv,
        fields: vec![
            FieldSpec::required("provider", FieldKind::Text),
            FieldSpec::required("smartcardNumber", FieldKind::Text),
            FieldSpec::required("planCode", FieldKind::Text),
            FieldSpec::required("amount", FieldKind::Amount { min: None }),
            FieldSpec::required("pin", FieldKind::Pin),
        ],
        verification: Some(VerificationSpec {
            operation: "resolve_smartcard".to_string(),
            key_fields: vec!["provider".to_string(), "smartcardNumber".to_string()],
            auto_advance: true,
        }),
        execute_operation: "pay_cable_tv".to_string(),
        fee_rule: flat_fee("100"),
        currency: "NGN".to_string(),
        amount_field: Some("amount".to_string()),
        uses_conversion_rate: false,
        debits_wallet: true,
    }
}

/// Electricity: meter number resolves to the customer name; token comes back
/// in the execute payload for prepaid meters.
pub fn electricity() -> WizardConfig {
    WizardConfig {
        flow: FlowKind::Electricity,
        fields: vec![
            FieldSpec::required("provider", FieldKind::Text),
            FieldSpec::required("meterNumber", FieldKind::Text),
            FieldSpec::required("meterType", FieldKind::Text),
            FieldSpec::required("amount", FieldKind::Amount { min: None }),
            FieldSpec::required("pin", FieldKind::Pin),
        ],
        verification: Some(VerificationSpec {
            operation: "resolve_meter".to_string(),
            key_fields: vec![
                "provider".to_string(),
                "meterNumber".to_string(),
                "meterType".to_string(),
            ],
            auto_advance: true,
        }),
        execute_operation: "pay_electricity".to_string(),
        fee_rule: flat_fee("100"),
        currency: "NGN".to_string(),
        amount_field: Some("amount".to_string()),
        uses_conversion_rate: false,
        debits_wallet: true,
    }
}

/// Betting wallet funding: 100 NGN minimum stake, customer id resolves to
/// the bettor's name.
pub fn betting() -> WizardConfig {
    WizardConfig {
        flow: FlowKind::Betting,
        fields: vec![
            FieldSpec::required("provider", FieldKind::Text),
            FieldSpec::required("customerId", FieldKind::Text),
            FieldSpec::required(
                "amount",
                FieldKind::Amount {
                    min: Some(BigDecimal::from(100)),
                },
            ),
            FieldSpec::required("pin", FieldKind::Pin),
        ],
        verification: Some(VerificationSpec {
            operation: "resolve_betting_customer".to_string(),
            key_fields: vec!["provider".to_string(), "customerId".to_string()],
            auto_advance: false,
        }),
        execute_operation: "fund_betting_wallet".to_string(),
        fee_rule: FeeRule::None,
        currency: "NGN".to_string(),
        amount_field: Some("amount".to_string()),
        uses_conversion_rate: false,
        debits_wallet: true,
    }
}

pub fn transport() -> WizardConfig {
    WizardConfig {
        flow: FlowKind::Transport,
        fields: vec![
            FieldSpec::required("provider", FieldKind::Text),
            FieldSpec::required("ticketCode", FieldKind::Text),
            FieldSpec::required("amount", FieldKind::Amount { min: None }),
            FieldSpec::required("pin", FieldKind::Pin),
        ],
        verification: None,
        execute_operation: "pay_transport".to_string(),
        fee_rule: FeeRule::None,
        currency: "NGN".to_string(),
        amount_field: Some("amount".to_string()),
        uses_conversion_rate: false,
        debits_wallet: true,
    }
}

/// International airtime: amount entered in the foreign currency, total
/// charged in NGN at the runtime-supplied rate.
pub fn international_airtime() -> WizardConfig {
    WizardConfig {
        flow: FlowKind::InternationalAirtime,
        fields: vec![
            FieldSpec::required("phone", FieldKind::Text),
            FieldSpec::required("country", FieldKind::Text),
            FieldSpec::required("provider", FieldKind::Text),
            FieldSpec::required("amount", FieldKind::Amount { min: None }),
            FieldSpec::required("pin", FieldKind::Pin),
        ],
        verification: None,
        execute_operation: "pay_international_airtime".to_string(),
        fee_rule: FeeRule::None,
        currency: "NGN".to_string(),
        amount_field: Some("amount".to_string()),
        uses_conversion_rate: true,
        debits_wallet: true,
    }
}

/// BVN verification: no debit, no quote; the selfie capture arrives as an
/// opaque payload from the device collaborator.
pub fn bvn_verification() -> WizardConfig {
    WizardConfig {
        flow: FlowKind::BvnVerification,
        fields: vec![
            FieldSpec::required("bvn", FieldKind::Bvn),
            FieldSpec::required("selfie", FieldKind::Opaque),
            FieldSpec::required("pin", FieldKind::Pin),
        ],
        verification: Some(VerificationSpec {
            operation: "resolve_bvn".to_string(),
            key_fields: vec!["bvn".to_string()],
            auto_advance: false,
        }),
        execute_operation: "submit_bvn_verification".to_string(),
        fee_rule: FeeRule::None,
        currency: "NGN".to_string(),
        amount_field: None,
        uses_conversion_rate: false,
        debits_wallet: false,
    }
}

/// Wallet withdrawal to a bank account: NUBAN-checked locally, then the
/// account name is resolved before confirm.
pub fn bank_withdrawal() -> WizardConfig {
    WizardConfig {
        flow: FlowKind::BankWithdrawal,
        fields: vec![
            FieldSpec::required("bankCode", FieldKind::Text),
            FieldSpec::required("accountNumber", FieldKind::BankAccount),
            FieldSpec::required("amount", FieldKind::Amount { min: None }),
            FieldSpec::optional("narration", FieldKind::Text),
            FieldSpec::required("pin", FieldKind::Pin),
        ],
        verification: Some(VerificationSpec {
            operation: "resolve_account".to_string(),
            key_fields: vec!["bankCode".to_string(), "accountNumber".to_string()],
            auto_advance: false,
        }),
        execute_operation: "withdraw_to_bank".to_string(),
        fee_rule: flat_fee("25"),
        currency: "NGN".to_string(),
        amount_field: Some("amount".to_string()),
        uses_conversion_rate: false,
        debits_wallet: true,
    }
}
