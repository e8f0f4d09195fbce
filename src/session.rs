//! Transient per-modal session state.
//!
//! One `WizardSession` lives exactly as long as its modal: created on open,
//! discarded on close, never persisted. All mutation happens through the
//! state machine, which also owns the request-token staleness guard.

use crate::error::WizardError;
use crate::fields::FieldValue;
use crate::projector::TransactionRecord;
use crate::quote::Quote;
use crate::verification::{VerificationResult, Verifier};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    Details,
    Verifying,
    Confirm,
    Paying,
    Result,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::Details => "details",
            WizardStep::Verifying => "verifying",
            WizardStep::Confirm => "confirm",
            WizardStep::Paying => "paying",
            WizardStep::Result => "result",
        }
    }

    /// Steps with an in-flight gateway call.
    pub fn is_busy(&self) -> bool {
        matches!(self, WizardStep::Verifying | WizardStep::Paying)
    }
}

#[derive(Debug)]
pub struct WizardSession {
    pub id: Uuid,
    pub step: WizardStep,
    pub fields: BTreeMap<String, FieldValue>,
    pub verifier: Verifier,
    pub quote: Option<Quote>,
    pub conversion_rate: Option<BigDecimal>,
    pub last_error: Option<WizardError>,
    pub transaction: Option<TransactionRecord>,
    /// Monotonically increasing token; a response is applied only if the
    /// token it captured is still current.
    pub request_token: u64,
    pub in_flight: bool,
    pub discarded: bool,
}

impl WizardSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            step: WizardStep::Details,
            fields: BTreeMap::new(),
            verifier: Verifier::new(),
            quote: None,
            conversion_rate: None,
            last_error: None,
            transaction: None,
            request_token: 0,
            in_flight: false,
            discarded: false,
        }
    }

    pub fn verification(&self) -> Option<&VerificationResult> {
        self.verifier.last_result()
    }

    /// Bump the token, invalidating any response still in flight.
    pub fn next_token(&mut self) -> u64 {
        self.request_token += 1;
        self.request_token
    }

    pub fn is_current(&self, token: u64) -> bool {
        !self.discarded && self.request_token == token
    }

    /// Reset for a fresh transaction after the result was acknowledged.
    /// Field values and the session id survive the reset the same way the
    /// modal keeps its inputs; errors, quote and verification do not. The
    /// state machine layers its own cleanup on top (PIN wipe, quote
    /// recompute) since only it knows the flow's field roles.
    pub fn reset_for_new_transaction(&mut self) {
        self.step = WizardStep::Details;
        self.quote = None;
        self.last_error = None;
        self.transaction = None;
        self.verifier.reset();
        self.in_flight = false;
    }
}

impl Default for WizardSession {
    fn default() -> Self {
        Self::new()
    }
}
