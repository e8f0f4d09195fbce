//! The wizard state machine.
//!
//! Orchestrates `Details -> (Verifying) -> Confirm -> Paying -> Result` for
//! one open modal. Guards are checked under the session lock; gateway calls
//! run with the lock released so a discard can race them; results are
//! applied only if the request token they captured is still current.
//!
//! A submit whose guard fails is a no-op: state unchanged, no network call,
//! no stored error. Remote failures land in `last_error` and return control
//! to the editable step.

use crate::config::{FlowContext, WizardConfig};
use crate::error::WizardError;
use crate::fields::{FieldKind, FieldValue};
use crate::gateway::{ExecuteRequest, PaymentGateway, VerifyRequest};
use crate::projector::{self, SessionView, TransactionRecord};
use crate::quote::{compute_quote, Quote};
use crate::session::{WizardSession, WizardStep};
use crate::verification::{self, VerificationResult};
use bigdecimal::{BigDecimal, Zero};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of a submit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The transition fired; the session now sits at the carried step.
    Advanced(WizardStep),
    /// The gateway declined; the session is back at the carried editable
    /// step with `last_error` set.
    Failed(WizardStep),
    /// Guard not satisfied, a call already in flight, or the response was
    /// stale. Nothing changed, nothing was sent.
    Blocked,
}

pub struct WizardStateMachine {
    config: WizardConfig,
    context: FlowContext,
    gateway: Arc<dyn PaymentGateway>,
    session: Mutex<WizardSession>,
}

impl WizardStateMachine {
    pub fn new(config: WizardConfig, context: FlowContext, gateway: Arc<dyn PaymentGateway>) -> Self {
        let mut session = WizardSession::new();
        for spec in &config.fields {
            session.fields.insert(spec.name.clone(), FieldValue::empty());
        }
        info!(flow = config.flow.as_str(), session_id = %session.id, "wizard session opened");
        Self {
            config,
            context,
            gateway,
            session: Mutex::new(session),
        }
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Set a field from raw user input. Editable on `Details`; on `Confirm`
    /// only the PIN field accepts input. Ignored while a call is in flight
    /// and after the session reached `Result` or was discarded.
    pub async fn set_field(&self, name: &str, raw: &str) {
        let mut session = self.session.lock().await;
        if session.discarded || session.in_flight {
            return;
        }
        let editable = match session.step {
            WizardStep::Details => true,
            WizardStep::Confirm => self.is_pin_field(name),
            _ => false,
        };
        if !editable {
            return;
        }
        let Some(spec) = self.config.field_spec(name) else {
            debug!(flow = self.config.flow.as_str(), field = name, "ignoring unknown field");
            return;
        };

        let value = FieldValue::new(&spec.kind, raw);
        let key_field_changed = self.is_verification_key_field(name)
            && session.fields.get(name).map(|old| old.normalized.as_str())
                != Some(value.normalized.as_str());
        session.fields.insert(name.to_string(), value);

        if key_field_changed {
            session.verifier.reset();
        }

        self.apply_network_rule(&mut session, name);
        self.recompute_quote(&mut session);
    }

    /// Supply the conversion rate for flows that charge in NGN against a
    /// foreign-currency amount. Triggers a quote recompute like any input,
    /// and follows the same editability rule: once the session left
    /// `Details` the quoted total is frozen, so later rate ticks are
    /// ignored rather than repricing a payment in flight.
    pub async fn set_conversion_rate(&self, rate: BigDecimal) {
        let mut session = self.session.lock().await;
        if session.discarded || session.in_flight || session.step != WizardStep::Details {
            return;
        }
        session.conversion_rate = Some(rate);
        self.recompute_quote(&mut session);
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Submit from `Details`. Runs the flow's verification step when one is
    /// configured, otherwise advances straight to `Confirm`.
    pub async fn submit_details(&self) -> SubmitOutcome {
        let (token, request) = {
            let mut session = self.session.lock().await;
            if session.discarded
                || session.in_flight
                || session.step != WizardStep::Details
                || !self.details_guard(&session)
            {
                return SubmitOutcome::Blocked;
            }

            let Some(spec) = self.config.verification.clone() else {
                session.step = WizardStep::Confirm;
                session.last_error = None;
                return SubmitOutcome::Advanced(WizardStep::Confirm);
            };

            let fields = self.verification_fields(&session, &spec.key_fields);
            let key = verification::dedup_key(&spec.operation, &fields);
            if session.verifier.cached(&key).is_some() {
                // Identical input already verified; no second network call.
                debug!(flow = self.config.flow.as_str(), "re-verification skipped");
                session.step = WizardStep::Confirm;
                session.last_error = None;
                return SubmitOutcome::Advanced(WizardStep::Confirm);
            }

            if let Err(err) = verification::precheck(&fields) {
                session.verifier.fail();
                session.last_error = Some(WizardError::Verification {
                    messages: err.messages,
                });
                return SubmitOutcome::Failed(WizardStep::Details);
            }

            session.step = WizardStep::Verifying;
            session.in_flight = true;
            session.last_error = None;
            let token = session.next_token();
            (
                token,
                VerifyRequest {
                    operation: spec.operation.clone(),
                    fields,
                },
            )
        };

        let key = verification::dedup_key(&request.operation, &request.fields);
        let response = self.gateway.verify(request).await;

        let mut session = self.session.lock().await;
        if !session.is_current(token) {
            let dropped = WizardError::Stale { token };
            debug!(error = %dropped, "dropping verification response");
            return SubmitOutcome::Blocked;
        }
        session.in_flight = false;

        match response {
            Ok(resolved) => {
                info!(flow = self.config.flow.as_str(), label = %resolved.label, "verification succeeded");
                session.verifier.store(
                    key,
                    VerificationResult {
                        label: resolved.label,
                        raw: resolved.raw,
                    },
                );
                let auto_advance = self
                    .config
                    .verification
                    .as_ref()
                    .map(|spec| spec.auto_advance)
                    .unwrap_or(true);
                session.step = if auto_advance {
                    WizardStep::Confirm
                } else {
                    // Resolved label is shown on the details step; an
                    // explicit submit (served from cache) moves on.
                    WizardStep::Details
                };
                SubmitOutcome::Advanced(session.step)
            }
            Err(err) => {
                warn!(flow = self.config.flow.as_str(), error = %err, "verification failed");
                session.verifier.fail();
                session.step = WizardStep::Details;
                session.last_error = Some(WizardError::Verification {
                    messages: err.messages,
                });
                SubmitOutcome::Failed(WizardStep::Details)
            }
        }
    }

    /// Submit from `Confirm` with the entered PIN. On gateway success the
    /// session reaches `Result` carrying a projected `TransactionRecord`;
    /// on failure it returns to `Confirm` with the PIN cleared.
    pub async fn submit_confirm(&self) -> SubmitOutcome {
        let (token, request) = {
            let mut session = self.session.lock().await;
            if session.discarded
                || session.in_flight
                || session.step != WizardStep::Confirm
                || !self.confirm_guard(&session)
            {
                return SubmitOutcome::Blocked;
            }

            session.step = WizardStep::Paying;
            session.in_flight = true;
            session.last_error = None;
            let token = session.next_token();
            (token, self.execute_request(&session))
        };

        let response = self.gateway.execute(request).await;

        let mut session = self.session.lock().await;
        if !session.is_current(token) {
            let dropped = WizardError::Stale { token };
            debug!(error = %dropped, "dropping payment response");
            return SubmitOutcome::Blocked;
        }
        session.in_flight = false;

        match response {
            Ok(executed) => {
                let record = {
                    let fields = normalized_fields(&session);
                    let view = SessionView {
                        config: &self.config,
                        fields: &fields,
                        quote: session.quote.as_ref(),
                        verification: session.verification(),
                    };
                    projector::project(&executed.payload, &view)
                };
                info!(
                    flow = self.config.flow.as_str(),
                    reference = %record.reference,
                    "payment succeeded"
                );
                session.transaction = Some(record);
                session.step = WizardStep::Result;
                SubmitOutcome::Advanced(WizardStep::Result)
            }
            Err(err) => {
                warn!(flow = self.config.flow.as_str(), error = %err, "payment failed");
                session.step = WizardStep::Confirm;
                session.last_error = Some(WizardError::Payment {
                    messages: err.messages,
                });
                // Clear-on-failure: a declined payment forces PIN re-entry.
                if let Some(pin_name) = self.pin_field_name() {
                    session.fields.insert(pin_name, FieldValue::empty());
                }
                SubmitOutcome::Failed(WizardStep::Confirm)
            }
        }
    }

    /// Step back from `Confirm` to `Details` to edit inputs, e.g. to correct
    /// the amount after a declined payment. No-op anywhere else.
    pub async fn back(&self) -> bool {
        let mut session = self.session.lock().await;
        if session.discarded || session.in_flight || session.step != WizardStep::Confirm {
            return false;
        }
        session.step = WizardStep::Details;
        session.last_error = None;
        true
    }

    /// Acknowledge the result and reset the session for a new transaction.
    /// Inputs survive so a repeat payment only needs a fresh PIN; the PIN
    /// itself is wiped and the quote recomputed from the kept fields.
    pub async fn acknowledge(&self) -> Option<TransactionRecord> {
        let mut session = self.session.lock().await;
        if session.discarded || session.step != WizardStep::Result {
            return None;
        }
        let record = session.transaction.clone();
        session.reset_for_new_transaction();
        if let Some(pin_name) = self.pin_field_name() {
            session.fields.insert(pin_name, FieldValue::empty());
        }
        self.recompute_quote(&mut session);
        record
    }

    /// Discard the session (modal closed). Any in-flight response will be
    /// dropped when it resolves.
    pub async fn discard(&self) {
        let mut session = self.session.lock().await;
        session.discarded = true;
        session.in_flight = false;
        session.next_token();
        info!(session_id = %session.id, "wizard session discarded");
    }

    // -----------------------------------------------------------------------
    // Snapshot accessors
    // -----------------------------------------------------------------------

    pub async fn step(&self) -> WizardStep {
        self.session.lock().await.step
    }

    pub async fn session_id(&self) -> Uuid {
        self.session.lock().await.id
    }

    pub async fn quote(&self) -> Option<Quote> {
        self.session.lock().await.quote.clone()
    }

    pub async fn last_error(&self) -> Option<WizardError> {
        self.session.lock().await.last_error.clone()
    }

    pub async fn verification_label(&self) -> Option<String> {
        self.session
            .lock()
            .await
            .verification()
            .map(|v| v.label.clone())
    }

    pub async fn transaction(&self) -> Option<TransactionRecord> {
        self.session.lock().await.transaction.clone()
    }

    pub async fn field(&self, name: &str) -> Option<FieldValue> {
        self.session.lock().await.fields.get(name).cloned()
    }

    /// Whether the details submit button should be enabled.
    pub async fn can_submit_details(&self) -> bool {
        let session = self.session.lock().await;
        session.step == WizardStep::Details && !session.in_flight && self.details_guard(&session)
    }

    /// Whether the confirm submit button should be enabled.
    pub async fn can_submit_confirm(&self) -> bool {
        let session = self.session.lock().await;
        session.step == WizardStep::Confirm && !session.in_flight && self.confirm_guard(&session)
    }

    /// Per-field validation failures for inline display. These never land in
    /// `last_error` (invalid input only disables the submit), so callers
    /// that want field-level hints read them here.
    pub async fn validation_errors(&self) -> Vec<WizardError> {
        let session = self.session.lock().await;
        self.config
            .fields
            .iter()
            .filter(|spec| spec.required && !matches!(spec.kind, FieldKind::Pin))
            .filter(|spec| {
                !session
                    .fields
                    .get(&spec.name)
                    .map(|value| value.valid)
                    .unwrap_or(false)
            })
            .map(|spec| WizardError::Validation {
                field: spec.name.clone(),
                reason: spec.kind.requirement(),
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Guards and derivations
    // -----------------------------------------------------------------------

    /// All required non-PIN fields valid, and the quote affordable when the
    /// flow debits the wallet. The PIN belongs to the confirm step.
    fn details_guard(&self, session: &WizardSession) -> bool {
        for spec in &self.config.fields {
            if !spec.required || matches!(spec.kind, FieldKind::Pin) {
                continue;
            }
            match session.fields.get(&spec.name) {
                Some(value) if value.valid => {}
                _ => return false,
            }
        }
        if self.config.debits_wallet {
            match &session.quote {
                // A zero total means the conversion rate has not arrived yet.
                Some(quote) => {
                    if quote.total <= BigDecimal::zero()
                        || quote.total > self.context.wallet_balance
                    {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }

    fn confirm_guard(&self, session: &WizardSession) -> bool {
        match self.pin_field_name() {
            Some(name) => session
                .fields
                .get(&name)
                .map(|value| value.valid)
                .unwrap_or(false),
            // A flow without a PIN field cannot reach Paying.
            None => false,
        }
    }

    fn pin_field_name(&self) -> Option<String> {
        self.config
            .fields
            .iter()
            .find(|spec| matches!(spec.kind, FieldKind::Pin))
            .map(|spec| spec.name.clone())
    }

    fn is_pin_field(&self, name: &str) -> bool {
        self.config
            .field_spec(name)
            .map(|spec| matches!(spec.kind, FieldKind::Pin))
            .unwrap_or(false)
    }

    fn is_verification_key_field(&self, name: &str) -> bool {
        self.config
            .verification
            .as_ref()
            .map(|spec| spec.key_fields.iter().any(|key| key == name))
            .unwrap_or(false)
    }

    /// When the phone number changes and no provider is chosen yet, write
    /// the detected network into the provider field. Evaluated once per
    /// input change, never as a lifecycle side effect.
    fn apply_network_rule(&self, session: &mut WizardSession, changed: &str) {
        if changed != "phone" {
            return;
        }
        let Some(phone_spec) = self.config.field_spec("phone") else {
            return;
        };
        if !matches!(phone_spec.kind, FieldKind::Phone) {
            return;
        }
        let Some(provider_spec) = self.config.field_spec("provider") else {
            return;
        };

        let phone = match session.fields.get("phone") {
            Some(value) if value.valid => value.normalized.clone(),
            _ => return,
        };
        let provider_empty = session
            .fields
            .get("provider")
            .map(|value| value.normalized.is_empty())
            .unwrap_or(true);
        if !provider_empty {
            return;
        }

        let network = verification::detect_network(&phone);
        if network != "Unknown" {
            debug!(phone = %phone, network, "auto-selecting provider from detected network");
            session
                .fields
                .insert("provider".to_string(), FieldValue::new(&provider_spec.kind, network));
        }
    }

    fn recompute_quote(&self, session: &mut WizardSession) {
        let Some(amount_field) = &self.config.amount_field else {
            session.quote = None;
            return;
        };
        let raw = session
            .fields
            .get(amount_field)
            .map(|value| value.normalized.clone())
            .unwrap_or_default();

        let zero = BigDecimal::zero();
        let rate = if self.config.uses_conversion_rate {
            Some(session.conversion_rate.as_ref().unwrap_or(&zero))
        } else {
            None
        };
        session.quote = Some(compute_quote(
            &raw,
            &self.config.fee_rule,
            rate,
            &self.config.currency,
        ));
    }

    fn verification_fields(
        &self,
        session: &WizardSession,
        key_fields: &[String],
    ) -> BTreeMap<String, String> {
        let mut fields = BTreeMap::new();
        for name in key_fields {
            if let Some(value) = session.fields.get(name) {
                fields.insert(name.clone(), value.normalized.clone());
            }
        }
        fields
    }

    fn execute_request(&self, session: &WizardSession) -> ExecuteRequest {
        let mut fields: BTreeMap<String, JsonValue> = normalized_fields(session)
            .into_iter()
            .map(|(name, value)| (name, JsonValue::String(value)))
            .collect();
        if let Some(quote) = &session.quote {
            fields.insert(
                "chargeTotal".to_string(),
                JsonValue::String(quote.total.to_string()),
            );
            fields.insert(
                "currency".to_string(),
                JsonValue::String(quote.currency.clone()),
            );
        }
        fields.insert(
            "sessionId".to_string(),
            JsonValue::String(session.id.to_string()),
        );
        ExecuteRequest {
            operation: self.config.execute_operation.clone(),
            fields,
        }
    }
}

fn normalized_fields(session: &WizardSession) -> BTreeMap<String, String> {
    session
        .fields
        .iter()
        .map(|(name, value)| (name.clone(), value.normalized.clone()))
        .collect()
}
