//! End-to-end wizard flows against a mock gateway.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use valarpay_wizard::{
    config, ExecuteRequest, ExecuteResponse, FlowContext, GatewayError, GatewayResult,
    PaymentGateway, SubmitOutcome, VerifyRequest, VerifyResponse, WizardStateMachine, WizardStep,
};

/// Mock gateway with call counters and scriptable failures.
struct MockGateway {
    verify_calls: AtomicUsize,
    execute_calls: AtomicUsize,
    verify_error: Option<Vec<String>>,
    execute_error: Option<Vec<String>>,
    /// When set, `execute` parks until the test releases it.
    hold_execute: Option<Arc<Notify>>,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            verify_calls: AtomicUsize::new(0),
            execute_calls: AtomicUsize::new(0),
            verify_error: None,
            execute_error: None,
            hold_execute: None,
        }
    }

    fn with_verify_error(messages: &[&str]) -> Self {
        Self {
            verify_error: Some(messages.iter().map(|m| m.to_string()).collect()),
            ..Self::new()
        }
    }

    fn with_execute_error(messages: &[&str]) -> Self {
        Self {
            execute_error: Some(messages.iter().map(|m| m.to_string()).collect()),
            ..Self::new()
        }
    }

    fn with_held_execute(release: Arc<Notify>) -> Self {
        Self {
            hold_execute: Some(release),
            ..Self::new()
        }
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn verify(&self, _request: VerifyRequest) -> GatewayResult<VerifyResponse> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        match &self.verify_error {
            Some(messages) => Err(GatewayError::new(messages.clone())),
            None => Ok(VerifyResponse {
                label: "ADA OBI".to_string(),
                raw: serde_json::json!({"accountName": "ADA OBI"}),
            }),
        }
    }

    async fn execute(&self, _request: ExecuteRequest) -> GatewayResult<ExecuteResponse> {
        if let Some(release) = &self.hold_execute {
            release.notified().await;
        }
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        match &self.execute_error {
            Some(messages) => Err(GatewayError::new(messages.clone())),
            None => Ok(ExecuteResponse {
                payload: serde_json::json!({
                    "transactionRef": "abc123",
                    "status": "success",
                }),
            }),
        }
    }
}

fn funded_context() -> FlowContext {
    FlowContext::new(BigDecimal::from(1_000_000), false)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[tokio::test]
async fn airtime_happy_path_produces_a_transaction_record() {
    init_tracing();
    let gateway = Arc::new(MockGateway::new());
    let machine = WizardStateMachine::new(config::airtime(), funded_context(), gateway.clone());

    machine.set_field("phone", "08012345678").await;
    machine.set_field("amount", "500").await;

    // Network auto-detected into the provider field.
    let provider = machine.field("provider").await.expect("provider field");
    assert_eq!(provider.normalized, "MTN");
    assert!(machine.can_submit_details().await);

    assert_eq!(
        machine.submit_details().await,
        SubmitOutcome::Advanced(WizardStep::Confirm)
    );

    machine.set_field("pin", "1234").await;
    assert_eq!(
        machine.submit_confirm().await,
        SubmitOutcome::Advanced(WizardStep::Result)
    );

    let record = machine.transaction().await.expect("record produced");
    assert_eq!(record.id, "abc123");
    assert_eq!(record.amount, BigDecimal::from_str("500.00").unwrap());
    assert_eq!(record.currency, "NGN");
    assert_eq!(record.kind, "airtime");
    assert_eq!(gateway.execute_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn two_digit_pin_never_reaches_the_gateway() {
    let gateway = Arc::new(MockGateway::new());
    let machine = WizardStateMachine::new(config::airtime(), funded_context(), gateway.clone());

    machine.set_field("phone", "08012345678").await;
    machine.set_field("amount", "500").await;
    machine.submit_details().await;

    machine.set_field("pin", "12").await;
    assert_eq!(machine.submit_confirm().await, SubmitOutcome::Blocked);
    assert_eq!(machine.step().await, WizardStep::Confirm);
    assert_eq!(gateway.execute_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn duplicate_account_verification_makes_one_network_call() {
    let gateway = Arc::new(MockGateway::new());
    let machine =
        WizardStateMachine::new(config::bank_withdrawal(), funded_context(), gateway.clone());

    machine.set_field("bankCode", "058").await;
    machine.set_field("accountNumber", "0152792740").await;
    machine.set_field("amount", "5000").await;

    // bank_withdrawal waits for an explicit Next after showing the name.
    assert_eq!(
        machine.submit_details().await,
        SubmitOutcome::Advanced(WizardStep::Details)
    );
    assert_eq!(
        machine.verification_label().await.as_deref(),
        Some("ADA OBI")
    );

    // Second submit with identical input is served from the cache.
    assert_eq!(
        machine.submit_details().await,
        SubmitOutcome::Advanced(WizardStep::Confirm)
    );
    assert_eq!(gateway.verify_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verification_failure_keeps_confirm_unreachable() {
    let gateway = Arc::new(MockGateway::with_verify_error(&["Account not found"]));
    let machine =
        WizardStateMachine::new(config::bank_withdrawal(), funded_context(), gateway.clone());

    machine.set_field("bankCode", "058").await;
    machine.set_field("accountNumber", "0152792740").await;
    machine.set_field("amount", "5000").await;

    assert_eq!(
        machine.submit_details().await,
        SubmitOutcome::Failed(WizardStep::Details)
    );
    assert_eq!(machine.step().await, WizardStep::Details);

    let err = machine.last_error().await.expect("error surfaced");
    assert_eq!(err.user_messages(), vec!["Account not found".to_string()]);

    machine.set_field("pin", "1234").await;
    assert_eq!(machine.submit_confirm().await, SubmitOutcome::Blocked);
    assert_eq!(gateway.execute_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn currency_conversion_quote_uses_the_supplied_rate() {
    let gateway = Arc::new(MockGateway::new());
    let machine = WizardStateMachine::new(
        config::international_airtime(),
        funded_context(),
        gateway.clone(),
    );

    machine.set_field("phone", "15551234567").await;
    machine.set_field("country", "US").await;
    machine.set_field("provider", "AT&T").await;
    machine.set_field("amount", "100").await;
    machine
        .set_conversion_rate(BigDecimal::from(1500))
        .await;

    let quote = machine.quote().await.expect("quote computed");
    assert_eq!(quote.total, BigDecimal::from_str("150000.00").unwrap());
    assert_eq!(quote.currency, "NGN");
}

#[tokio::test]
async fn payment_failure_surfaces_messages_and_allows_retry() {
    let gateway = Arc::new(MockGateway::with_execute_error(&["Insufficient funds"]));
    let machine = WizardStateMachine::new(config::airtime(), funded_context(), gateway.clone());

    machine.set_field("phone", "08012345678").await;
    machine.set_field("amount", "500").await;
    machine.submit_details().await;
    machine.set_field("pin", "1234").await;

    assert_eq!(
        machine.submit_confirm().await,
        SubmitOutcome::Failed(WizardStep::Confirm)
    );
    let err = machine.last_error().await.expect("error surfaced");
    assert_eq!(err.user_messages(), vec!["Insufficient funds".to_string()]);

    // PIN was cleared; re-entry re-arms the confirm submit.
    assert!(!machine.can_submit_confirm().await);
    machine.set_field("pin", "1234").await;
    assert!(machine.can_submit_confirm().await);
}

#[tokio::test]
async fn response_after_discard_is_dropped_silently() {
    init_tracing();
    let release = Arc::new(Notify::new());
    let gateway = Arc::new(MockGateway::with_held_execute(release.clone()));
    let machine = Arc::new(WizardStateMachine::new(
        config::airtime(),
        funded_context(),
        gateway.clone(),
    ));

    machine.set_field("phone", "08012345678").await;
    machine.set_field("amount", "500").await;
    machine.submit_details().await;
    machine.set_field("pin", "1234").await;

    let in_flight = {
        let machine = machine.clone();
        tokio::spawn(async move { machine.submit_confirm().await })
    };

    // Let the call reach the gateway, then close the modal.
    tokio::task::yield_now().await;
    machine.discard().await;
    release.notify_one();

    let outcome = in_flight.await.expect("task completes");
    assert_eq!(outcome, SubmitOutcome::Blocked);
    assert!(machine.transaction().await.is_none());
    assert!(machine.last_error().await.is_none());
}

#[tokio::test]
async fn betting_flow_enforces_minimum_stake() {
    let gateway = Arc::new(MockGateway::new());
    let machine = WizardStateMachine::new(config::betting(), funded_context(), gateway.clone());

    machine.set_field("provider", "Bet9ja").await;
    machine.set_field("customerId", "VP-778-21").await;
    machine.set_field("amount", "50").await;
    assert!(!machine.can_submit_details().await);
    assert_eq!(machine.submit_details().await, SubmitOutcome::Blocked);
    assert_eq!(gateway.verify_calls.load(Ordering::SeqCst), 0);

    machine.set_field("amount", "100").await;
    assert!(machine.can_submit_details().await);
}

#[tokio::test]
async fn bvn_flow_completes_without_a_quote() {
    let gateway = Arc::new(MockGateway::new());
    let machine = WizardStateMachine::new(
        config::bvn_verification(),
        funded_context(),
        gateway.clone(),
    );

    machine.set_field("bvn", "12345678901").await;
    machine.set_field("selfie", "b64:capture-payload").await;

    // Explicit Next after the resolved name is shown.
    assert_eq!(
        machine.submit_details().await,
        SubmitOutcome::Advanced(WizardStep::Details)
    );
    assert_eq!(
        machine.submit_details().await,
        SubmitOutcome::Advanced(WizardStep::Confirm)
    );

    machine.set_field("pin", "1234").await;
    assert_eq!(
        machine.submit_confirm().await,
        SubmitOutcome::Advanced(WizardStep::Result)
    );

    let record = machine.transaction().await.expect("record produced");
    assert_eq!(record.kind, "bvn_verification");
    assert_eq!(record.counterparty_name.as_deref(), Some("ADA OBI"));
    assert!(machine.quote().await.is_none());
}
