//! ValarPay wizard engine.
//!
//! The generic step-wizard behind every "verify -> confirm -> pay -> show
//! result" flow of the ValarPay client: airtime, data, cable TV,
//! electricity, betting, transport, international airtime, BVN verification
//! and bank withdrawal. Each flow is a `WizardConfig` value, not its own
//! component tree; the `WizardStateMachine` drives one transient session
//! per open modal against a `PaymentGateway` implementation.
//!
//! The crate owns no transport and no persistence. Its single boundary is
//! the gateway trait; everything else is in-memory state, pure validation
//! and pure quote arithmetic.

pub mod config;
pub mod error;
pub mod fields;
pub mod gateway;
pub mod machine;
pub mod projector;
pub mod quote;
pub mod session;
pub mod verification;

pub use config::{FlowContext, FlowKind, VerificationSpec, WizardConfig};
pub use error::{GatewayError, WizardError, WizardResult};
pub use fields::{FieldKind, FieldSpec, FieldValue};
pub use gateway::{
    ExecuteRequest, ExecuteResponse, GatewayResult, PaymentGateway, VerifyRequest, VerifyResponse,
};
pub use machine::{SubmitOutcome, WizardStateMachine};
pub use projector::{SessionView, TransactionDirection, TransactionRecord};
pub use quote::{compute_quote, FeeRule, Quote};
pub use session::{WizardSession, WizardStep};
pub use verification::{VerificationResult, Verifier};
