//! Unified error handling for the wizard engine.
//!
//! Remote failures are converted into `WizardError` at the state machine
//! boundary and stored on the session; nothing propagates to a global
//! handler. Validation failures never become a stored error at all, they
//! only gate step advancement.

use thiserror::Error;

pub type WizardResult<T> = Result<T, WizardError>;

/// Failure returned by a `PaymentGateway` operation.
///
/// The only contract the engine relies on: a non-empty list of
/// human-readable messages. An empty list is normalized on construction.
#[derive(Debug, Clone, Error)]
#[error("gateway declined: {}", messages.join("; "))]
pub struct GatewayError {
    pub messages: Vec<String>,
}

impl GatewayError {
    pub fn new(messages: Vec<String>) -> Self {
        let messages = if messages.is_empty() {
            vec!["The provider returned an error. Please try again".to_string()]
        } else {
            messages
        };
        Self { messages }
    }

    pub fn single(message: impl Into<String>) -> Self {
        Self::new(vec![message.into()])
    }
}

#[derive(Debug, Clone, Error)]
pub enum WizardError {
    #[error("validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("verification failed: {}", messages.join("; "))]
    Verification { messages: Vec<String> },

    #[error("payment failed: {}", messages.join("; "))]
    Payment { messages: Vec<String> },

    #[error("stale response for request token {token}")]
    Stale { token: u64 },
}

impl WizardError {
    /// Messages suitable for a titled message list in the UI.
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            WizardError::Validation { reason, .. } => vec![reason.clone()],
            WizardError::Verification { messages } => messages.clone(),
            WizardError::Payment { messages } => messages.clone(),
            // Stale results are dropped before reaching the UI.
            WizardError::Stale { .. } => Vec::new(),
        }
    }

    /// Whether the error may be stored on the session and shown to the user.
    pub fn is_surfaceable(&self) -> bool {
        match self {
            WizardError::Validation { .. } => false,
            WizardError::Verification { .. } => true,
            WizardError::Payment { .. } => true,
            WizardError::Stale { .. } => false,
        }
    }
}
