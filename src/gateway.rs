//! The gateway boundary.
//!
//! Everything remote happens behind `PaymentGateway`: resolving an
//! identifier to a customer name, and executing the actual debit. Transport,
//! auth, retries and timeouts are the implementor's concern; the engine only
//! requires that failures carry human-readable messages and successes carry
//! a payload the projector can read fields from.

use crate::error::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Request for a verification operation ("resolve account name", "resolve
/// smartcard customer", ...). Field sets differ per flow; the shape does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub operation: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    /// Human-readable confirmation label, e.g. the resolved account name.
    pub label: String,
    pub raw: JsonValue,
}

/// Request for the payment/execution operation of a flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub operation: String,
    pub fields: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub payload: JsonValue,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn verify(&self, request: VerifyRequest) -> GatewayResult<VerifyResponse>;

    async fn execute(&self, request: ExecuteRequest) -> GatewayResult<ExecuteResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticGateway;

    #[async_trait]
    impl PaymentGateway for StaticGateway {
        async fn verify(&self, request: VerifyRequest) -> GatewayResult<VerifyResponse> {
            if request.fields.get("accountNumber").map(String::as_str) == Some("0123456789") {
                Ok(VerifyResponse {
                    label: "ADA OBI".to_string(),
                    raw: serde_json::json!({"accountName": "ADA OBI"}),
                })
            } else {
                Err(GatewayError::single("Account not found"))
            }
        }

        async fn execute(&self, request: ExecuteRequest) -> GatewayResult<ExecuteResponse> {
            Ok(ExecuteResponse {
                payload: serde_json::json!({
                    "transactionRef": "abc123",
                    "operation": request.operation,
                }),
            })
        }
    }

    #[tokio::test]
    async fn trait_can_be_implemented_by_static_gateway() {
        let gateway: Box<dyn PaymentGateway> = Box::new(StaticGateway);

        let mut fields = BTreeMap::new();
        fields.insert("accountNumber".to_string(), "0123456789".to_string());
        fields.insert("bankCode".to_string(), "058".to_string());
        let resolved = gateway
            .verify(VerifyRequest {
                operation: "resolve_account".to_string(),
                fields,
            })
            .await
            .expect("verification should succeed");
        assert_eq!(resolved.label, "ADA OBI");

        let executed = gateway
            .execute(ExecuteRequest {
                operation: "pay_airtime".to_string(),
                fields: BTreeMap::new(),
            })
            .await
            .expect("execution should succeed");
        assert_eq!(executed.payload["transactionRef"], "abc123");
    }

    #[tokio::test]
    async fn verification_failure_carries_messages() {
        let gateway = StaticGateway;
        let err = gateway
            .verify(VerifyRequest {
                operation: "resolve_account".to_string(),
                fields: BTreeMap::new(),
            })
            .await
            .expect_err("unknown account should fail");
        assert_eq!(err.messages, vec!["Account not found".to_string()]);
    }
}
