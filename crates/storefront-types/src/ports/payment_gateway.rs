use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug)]
pub enum GatewayError {
    /// Merchant key or callback URLs are not configured.
    #[error("payment gateway misconfigured: {0}")]
    Misconfigured(String),

    #[error("payment gateway timed out")]
    Timeout,

    #[error("payment gateway rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("payment gateway unreachable: {0}")]
    Transport(String),

    #[error("payment gateway returned an unexpected response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    /// Already normalized to `+977...`.
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Minor units (paisa).
    pub amount: i64,
    pub purchase_order_id: String,
    pub purchase_order_name: String,
    pub customer_info: CustomerInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSession {
    pub pidx: String,
    pub payment_url: String,
}

/// Authoritative payment state as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    Completed,
    Pending,
    Initiated,
    Refunded,
    PartiallyRefunded,
    Expired,
    UserCanceled,
    Other(String),
}

impl GatewayStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Completed" => GatewayStatus::Completed,
            "Pending" => GatewayStatus::Pending,
            "Initiated" => GatewayStatus::Initiated,
            "Refunded" => GatewayStatus::Refunded,
            "Partially Refunded" => GatewayStatus::PartiallyRefunded,
            "Expired" => GatewayStatus::Expired,
            "User canceled" => GatewayStatus::UserCanceled,
            other => GatewayStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            GatewayStatus::Completed => "Completed",
            GatewayStatus::Pending => "Pending",
            GatewayStatus::Initiated => "Initiated",
            GatewayStatus::Refunded => "Refunded",
            GatewayStatus::PartiallyRefunded => "Partially Refunded",
            GatewayStatus::Expired => "Expired",
            GatewayStatus::UserCanceled => "User canceled",
            GatewayStatus::Other(s) => s,
        }
    }

    /// The payer can no longer complete this transaction.
    pub fn is_terminal_failure(&self) -> bool {
        matches!(
            self,
            GatewayStatus::Refunded
                | GatewayStatus::PartiallyRefunded
                | GatewayStatus::Expired
                | GatewayStatus::UserCanceled
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentLookup {
    pub pidx: String,
    pub status: GatewayStatus,
    pub total_amount: i64,
    pub transaction_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn initiate(&self, request: PaymentRequest) -> Result<PaymentSession, GatewayError>;
    async fn lookup(&self, pidx: &str) -> Result<PaymentLookup, GatewayError>;
}
