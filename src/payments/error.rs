use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Message shown to the buyer whenever checkout cannot hand them over to Viva.
pub const GENERIC_CHECKOUT_FAILURE: &str =
    "Payment with Viva Wallet failed. Please try again later, or use a different payment method.";

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Processor unreachable: {message}")]
    RemoteUnreachable { message: String },

    #[error("Processor rejected request: {message}")]
    RemoteRejected {
        message: String,
        error_code: Option<i64>,
    },

    #[error("Invalid processor response: {message}")]
    InvalidResponse { message: String },

    #[error("{entity} '{id}' not found")]
    NotFound { entity: String, id: String },

    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: String },

    #[error("Order {order_id} has no captured transaction to refund")]
    MissingTransactionReference { order_id: String },

    #[error("Payment initiation failed: {reason}")]
    PaymentInitiationFailed { reason: String },

    #[error("Unsupported currency: {currency}")]
    UnsupportedCurrency { currency: String },

    #[error("Storage error: {message}")]
    Storage { message: String, retryable: bool },
}

impl PaymentError {
    pub fn not_found(entity: &str, id: impl Into<String>) -> Self {
        PaymentError::NotFound {
            entity: entity.to_string(),
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, PaymentError::NotFound { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentError::RemoteUnreachable { .. } => true,
            PaymentError::RemoteRejected { .. } => false,
            PaymentError::InvalidResponse { .. } => false,
            PaymentError::NotFound { .. } => false,
            PaymentError::InvalidInput { .. } => false,
            PaymentError::InvalidAmount { .. } => false,
            PaymentError::MissingTransactionReference { .. } => false,
            PaymentError::PaymentInitiationFailed { .. } => true,
            PaymentError::UnsupportedCurrency { .. } => false,
            PaymentError::Storage { retryable, .. } => *retryable,
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            PaymentError::RemoteUnreachable { .. } => 503,
            PaymentError::RemoteRejected { .. } => 502,
            PaymentError::InvalidResponse { .. } => 502,
            PaymentError::NotFound { .. } => 404,
            PaymentError::InvalidInput { .. } => 400,
            PaymentError::InvalidAmount { .. } => 400,
            PaymentError::MissingTransactionReference { .. } => 422,
            PaymentError::PaymentInitiationFailed { .. } => 502,
            PaymentError::UnsupportedCurrency { .. } => 400,
            PaymentError::Storage { .. } => 500,
        }
    }

    /// Buyer-facing text. Never carries processor internals.
    pub fn user_message(&self) -> String {
        match self {
            PaymentError::RemoteUnreachable { .. }
            | PaymentError::RemoteRejected { .. }
            | PaymentError::InvalidResponse { .. }
            | PaymentError::PaymentInitiationFailed { .. } => GENERIC_CHECKOUT_FAILURE.to_string(),
            PaymentError::NotFound { entity, .. } => format!("{} not found", entity),
            PaymentError::InvalidInput { message, .. } => message.clone(),
            PaymentError::InvalidAmount { .. } => "Amount invalid".to_string(),
            PaymentError::MissingTransactionReference { .. } => {
                "Transaction ID not found".to_string()
            }
            PaymentError::UnsupportedCurrency { .. } => {
                "Viva Wallet only supports payments in Euros (EUR)".to_string()
            }
            PaymentError::Storage { .. } => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
        }
    }

    /// Store-operator text. Refund failures surface the processor's reason here.
    pub fn operator_message(&self) -> String {
        match self {
            PaymentError::RemoteRejected { message, .. } => {
                format!("Refund failed. Reason: {}.", message)
            }
            PaymentError::RemoteUnreachable { message } => message.clone(),
            PaymentError::MissingTransactionReference { .. } => {
                "Refund failed: Transaction ID not found.".to_string()
            }
            PaymentError::InvalidAmount { .. } => "Refund failed: Amount invalid.".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_http_status_mapping_is_correct() {
        assert_eq!(
            PaymentError::InvalidInput {
                message: "bad".to_string(),
                field: None
            }
            .http_status_code(),
            400
        );
        assert_eq!(PaymentError::not_found("Order", "42").http_status_code(), 404);
        assert_eq!(
            PaymentError::RemoteUnreachable {
                message: "timeout".to_string()
            }
            .http_status_code(),
            503
        );
    }

    #[test]
    fn checkout_failures_never_leak_processor_text() {
        let err = PaymentError::PaymentInitiationFailed {
            reason: "ErrorCode 403: merchant disabled".to_string(),
        };
        assert_eq!(err.user_message(), GENERIC_CHECKOUT_FAILURE);
        assert!(!err.user_message().contains("403"));
    }

    #[test]
    fn refund_rejection_reaches_operator() {
        let err = PaymentError::RemoteRejected {
            message: "Transaction already refunded".to_string(),
            error_code: Some(403),
        };
        assert_eq!(
            err.operator_message(),
            "Refund failed. Reason: Transaction already refunded."
        );
        assert!(!err.is_retryable());
    }
}
