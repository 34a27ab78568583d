//! Application-level error type for the HTTP surface
//!
//! Service errors (`PaymentError`, `DatabaseError`) are converted into
//! `AppError`, which carries the HTTP status, a machine-readable code and a
//! message safe to show to the caller.

use crate::database::error::DatabaseError;
use crate::payments::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes for programmatic handling
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Domain errors (4xx)
    OrderNotFound,
    MissingTransactionReference,
    UnsupportedCurrency,
    PaymentInitiationFailed,
    InvalidAmount,
    GatewayDisabled,

    // Infrastructure errors (5xx)
    DatabaseError,
    ConfigurationError,

    // External errors (502, 503)
    PaymentProviderError,
    PaymentProviderUnavailable,

    // Generic
    InternalError,
    ValidationError,
}

/// Business rule failures
#[derive(Debug, Clone)]
pub enum DomainError {
    OrderNotFound { order_id: String },
    /// Refund requested for an order that never recorded a transaction
    MissingTransactionReference { order_id: String },
    UnsupportedCurrency { currency: String },
    /// Checkout could not hand the buyer over to Viva
    PaymentInitiationFailed { reason: String },
    GatewayDisabled,
}

#[derive(Debug, Clone)]
pub enum InfrastructureError {
    Database { message: String, is_retryable: bool },
    Configuration { message: String },
}

#[derive(Debug, Clone)]
pub enum ExternalError {
    /// Viva answered but refused the operation; `message` is operator-facing.
    ProcessorRejected { message: String },
    /// Viva could not be reached or returned something unreadable
    ProcessorUnavailable { message: String, is_retryable: bool },
}

#[derive(Debug, Clone)]
pub enum ValidationError {
    InvalidAmount { amount: String, reason: String },
    InvalidField { field: String, reason: String },
}

/// Unified application error type
#[derive(Debug, Clone)]
pub struct AppError {
    pub kind: AppErrorKind,
    pub request_id: Option<String>,
    pub context: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AppErrorKind {
    Domain(DomainError),
    Infrastructure(InfrastructureError),
    External(ExternalError),
    Validation(ValidationError),
}

impl AppError {
    pub fn new(kind: AppErrorKind) -> Self {
        Self {
            kind,
            request_id: None,
            context: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Map error to HTTP status code
    pub fn status_code(&self) -> u16 {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { .. } => 404,
                DomainError::MissingTransactionReference { .. } => 422,
                DomainError::UnsupportedCurrency { .. } => 422,
                DomainError::PaymentInitiationFailed { .. } => 502,
                DomainError::GatewayDisabled => 503,
            },
            AppErrorKind::Infrastructure(_) => 500,
            AppErrorKind::External(err) => match err {
                ExternalError::ProcessorRejected { .. } => 502,
                ExternalError::ProcessorUnavailable { .. } => 503,
            },
            AppErrorKind::Validation(_) => 400,
        }
    }

    pub fn error_code(&self) -> ErrorCode {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { .. } => ErrorCode::OrderNotFound,
                DomainError::MissingTransactionReference { .. } => {
                    ErrorCode::MissingTransactionReference
                }
                DomainError::UnsupportedCurrency { .. } => ErrorCode::UnsupportedCurrency,
                DomainError::PaymentInitiationFailed { .. } => ErrorCode::PaymentInitiationFailed,
                DomainError::GatewayDisabled => ErrorCode::GatewayDisabled,
            },
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { .. } => ErrorCode::DatabaseError,
                InfrastructureError::Configuration { .. } => ErrorCode::ConfigurationError,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::ProcessorRejected { .. } => ErrorCode::PaymentProviderError,
                ExternalError::ProcessorUnavailable { .. } => {
                    ErrorCode::PaymentProviderUnavailable
                }
            },
            AppErrorKind::Validation(ValidationError::InvalidAmount { .. }) => {
                ErrorCode::InvalidAmount
            }
            AppErrorKind::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Get user-friendly error message
    pub fn user_message(&self) -> String {
        match &self.kind {
            AppErrorKind::Domain(err) => match err {
                DomainError::OrderNotFound { order_id } => {
                    format!("Order '{}' not found", order_id)
                }
                DomainError::MissingTransactionReference { .. } => {
                    "Refund failed: Transaction ID not found.".to_string()
                }
                DomainError::UnsupportedCurrency { .. } => {
                    "Viva Wallet only supports payments in Euros (EUR)".to_string()
                }
                DomainError::PaymentInitiationFailed { .. } => {
                    crate::payments::error::GENERIC_CHECKOUT_FAILURE.to_string()
                }
                DomainError::GatewayDisabled => {
                    "Viva Wallet payments are currently unavailable".to_string()
                }
            },
            AppErrorKind::Infrastructure(_) => {
                "Service temporarily unavailable. Please try again later".to_string()
            }
            AppErrorKind::External(err) => match err {
                ExternalError::ProcessorRejected { message } => message.clone(),
                ExternalError::ProcessorUnavailable { .. } => {
                    "Viva Wallet is temporarily unavailable. Please try again".to_string()
                }
            },
            AppErrorKind::Validation(err) => match err {
                ValidationError::InvalidAmount { amount, reason } => {
                    format!("Invalid amount '{}': {}", amount, reason)
                }
                ValidationError::InvalidField { field, reason } => {
                    format!("Invalid value for '{}': {}", field, reason)
                }
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match &self.kind {
            AppErrorKind::Domain(DomainError::PaymentInitiationFailed { .. }) => true,
            AppErrorKind::Domain(_) => false,
            AppErrorKind::Infrastructure(err) => match err {
                InfrastructureError::Database { is_retryable, .. } => *is_retryable,
                InfrastructureError::Configuration { .. } => false,
            },
            AppErrorKind::External(err) => match err {
                ExternalError::ProcessorRejected { .. } => false,
                ExternalError::ProcessorUnavailable { is_retryable, .. } => *is_retryable,
            },
            AppErrorKind::Validation(_) => false,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.user_message())
    }
}

impl std::error::Error for AppError {}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        let context = err.to_string();
        let kind = match err {
            PaymentError::NotFound { id, .. } => {
                AppErrorKind::Domain(DomainError::OrderNotFound { order_id: id })
            }
            PaymentError::MissingTransactionReference { order_id } => {
                AppErrorKind::Domain(DomainError::MissingTransactionReference { order_id })
            }
            PaymentError::UnsupportedCurrency { currency } => {
                AppErrorKind::Domain(DomainError::UnsupportedCurrency { currency })
            }
            PaymentError::PaymentInitiationFailed { reason } => {
                AppErrorKind::Domain(DomainError::PaymentInitiationFailed { reason })
            }
            PaymentError::InvalidAmount { amount } => {
                AppErrorKind::Validation(ValidationError::InvalidAmount {
                    amount,
                    reason: "Amount must be a positive value".to_string(),
                })
            }
            PaymentError::InvalidInput { message, field } => {
                AppErrorKind::Validation(ValidationError::InvalidField {
                    field: field.unwrap_or_else(|| "request".to_string()),
                    reason: message,
                })
            }
            ref rejected @ PaymentError::RemoteRejected { .. } => {
                AppErrorKind::External(ExternalError::ProcessorRejected {
                    message: rejected.operator_message(),
                })
            }
            ref other @ (PaymentError::RemoteUnreachable { .. }
            | PaymentError::InvalidResponse { .. }) => {
                AppErrorKind::External(ExternalError::ProcessorUnavailable {
                    message: other.operator_message(),
                    is_retryable: other.is_retryable(),
                })
            }
            PaymentError::Storage { message, retryable } => {
                AppErrorKind::Infrastructure(InfrastructureError::Database {
                    message,
                    is_retryable: retryable,
                })
            }
        };

        AppError::new(kind).with_context(context)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::from(PaymentError::from(err))
    }
}

/// Result type for operations that can fail with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_not_found_error() {
        let error = AppError::from(PaymentError::not_found("Order", "42"));

        assert_eq!(error.status_code(), 404);
        assert_eq!(error.error_code(), ErrorCode::OrderNotFound);
        assert!(error.user_message().contains("42"));
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_refund_rejection_carries_processor_text() {
        let error = AppError::from(PaymentError::RemoteRejected {
            message: "Transaction already refunded".to_string(),
            error_code: Some(403),
        });

        assert_eq!(error.status_code(), 502);
        assert_eq!(error.error_code(), ErrorCode::PaymentProviderError);
        assert_eq!(
            error.user_message(),
            "Refund failed. Reason: Transaction already refunded."
        );
    }

    #[test]
    fn test_initiation_failure_is_generic() {
        let error = AppError::from(PaymentError::PaymentInitiationFailed {
            reason: "ErrorCode 403".to_string(),
        });

        assert_eq!(error.status_code(), 502);
        assert!(!error.user_message().contains("403"));
        assert!(error.context.as_deref().unwrap_or("").contains("403"));
    }

    #[test]
    fn test_error_code_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::MissingTransactionReference).unwrap();
        assert_eq!(json, "\"MISSING_TRANSACTION_REFERENCE\"");
    }
}
