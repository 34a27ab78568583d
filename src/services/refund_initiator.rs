use crate::database::order_repository::OrderStore;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::ProcessorClient;
use crate::payments::utils::to_minor_units;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Operator-initiated refunds against the transaction that paid an order.
///
/// A successful call only means Viva accepted the refund. The order moves to
/// `refunded` when the matching reversal notification arrives.
pub struct RefundInitiator {
    orders: Arc<dyn OrderStore>,
    client: Arc<dyn ProcessorClient>,
}

impl RefundInitiator {
    pub fn new(orders: Arc<dyn OrderStore>, client: Arc<dyn ProcessorClient>) -> Self {
        Self { orders, client }
    }

    pub async fn refund(
        &self,
        order_id: &str,
        amount: Decimal,
        reason: Option<&str>,
    ) -> PaymentResult<bool> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("Order", order_id))?;

        let Some(transaction_id) = order
            .transaction_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
        else {
            warn!(order_id = %order.id, "refund requested for an order without a viva transaction");
            return Err(PaymentError::MissingTransactionReference {
                order_id: order.id.clone(),
            });
        };

        let minor = to_minor_units(amount)
            .filter(|minor| *minor > 0)
            .ok_or_else(|| PaymentError::InvalidAmount {
                amount: amount.to_string(),
            })?;

        let response = self
            .client
            .refund_transaction(transaction_id, minor)
            .await
            .inspect_err(|e| {
                error!(order_id = %order.id, transaction_id = %transaction_id, error = %e, "viva refund call failed");
            })?;

        if let Some(code) = response.error_code.filter(|code| *code > 0) {
            let message = response
                .error_text
                .unwrap_or_else(|| format!("ErrorCode {}", code));
            warn!(order_id = %order.id, error_code = code, message = %message, "viva rejected the refund");
            return Err(PaymentError::RemoteRejected {
                message,
                error_code: Some(code),
            });
        }

        let accepted = response.status_id.is_some();
        if accepted {
            info!(order_id = %order.id, transaction_id = %transaction_id, amount_minor = minor, "viva refund accepted");
            let mut note = format!("Viva Wallet refund of {} requested.", amount);
            if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
                note.push_str(&format!(" Reason: {}", reason));
            }
            if let Err(e) = self.orders.add_note(&order.id, &note).await {
                error!(order_id = %order.id, error = %e, "could not record refund note");
            }
        } else {
            warn!(order_id = %order.id, "viva refund response carried no status");
        }
        Ok(accepted)
    }
}
