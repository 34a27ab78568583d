use crate::database::order_repository::{Order, OrderStore};
use crate::payments::error::{PaymentError, PaymentResult};
use std::sync::Arc;
use tracing::debug;

/// Resolves a Viva order code back to the local order it was created for.
#[derive(Clone)]
pub struct OrderCorrelator {
    orders: Arc<dyn OrderStore>,
}

impl OrderCorrelator {
    pub fn new(orders: Arc<dyn OrderStore>) -> Self {
        Self { orders }
    }

    pub async fn correlate(&self, order_code: &str) -> PaymentResult<Order> {
        let code = order_code.trim();
        if code.is_empty() {
            return Err(PaymentError::not_found("Order", code));
        }

        match self.orders.find_by_processor_code(code).await? {
            Some(order) => Ok(order),
            None => {
                debug!(order_code = %code, "no order carries this processor code");
                Err(PaymentError::not_found("Order", code))
            }
        }
    }
}
