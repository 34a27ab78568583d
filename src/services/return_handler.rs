use crate::config::StorefrontConfig;
use crate::services::order_correlator::OrderCorrelator;
use std::collections::HashMap;
use tracing::{error, info, warn};

pub const FAILED_ORDER_CODE_PARAM: &str = "failed_viva_order_code";

/// Query parameters Viva appends when sending the buyer back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReturnParams {
    pub result: Option<String>,
    /// Viva order code
    pub s: Option<String>,
}

impl ReturnParams {
    pub fn from_query(query: &HashMap<String, String>) -> Self {
        Self {
            result: query.get("result").cloned(),
            s: query.get("s").cloned().filter(|s| !s.trim().is_empty()),
        }
    }

    fn is_success(&self) -> bool {
        self.result.as_deref() == Some("success")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnOutcome {
    ThankYou { order_id: String },
    /// Success reported for a code no order carries
    GenericThankYou,
    RetryPayment { order_id: String, order_code: String },
    Checkout,
}

impl ReturnOutcome {
    pub fn redirect_url(&self, storefront: &StorefrontConfig) -> String {
        match self {
            ReturnOutcome::ThankYou { order_id } => storefront.thank_you_url(order_id),
            ReturnOutcome::GenericThankYou => storefront.generic_thank_you_url(),
            ReturnOutcome::RetryPayment {
                order_id,
                order_code,
            } => storefront.order_pay_url(order_id, order_code),
            ReturnOutcome::Checkout => storefront.checkout_url(),
        }
    }
}

/// Turns the buyer's browser return into a redirect. Order state is never
/// touched here; only notifications move an order forward.
pub struct ReturnHandler {
    correlator: OrderCorrelator,
}

impl ReturnHandler {
    pub fn new(correlator: OrderCorrelator) -> Self {
        Self { correlator }
    }

    pub async fn handle(&self, params: &ReturnParams) -> ReturnOutcome {
        let order = match params.s.as_deref() {
            Some(code) => match self.correlator.correlate(code).await {
                Ok(order) => Some(order),
                Err(e) if e.is_not_found() => None,
                Err(e) => {
                    error!(order_code = %code, error = %e, "order lookup failed on buyer return");
                    None
                }
            },
            None => None,
        };

        if params.is_success() && params.s.is_some() {
            return match order {
                Some(order) => {
                    info!(order_id = %order.id, "buyer returned after successful payment");
                    ReturnOutcome::ThankYou { order_id: order.id }
                }
                None => {
                    warn!(
                        audit = true,
                        order_code = ?params.s,
                        "processed payment for an unknown order, possible fraudulent attempt"
                    );
                    ReturnOutcome::GenericThankYou
                }
            };
        }

        match (order, params.s.as_deref()) {
            (Some(order), Some(code)) => {
                info!(order_id = %order.id, "buyer returned after failed payment");
                ReturnOutcome::RetryPayment {
                    order_id: order.id,
                    order_code: code.trim().to_string(),
                }
            }
            _ => {
                warn!(
                    audit = true,
                    order_code = ?params.s,
                    "payment for an unknown order failed"
                );
                ReturnOutcome::Checkout
            }
        }
    }
}

/// Banner for the pay page after a failed attempt, shown when the page was
/// reached through a failure redirect.
pub fn failed_payment_notice(query: &HashMap<String, String>) -> Option<&'static str> {
    if query.contains_key("result") && query.contains_key(FAILED_ORDER_CODE_PARAM) {
        Some(crate::payments::error::GENERIC_CHECKOUT_FAILURE)
    } else {
        None
    }
}
