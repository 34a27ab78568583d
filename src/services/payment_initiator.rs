use crate::database::order_repository::{Order, OrderStore};
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::ProcessorClient;
use crate::payments::types::CreateOrderRequest;
use crate::payments::utils::{digits_only, format_minor_units, request_lang};
use crate::services::gateway_status::is_supported_currency;
use reqwest::Url;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRedirect {
    pub order_id: String,
    pub order_code: String,
    pub redirect: String,
}

/// Creates the Viva payment order for a local order and hands back the
/// checkout URL the buyer is sent to.
pub struct PaymentInitiator {
    orders: Arc<dyn OrderStore>,
    client: Arc<dyn ProcessorClient>,
    source_code: String,
    allow_non_eur: bool,
}

impl PaymentInitiator {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        client: Arc<dyn ProcessorClient>,
        source_code: impl Into<String>,
        allow_non_eur: bool,
    ) -> Self {
        Self {
            orders,
            client,
            source_code: source_code.into(),
            allow_non_eur,
        }
    }

    pub async fn initiate(&self, order_id: &str, locale: &str) -> PaymentResult<PaymentRedirect> {
        let order = self
            .orders
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| PaymentError::not_found("Order", order_id))?;

        if order.total <= Decimal::ZERO {
            return Err(PaymentError::InvalidAmount {
                amount: order.total.to_string(),
            });
        }
        if !self.allow_non_eur && !is_supported_currency(&order.currency) {
            return Err(PaymentError::UnsupportedCurrency {
                currency: order.currency.clone(),
            });
        }

        let lang = request_lang(locale);

        // Re-entering payment from the retry page keeps the original code.
        if let Some(existing) = order.processor_order_code.as_deref() {
            info!(order_id = %order.id, "reusing existing viva order code");
            return self.redirect_for(&order.id, existing, lang);
        }

        let request = self.build_request(&order, lang)?;
        let response = self.client.create_order(&request).await.map_err(|e| {
            error!(order_id = %order.id, error = %e, "viva create-order call failed");
            PaymentError::PaymentInitiationFailed {
                reason: e.to_string(),
            }
        })?;

        let error_code = response.error_code.unwrap_or(0);
        let order_code = match response.order_code {
            Some(code) if error_code == 0 => code,
            _ => {
                let reason = format!(
                    "ErrorCode {}: {}",
                    error_code,
                    response.error_text.as_deref().unwrap_or("no order code returned")
                );
                error!(order_id = %order.id, reason = %reason, "viva refused to create the payment order");
                return Err(PaymentError::PaymentInitiationFailed { reason });
            }
        };

        match self
            .orders
            .assign_processor_code(&order.id, &order_code)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!(order_id = %order.id, "order received a viva code concurrently");
                return Err(PaymentError::PaymentInitiationFailed {
                    reason: "order already carries a processor order code".to_string(),
                });
            }
            Err(e) if e.is_unique_violation() => {
                error!(order_id = %order.id, order_code = %order_code, "viva order code already attached to another order");
                return Err(PaymentError::PaymentInitiationFailed {
                    reason: "processor order code is not unique".to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        info!(order_id = %order.id, order_code = %order_code, "viva payment order created");
        self.redirect_for(&order.id, &order_code, lang)
    }

    fn build_request(&self, order: &Order, lang: &str) -> PaymentResult<CreateOrderRequest> {
        let amount = format_minor_units(order.total)
            .filter(|minor| minor != "0")
            .ok_or_else(|| PaymentError::InvalidAmount {
                amount: order.total.to_string(),
            })?;

        Ok(CreateOrderRequest {
            email: order.billing_email.clone(),
            full_name: order.billing_full_name(),
            request_lang: lang.to_string(),
            phone: digits_only(&order.billing_phone),
            merchant_trns: order.id.clone(),
            customer_trns: format!("Order #{}", order.id),
            amount,
            source_code: self.source_code.clone(),
        })
    }

    fn redirect_for(&self, order_id: &str, order_code: &str, lang: &str) -> PaymentResult<PaymentRedirect> {
        let mut url = Url::parse(&self.client.checkout_endpoint()).map_err(|e| {
            PaymentError::PaymentInitiationFailed {
                reason: format!("invalid checkout endpoint: {}", e),
            }
        })?;
        url.set_path("/web/checkout");
        url.query_pairs_mut()
            .append_pair("ref", order_code)
            .append_pair("lang", lang);

        Ok(PaymentRedirect {
            order_id: order_id.to_string(),
            order_code: order_code.to_string(),
            redirect: url.into(),
        })
    }
}
