//! Webhook (IPN) processing.
//!
//! Viva calls the same endpoint for two things: an empty-body verification
//! probe, answered by echoing a fresh config token, and JSON event
//! notifications. Every event is re-fetched from Viva before it is allowed to
//! move an order forward; the payload itself is never trusted.
//!
//! Nothing a caller sends can make this handler fail. Undecodable bodies,
//! unknown orders and storage errors are logged and acknowledged so Viva stops
//! retrying.

use crate::database::order_repository::{Order, OrderStatus, OrderStore};
use crate::database::settings_repository::{SettingsStore, IPN_VALIDATED_KEY};
use crate::payments::catalog::TransactionCatalog;
use crate::payments::error::PaymentResult;
use crate::payments::provider::ProcessorClient;
use crate::payments::types::{EventKind, NotificationEvent, RemoteTransaction};
use crate::payments::utils::fingerprint;
use crate::services::order_correlator::OrderCorrelator;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Undecodable,
    UnknownOrder,
    /// Order is no longer awaiting payment.
    Ignored,
    PaymentApplied {
        order_id: String,
        status: OrderStatus,
    },
    /// Valid payment with an unrecognised type code; annotated only.
    PaymentNoted,
    FraudSuspected,
    Refunded,
    AlreadyRefunded,
    PartialRefund,
    UnhandledEvent(Option<i64>),
    StoreFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationReply {
    /// Raw config-token body for the verification probe.
    Echo(String),
    ProbeFailed,
    Acknowledged(NotificationOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Validated(RemoteTransaction),
    Rejected(String),
}

impl Validation {
    pub fn is_validated(&self) -> bool {
        matches!(self, Validation::Validated(_))
    }
}

pub struct NotificationHandler {
    orders: Arc<dyn OrderStore>,
    settings: Arc<dyn SettingsStore>,
    client: Arc<dyn ProcessorClient>,
    correlator: OrderCorrelator,
}

impl NotificationHandler {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        settings: Arc<dyn SettingsStore>,
        client: Arc<dyn ProcessorClient>,
    ) -> Self {
        let correlator = OrderCorrelator::new(orders.clone());
        Self {
            orders,
            settings,
            client,
            correlator,
        }
    }

    pub async fn handle(&self, body: &str) -> NotificationReply {
        if body.is_empty() {
            return self.answer_probe().await;
        }

        let event: NotificationEvent = match serde_json::from_str(body) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, body_len = body.len(), "undecodable viva notification");
                return NotificationReply::Acknowledged(NotificationOutcome::Undecodable);
            }
        };

        let outcome = match event.kind() {
            Some(EventKind::TransactionCreated) => self.on_transaction_created(&event).await,
            Some(EventKind::TransactionReversed) => self.on_transaction_reversed(&event).await,
            other => {
                debug!(event_type = ?other.map(|k| k.code()), "ignoring viva event type");
                Ok(NotificationOutcome::UnhandledEvent(event.event_type_id))
            }
        };

        let outcome = outcome.unwrap_or_else(|e| {
            error!(
                error = %e,
                merchant_trns = ?event.event_data.merchant_trns,
                "storage failure while applying viva notification"
            );
            NotificationOutcome::StoreFailure
        });
        NotificationReply::Acknowledged(outcome)
    }

    async fn answer_probe(&self) -> NotificationReply {
        let token = match self.client.request_config_token().await {
            Ok(token) => token,
            Err(e) => {
                error!(error = %e, "viva webhook verification token request failed");
                return NotificationReply::ProbeFailed;
            }
        };

        if let Some(key) = token.key.as_deref() {
            if let Err(e) = self.settings.set(IPN_VALIDATED_KEY, &fingerprint(key)).await {
                error!(error = %e, "could not record viva webhook verification");
            } else {
                info!("viva webhook verified");
            }
        } else {
            warn!("viva config token carried no key");
        }
        NotificationReply::Echo(token.raw)
    }

    /// Re-fetches the transaction and checks Viva agrees with the claimed status.
    pub async fn validate(&self, event: &NotificationEvent) -> Validation {
        let data = &event.event_data;
        let (Some(transaction_id), Some(claimed_status)) =
            (data.transaction_id.as_deref(), data.status_id.as_deref())
        else {
            return Validation::Rejected("notification lacks TransactionId or StatusId".to_string());
        };

        let response = match self.client.get_transaction(transaction_id).await {
            Ok(response) => response,
            Err(e) => {
                warn!(transaction_id = %transaction_id, error = %e, "transaction lookup failed");
                return Validation::Rejected(format!("transaction lookup failed: {}", e));
            }
        };

        match response.error_code {
            Some(0) => {}
            code => {
                return Validation::Rejected(format!(
                    "transaction lookup returned ErrorCode {:?}: {}",
                    code,
                    response.error_text.as_deref().unwrap_or("")
                ))
            }
        }

        let Some(remote) = response.transactions.and_then(|t| t.into_iter().next()) else {
            return Validation::Rejected("transaction lookup returned no transactions".to_string());
        };

        if remote.status_id.as_deref() == Some(claimed_status) {
            Validation::Validated(remote)
        } else {
            Validation::Rejected(format!(
                "claimed StatusId {} but Viva reports {:?}",
                claimed_status, remote.status_id
            ))
        }
    }

    async fn on_transaction_created(
        &self,
        event: &NotificationEvent,
    ) -> PaymentResult<NotificationOutcome> {
        let data = &event.event_data;
        let Some(order) = self.order_by_merchant_trns(event).await? else {
            warn!(merchant_trns = ?data.merchant_trns, "payment notification for unknown order");
            return Ok(NotificationOutcome::UnknownOrder);
        };

        if !order.is_awaiting_payment() {
            debug!(order_id = %order.id, status = %order.status, "order no longer awaits payment");
            return Ok(NotificationOutcome::Ignored);
        }

        let transaction_id = data.transaction_id.as_deref().unwrap_or_default();
        if let Validation::Rejected(reason) = self.validate(event).await {
            warn!(
                audit = true,
                order_id = %order.id,
                transaction_id = %transaction_id,
                reason = %reason,
                "payment notification failed validation"
            );
            let note = format!(
                "Invalid Viva Wallet payment notification received: Possible fraudulent order attempt with transaction ID {}.",
                transaction_id
            );
            self.orders.add_note(&order.id, &note).await?;
            return Ok(NotificationOutcome::FraudSuspected);
        }

        let email = data.email.as_deref().unwrap_or_default();
        let type_code = data.transaction_type_id.as_deref().unwrap_or_default();
        let Some(label) = TransactionCatalog::label(EventKind::TransactionCreated, type_code) else {
            warn!(order_id = %order.id, type_code = %type_code, "unrecognised viva transaction type");
            let note = format!(
                "Viva Wallet payment notification received: Unrecognized \"{}\" transaction with ID {}, paid by {}.",
                type_code, transaction_id, email
            );
            self.orders.add_note(&order.id, &note).await?;
            return Ok(NotificationOutcome::PaymentNoted);
        };

        let note = format!(
            "Viva Wallet payment notification received: \"{}\" transaction with ID {} successful, paid by {}.",
            label, transaction_id, email
        );
        match self
            .orders
            .complete_payment(&order.id, transaction_id, &note)
            .await?
        {
            Some(status) => {
                info!(order_id = %order.id, transaction_id = %transaction_id, status = %status, "viva payment applied");
                Ok(NotificationOutcome::PaymentApplied {
                    order_id: order.id,
                    status,
                })
            }
            None => {
                debug!(order_id = %order.id, "payment already applied by a concurrent notification");
                Ok(NotificationOutcome::Ignored)
            }
        }
    }

    async fn on_transaction_reversed(
        &self,
        event: &NotificationEvent,
    ) -> PaymentResult<NotificationOutcome> {
        let data = &event.event_data;
        // The processor code is consulted only when no order id came with the event.
        let order = match (data.merchant_trns.as_deref(), data.order_code.as_deref()) {
            (Some(_), _) => self.order_by_merchant_trns(event).await?,
            (None, Some(code)) => match self.correlator.correlate(code).await {
                Ok(order) => Some(order),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            },
            (None, None) => None,
        };
        let Some(order) = order else {
            warn!(
                merchant_trns = ?data.merchant_trns,
                order_code = ?data.order_code,
                "refund notification for unknown order"
            );
            return Ok(NotificationOutcome::UnknownOrder);
        };

        let transaction_id = data.transaction_id.as_deref().unwrap_or_default();
        if let Validation::Rejected(reason) = self.validate(event).await {
            warn!(
                audit = true,
                order_id = %order.id,
                transaction_id = %transaction_id,
                reason = %reason,
                "refund notification failed validation"
            );
            let note = format!(
                "Invalid Viva Wallet refund notification received: Possible fraudulent attempt with transaction ID {}.",
                transaction_id
            );
            self.orders.add_note(&order.id, &note).await?;
            return Ok(NotificationOutcome::FraudSuspected);
        }

        let type_code = data.transaction_type_id.as_deref().unwrap_or_default();
        let label = TransactionCatalog::label(EventKind::TransactionReversed, type_code)
            .unwrap_or(type_code);

        match data.amount {
            Some(amount) if amount.abs() == order.total => {
                let note = format!(
                    "Viva Wallet refund notification received: \"{}\" transaction with ID {}.",
                    label, transaction_id
                );
                if self.orders.mark_refunded(&order.id, &note).await? {
                    info!(order_id = %order.id, transaction_id = %transaction_id, "order refunded through viva");
                    Ok(NotificationOutcome::Refunded)
                } else {
                    debug!(order_id = %order.id, "order already refunded");
                    Ok(NotificationOutcome::AlreadyRefunded)
                }
            }
            amount => {
                let refunded = amount
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                let note = format!(
                    "Viva Wallet partial refund notification received: \"{}\" transaction with ID {}. Refunded amount: {}.",
                    label, transaction_id, refunded
                );
                self.orders.add_note(&order.id, &note).await?;
                info!(order_id = %order.id, amount = %refunded, "partial viva refund noted");
                Ok(NotificationOutcome::PartialRefund)
            }
        }
    }

    async fn order_by_merchant_trns(&self, event: &NotificationEvent) -> PaymentResult<Option<Order>> {
        match event.event_data.merchant_trns.as_deref() {
            Some(order_id) => Ok(self.orders.find_by_id(order_id).await?),
            None => Ok(None),
        }
    }
}
