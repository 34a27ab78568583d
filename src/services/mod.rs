//! Services module for payment reconciliation logic

pub mod callback_dispatcher;
pub mod gateway_status;
pub mod notification_handler;
pub mod order_correlator;
pub mod payment_initiator;
pub mod refund_initiator;
pub mod return_handler;

#[cfg(test)]
pub(crate) mod test_support;

pub use callback_dispatcher::{CallbackDispatcher, CallbackKind, CallbackResponse};
pub use gateway_status::{ConfigurationStatus, GatewayStatus, GatewayStatusReport};
pub use notification_handler::{NotificationHandler, NotificationOutcome, NotificationReply};
pub use order_correlator::OrderCorrelator;
pub use payment_initiator::{PaymentInitiator, PaymentRedirect};
pub use refund_initiator::RefundInitiator;
pub use return_handler::{ReturnHandler, ReturnOutcome, ReturnParams};
