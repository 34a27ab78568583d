use crate::payments::error::PaymentResult;
use crate::payments::types::{
    ConfigToken, CreateOrderRequest, CreateOrderResponse, RefundResponse, TransactionsResponse,
};
use async_trait::async_trait;

/// Authenticated calls against the processor's REST surface.
///
/// Implementations only shape requests and decode responses; interpreting
/// `ErrorCode` and mutating orders is left to the services.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest)
        -> PaymentResult<CreateOrderResponse>;

    async fn get_transaction(&self, transaction_id: &str) -> PaymentResult<TransactionsResponse>;

    /// Config token using the configured merchant credentials.
    async fn request_config_token(&self) -> PaymentResult<ConfigToken>;

    /// Config token using explicit credentials, for validating new settings.
    async fn request_config_token_with(
        &self,
        merchant_id: &str,
        api_key: &str,
    ) -> PaymentResult<ConfigToken>;

    async fn refund_transaction(
        &self,
        transaction_id: &str,
        amount_minor: i64,
    ) -> PaymentResult<RefundResponse>;

    /// Base URL the buyer is redirected to, e.g. `https://demo.vivapayments.com`.
    fn checkout_endpoint(&self) -> String;
}
