#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use viva_reconciler::config::StorefrontConfig;
use viva_reconciler::database::memory::{InMemoryOrderStore, InMemorySettingsStore};
use viva_reconciler::database::order_repository::{Order, OrderStatus};
use viva_reconciler::payments::error::{PaymentError, PaymentResult};
use viva_reconciler::payments::provider::ProcessorClient;
use viva_reconciler::payments::types::{
    ConfigToken, CreateOrderRequest, CreateOrderResponse, RefundResponse, TransactionsResponse,
};
use viva_reconciler::payments::{VivaClient, VivaConfig};

pub const MERCHANT_AUTH: &str = "Basic bWVyY2hhbnQ6c2VjcmV0";

/// Processor double that answers from scripted responses and counts calls.
#[derive(Default)]
pub struct ScriptedProcessor {
    pub create_response: Mutex<Option<PaymentResult<CreateOrderResponse>>>,
    pub transaction_response: Mutex<Option<PaymentResult<TransactionsResponse>>>,
    pub refund_response: Mutex<Option<PaymentResult<RefundResponse>>>,
    pub calls: AtomicUsize,
}

impl ScriptedProcessor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn answer<T: Clone>(&self, slot: &Mutex<Option<PaymentResult<T>>>) -> PaymentResult<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        slot.lock().unwrap().clone().unwrap_or_else(|| {
            Err(PaymentError::RemoteUnreachable {
                message: "connection refused".to_string(),
            })
        })
    }
}

#[async_trait]
impl ProcessorClient for ScriptedProcessor {
    async fn create_order(&self, _: &CreateOrderRequest) -> PaymentResult<CreateOrderResponse> {
        self.answer(&self.create_response)
    }

    async fn get_transaction(&self, _: &str) -> PaymentResult<TransactionsResponse> {
        self.answer(&self.transaction_response)
    }

    async fn request_config_token(&self) -> PaymentResult<ConfigToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(ConfigToken::from_raw(r#"{"Key":"SCRIPTED"}"#.to_string()))
    }

    async fn request_config_token_with(&self, _: &str, _: &str) -> PaymentResult<ConfigToken> {
        self.request_config_token().await
    }

    async fn refund_transaction(&self, _: &str, _: i64) -> PaymentResult<RefundResponse> {
        self.answer(&self.refund_response)
    }

    fn checkout_endpoint(&self) -> String {
        "https://demo.vivapayments.com".to_string()
    }
}

pub fn viva_client(base_url: String) -> Arc<VivaClient> {
    Arc::new(
        VivaClient::new(VivaConfig {
            merchant_id: "merchant".to_string(),
            api_key: "secret".to_string(),
            base_url,
            timeout_secs: 5,
            log_payloads: false,
        })
        .expect("client should build"),
    )
}

pub fn storefront() -> StorefrontConfig {
    StorefrontConfig {
        base_url: Url::parse("https://shop.example.com").unwrap(),
        thank_you_path: "/checkout/order-received/{order_id}".to_string(),
        generic_thank_you_path: "/checkout/order-received".to_string(),
        order_pay_path: "/checkout/order-pay/{order_id}".to_string(),
        checkout_path: "/checkout".to_string(),
    }
}

pub fn order(id: &str, status: OrderStatus, total: &str) -> Order {
    Order {
        id: id.to_string(),
        status,
        total: Decimal::from_str(total).unwrap(),
        currency: "EUR".to_string(),
        needs_processing: false,
        billing_email: "a@b.com".to_string(),
        billing_first_name: "Ada".to_string(),
        billing_last_name: "Lovelace".to_string(),
        billing_phone: "+30 210 1234567".to_string(),
        processor_order_code: None,
        transaction_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub async fn stores(orders: Vec<Order>) -> (Arc<InMemoryOrderStore>, Arc<InMemorySettingsStore>) {
    let store = Arc::new(InMemoryOrderStore::new());
    for order in orders {
        store.insert(order).await.unwrap();
    }
    (store, Arc::new(InMemorySettingsStore::new()))
}
