//! Scripted processor and order fixtures shared by the service unit tests.

use crate::database::memory::{InMemoryOrderStore, InMemorySettingsStore};
use crate::database::order_repository::{Order, OrderStatus};
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::provider::ProcessorClient;
use crate::payments::types::{
    ConfigToken, CreateOrderRequest, CreateOrderResponse, RefundResponse, RemoteTransaction,
    TransactionsResponse,
};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const ENDPOINT: &str = "https://demo.vivapayments.com";

#[derive(Default)]
pub struct FakeProcessor {
    pub create_response: Mutex<Option<PaymentResult<CreateOrderResponse>>>,
    pub transaction_response: Mutex<Option<PaymentResult<TransactionsResponse>>>,
    pub token_response: Mutex<Option<PaymentResult<ConfigToken>>>,
    pub refund_response: Mutex<Option<PaymentResult<RefundResponse>>>,
    pub create_requests: Mutex<Vec<CreateOrderRequest>>,
    pub refund_requests: Mutex<Vec<(String, i64)>>,
    pub calls: AtomicUsize,
}

impl FakeProcessor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_order_code(self: Arc<Self>, code: &str) -> Arc<Self> {
        *self.create_response.lock().unwrap() = Some(Ok(CreateOrderResponse {
            order_code: Some(code.to_string()),
            error_code: Some(0),
            error_text: None,
        }));
        self
    }

    pub fn with_transaction_status(self: Arc<Self>, status_id: &str) -> Arc<Self> {
        *self.transaction_response.lock().unwrap() = Some(Ok(TransactionsResponse {
            error_code: Some(0),
            error_text: None,
            transactions: Some(vec![RemoteTransaction {
                transaction_id: None,
                status_id: Some(status_id.to_string()),
                amount: None,
            }]),
        }));
        self
    }

    pub fn set_create_response(&self, response: PaymentResult<CreateOrderResponse>) {
        *self.create_response.lock().unwrap() = Some(response);
    }

    pub fn set_transaction_response(&self, response: PaymentResult<TransactionsResponse>) {
        *self.transaction_response.lock().unwrap() = Some(response);
    }

    pub fn set_token_response(&self, response: PaymentResult<ConfigToken>) {
        *self.token_response.lock().unwrap() = Some(response);
    }

    pub fn set_refund_response(&self, response: PaymentResult<RefundResponse>) {
        *self.refund_response.lock().unwrap() = Some(response);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn unscripted<T>() -> PaymentResult<T> {
        Err(PaymentError::RemoteUnreachable {
            message: "no scripted response".to_string(),
        })
    }
}

#[async_trait]
impl ProcessorClient for FakeProcessor {
    async fn create_order(&self, request: &CreateOrderRequest) -> PaymentResult<CreateOrderResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.create_requests.lock().unwrap().push(request.clone());
        self.create_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(Self::unscripted)
    }

    async fn get_transaction(&self, _transaction_id: &str) -> PaymentResult<TransactionsResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.transaction_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(Self::unscripted)
    }

    async fn request_config_token(&self) -> PaymentResult<ConfigToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(Self::unscripted)
    }

    async fn request_config_token_with(&self, _: &str, _: &str) -> PaymentResult<ConfigToken> {
        self.request_config_token().await
    }

    async fn refund_transaction(
        &self,
        transaction_id: &str,
        amount_minor: i64,
    ) -> PaymentResult<RefundResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.refund_requests
            .lock()
            .unwrap()
            .push((transaction_id.to_string(), amount_minor));
        self.refund_response
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(Self::unscripted)
    }

    fn checkout_endpoint(&self) -> String {
        ENDPOINT.to_string()
    }
}

pub fn order(id: &str, status: OrderStatus, total: &str) -> Order {
    Order {
        id: id.to_string(),
        status,
        total: Decimal::from_str(total).unwrap(),
        currency: "EUR".to_string(),
        needs_processing: false,
        billing_email: "jane@example.com".to_string(),
        billing_first_name: "Jane".to_string(),
        billing_last_name: "Doe".to_string(),
        billing_phone: "+30 (691) 234-5678".to_string(),
        processor_order_code: None,
        transaction_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub async fn seeded(orders: Vec<Order>) -> (Arc<InMemoryOrderStore>, Arc<InMemorySettingsStore>) {
    let store = Arc::new(InMemoryOrderStore::new());
    for order in orders {
        store.insert(order).await.unwrap();
    }
    (store, Arc::new(InMemorySettingsStore::new()))
}
