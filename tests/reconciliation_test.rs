//! End-to-end reconciliation flows against a mocked Viva API.

mod common;

use common::{order, storefront, stores, viva_client, ScriptedProcessor, MERCHANT_AUTH};
use mockito::Matcher;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use viva_reconciler::database::order_repository::{OrderStatus, OrderStore};
use viva_reconciler::database::settings_repository::{SettingsStore, IPN_VALIDATED_KEY};
use viva_reconciler::payments::error::PaymentError;
use viva_reconciler::payments::types::{CreateOrderResponse, RemoteTransaction, TransactionsResponse};
use viva_reconciler::payments::utils::fingerprint;
use viva_reconciler::services::{
    CallbackDispatcher, CallbackResponse, NotificationHandler, NotificationOutcome,
    NotificationReply, OrderCorrelator, PaymentInitiator, RefundInitiator, ReturnHandler,
};

const PAYMENT_T1: &str = r#"{"EventTypeId":1796,"EventData":{"MerchantTrns":100,"TransactionId":"T1","TransactionTypeId":"5","StatusId":2,"Email":"a@b.com"}}"#;

fn reversal(amount: &str) -> String {
    format!(
        r#"{{"EventTypeId":1797,"EventData":{{"MerchantTrns":100,"TransactionId":"R1","TransactionTypeId":"4","StatusId":"F","Amount":{}}}}}"#,
        amount
    )
}

fn applied(status: OrderStatus) -> NotificationReply {
    NotificationReply::Acknowledged(NotificationOutcome::PaymentApplied {
        order_id: "100".to_string(),
        status,
    })
}

#[tokio::test]
async fn scenario_a_validated_payment_completes_order() {
    let mut server = mockito::Server::new_async().await;
    let lookup = server
        .mock("GET", "/api/transactions/T1")
        .match_header("authorization", MERCHANT_AUTH)
        .with_status(200)
        .with_body(r#"{"ErrorCode":0,"Transactions":[{"StatusId":2}]}"#)
        .expect(1)
        .create_async()
        .await;
    let (orders, settings) = stores(vec![order("100", OrderStatus::Pending, "19.99")]).await;
    let handler = NotificationHandler::new(orders.clone(), settings, viva_client(server.url()));

    assert_eq!(handler.handle(PAYMENT_T1).await, applied(OrderStatus::Completed));

    // Redelivery is ignored before any remote call.
    assert_eq!(
        handler.handle(PAYMENT_T1).await,
        NotificationReply::Acknowledged(NotificationOutcome::Ignored)
    );
    lookup.assert_async().await;

    let stored = orders.find_by_id("100").await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Completed);
    assert_eq!(stored.transaction_id.as_deref(), Some("T1"));
    assert_eq!(orders.notes("100").await.unwrap().len(), 1);
}

#[tokio::test]
async fn scenario_b_status_mismatch_is_treated_as_fraud() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/transactions/T1")
        .with_status(200)
        .with_body(r#"{"ErrorCode":0,"Transactions":[{"StatusId":5}]}"#)
        .create_async()
        .await;
    let (orders, settings) = stores(vec![order("100", OrderStatus::Pending, "19.99")]).await;
    let handler = NotificationHandler::new(orders.clone(), settings, viva_client(server.url()));

    assert_eq!(
        handler.handle(PAYMENT_T1).await,
        NotificationReply::Acknowledged(NotificationOutcome::FraudSuspected)
    );

    let stored = orders.find_by_id("100").await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    let notes = orders.notes("100").await.unwrap();
    assert_eq!(
        notes[0].message,
        "Invalid Viva Wallet payment notification received: Possible fraudulent order attempt with transaction ID T1."
    );
}

#[tokio::test]
async fn scenarios_c_and_d_full_and_partial_reversals() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/transactions/R1")
        .with_status(200)
        .with_body(r#"{"ErrorCode":0,"Transactions":[{"StatusId":"F"}]}"#)
        .create_async()
        .await;
    let mut paid = order("100", OrderStatus::Completed, "19.99");
    paid.transaction_id = Some("T1".to_string());
    let (orders, settings) = stores(vec![paid]).await;
    let handler = NotificationHandler::new(orders.clone(), settings, viva_client(server.url()));

    assert_eq!(
        handler.handle(&reversal("-5.00")).await,
        NotificationReply::Acknowledged(NotificationOutcome::PartialRefund)
    );
    assert_eq!(
        orders.find_by_id("100").await.unwrap().unwrap().status,
        OrderStatus::Completed
    );
    assert!(orders.notes("100").await.unwrap()[0]
        .message
        .starts_with("Viva Wallet partial refund notification received: \"Refund Card Transaction\" transaction with ID R1."));

    assert_eq!(
        handler.handle(&reversal("-19.99")).await,
        NotificationReply::Acknowledged(NotificationOutcome::Refunded)
    );
    assert_eq!(
        orders.find_by_id("100").await.unwrap().unwrap().status,
        OrderStatus::Refunded
    );
}

#[tokio::test]
async fn scenario_e_probe_echoes_token_and_touches_no_order() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/messages/config/token")
        .match_header("authorization", MERCHANT_AUTH)
        .with_status(200)
        .with_body(r#"{"Key":"B3248B3A"}"#)
        .create_async()
        .await;
    let (orders, settings) = stores(vec![order("100", OrderStatus::Pending, "19.99")]).await;
    let handler = NotificationHandler::new(
        orders.clone(),
        settings.clone(),
        viva_client(server.url()),
    );

    assert_eq!(
        handler.handle("").await,
        NotificationReply::Echo(r#"{"Key":"B3248B3A"}"#.to_string())
    );
    assert_eq!(
        settings.get(IPN_VALIDATED_KEY).await.unwrap(),
        Some(fingerprint("B3248B3A"))
    );
    assert!(orders.notes("100").await.unwrap().is_empty());
    assert_eq!(
        orders.find_by_id("100").await.unwrap().unwrap().status,
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn concurrent_deliveries_apply_payment_once() {
    let client = ScriptedProcessor::new();
    *client.transaction_response.lock().unwrap() = Some(Ok(TransactionsResponse {
        error_code: Some(0),
        error_text: None,
        transactions: Some(vec![RemoteTransaction {
            transaction_id: Some("T1".to_string()),
            status_id: Some("2".to_string()),
            amount: None,
        }]),
    }));
    let (orders, settings) = stores(vec![order("100", OrderStatus::Pending, "19.99")]).await;
    let handler = Arc::new(NotificationHandler::new(orders.clone(), settings, client));

    let (first, second) = tokio::join!(handler.handle(PAYMENT_T1), handler.handle(PAYMENT_T1));

    let applied_count = [first, second]
        .iter()
        .filter(|reply| {
            matches!(
                reply,
                NotificationReply::Acknowledged(NotificationOutcome::PaymentApplied { .. })
            )
        })
        .count();
    assert_eq!(applied_count, 1);
    assert_eq!(orders.notes("100").await.unwrap().len(), 1);
}

#[tokio::test]
async fn payment_initiation_sends_minor_units_and_stores_code() {
    let mut server = mockito::Server::new_async().await;
    let create = server
        .mock("POST", "/api/orders")
        .match_header("authorization", MERCHANT_AUTH)
        .match_body(Matcher::PartialJson(json!({
            "Amount": "500",
            "MerchantTrns": "200",
            "CustomerTrns": "Order #200",
            "FullName": "Ada Lovelace",
            "Phone": "302101234567",
            "RequestLang": "en-US",
            "SourceCode": "Default",
        })))
        .with_status(200)
        .with_body(r#"{"OrderCode":1272214778972604,"ErrorCode":0,"ErrorText":null}"#)
        .create_async()
        .await;
    let (orders, _) = stores(vec![order("200", OrderStatus::Pending, "5")]).await;
    let initiator = PaymentInitiator::new(orders.clone(), viva_client(server.url()), "Default", false);

    let redirect = initiator.initiate("200", "en_GB").await.unwrap();

    create.assert_async().await;
    assert_eq!(
        redirect.redirect,
        format!("{}/web/checkout?ref=1272214778972604&lang=en-US", server.url())
    );
    let correlated = OrderCorrelator::new(orders.clone())
        .correlate("1272214778972604")
        .await
        .unwrap();
    assert_eq!(correlated.id, "200");
}

#[tokio::test]
async fn rejected_order_creation_persists_nothing() {
    let client = ScriptedProcessor::new();
    *client.create_response.lock().unwrap() = Some(Ok(CreateOrderResponse {
        order_code: Some("999".to_string()),
        error_code: Some(10),
        error_text: Some("Invalid SourceCode".to_string()),
    }));
    let (orders, _) = stores(vec![order("200", OrderStatus::Pending, "19.99")]).await;
    let initiator = PaymentInitiator::new(orders.clone(), client, "Bogus", false);

    let err = initiator.initiate("200", "en").await.unwrap_err();

    assert!(matches!(err, PaymentError::PaymentInitiationFailed { .. }));
    assert_eq!(
        err.user_message(),
        viva_reconciler::payments::error::GENERIC_CHECKOUT_FAILURE
    );
    assert!(orders
        .find_by_id("200")
        .await
        .unwrap()
        .unwrap()
        .processor_order_code
        .is_none());
}

#[tokio::test]
async fn refund_without_transaction_reference_skips_viva() {
    let client = ScriptedProcessor::new();
    let (orders, _) = stores(vec![order("300", OrderStatus::Completed, "10")]).await;
    let refunds = RefundInitiator::new(orders, client.clone());

    let err = refunds
        .refund("300", Decimal::new(1000, 2), Some("customer request"))
        .await
        .unwrap_err();

    assert!(matches!(err, PaymentError::MissingTransactionReference { .. }));
    assert_eq!(client.calls(), 0);
}

#[tokio::test]
async fn refund_round_trips_through_viva() {
    let mut server = mockito::Server::new_async().await;
    let delete = server
        .mock("DELETE", Matcher::Regex(r"^/api/transactions/T1".to_string()))
        .match_query(Matcher::UrlEncoded("Amount".into(), "1999".into()))
        .match_header("authorization", MERCHANT_AUTH)
        .with_status(200)
        .with_body(r#"{"ErrorCode":0,"StatusId":"F"}"#)
        .create_async()
        .await;
    let mut paid = order("300", OrderStatus::Completed, "19.99");
    paid.transaction_id = Some("T1".to_string());
    let (orders, _) = stores(vec![paid]).await;
    let refunds = RefundInitiator::new(orders, viva_client(server.url()));

    assert!(refunds
        .refund("300", Decimal::new(1999, 2), None)
        .await
        .unwrap());
    delete.assert_async().await;
}

#[tokio::test]
async fn browser_return_never_changes_order_state() {
    let mut coded = order("100", OrderStatus::Pending, "19.99");
    coded.processor_order_code = Some("555".to_string());
    let (orders, settings) = stores(vec![coded]).await;
    let client = ScriptedProcessor::new();
    let dispatcher = CallbackDispatcher::new(
        Arc::new(ReturnHandler::new(OrderCorrelator::new(orders.clone()))),
        Arc::new(NotificationHandler::new(orders.clone(), settings, client.clone())),
        storefront(),
    );
    let query: HashMap<String, String> = [("result", "success"), ("s", "555")]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    assert_eq!(
        dispatcher.dispatch(&query, "").await,
        CallbackResponse::Redirect(
            "https://shop.example.com/checkout/order-received/100".to_string()
        )
    );
    assert_eq!(
        orders.find_by_id("100").await.unwrap().unwrap().status,
        OrderStatus::Pending
    );
    assert_eq!(client.calls(), 0);
}
