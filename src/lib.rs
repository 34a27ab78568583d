//! Viva Wallet payment reconciliation service.
//!
//! Starts hosted-checkout payments for store orders, maps buyer returns and
//! webhook notifications back onto those orders, and issues refunds.

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod health;
pub mod logging;
pub mod middleware;
pub mod payments;
pub mod services;
