//! Viva Wallet integration: wire types, the processor client and its helpers.

pub mod catalog;
pub mod error;
pub mod provider;
pub mod providers;
pub mod types;
pub mod utils;

pub use catalog::TransactionCatalog;
pub use error::{PaymentError, PaymentResult};
pub use provider::ProcessorClient;
pub use providers::viva::{VivaClient, VivaConfig};
