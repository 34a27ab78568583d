//! Human-readable labels for Viva transaction type codes, per notification kind.

use crate::payments::types::EventKind;

const CREATED_TRANSACTION_TYPES: &[(&str, &str)] = &[
    ("0", "Capture from Preauth"),
    ("5", "Charge Card"),
    ("6", "Charge Card w. Installments"),
    ("9", "Wallet Charge"),
    ("15", "Dias Payment"),
    ("16", "Cash Payment"),
];

const REVERSED_TRANSACTION_TYPES: &[(&str, &str)] = &[
    ("4", "Refund Card Transaction"),
    ("7", "Void Card Transaction"),
    ("11", "Wallet Refund Transaction"),
    ("13", "Refund Card Transaction from Claim"),
    ("16", "Void Cash"),
];

pub struct TransactionCatalog;

impl TransactionCatalog {
    pub fn label(kind: EventKind, type_code: &str) -> Option<&'static str> {
        let table = match kind {
            EventKind::TransactionCreated => CREATED_TRANSACTION_TYPES,
            EventKind::TransactionReversed => REVERSED_TRANSACTION_TYPES,
            EventKind::Other(_) => return None,
        };
        let code = type_code.trim();
        table
            .iter()
            .find(|(candidate, _)| *candidate == code)
            .map(|(_, label)| *label)
    }

    pub fn is_known(kind: EventKind, type_code: &str) -> bool {
        Self::label(kind, type_code).is_some()
    }
}
