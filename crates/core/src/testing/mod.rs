//! Testing utilities and mock implementations.
//!
//! This module provides mocks for the API traits plus a tiny one-shot HTTP
//! stub, allowing end-to-end runs without real Amazon infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use billhook_core::testing::{fixtures, MockSpApi};
//!
//! let api = MockSpApi::new();
//!
//! // Configure mock responses
//! api.set_transaction_pages(vec![
//!     fixtures::transactions_page(&["028-1", "028-2"], None),
//! ]).await;
//! api.script_report("028-1", &["IN_QUEUE", "DONE"], Some("doc-1")).await;
//! ```

mod http;
mod mock_fetcher;
mod mock_spapi;

pub use http::spawn_one_shot_http;
pub use mock_fetcher::{FetchOutcome, MockInvoiceFetcher};
pub use mock_spapi::{MockSpApi, RecordedListing};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::client::{Transaction, TransactionsPage};

    /// Create a transactions page with one transaction per order id.
    pub fn transactions_page(order_ids: &[&str], next_token: Option<&str>) -> TransactionsPage {
        TransactionsPage {
            transactions: order_ids.iter().map(|id| transaction(Some(id))).collect(),
            next_token: next_token.map(str::to_string),
        }
    }

    /// Create a single transaction, optionally tied to an order.
    pub fn transaction(order_id: Option<&str>) -> Transaction {
        Transaction {
            order_id: order_id.map(str::to_string),
        }
    }
}
