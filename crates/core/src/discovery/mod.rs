//! Order discovery over the financial transactions listing.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::client::{ApiError, SellingPartnerApi};
use crate::config::DateWindow;

/// Discovers orders with financial activity inside a date window.
///
/// Pages through the transactions listing and collects the distinct order
/// ids in the order they were first seen. Transactions without an order
/// reference (fees, carrier adjustments) are skipped.
pub struct OrderDiscovery {
    api: Arc<dyn SellingPartnerApi>,
    marketplace_id: String,
}

impl OrderDiscovery {
    /// Create a new discovery for the given marketplace.
    pub fn new(api: Arc<dyn SellingPartnerApi>, marketplace_id: impl Into<String>) -> Self {
        Self {
            api,
            marketplace_id: marketplace_id.into(),
        }
    }

    /// Collect the distinct order ids posted inside `window`.
    ///
    /// Each page's cursor is passed back verbatim until a page without one
    /// arrives. A failure on any page aborts the whole discovery.
    pub async fn fetch_order_ids(&self, window: &DateWindow) -> Result<Vec<String>, ApiError> {
        let mut seen = HashSet::new();
        let mut order_ids = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            let page = self
                .api
                .list_transactions(
                    &self.marketplace_id,
                    window.from,
                    window.to,
                    next_token.as_deref(),
                )
                .await?;
            pages += 1;

            for transaction in page.transactions {
                if let Some(order_id) = transaction.order_id {
                    if seen.insert(order_id.clone()) {
                        order_ids.push(order_id);
                    }
                }
            }

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        debug!(
            "Discovered {} distinct orders across {} pages",
            order_ids.len(),
            pages
        );

        Ok(order_ids)
    }
}
