//! Quote types and the cross-market merge.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One price observation for an item from one marketplace. The currency
/// is implied by the source: Buff quotes are CNY, market.csgo quotes
/// are RUB (already converted from kopecks at the provider boundary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub description: String,
    pub price: f64,
    pub link: Option<String>,
}

/// A pair of quotes for the same item description, one per marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub description: String,
    pub buff_price: f64,
    pub market_price: f64,
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Fetches current listings for one item. `name` is the canonical
    /// catalog name, `external_id` the marketplace-specific identifier;
    /// each provider uses whichever it needs.
    async fn fetch_quotes(&self, name: &str, external_id: &str) -> Result<Vec<Quote>>;
}

/// Source-driven inner join on exact description equality. For each
/// Buff quote the first market quote with an equal description is
/// paired; unmatched Buff quotes are dropped, market quotes with no
/// Buff counterpart are never emitted. O(n*m), fine for the single- to
/// low-double-digit lists a scan produces.
pub fn merge(buff_quotes: &[Quote], market_quotes: &[Quote]) -> Vec<MergedRow> {
    buff_quotes
        .iter()
        .filter_map(|buff| {
            market_quotes
                .iter()
                .find(|market| market.description == buff.description)
                .map(|market| MergedRow {
                    description: buff.description.clone(),
                    buff_price: buff.price,
                    market_price: market.price,
                })
        })
        .collect()
}
