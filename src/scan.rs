//! The combined-search pipeline: catalog lookup, concurrent fetches
//! from both marketplaces, merge, rendering.

use crate::core::catalog::Catalog;
use crate::core::quote::{MergedRow, Quote, QuoteProvider, merge};
use crate::core::valuation::{ExchangeRates, Valuation};
use crate::ui;
use anyhow::{Result, bail};
use comfy_table::Cell;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct ScanOutcome {
    /// Canonical catalog name the query resolved to.
    pub item_name: String,
    pub rows: Vec<MergedRow>,
}

/// A failed fetch degrades to an empty quote list. The merge then
/// produces no rows for that side, which is exactly what the original
/// behavior shows the user; the reason only goes to the log.
fn absorb_fetch_result(marketplace: &str, result: Result<Vec<Quote>>) -> Vec<Quote> {
    match result {
        Ok(quotes) => quotes,
        Err(e) => {
            warn!(error = %e, marketplace, "Quote fetch failed, treating as empty");
            Vec::new()
        }
    }
}

pub async fn run_scan(
    catalog: &Catalog,
    buff_provider: &(dyn QuoteProvider + Send + Sync),
    market_provider: &(dyn QuoteProvider + Send + Sync),
    query: &str,
) -> Result<ScanOutcome> {
    let query = query.trim();
    if query.is_empty() {
        bail!("Item name must not be empty");
    }

    let entry = match catalog.find(query) {
        Some(entry) => entry,
        None => bail!("Item '{query}' not found in the goods catalog"),
    };
    debug!(
        "Resolved '{}' to '{}' (goods id {})",
        query, entry.name, entry.goods_id
    );

    let pb = ui::new_progress_bar(2, true);
    pb.set_message("Fetching listings...");

    // The two marketplaces are independent; fetch them concurrently
    // and join before the merge.
    let (buff_result, market_result) = futures::join!(
        buff_provider.fetch_quotes(&entry.name, &entry.goods_id),
        market_provider.fetch_quotes(&entry.name, &entry.goods_id),
    );
    pb.inc(2);
    pb.finish_and_clear();

    let buff_quotes = absorb_fetch_result("buff", buff_result);
    let market_quotes = absorb_fetch_result("market.csgo", market_result);

    let rows = merge(&buff_quotes, &market_quotes);
    debug!(
        "Merged {} Buff and {} market.csgo quotes into {} rows",
        buff_quotes.len(),
        market_quotes.len(),
        rows.len()
    );

    Ok(ScanOutcome {
        item_name: entry.name.clone(),
        rows,
    })
}

impl ScanOutcome {
    pub fn display_as_table(&self) -> String {
        let mut output = format!(
            "Item: {}\n\n",
            ui::style_text(&self.item_name, ui::StyleType::Title)
        );

        if self.rows.is_empty() {
            output.push_str(&ui::style_text(
                "No matching listings on both marketplaces.",
                ui::StyleType::Subtle,
            ));
            return output;
        }

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Description"),
            ui::header_cell("Buff (CNY)"),
            ui::header_cell("Market (RUB)"),
        ]);
        for row in &self.rows {
            table.add_row(vec![
                Cell::new(&row.description),
                ui::price_cell(row.buff_price),
                ui::price_cell(row.market_price),
            ]);
        }
        output.push_str(&table.to_string());
        output
    }
}

#[derive(Debug)]
pub struct LookupOutcome {
    pub item_name: String,
    pub goods_id: String,
    pub quotes: Vec<Quote>,
}

/// Buff-only lookup: resolve the name against the catalog and list the
/// current sell orders with deep links.
pub async fn run_lookup(
    catalog: &Catalog,
    buff_provider: &(dyn QuoteProvider + Send + Sync),
    query: &str,
) -> Result<LookupOutcome> {
    let query = query.trim();
    if query.is_empty() {
        bail!("Item name must not be empty");
    }

    let entry = match catalog.find(query) {
        Some(entry) => entry,
        None => bail!("Item '{query}' not found in the goods catalog"),
    };

    let result = buff_provider
        .fetch_quotes(&entry.name, &entry.goods_id)
        .await;
    let quotes = absorb_fetch_result("buff", result);

    Ok(LookupOutcome {
        item_name: entry.name.clone(),
        goods_id: entry.goods_id.clone(),
        quotes,
    })
}

impl LookupOutcome {
    pub fn display_as_table(&self) -> String {
        let mut output = format!(
            "Item: {} (goods id {})\n\n",
            ui::style_text(&self.item_name, ui::StyleType::Title),
            self.goods_id
        );

        if self.quotes.is_empty() {
            output.push_str(&ui::style_text(
                "No current sell orders.",
                ui::StyleType::Subtle,
            ));
            return output;
        }

        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Price (CNY)"),
            ui::header_cell("Link"),
        ]);
        for quote in &self.quotes {
            table.add_row(vec![
                ui::price_cell(quote.price),
                ui::format_optional_cell(quote.link.as_deref(), |l| l.to_string()),
            ]);
        }
        output.push_str(&table.to_string());
        output
    }
}

/// Renders one valuation with the rates that produced it.
pub fn render_valuation(description: &str, v: &Valuation, rates: ExchangeRates) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Converted cost (RUB)"),
        ui::header_cell("Net proceeds (RUB)"),
        ui::header_cell("Profit (RUB)"),
        ui::header_cell("Profit %"),
    ]);
    table.add_row(vec![
        ui::price_cell(v.converted_cost),
        ui::price_cell(v.net_proceeds),
        ui::change_cell(v.profit, ""),
        ui::change_cell(v.profit_pct, "%"),
    ]);

    format!(
        "{}\n\n{}\n\nRates: USDT/RUB {:.2}, CNY/USDT {:.2}",
        ui::style_text(description, ui::StyleType::Title),
        table,
        rates.usdt_to_rub,
        rates.cny_to_usdt
    )
}
