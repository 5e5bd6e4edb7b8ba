//! Export sinks: a local CSV artifact for the full merged row set, and
//! a single-row append to a remote spreadsheet for one valuation.

use crate::core::config::SheetConfig;
use crate::core::quote::MergedRow;
use crate::core::valuation::{ExchangeRates, Valuation};
use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use std::path::Path;
use tracing::debug;

/// Writes the merged rows as a CSV file. Two calls with the same rows
/// produce byte-identical artifacts; nothing is deduplicated.
pub fn export_csv(rows: &[MergedRow], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    writer.write_record(["description", "buff_price_cny", "market_price_rub"])?;
    for row in rows {
        writer.write_record([
            row.description.as_str(),
            &row.buff_price.to_string(),
            &row.market_price.to_string(),
        ])?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Header written to the remote sheet when it is still empty.
pub const SHEET_HEADER: [&str; 7] = [
    "Buff price (CNY)",
    "Market price (RUB)",
    "USDT/RUB rate",
    "CNY/USDT rate",
    "Profit (RUB)",
    "Profit %",
    "Description",
];

/// Minimal Google-Sheets-style values client: read a range to test for
/// emptiness, append rows with RAW input.
pub struct SheetClient {
    base_url: String,
    spreadsheet_id: String,
    range: String,
    token: String,
}

impl SheetClient {
    pub fn new(config: &SheetConfig) -> Self {
        SheetClient {
            base_url: config.base_url.clone(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: config.range.clone(),
            token: config.token.clone(),
        }
    }

    fn client(&self) -> Result<reqwest::Client> {
        Ok(reqwest::Client::builder().user_agent("skinarb/1.0").build()?)
    }

    fn values_url(&self) -> String {
        format!(
            "{}/v4/spreadsheets/{}/values/{}",
            self.base_url, self.spreadsheet_id, self.range
        )
    }

    pub async fn is_empty(&self) -> Result<bool> {
        let url = self.values_url();
        debug!("Reading sheet values from {}", url);

        let response = self
            .client()?
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} reading sheet values", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} reading sheet values",
                response.status()
            ));
        }

        #[derive(serde::Deserialize)]
        struct ValuesResponse {
            values: Option<Vec<Vec<Value>>>,
        }

        let data = response.json::<ValuesResponse>().await?;
        Ok(data.values.is_none_or(|v| v.is_empty()))
    }

    pub async fn append_row(&self, cells: Vec<Value>) -> Result<()> {
        let url = format!("{}:append?valueInputOption=RAW", self.values_url());
        debug!("Appending row via {}", url);

        let response = self
            .client()?
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "values": [cells] }))
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} appending sheet row", e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} appending sheet row",
                response.status()
            ));
        }
        Ok(())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Appends one valuated row to the remote sheet, preceded by the
/// header row iff the sheet is currently empty. Failures propagate to
/// the caller; the in-memory session is never touched here, so a
/// failed export can simply be retried.
pub async fn export_valuation(
    client: &SheetClient,
    row: &MergedRow,
    valuation: &Valuation,
    rates: ExchangeRates,
) -> Result<()> {
    if client.is_empty().await? {
        let header = SHEET_HEADER.iter().map(|h| json!(h)).collect();
        client.append_row(header).await?;
    }

    client
        .append_row(vec![
            json!(round2(row.buff_price)),
            json!(round2(row.market_price)),
            json!(round2(rates.usdt_to_rub)),
            json!(round2(rates.cny_to_usdt)),
            json!(round2(valuation.profit)),
            json!(round2(valuation.profit_pct)),
            json!(row.description),
        ])
        .await
}
