pub mod core;
pub mod export;
pub mod providers;
pub mod scan;
pub mod ui;

use crate::core::catalog::Catalog;
use crate::core::config::AppConfig;
use crate::core::session::Session;
use crate::core::valuation::{COMMISSION_RATE, ExchangeRates, valuate};
use crate::providers::buff::BuffProvider;
use crate::providers::market_csgo::MarketCsgoProvider;
use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use comfy_table::Cell;
use std::path::PathBuf;
use tracing::{debug, info};

pub enum AppCommand {
    /// Store the market.csgo API key in the session.
    Key { api_key: String },
    /// Store exchange rates in the session.
    Rates { usdt_to_rub: f64, cny_to_usdt: f64 },
    /// Resolve an item and list its Buff sell orders.
    Lookup { name: String },
    /// Full cross-market scan for one item.
    Scan {
        name: String,
        usdt_to_rub: Option<f64>,
        cny_to_usdt: Option<f64>,
    },
    /// Write the last scan results to a CSV file.
    Export { out: Option<String> },
    /// Valuate the first scanned row and append it to the remote sheet.
    Sheet,
    /// Sales info for one item from market.csgo.
    History { name: String },
    /// One page of the market.csgo order log.
    Orders { page: u32 },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("skinarb starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let session_path = config.session_path()?;
    let mut session = Session::load(&session_path)?;

    let buff_base_url = config
        .providers
        .buff
        .as_ref()
        .map_or("https://buff.163.com", |p| &p.base_url);
    let market_base_url = config
        .providers
        .market
        .as_ref()
        .map_or("https://market.csgo.com", |p| &p.base_url);

    match command {
        AppCommand::Key { api_key } => {
            session.api_key = Some(api_key);
            session.save(&session_path)?;
            println!("API key saved.");
            Ok(())
        }
        AppCommand::Rates {
            usdt_to_rub,
            cny_to_usdt,
        } => {
            session.rates = ExchangeRates {
                usdt_to_rub,
                cny_to_usdt,
            };
            session.save(&session_path)?;
            println!("Rates updated: USDT/RUB {usdt_to_rub:.2}, CNY/USDT {cny_to_usdt:.2}");
            Ok(())
        }
        AppCommand::Lookup { name } => {
            let catalog = Catalog::load_from_path(&config.goods_file)?;
            let buff_provider = BuffProvider::new(buff_base_url);

            let outcome = scan::run_lookup(&catalog, &buff_provider, &name).await?;
            println!("{}", outcome.display_as_table());
            Ok(())
        }
        AppCommand::Scan {
            name,
            usdt_to_rub,
            cny_to_usdt,
        } => {
            let catalog = Catalog::load_from_path(&config.goods_file)?;

            if let Some(rate) = usdt_to_rub {
                session.rates.usdt_to_rub = rate;
            }
            if let Some(rate) = cny_to_usdt {
                session.rates.cny_to_usdt = rate;
            }

            let buff_provider = BuffProvider::new(buff_base_url);
            let market_provider =
                MarketCsgoProvider::new(market_base_url, session.api_key_or_empty());

            let outcome = scan::run_scan(&catalog, &buff_provider, &market_provider, &name).await?;
            println!("{}", outcome.display_as_table());

            session.last_results = outcome.rows;
            session.scanned_at = Some(Utc::now());
            session.save(&session_path)?;
            Ok(())
        }
        AppCommand::Export { out } => {
            if session.last_results.is_empty() {
                bail!("No scan results in the session; run `skinarb scan` first");
            }
            let out_path = out
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("skinarb_results.csv"));

            export::export_csv(&session.last_results, &out_path)?;
            println!(
                "Exported {} rows to {}",
                session.last_results.len(),
                out_path.display()
            );
            Ok(())
        }
        AppCommand::Sheet => {
            let Some(first) = session.last_results.first() else {
                bail!("No scan results in the session; run `skinarb scan` first");
            };

            let valuation = valuate(first, session.rates, COMMISSION_RATE)?;
            println!(
                "{}",
                scan::render_valuation(&first.description, &valuation, session.rates)
            );

            let sheet_config = config
                .sheet
                .as_ref()
                .context("Sheet export is not configured; add a `sheet` section to the config")?;
            let client = export::SheetClient::new(sheet_config);
            export::export_valuation(&client, first, &valuation, session.rates).await?;
            println!("Appended one row to the spreadsheet.");
            Ok(())
        }
        AppCommand::History { name } => {
            let provider = MarketCsgoProvider::new(market_base_url, session.api_key_or_empty());
            let info = provider.item_info(&name).await?;

            println!("Item: {}\n", ui::style_text(&name, ui::StyleType::Title));
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("Min (RUB)"),
                ui::header_cell("Max (RUB)"),
                ui::header_cell("Average (RUB)"),
            ]);
            table.add_row(vec![
                ui::price_cell(info.min),
                ui::price_cell(info.max),
                ui::price_cell(info.average),
            ]);
            println!("{table}");

            if !info.history.is_empty() {
                let mut history = ui::new_styled_table();
                history.set_header(vec![
                    ui::header_cell("Date"),
                    ui::header_cell("Price (RUB)"),
                ]);
                for (timestamp, price) in &info.history {
                    history.add_row(vec![
                        Cell::new(format_unix(*timestamp)),
                        ui::price_cell(*price),
                    ]);
                }
                println!("\n{history}");
            }
            Ok(())
        }
        AppCommand::Orders { page } => {
            let provider = MarketCsgoProvider::new(market_base_url, session.api_key_or_empty());
            let orders = provider.order_log(page).await?;

            if orders.is_empty() {
                println!("No orders on page {page}.");
                return Ok(());
            }

            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("Date"),
                ui::header_cell("Item"),
                ui::header_cell("Price (RUB)"),
                ui::header_cell("Event"),
            ]);
            for order in &orders {
                table.add_row(vec![
                    Cell::new(format_unix(order.date)),
                    Cell::new(&order.market_hash_name),
                    ui::price_cell(order.price),
                    Cell::new(&order.event),
                ]);
            }
            println!("{table}");
            Ok(())
        }
    }
}

fn format_unix(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
