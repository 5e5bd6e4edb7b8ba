//! Core pipeline types and business logic

pub mod catalog;
pub mod config;
pub mod log;
pub mod quote;
pub mod session;
pub mod valuation;

// Re-export main types for cleaner imports
pub use catalog::{Catalog, CatalogEntry};
pub use quote::{MergedRow, Quote, QuoteProvider, merge};
pub use session::Session;
pub use valuation::{COMMISSION_RATE, ExchangeRates, Valuation, ValuationError, valuate};
