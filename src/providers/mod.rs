pub mod buff;
pub mod market_csgo;
