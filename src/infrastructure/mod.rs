pub mod quote_cache;
pub mod sample_provider;
pub mod stock_api;
