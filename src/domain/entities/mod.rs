pub mod account;
pub mod stock;
pub mod transaction;
