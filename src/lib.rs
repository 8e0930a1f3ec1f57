//! Tradedesk Library
//!
//! Paper-trading web service: accounts with a simulated cash balance buy and
//! sell stocks at live market prices, with every trade recorded in a ledger.

pub mod application;
pub mod auth;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
pub mod rate_limit;
pub mod task_runner;

#[cfg(test)]
mod tests;
