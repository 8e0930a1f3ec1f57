pub mod trade_settlement;
