//! Data models for the accounting period, tokens, and trades.

mod period;
mod token;
mod trade;

pub use period::AccountingPeriod;
pub use token::Token;
pub use trade::{TokenTradeInfo, Trade, TradeInfo, TradeRequest, TradeType, VolumeInfo};
