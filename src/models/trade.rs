//! Trade models for token-pair trades pulled off the trades query.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use anyhow::bail;
use chrono::{DateTime, Utc};

use super::token::Token;

/// Classification of trade types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TradeType {
    Buy,
    Sell,
}

impl FromStr for TradeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            _ => bail!("no trade type {s}"),
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeType::Buy => write!(f, "buy"),
            TradeType::Sell => write!(f, "sell"),
        }
    }
}

/// One side of a trade: the token and its quote at execution time.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenTradeInfo {
    pub token: Token,
    pub price: f64,
    pub value_usd: f64,
}

/// Traded volume in both human units and atoms (smallest denomination).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeInfo {
    pub units_sold: f64,
    pub atoms_sold: u128,
}

/// Trade-level details: volume, total USD value, and the pair label as
/// reported by the source record.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeInfo {
    pub volume: VolumeInfo,
    pub usd_value: f64,
    pub token_pair: String,
}

/// All data needed to build a `Trade`. Decouples raw-record parsing from
/// the canonical entity.
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub block_time: DateTime<Utc>,
    pub tx_hash: String,
    pub sell_info: TokenTradeInfo,
    pub buy_info: TokenTradeInfo,
    pub volume: VolumeInfo,
    pub usd_value: f64,
    pub token_pair: String,
}

/// A single executed exchange between two tokens.
///
/// `tx_hash` is the natural key: equality and hashing ignore every other
/// field, so callers can dedup with set/map operations directly.
#[derive(Debug, Clone)]
pub struct Trade {
    pub block_time: DateTime<Utc>,
    pub tx_hash: String,
    pub sell_info: TokenTradeInfo,
    pub buy_info: TokenTradeInfo,
    pub trade_info: TradeInfo,
}

impl Trade {
    pub fn from_request(request: TradeRequest) -> Self {
        let trade_info = TradeInfo {
            volume: request.volume,
            usd_value: request.usd_value,
            token_pair: request.token_pair,
        };
        Self {
            block_time: request.block_time,
            tx_hash: request.tx_hash,
            sell_info: request.sell_info,
            buy_info: request.buy_info,
            trade_info,
        }
    }
}

impl PartialEq for Trade {
    fn eq(&self, other: &Self) -> bool {
        self.tx_hash == other.tx_hash
    }
}

impl Eq for Trade {}

impl Hash for Trade {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tx_hash.hash(state);
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Trade(tx_hash={}, sell_token={}, buy_token={}, units_sold={})",
            self.tx_hash,
            self.sell_info.token,
            self.buy_info.token,
            self.trade_info.volume.units_sold
        )
    }
}
