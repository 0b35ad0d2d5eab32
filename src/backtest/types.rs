//! Core data model shared by the ingestion and matching units.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Small integer handle identifying an instrument for the lifetime of a run.
///
/// Handles are owned collectively by the
/// [`InstrumentDirectory`](crate::backtest::directory::InstrumentDirectory);
/// every other component only copies them around.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstrumentId(u32);

impl InstrumentId {
    /// Creates a handle from its raw value.
    #[must_use]
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    #[must_use]
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for InstrumentId {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl FromStr for InstrumentId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u32>().map(Self)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Side of an order submitted by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// An order as submitted by the strategy.
///
/// Orders are appended once to the order sequencer, never mutated afterwards,
/// and consumed exactly once by the matching engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    /// Instrument the order targets
    pub instrument: InstrumentId,
    /// Limit price supplied by the strategy (informational for matching)
    pub price: i64,
    /// Requested size
    pub size: i64,
    /// Strategy-assigned order identifier
    pub order_id: u64,
    /// Buy or sell
    pub side: Side,
}

impl Order {
    /// Creates a new order.
    #[must_use]
    pub fn new(instrument: InstrumentId, price: i64, size: i64, order_id: u64, side: Side) -> Self {
        Self {
            instrument,
            price,
            size,
            order_id,
            side,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} @ {} on instrument {}",
            self.order_id, self.side, self.size, self.price, self.instrument
        )
    }
}

/// A top-of-book quote update read from a quotes feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteUpdate {
    /// Feed timestamp
    pub timestamp: i64,
    /// Quoted instrument
    pub instrument: InstrumentId,
    /// Best bid price
    pub bid_price: i64,
    /// Best ask price
    pub ask_price: i64,
    /// Size available at the best bid
    pub bid_size: i64,
    /// Size available at the best ask
    pub ask_size: i64,
}

/// A trade print read from a prints feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePrint {
    /// Feed timestamp
    pub timestamp: i64,
    /// Traded instrument
    pub instrument: InstrumentId,
    /// Execution price
    pub trade_price: i64,
    /// Executed size
    pub size: i64,
    /// `true` when the buyer was the aggressor
    pub aggressor_is_buy: bool,
}

/// Scalar liquidity carry for one instrument.
///
/// `quantity` is the magnitude of unmatched liquidity and is never negative
/// at an observation point; `carry_is_sell` records which side currently
/// holds the surplus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentLiquidity {
    /// Magnitude of the unmatched surplus
    pub quantity: i64,
    /// Whether the surplus is carried on the sell side
    pub carry_is_sell: bool,
}

impl InstrumentLiquidity {
    /// Creates a liquidity carry.
    #[must_use]
    #[inline]
    pub const fn new(quantity: i64, carry_is_sell: bool) -> Self {
        Self {
            quantity,
            carry_is_sell,
        }
    }

    /// Returns `true` when there is neither a surplus nor a carry direction.
    #[must_use]
    #[inline]
    pub fn is_flat(&self) -> bool {
        self.quantity == 0 && !self.carry_is_sell
    }
}

/// Classification of a market-data source.
///
/// The mode decides the field layout of each row and which per-instrument
/// history the row is appended to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedMode {
    /// Rows are top-of-book quote updates
    Quotes,
    /// Rows are trade prints
    Prints,
}

impl FromStr for FeedMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quotes" | "quote" | "marketdata" | "market_data" => Ok(FeedMode::Quotes),
            "prints" | "print" | "algo" => Ok(FeedMode::Prints),
            other => Err(format!("unknown feed mode: {other}")),
        }
    }
}

impl fmt::Display for FeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedMode::Quotes => write!(f, "quotes"),
            FeedMode::Prints => write!(f, "prints"),
        }
    }
}
