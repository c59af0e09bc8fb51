//! Market data types: ticks, bars and bar type keys

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::values::{Price, Quantity, Symbol, Timestamp};

/// A top-of-book quote tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub symbol: Symbol,
    pub bid: Price,
    pub ask: Price,
    pub timestamp: Timestamp,
}

impl Tick {
    pub fn new(symbol: impl Into<Symbol>, bid: Price, ask: Price, timestamp: Timestamp) -> Self {
        Self {
            symbol: symbol.into(),
            bid,
            ask,
            timestamp,
        }
    }

    /// Midpoint of the quote
    pub fn mid(&self) -> Price {
        (self.bid + self.ask) / Price::TWO
    }
}

/// Bar aggregation resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Second,
    Minute,
    Hour,
    Day,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Resolution::Second => "SECOND",
            Resolution::Minute => "MINUTE",
            Resolution::Hour => "HOUR",
            Resolution::Day => "DAY",
        };
        f.write_str(s)
    }
}

/// Which price feeds the bar aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceType {
    Bid,
    Ask,
    Mid,
    Last,
}

impl fmt::Display for PriceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceType::Bid => "BID",
            PriceType::Ask => "ASK",
            PriceType::Mid => "MID",
            PriceType::Last => "LAST",
        };
        f.write_str(s)
    }
}

/// Bar aggregation specification, e.g. 1-MINUTE-MID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarSpec {
    pub step: u32,
    pub resolution: Resolution,
    pub price_type: PriceType,
}

impl BarSpec {
    pub fn new(step: u32, resolution: Resolution, price_type: PriceType) -> Self {
        Self {
            step,
            resolution,
            price_type,
        }
    }
}

impl fmt::Display for BarSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.step, self.resolution, self.price_type)
    }
}

/// Symbol plus bar specification; the key indicators and bar caches hang off
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BarType {
    pub symbol: Symbol,
    pub spec: BarSpec,
}

impl BarType {
    pub fn new(symbol: impl Into<Symbol>, spec: BarSpec) -> Self {
        Self {
            symbol: symbol.into(),
            spec,
        }
    }
}

impl fmt::Display for BarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.symbol, self.spec)
    }
}

/// An OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: Price,
    pub high: Price,
    pub low: Price,
    pub close: Price,
    pub volume: Quantity,
    pub timestamp: Timestamp,
}

impl Bar {
    pub fn new(
        open: Price,
        high: Price,
        low: Price,
        close: Price,
        volume: Quantity,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            timestamp,
        }
    }
}
