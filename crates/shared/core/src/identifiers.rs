//! Identifiers and deterministic identifier generation
//!
//! Orders and positions are identified by strings produced by generators keyed
//! on the issuing strategy's tag and the traded symbol. Generators embed a
//! session timestamp so identifiers remain globally unique across restarts
//! without any shared counter.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::values::{Symbol, Timestamp};

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(StrategyId, "Unique identifier for a strategy instance");
string_id!(OrderId, "Unique identifier for an order");
string_id!(PositionId, "Unique identifier for a position");

/// Generates order identifiers of the form `O-{tag}-{session}-{symbol}-{n}`.
///
/// One per-symbol counter per generator; the session component comes from a
/// clock-provided timestamp taken at construction.
#[derive(Debug, Clone)]
pub struct OrderIdGenerator {
    tag: String,
    session: String,
    counters: HashMap<Symbol, u64>,
}

impl OrderIdGenerator {
    pub fn new(tag: impl Into<String>, session_start: Timestamp) -> Self {
        Self {
            tag: tag.into(),
            session: session_start.format("%Y%m%d%H%M%S").to_string(),
            counters: HashMap::new(),
        }
    }

    /// Generate the next order identifier for `symbol`.
    pub fn generate(&mut self, symbol: &Symbol) -> OrderId {
        let count = self.counters.entry(symbol.clone()).or_insert(0);
        *count += 1;
        OrderId::new(format!(
            "O-{}-{}-{}-{}",
            self.tag, self.session, symbol, count
        ))
    }

    /// Total identifiers issued for `symbol` so far.
    pub fn count(&self, symbol: &Symbol) -> u64 {
        self.counters.get(symbol).copied().unwrap_or(0)
    }
}

/// Generates position identifiers of the form `P-{tag}-{session}-{symbol}-{n}`.
#[derive(Debug, Clone)]
pub struct PositionIdGenerator {
    tag: String,
    session: String,
    counters: HashMap<Symbol, u64>,
}

impl PositionIdGenerator {
    pub fn new(tag: impl Into<String>, session_start: Timestamp) -> Self {
        Self {
            tag: tag.into(),
            session: session_start.format("%Y%m%d%H%M%S").to_string(),
            counters: HashMap::new(),
        }
    }

    pub fn generate(&mut self, symbol: &Symbol) -> PositionId {
        let count = self.counters.entry(symbol.clone()).or_insert(0);
        *count += 1;
        PositionId::new(format!(
            "P-{}-{}-{}-{}",
            self.tag, self.session, symbol, count
        ))
    }
}
