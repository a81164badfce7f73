// 1.0: all the primitives live here. addresses, sides, prices, coins, block context.
// amounts are integer base units (i64). prices are decimals with at most 18 fractional digits.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native fee token. every commission and feature fee is paid in it.
pub const CET: &str = "cet";

/// Largest amount a single order may freeze, and the largest single trade.
pub const MAX_ORDER_AMOUNT: i64 = 1_000_000_000_000_000_000;

/// Fractional digits carried by every price.
pub const PRICE_SCALE: u32 = 18;

/// Max precision a market may declare for prices or order quantities.
pub const MAX_MARKET_PRECISION: u8 = 8;

/// Max precision a create-order message may carry.
pub const MAX_ORDER_PRICE_PRECISION: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// Buy = pay money, receive stock. Sell = pay stock, receive money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

// GTE rests until filled, canceled or expired. IOC gets one matching pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Gte,
    Ioc,
}

impl Default for TimeInForce {
    fn default() -> Self {
        Self::Gte
    }
}

// 1.1: limit price in money per unit of stock. must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Price(Decimal);

impl Price {
    #[must_use]
    pub fn new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO && value.scale() <= PRICE_SCALE {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn new_unchecked(value: Decimal) -> Self {
        debug_assert!(value > Decimal::ZERO);
        Self(value)
    }

    /// `raw * 10^-precision`, the way prices travel in messages.
    #[must_use]
    pub fn from_raw(raw: i64, precision: u8) -> Option<Self> {
        if u32::from(precision) > PRICE_SCALE {
            return None;
        }
        Decimal::try_new(raw, u32::from(precision))
            .ok()
            .and_then(|d| Self::new(d.normalize()))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.2: a single-denom amount handed to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: i64,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: i64) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }

    pub fn cet(amount: i64) -> Self {
        Self::new(CET, amount)
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

// 1.3: fee rate in basis points of 10000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bps(pub i64);

impl Bps {
    pub fn new(bps: i64) -> Self {
        Self(bps)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn as_fraction(&self) -> Decimal {
        Decimal::new(self.0, 4)
    }
}

/// Per-block inputs the host chain hands to every handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockContext {
    pub height: u64,
    pub time: DateTime<Utc>,
    pub data_hash: Vec<u8>,
    pub chain_id: String,
}

impl BlockContext {
    pub fn new(height: u64, time: DateTime<Utc>) -> Self {
        Self {
            height,
            time,
            data_hash: Vec::new(),
            chain_id: "coinexdex".to_string(),
        }
    }

    pub fn with_data_hash(mut self, data_hash: impl Into<Vec<u8>>) -> Self {
        self.data_hash = data_hash.into();
        self
    }

    pub fn with_chain_id(mut self, chain_id: impl Into<String>) -> Self {
        self.chain_id = chain_id.into();
        self
    }

    pub fn unix_seconds(&self) -> i64 {
        self.time.timestamp()
    }

    pub fn unix_nanos(&self) -> i64 {
        self.time.timestamp_nanos_opt().unwrap_or(i64::MAX)
    }
}

// 1.4: trading pair symbols are "stock/money".

pub fn symbol(stock: &str, money: &str) -> String {
    format!("{stock}/{money}")
}

pub fn split_symbol(symbol: &str) -> Option<(&str, &str)> {
    let (stock, money) = symbol.split_once('/')?;
    if is_valid_denom(stock) && is_valid_denom(money) && stock != money {
        Some((stock, money))
    } else {
        None
    }
}

/// Lowercase, starts with a letter, 2 to 16 chars of [a-z0-9].
pub fn is_valid_denom(denom: &str) -> bool {
    let bytes = denom.as_bytes();
    (2..=16).contains(&bytes.len())
        && bytes[0].is_ascii_lowercase()
        && bytes.iter().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}

pub fn assemble_order_id(sender: &Address, sequence: u64, identify: u8) -> String {
    format!("{sender}-{sequence}-{identify}")
}

// 1.5: integer conversions with explicit rounding. None means the value left i64 range.

pub fn trunc_i64(value: Decimal) -> Option<i64> {
    value.trunc().to_i64()
}

pub fn round_i64(value: Decimal) -> Option<i64> {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
        .to_i64()
}

pub fn ceil_i64(value: Decimal) -> Option<i64> {
    value.ceil().to_i64()
}

/// Drop digits past the 18th fractional place.
pub fn trunc_scale(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::ToZero)
}

/// `10^precision`, or 1 when the precision is out of range.
pub fn granularity(precision: u8) -> i64 {
    if precision > MAX_MARKET_PRECISION {
        return 1;
    }
    10i64.pow(u32::from(precision))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn price_from_raw() {
        assert_eq!(Price::from_raw(100, 2).unwrap().value(), dec!(1));
        assert_eq!(Price::from_raw(300, 8).unwrap().value(), dec!(0.000003));
        assert!(Price::from_raw(0, 2).is_none());
        assert!(Price::from_raw(-5, 0).is_none());
        assert!(Price::from_raw(1, 19).is_none());
    }

    #[test]
    fn symbol_split() {
        assert_eq!(split_symbol("abc/cet"), Some(("abc", "cet")));
        assert_eq!(split_symbol("abc"), None);
        assert_eq!(split_symbol("abc/abc"), None);
        assert_eq!(split_symbol("Abc/cet"), None);
        assert_eq!(split_symbol("a/cet"), None);
    }

    #[test]
    fn order_id_assembly() {
        let sender = Address::new("coinex1alice");
        assert_eq!(assemble_order_id(&sender, 7, 3), "coinex1alice-7-3");
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round_i64(dec!(204.5)), Some(204));
        assert_eq!(round_i64(dec!(205.5)), Some(206));
        assert_eq!(ceil_i64(dec!(204.0001)), Some(205));
        assert_eq!(trunc_i64(dec!(-1.9)), Some(-1));
        assert_eq!(trunc_scale(dec!(0.1234567890123456789)), dec!(0.123456789012345678));
    }

    #[test]
    fn granularity_by_precision() {
        assert_eq!(granularity(0), 1);
        assert_eq!(granularity(2), 100);
        assert_eq!(granularity(8), 100_000_000);
        assert_eq!(granularity(9), 1);
    }

    #[test]
    fn bps_conversion() {
        assert_eq!(Bps::new(10).as_fraction(), dec!(0.001));
        assert_eq!(Bps::new(100).as_fraction(), dec!(0.01));
    }
}
