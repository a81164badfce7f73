//! Trading pair records and the delist queue.
//!
//! A market is keyed by its symbol `"stock/money"`. Delist requests are keyed
//! by effective time first, so that due requests come out of a single range scan.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::key_codec::{decode_i64, encode_i64};
use crate::store::{decode_value, encode_value, KvStore, StoreError};
use crate::types::{granularity, split_symbol, symbol, Address, Coin, Side};

const MARKET_KEY: u8 = 0x15;
const DELIST_KEY: u8 = 0x16;
const DELIST_SYMBOL_KEY: u8 = 0x17;
const ORDER_CLEAN_TIME_KEY: u8 = 0x20;

/// Trading pair configuration plus its last clearing price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    pub stock: String,
    pub money: String,
    pub price_precision: u8,
    pub order_precision: u8,
    /// Zero until the first trade.
    pub last_executed_price: Decimal,
    pub buy_fee_rate: Decimal,
    pub sell_fee_rate: Decimal,
}

impl MarketInfo {
    pub fn symbol(&self) -> String {
        symbol(&self.stock, &self.money)
    }

    /// Order quantities must be a multiple of this.
    pub fn granularity(&self) -> i64 {
        granularity(self.order_precision)
    }

    pub fn fee_rate(&self, side: Side) -> Decimal {
        match side {
            Side::Buy => self.buy_fee_rate,
            Side::Sell => self.sell_fee_rate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MarketError {
    #[error("invalid trading pair symbol {0}")]
    InvalidSymbol(String),

    #[error("token {0} does not exist")]
    InvalidToken(String),

    #[error("{0} is not the issuer of the stock token")]
    InvalidTokenIssuer(Address),

    #[error("trading pair {0} already exists")]
    RepeatTradingPair(String),

    #[error("market {0} not found")]
    InvalidMarket(String),

    #[error("price precision {given} exceeds limit {limit}")]
    InvalidPricePrecision { given: u8, limit: u8 },

    #[error("order precision {0} exceeds limit")]
    InvalidOrderPrecision(u8),

    #[error("invalid order amount: {0}")]
    InvalidOrderAmount(String),

    #[error("invalid price")]
    InvalidPrice,

    #[error("insufficient coins, need {0}")]
    InsufficientCoin(Coin),

    #[error("token {0} is forbidden by its issuer")]
    TokenForbidByIssuer(String),

    #[error("address {addr} is forbidden by the issuer of {denom}")]
    AddressForbidByIssuer { addr: Address, denom: String },

    #[error("order {0} already exists")]
    OrderAlreadyExist(String),

    #[error("order {0} not found")]
    OrderNotFound(String),

    #[error("sender does not match the owner")]
    NotMatchSender,

    #[error("effective time {0} is earlier than the minimum notice")]
    InvalidCancelTime(i64),

    #[error("delist request for {0} already exists")]
    DelistRequestExist(String),

    #[error("invalid fee rate {0}")]
    InvalidFeeRate(Decimal),

    #[error("missing address")]
    InvalidAddress,
}

impl MarketError {
    /// Stable code reported to the caller.
    pub fn code(&self) -> u32 {
        match self {
            MarketError::InvalidSymbol(_) => 601,
            MarketError::InvalidToken(_) => 602,
            MarketError::InvalidTokenIssuer(_) => 603,
            MarketError::RepeatTradingPair(_) => 604,
            MarketError::InvalidMarket(_) => 605,
            MarketError::InvalidPricePrecision { .. } => 606,
            MarketError::InvalidOrderPrecision(_) => 607,
            MarketError::InvalidOrderAmount(_) => 608,
            MarketError::InvalidPrice => 609,
            MarketError::InsufficientCoin(_) => 610,
            MarketError::TokenForbidByIssuer(_) => 611,
            MarketError::AddressForbidByIssuer { .. } => 612,
            MarketError::OrderAlreadyExist(_) => 613,
            MarketError::OrderNotFound(_) => 614,
            MarketError::NotMatchSender => 615,
            MarketError::InvalidCancelTime(_) => 616,
            MarketError::DelistRequestExist(_) => 617,
            MarketError::InvalidFeeRate(_) => 618,
            MarketError::InvalidAddress => 619,
        }
    }
}

fn market_key(symbol: &str) -> Vec<u8> {
    let mut key = vec![MARKET_KEY];
    key.extend_from_slice(symbol.as_bytes());
    key
}

pub fn get_market<S: KvStore>(store: &S, symbol: &str) -> Result<Option<MarketInfo>, StoreError> {
    store.get(&market_key(symbol)).map(decode_value).transpose()
}

pub fn market_exists<S: KvStore>(store: &S, symbol: &str) -> bool {
    store.has(&market_key(symbol))
}

pub fn set_market<S: KvStore>(store: &mut S, info: &MarketInfo) -> Result<(), StoreError> {
    let value = encode_value(info)?;
    store.set(&market_key(&info.symbol()), &value);
    Ok(())
}

pub fn remove_market<S: KvStore>(store: &mut S, symbol: &str) {
    store.delete(&market_key(symbol));
}

pub fn all_markets<S: KvStore>(store: &S) -> Result<Vec<MarketInfo>, StoreError> {
    store
        .prefix(&[MARKET_KEY])
        .map(|(_, v)| decode_value(v))
        .collect()
}

/// Number of markets quoting `stock` against anything.
pub fn market_count_of_stock<S: KvStore>(store: &S, stock: &str) -> usize {
    store.prefix(&market_key(&format!("{stock}/"))).count()
}

/// Last price of `symbol`, if that market exists.
pub fn last_price<S: KvStore>(store: &S, symbol: &str) -> Result<Option<Decimal>, StoreError> {
    Ok(get_market(store, symbol)?.map(|m| m.last_executed_price))
}

// delist queue: time-ordered keys plus a per-symbol marker for existence checks

fn delist_key(time: i64, symbol: &str) -> Vec<u8> {
    let mut key = vec![DELIST_KEY];
    key.extend_from_slice(&encode_i64(time));
    key.extend_from_slice(symbol.as_bytes());
    key
}

fn delist_symbol_key(symbol: &str) -> Vec<u8> {
    let mut key = vec![DELIST_SYMBOL_KEY];
    key.extend_from_slice(symbol.as_bytes());
    key
}

fn delist_end(time: i64) -> Vec<u8> {
    // everything with effective time <= `time`
    match time.checked_add(1) {
        Some(next) => {
            let mut key = vec![DELIST_KEY];
            key.extend_from_slice(&encode_i64(next));
            key
        }
        None => vec![DELIST_KEY + 1],
    }
}

pub fn add_delist_request<S: KvStore>(store: &mut S, time: i64, symbol: &str) {
    store.set(&delist_key(time, symbol), &[]);
    store.set(&delist_symbol_key(symbol), &encode_i64(time));
}

pub fn has_delist_request<S: KvStore>(store: &S, symbol: &str) -> bool {
    store.has(&delist_symbol_key(symbol))
}

/// Symbols whose effective time is at or before `time`, earliest first.
pub fn delist_symbols_before<S: KvStore>(store: &S, time: i64) -> Vec<String> {
    store
        .range(&[DELIST_KEY], &delist_end(time))
        .filter_map(|(k, _)| String::from_utf8(k[9..].to_vec()).ok())
        .collect()
}

pub fn remove_delist_requests_before<S: KvStore>(store: &mut S, time: i64) {
    let keys: Vec<Vec<u8>> = store
        .range(&[DELIST_KEY], &delist_end(time))
        .map(|(k, _)| k.to_vec())
        .collect();
    for key in keys {
        if let Ok(symbol) = std::str::from_utf8(&key[9..]) {
            store.delete(&delist_symbol_key(symbol));
        }
        store.delete(&key);
    }
}

pub fn all_delist_requests<S: KvStore>(store: &S) -> Result<Vec<(i64, String)>, StoreError> {
    store
        .prefix(&[DELIST_KEY])
        .map(|(k, _)| {
            let time = decode_i64(&k[1..9])?;
            let symbol = String::from_utf8(k[9..].to_vec())
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            Ok((time, symbol))
        })
        .collect()
}

/// Unix seconds of the last periodic cleanup.
pub fn order_clean_time<S: KvStore>(store: &S) -> Result<Option<i64>, StoreError> {
    store
        .get(&[ORDER_CLEAN_TIME_KEY])
        .map(|bytes| decode_i64(bytes).map_err(StoreError::from))
        .transpose()
}

pub fn set_order_clean_time<S: KvStore>(store: &mut S, unix_seconds: i64) {
    store.set(&[ORDER_CLEAN_TIME_KEY], &encode_i64(unix_seconds));
}

/// True when `symbol` parses into two valid, distinct denoms.
pub fn is_valid_symbol(symbol: &str) -> bool {
    split_symbol(symbol).is_some()
}
