//! Bonding-curve pools for single-sided token launches.
//!
//! A pool holds `max_supply` stock frozen in the owner's account. Buying takes
//! stock out of the pool and money in, selling does the opposite. Price and
//! money in pool are a pure function of `stock_in_pool`:
//!
//! - `max_money == 0`: a straight line from `init_price` to `max_price`, money is the
//!   trapezoid under it.
//! - otherwise: a power curve with exponent `ar / 1000`, read from the shared
//!   table in [`crate::curve`] and interpolated between samples.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::curve::{lookup, AR_SAMPLES, MAX_AR, SUPPLY_RATIO_SAMPLES};
use crate::store::{decode_value, encode_value, KvStore, StoreError};
use crate::types::{granularity, symbol, trunc_i64, trunc_scale, Address, Coin, MAX_MARKET_PRECISION, PRICE_SCALE};

const POOL_KEY: u8 = 0x21;

/// Largest supply, money cap or trade amount a pool accepts.
pub const MAX_TRADE_AMOUNT: i64 = 1_000_000_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BancorError {
    #[error("bancor pool already exists")]
    AlreadyExists,

    #[error("no bancor pool for {0}")]
    NoBancorExists(String),

    #[error("token {0} does not exist")]
    NoSuchToken(String),

    #[error("only the stock issuer may create a pool")]
    NonOwnerIsProhibited,

    #[error("only the pool owner may cancel it")]
    NotBancorOwner,

    #[error("the pool owner may not trade with it")]
    OwnerIsProhibited,

    #[error("cancel is not allowed before {0}")]
    EarliestCancelTimeNotArrive(i64),

    #[error("token is forbidden by its issuer")]
    TokenForbiddenByOwner,

    #[error("stock amount does not match the pool precision")]
    StockAmountPrecisionNotMatch,

    #[error("max supply does not match the stock precision")]
    StockSupplyPrecisionNotMatch,

    #[error("stock in pool out of bound")]
    StockInPoolOutOfBound,

    #[error("trade moves no money")]
    TradeMoneyNotPositive,

    #[error("money {0} the limit")]
    MoneyCrossLimit(&'static str),

    #[error("invalid symbol")]
    InvalidSymbol,

    #[error("max supply must be positive")]
    NonPositiveSupply,

    #[error("max supply is too big")]
    MaxSupplyTooBig,

    #[error("max money must not be negative")]
    NegativeMaxMoney,

    #[error("max money is too big")]
    MaxMoneyTooBig,

    #[error("max price must be positive")]
    NonPositivePrice,

    #[error("init price must not be negative")]
    NegativePrice,

    #[error("init price is above max price")]
    PriceConfiguration,

    #[error("price times supply is too big")]
    PriceTooBig,

    #[error("ar out of range")]
    AlphaBreakLimit,

    #[error("earliest cancel time must not be negative")]
    EarliestCancelTimeIsNegative,

    #[error("trade amount must be positive")]
    NonPositiveAmount,

    #[error("trade amount is too large")]
    TradeAmountTooLarge,

    #[error("insufficient coins, need {0}")]
    InsufficientCoin(Coin),

    #[error("curve arithmetic overflow")]
    Overflow,
}

impl BancorError {
    pub fn code(&self) -> u32 {
        match self {
            BancorError::AlreadyExists => 801,
            BancorError::NoBancorExists(_) => 802,
            BancorError::NoSuchToken(_) => 803,
            BancorError::NonOwnerIsProhibited => 804,
            BancorError::NotBancorOwner => 805,
            BancorError::OwnerIsProhibited => 806,
            BancorError::EarliestCancelTimeNotArrive(_) => 807,
            BancorError::TokenForbiddenByOwner => 808,
            BancorError::StockAmountPrecisionNotMatch => 809,
            BancorError::StockSupplyPrecisionNotMatch => 810,
            BancorError::StockInPoolOutOfBound => 811,
            BancorError::TradeMoneyNotPositive => 812,
            BancorError::MoneyCrossLimit(_) => 813,
            BancorError::InvalidSymbol => 814,
            BancorError::NonPositiveSupply => 815,
            BancorError::MaxSupplyTooBig => 816,
            BancorError::NegativeMaxMoney => 817,
            BancorError::MaxMoneyTooBig => 818,
            BancorError::NonPositivePrice => 819,
            BancorError::NegativePrice => 820,
            BancorError::PriceConfiguration => 821,
            BancorError::PriceTooBig => 822,
            BancorError::AlphaBreakLimit => 823,
            BancorError::EarliestCancelTimeIsNegative => 824,
            BancorError::NonPositiveAmount => 825,
            BancorError::TradeAmountTooLarge => 826,
            BancorError::InsufficientCoin(_) => 827,
            BancorError::Overflow => 828,
        }
    }
}

/// Pool state, keyed by `"stock/money"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BancorInfo {
    pub owner: Address,
    pub stock: String,
    pub money: String,
    pub init_price: Decimal,
    pub max_supply: i64,
    pub stock_precision: u8,
    pub max_price: Decimal,
    /// Zero selects the linear curve.
    pub max_money: i64,
    pub ar: i64,
    pub price: Decimal,
    pub stock_in_pool: i64,
    pub money_in_pool: i64,
    /// Unix seconds.
    pub earliest_cancel_time: i64,
}

impl BancorInfo {
    pub fn symbol(&self) -> String {
        symbol(&self.stock, &self.money)
    }

    pub fn supplied(&self) -> i64 {
        self.max_supply - self.stock_in_pool
    }

    pub fn is_linear(&self) -> bool {
        self.max_money == 0
    }

    /// Move the pool to `stock_in_pool` and recompute price and money in pool.
    /// Leaves `self` untouched on error.
    pub fn update_stock_in_pool(&mut self, stock_in_pool: i64) -> Result<(), BancorError> {
        if stock_in_pool < 0 || stock_in_pool > self.max_supply || self.max_supply <= 0 {
            return Err(BancorError::StockInPoolOutOfBound);
        }
        let supplied = self.max_supply - stock_in_pool;
        let (price, money) = if self.is_linear() {
            self.linear_state(supplied)?
        } else {
            self.convex_state(supplied)?
        };
        self.stock_in_pool = stock_in_pool;
        self.price = price;
        self.money_in_pool = money;
        Ok(())
    }

    fn linear_state(&self, supplied: i64) -> Result<(Decimal, i64), BancorError> {
        let (init, max) = self.fixed_prices()?;
        let supplied = i128::from(supplied);
        let price = (max - init)
            .checked_mul(supplied)
            .map(|v| v / i128::from(self.max_supply))
            .and_then(|v| v.checked_add(init))
            .ok_or(BancorError::Overflow)?;
        let half = price
            .checked_add(init)
            .and_then(|v| v.checked_mul(supplied))
            .ok_or(BancorError::Overflow)?
            / 2;
        let money = i64::try_from(half_even(half / ONE, half % ONE, ONE)).map_err(|_| BancorError::Overflow)?;
        Ok((from_fixed(price).ok_or(BancorError::Overflow)?, money))
    }

    fn convex_state(&self, supplied: i64) -> Result<(Decimal, i64), BancorError> {
        let max_supply = i128::from(self.max_supply);
        let factored = i128::from(supplied) * i128::from(SUPPLY_RATIO_SAMPLES);
        let s = factored / max_supply;
        if s > i128::from(SUPPLY_RATIO_SAMPLES) {
            return Err(BancorError::StockInPoolOutOfBound);
        }
        let s = s as i64;
        let table = |a: i64, s: i64| lookup(a, s).and_then(to_fixed).ok_or(BancorError::AlphaBreakLimit);

        let mut ratio = table(self.ar + AR_SAMPLES, s)?;
        let mut price_ratio = table(self.ar, s)?;
        let offset = factored - i128::from(s) * max_supply;
        if offset > 0 {
            // between two samples
            let step = |lo: i128, hi: i128| interpolate(hi - lo, offset, max_supply).ok_or(BancorError::Overflow);
            ratio += step(ratio, table(self.ar + AR_SAMPLES, s + 1)?)?;
            price_ratio += step(price_ratio, table(self.ar, s + 1)?)?;
        }

        let (init, max) = self.fixed_prices()?;
        let base_money = init.checked_mul(max_supply).ok_or(BancorError::Overflow)? / ONE;
        let money = ratio
            .checked_mul(i128::from(self.max_money) - base_money)
            .zip(init.checked_mul(i128::from(supplied)))
            .and_then(|(curve, floor)| curve.checked_add(floor))
            .and_then(|v| i64::try_from(v / ONE).ok())
            .ok_or(BancorError::Overflow)?;
        let price = mul_trunc(price_ratio, max - init)
            .and_then(|v| v.checked_add(init))
            .and_then(from_fixed)
            .ok_or(BancorError::Overflow)?;
        Ok((price, money))
    }

    fn fixed_prices(&self) -> Result<(i128, i128), BancorError> {
        to_fixed(self.init_price)
            .zip(to_fixed(self.max_price))
            .ok_or(BancorError::Overflow)
    }

    /// Whether the stored price and money in pool are what the curve says for
    /// the stored stock in pool.
    pub fn is_consistent(&self) -> bool {
        if self.stock_in_pool < 0 || self.stock_in_pool > self.max_supply || self.max_supply <= 0 {
            return false;
        }
        let supplied = self.supplied();

        if self.init_price == self.max_price {
            let base_money = self
                .init_price
                .checked_mul(Decimal::from(self.max_supply))
                .and_then(trunc_i64);
            if !(self.max_money == 0 || Some(self.max_money) == base_money) || self.ar != 0 {
                return false;
            }
            return self.init_price.checked_mul(Decimal::from(supplied)) == Some(Decimal::from(self.money_in_pool));
        }

        if self.is_linear() {
            return self.ar == 0
                && self
                    .linear_state(supplied)
                    .is_ok_and(|(price, money)| price == self.price && money == self.money_in_pool);
        }

        let cap = self
            .max_price
            .checked_mul(Decimal::from(self.max_supply))
            .and_then(trunc_i64);
        let base = self
            .init_price
            .checked_mul(Decimal::from(self.max_supply))
            .and_then(trunc_i64);
        match (cap, base) {
            (Some(cap), Some(base)) => {
                if self.money_in_pool < 0 || self.money_in_pool > cap || self.max_money < base {
                    return false;
                }
            }
            _ => return false,
        }
        if check_ar(self.max_supply, self.max_money, self.init_price, self.max_price) != Some(self.ar) {
            return false;
        }
        self.convex_state(supplied)
            .is_ok_and(|(price, money)| price == self.price && money == self.money_in_pool)
    }

    /// Marginal price at the current supply. Linear pools store it directly,
    /// convex pools take the slope between neighbouring table samples.
    pub fn current_price(&self) -> Decimal {
        if self.is_linear() {
            return self.price;
        }
        let s = i128::from(self.supplied()) * i128::from(SUPPLY_RATIO_SAMPLES) / i128::from(self.max_supply.max(1));
        if s >= i128::from(SUPPLY_RATIO_SAMPLES) {
            return self.max_price;
        }
        let s = s as i64;
        if s == 0 && self.money_in_pool == 0 {
            return self.init_price;
        }
        let a = self.ar + AR_SAMPLES;
        match (lookup(a, s), lookup(a, s + 1)) {
            (Some(lo), Some(hi)) => {
                let slope = (self.max_price - self.init_price) * Decimal::from(AR_SAMPLES * AR_SAMPLES)
                    / Decimal::from(a);
                self.init_price + trunc_scale(slope * (hi - lo))
            }
            _ => self.price,
        }
    }
}

/// Curve exponent from the pool caps, `trunc((p_max·s_max − m_max) / (m_max − p_init·s_max) · 1000)`.
/// Zero for flat curves and for caps that leave no room above the init price.
pub fn calculate_ar(max_supply: i64, max_money: i64, init_price: Decimal, max_price: Decimal) -> i64 {
    if max_price == init_price {
        return 0;
    }
    let supply = i128::from(max_supply);
    let caps = to_fixed(init_price)
        .zip(to_fixed(max_price))
        .and_then(|(init, max)| Some((init.checked_mul(supply)?, max.checked_mul(supply)?)));
    let (Some((floor, top)), Some(money)) = (caps, i128::from(max_money).checked_mul(ONE)) else {
        return 0;
    };
    if money <= floor {
        return 0;
    }
    scaled_quo(top - money, money - floor, AR_SAMPLES).unwrap_or(0)
}

/// AR for a pool definition, None when a convex pool would get AR 0.
pub fn check_ar(max_supply: i64, max_money: i64, init_price: Decimal, max_price: Decimal) -> Option<i64> {
    if max_money == 0 {
        return Some(0);
    }
    match calculate_ar(max_supply, max_money, init_price, max_price) {
        0 => None,
        ar => Some(ar),
    }
}

/// A valid AR for a new pool.
pub fn validate_ar(max_supply: i64, max_money: i64, init_price: Decimal, max_price: Decimal) -> Result<i64, BancorError> {
    match check_ar(max_supply, max_money, init_price, max_price) {
        Some(ar) if (0..=MAX_AR).contains(&ar) => Ok(ar),
        _ => Err(BancorError::AlphaBreakLimit),
    }
}

/// Linear pools also need `(init + max) / 2 · supply` to stay below the trade cap.
pub fn check_max_price(init_price: Decimal, max_price: Decimal, max_supply: i64) -> Result<(), BancorError> {
    if init_price > max_price {
        return Err(BancorError::PriceConfiguration);
    }
    let total = (init_price + max_price)
        .checked_div(Decimal::TWO)
        .and_then(|avg| avg.checked_mul(Decimal::from(max_supply)))
        .ok_or(BancorError::PriceTooBig)?;
    if total > Decimal::from(MAX_TRADE_AMOUNT) {
        return Err(BancorError::PriceTooBig);
    }
    Ok(())
}

/// Precisions above 8 mean 0.
pub fn stock_precision(precision: u8) -> u8 {
    if precision > MAX_MARKET_PRECISION {
        0
    } else {
        precision
    }
}

/// Amounts must be a multiple of `10^precision`.
pub fn check_stock_precision(amount: i64, precision: u8) -> bool {
    amount % granularity(stock_precision(precision)) == 0
}

// 18-digit fixed point: values are counts of 1e-18 so that products stay
// exact up to the single rounding step of each formula.

const ONE: i128 = 1_000_000_000_000_000_000;

fn to_fixed(value: Decimal) -> Option<i128> {
    let scale = value.scale();
    if scale <= PRICE_SCALE {
        value.mantissa().checked_mul(10i128.pow(PRICE_SCALE - scale))
    } else {
        Some(value.mantissa() / 10i128.pow(scale - PRICE_SCALE))
    }
}

fn from_fixed(raw: i128) -> Option<Decimal> {
    let (mut raw, mut scale) = (raw, PRICE_SCALE);
    loop {
        if let Ok(value) = Decimal::try_from_i128_with_scale(raw, scale) {
            return Some(value);
        }
        if scale == 0 || raw % 10 != 0 {
            return None;
        }
        raw /= 10;
        scale -= 1;
    }
}

/// `quo + rem / divisor` rounded to an integer, ties to even.
fn half_even(quo: i128, rem: i128, divisor: i128) -> i128 {
    match (rem * 2).cmp(&divisor) {
        Ordering::Less => quo,
        Ordering::Greater => quo + 1,
        Ordering::Equal => quo + (quo & 1),
    }
}

/// `diff · offset / span` at 18 digits, ties to even.
fn interpolate(diff: i128, offset: i128, span: i128) -> Option<i128> {
    let product = diff.checked_abs()?.checked_mul(offset)?;
    let extra = (product % span).checked_mul(ONE)? / span;
    let step = half_even(product / span, extra, ONE);
    Some(if diff < 0 { -step } else { step })
}

/// `ratio · value` truncated to 18 digits, with `value` split so that neither
/// partial product overflows.
fn mul_trunc(ratio: i128, value: i128) -> Option<i128> {
    let (a, b) = (ratio.checked_abs()?, value.checked_abs()?);
    let whole = a.checked_mul(b / ONE)?;
    let part = a.checked_mul(b % ONE)? / ONE;
    let product = whole.checked_add(part)?;
    Some(if (ratio < 0) != (value < 0) { -product } else { product })
}

/// `trunc(numer · factor / denom)` for a power-of-ten factor, one digit at a time.
fn scaled_quo(numer: i128, denom: i128, factor: i64) -> Option<i64> {
    let n = numer.checked_abs()?;
    let (mut quo, mut rem) = (n / denom, n % denom);
    let mut scaled = 1;
    while scaled < factor {
        rem = rem.checked_mul(10)?;
        quo = quo.checked_mul(10)?.checked_add(rem / denom)?;
        rem %= denom;
        scaled *= 10;
    }
    let quo = i64::try_from(quo).ok()?;
    Some(if numer < 0 { -quo } else { quo })
}

// pool store: 0x21 symbol

fn pool_key(symbol: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + symbol.len());
    key.push(POOL_KEY);
    key.extend_from_slice(symbol.as_bytes());
    key
}

pub fn get_pool<S: KvStore>(store: &S, symbol: &str) -> Result<Option<BancorInfo>, StoreError> {
    store.get(&pool_key(symbol)).map(decode_value).transpose()
}

pub fn set_pool<S: KvStore>(store: &mut S, info: &BancorInfo) -> Result<(), StoreError> {
    let value = encode_value(info)?;
    store.set(&pool_key(&info.symbol()), &value);
    Ok(())
}

pub fn remove_pool<S: KvStore>(store: &mut S, symbol: &str) {
    store.delete(&pool_key(symbol));
}

pub fn all_pools<S: KvStore>(store: &S) -> Result<Vec<BancorInfo>, StoreError> {
    store.prefix(&[POOL_KEY]).map(|(_, v)| decode_value(v)).collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::store::MemStore;
    use rust_decimal::RoundingStrategy;
    use rust_decimal_macros::dec;

    pub(crate) fn pool(init: Decimal, max: Decimal, max_supply: i64, max_money: i64) -> BancorInfo {
        BancorInfo {
            owner: Address::new("owner"),
            stock: "abc".to_string(),
            money: "cet".to_string(),
            init_price: init,
            max_supply,
            stock_precision: 0,
            max_price: max,
            max_money,
            ar: calculate_ar(max_supply, max_money, init, max),
            price: init,
            stock_in_pool: max_supply,
            money_in_pool: 0,
            earliest_cancel_time: 0,
        }
    }

    #[test]
    fn flat_pool_stays_flat() {
        let mut bi = pool(dec!(1), dec!(1), 2100, 0);
        assert!(bi.is_consistent());
        for stock in [2100, 2000, 1000, 1, 0, 700] {
            bi.update_stock_in_pool(stock).unwrap();
            assert_eq!(bi.money_in_pool, bi.supplied());
            assert_eq!(bi.price, dec!(1));
            assert_eq!(bi.ar, 0);
            assert!(bi.is_consistent());
        }
    }

    #[test]
    fn linear_curve() {
        let mut bi = pool(dec!(1), dec!(3), 1000, 0);
        bi.update_stock_in_pool(500).unwrap();
        assert_eq!(bi.price, dec!(2));
        assert_eq!(bi.money_in_pool, 750);
        bi.update_stock_in_pool(0).unwrap();
        assert_eq!(bi.price, dec!(3));
        assert_eq!(bi.money_in_pool, 2000);
        assert!(bi.is_consistent());
    }

    #[test]
    fn out_of_bound_leaves_state() {
        let mut bi = pool(dec!(1), dec!(3), 1000, 0);
        let before = bi.clone();
        assert_eq!(bi.update_stock_in_pool(1001), Err(BancorError::StockInPoolOutOfBound));
        assert_eq!(bi.update_stock_in_pool(-1), Err(BancorError::StockInPoolOutOfBound));
        assert_eq!(bi, before);
    }

    #[test]
    fn ar_from_caps() {
        // (10*1000 - 4000) / (4000 - 1000) = 2
        assert_eq!(calculate_ar(1000, 4000, dec!(1), dec!(10)), 2000);
        assert_eq!(calculate_ar(1000, 4000, dec!(1), dec!(1)), 0);
        assert_eq!(calculate_ar(1000, 1000, dec!(1), dec!(10)), 0);
        assert_eq!(check_ar(1000, 0, dec!(1), dec!(10)), Some(0));
        assert_eq!(check_ar(1000, 1000, dec!(1), dec!(10)), None);
        assert_eq!(validate_ar(1000, 1100, dec!(1), dec!(10)), Err(BancorError::AlphaBreakLimit));
    }

    #[test]
    fn convex_curve_endpoints() {
        let mut bi = pool(dec!(1), dec!(10), 1000, 4000);
        assert_eq!(bi.ar, 2000);
        assert!(bi.is_consistent());

        // s/s_max = 0.5: money = 0.5^3 * 3000 + 500, price = 0.5^2 * 9 + 1
        bi.update_stock_in_pool(500).unwrap();
        assert_eq!(bi.money_in_pool, 875);
        assert_eq!(bi.price, dec!(3.25));
        assert!(bi.is_consistent());

        bi.update_stock_in_pool(0).unwrap();
        assert_eq!(bi.money_in_pool, 4000);
        assert_eq!(bi.price, dec!(10));
        assert_eq!(bi.current_price(), dec!(10));
    }

    #[test]
    fn convex_interpolates_between_samples() {
        let mut bi = pool(dec!(1), dec!(10), 2000, 8000);
        assert_eq!(bi.ar, 2000);
        // supplied 1001 sits halfway between samples 500 and 501
        bi.update_stock_in_pool(999).unwrap();
        let lo = lookup(3000, 500).unwrap();
        let hi = lookup(3000, 501).unwrap();
        let ratio = lo + ((hi - lo) * dec!(0.5)).round_dp_with_strategy(18, RoundingStrategy::MidpointNearestEven);
        let expect = trunc_i64(ratio * dec!(6000) + dec!(1001)).unwrap();
        assert_eq!(bi.money_in_pool, expect);
        assert!(bi.is_consistent());
    }

    #[test]
    fn interpolation_rounds_once() {
        // (10*3000 - 10000) / (10000 - 3000) = 2.857...
        let mut bi = pool(dec!(1), dec!(10), 3000, 10_000);
        assert_eq!(bi.ar, 2857);
        // supplied 2 is two thirds of the way to the first sample
        bi.update_stock_in_pool(2998).unwrap();
        assert_eq!(bi.price, dec!(1.000000016112066679));
        assert_eq!(bi.money_in_pool, 2);
        assert!(bi.is_consistent());

        let hi = lookup(2857, 1).unwrap();
        let step = (hi * dec!(2) / dec!(3)).round_dp_with_strategy(18, RoundingStrategy::MidpointNearestEven);
        assert_eq!(bi.price - dec!(1), trunc_scale(step * dec!(9)));
    }

    #[test]
    fn fixed_point_helpers() {
        assert_eq!(to_fixed(dec!(1.5)), Some(1_500_000_000_000_000_000));
        assert_eq!(from_fixed(1_500_000_000_000_000_000), Some(dec!(1.5)));
        assert_eq!(half_even(2, 5, 10), 2);
        assert_eq!(half_even(3, 5, 10), 4);
        assert_eq!(half_even(3, 6, 10), 4);
        // 7 * 1 / 2 = 3.5e-18 rounds to 4e-18
        assert_eq!(interpolate(7, 1, 2), Some(4));
        assert_eq!(interpolate(5, 1, 2), Some(2));
        assert_eq!(mul_trunc(ONE / 3, 2 * ONE), Some(666_666_666_666_666_666));
        assert_eq!(scaled_quo(20_000, 7_000, 1000), Some(2857));
        assert_eq!(scaled_quo(-20_000, 7_000, 1000), Some(-2857));
    }

    #[test]
    fn tampered_state_is_inconsistent() {
        let mut bi = pool(dec!(1), dec!(10), 1000, 4000);
        bi.update_stock_in_pool(600).unwrap();
        let good = bi.clone();

        bi.money_in_pool += 1;
        assert!(!bi.is_consistent());

        let mut bi = good.clone();
        bi.ar += 1;
        assert!(!bi.is_consistent());

        let mut bi = good;
        bi.stock_in_pool = bi.max_supply + 1;
        assert!(!bi.is_consistent());
    }

    #[test]
    fn marginal_price_rises() {
        let mut bi = pool(dec!(1), dec!(10), 1000, 4000);
        assert_eq!(bi.current_price(), dec!(1));
        bi.update_stock_in_pool(700).unwrap();
        let p1 = bi.current_price();
        bi.update_stock_in_pool(300).unwrap();
        let p2 = bi.current_price();
        assert!(dec!(1) < p1 && p1 < p2 && p2 < dec!(10));
    }

    #[test]
    fn linear_price_cap() {
        assert_eq!(check_max_price(dec!(2), dec!(1), 10), Err(BancorError::PriceConfiguration));
        assert_eq!(
            check_max_price(dec!(1), dec!(3), MAX_TRADE_AMOUNT),
            Err(BancorError::PriceTooBig)
        );
        assert!(check_max_price(dec!(1), dec!(1), MAX_TRADE_AMOUNT).is_ok());
    }

    #[test]
    fn stock_precision_multiples() {
        assert!(check_stock_precision(1200, 2));
        assert!(!check_stock_precision(1250, 2));
        assert!(check_stock_precision(1251, 9));
        assert_eq!(stock_precision(9), 0);
        assert_eq!(stock_precision(8), 8);
    }

    #[test]
    fn pool_store() {
        let mut store = MemStore::new();
        let bi = pool(dec!(1), dec!(1), 2100, 0);
        set_pool(&mut store, &bi).unwrap();
        assert_eq!(get_pool(&store, "abc/cet").unwrap(), Some(bi.clone()));
        assert_eq!(all_pools(&store).unwrap(), vec![bi]);
        remove_pool(&mut store, "abc/cet");
        assert_eq!(get_pool(&store, "abc/cet").unwrap(), None);
    }

    #[test]
    fn error_codes() {
        assert_eq!(BancorError::StockInPoolOutOfBound.code(), 811);
        assert_eq!(BancorError::MoneyCrossLimit("more than").to_string(), "money more than the limit");
    }
}
