// 11.0 msgs.rs: the transactions the core accepts, with the stateless checks
// that run before any store access.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::bancor::{check_max_price, check_stock_precision, validate_ar, BancorError, MAX_TRADE_AMOUNT};
use crate::market::MarketError;
use crate::types::{
    is_valid_denom, split_symbol, symbol, Address, Price, Side, TimeInForce, CET, MAX_MARKET_PRECISION,
    MAX_ORDER_AMOUNT, MAX_ORDER_PRICE_PRECISION,
};

fn require_address(addr: &Address) -> Result<(), MarketError> {
    if addr.as_str().is_empty() {
        return Err(MarketError::InvalidAddress);
    }
    Ok(())
}

fn require_symbol(trading_pair: &str) -> Result<(), MarketError> {
    split_symbol(trading_pair)
        .map(|_| ())
        .ok_or_else(|| MarketError::InvalidSymbol(trading_pair.to_string()))
}

fn require_market_precision(precision: u8) -> Result<(), MarketError> {
    if precision > MAX_MARKET_PRECISION {
        return Err(MarketError::InvalidPricePrecision {
            given: precision,
            limit: MAX_MARKET_PRECISION,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateTradingPair {
    pub creator: Address,
    pub stock: String,
    pub money: String,
    pub price_precision: u8,
    pub order_precision: u8,
}

impl MsgCreateTradingPair {
    pub fn symbol(&self) -> String {
        symbol(&self.stock, &self.money)
    }

    pub fn validate_basic(&self) -> Result<(), MarketError> {
        require_address(&self.creator)?;
        require_symbol(&self.symbol())?;
        require_market_precision(self.price_precision)?;
        if self.order_precision > MAX_MARKET_PRECISION {
            return Err(MarketError::InvalidOrderPrecision(self.order_precision));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCancelTradingPair {
    pub sender: Address,
    pub trading_pair: String,
    /// Unix nanoseconds.
    pub effective_time: i64,
}

impl MsgCancelTradingPair {
    pub fn validate_basic(&self) -> Result<(), MarketError> {
        require_address(&self.sender)?;
        require_symbol(&self.trading_pair)?;
        if self.effective_time <= 0 {
            return Err(MarketError::InvalidCancelTime(self.effective_time));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgModifyPricePrecision {
    pub sender: Address,
    pub trading_pair: String,
    pub price_precision: u8,
}

impl MsgModifyPricePrecision {
    pub fn validate_basic(&self) -> Result<(), MarketError> {
        require_address(&self.sender)?;
        require_symbol(&self.trading_pair)?;
        require_market_precision(self.price_precision)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgModifyFeeRate {
    pub sender: Address,
    pub trading_pair: String,
    pub buy_fee_rate: Decimal,
    pub sell_fee_rate: Decimal,
}

impl MsgModifyFeeRate {
    pub fn validate_basic(&self) -> Result<(), MarketError> {
        require_address(&self.sender)?;
        require_symbol(&self.trading_pair)?;
        for rate in [self.buy_fee_rate, self.sell_fee_rate] {
            if rate.is_sign_negative() || rate >= Decimal::ONE {
                return Err(MarketError::InvalidFeeRate(rate));
            }
        }
        Ok(())
    }
}

/// A limit order. The price arrives as an integer plus a decimal exponent:
/// `price = price_raw * 10^-price_precision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCreateOrder {
    pub sender: Address,
    pub identify: u8,
    pub trading_pair: String,
    pub side: Side,
    pub price_raw: i64,
    pub price_precision: u8,
    pub quantity: i64,
    pub time_in_force: TimeInForce,
    /// GTE only. Zero means the free lifetime.
    pub exist_blocks: u64,
}

impl MsgCreateOrder {
    pub fn price(&self) -> Option<Price> {
        Price::from_raw(self.price_raw, self.price_precision)
    }

    pub fn validate_basic(&self) -> Result<(), MarketError> {
        require_address(&self.sender)?;
        require_symbol(&self.trading_pair)?;
        if self.quantity <= 0 || self.quantity > MAX_ORDER_AMOUNT {
            return Err(MarketError::InvalidOrderAmount(format!(
                "quantity {} out of range",
                self.quantity
            )));
        }
        if self.price_precision > MAX_ORDER_PRICE_PRECISION {
            return Err(MarketError::InvalidPricePrecision {
                given: self.price_precision,
                limit: MAX_ORDER_PRICE_PRECISION,
            });
        }
        if self.price_raw <= 0 || self.price().is_none() {
            return Err(MarketError::InvalidPrice);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgCancelOrder {
    pub sender: Address,
    pub order_id: String,
}

impl MsgCancelOrder {
    pub fn validate_basic(&self) -> Result<(), MarketError> {
        require_address(&self.sender)?;
        // "{sender}-{sequence}-{identify}"
        let mut parts = self.order_id.rsplitn(3, '-');
        let identify = parts.next().map(str::parse::<u8>);
        let sequence = parts.next().map(str::parse::<u64>);
        let sender = parts.next();
        match (identify, sequence, sender) {
            (Some(Ok(_)), Some(Ok(_)), Some(s)) if !s.is_empty() => Ok(()),
            _ => Err(MarketError::OrderNotFound(self.order_id.clone())),
        }
    }
}

fn require_pool_symbol(stock: &str, money: &str) -> Result<(), BancorError> {
    if !is_valid_denom(stock) || !is_valid_denom(money) || stock == money {
        return Err(BancorError::InvalidSymbol);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBancorInit {
    pub owner: Address,
    pub stock: String,
    pub money: String,
    pub init_price: Decimal,
    pub max_price: Decimal,
    pub max_supply: i64,
    /// Zero selects the linear curve.
    pub max_money: i64,
    pub stock_precision: u8,
    /// Unix seconds.
    pub earliest_cancel_time: i64,
}

impl MsgBancorInit {
    pub fn symbol(&self) -> String {
        symbol(&self.stock, &self.money)
    }

    pub fn validate_basic(&self) -> Result<(), BancorError> {
        if self.owner.as_str().is_empty() {
            return Err(BancorError::NotBancorOwner);
        }
        require_pool_symbol(&self.stock, &self.money)?;
        if self.max_supply <= 0 {
            return Err(BancorError::NonPositiveSupply);
        }
        if self.max_supply > MAX_TRADE_AMOUNT {
            return Err(BancorError::MaxSupplyTooBig);
        }
        if self.max_money < 0 {
            return Err(BancorError::NegativeMaxMoney);
        }
        if self.max_money > MAX_TRADE_AMOUNT {
            return Err(BancorError::MaxMoneyTooBig);
        }
        if !self.max_price.is_sign_positive() || self.max_price.is_zero() {
            return Err(BancorError::NonPositivePrice);
        }
        if self.init_price.is_sign_negative() && !self.init_price.is_zero() {
            return Err(BancorError::NegativePrice);
        }
        let ar = validate_ar(self.max_supply, self.max_money, self.init_price, self.max_price)?;
        if ar == 0 {
            check_max_price(self.init_price, self.max_price, self.max_supply)?;
        }
        if !check_stock_precision(self.max_supply, self.stock_precision) {
            return Err(BancorError::StockSupplyPrecisionNotMatch);
        }
        if self.earliest_cancel_time < 0 {
            return Err(BancorError::EarliestCancelTimeIsNegative);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBancorTrade {
    pub sender: Address,
    pub stock: String,
    pub money: String,
    pub amount: i64,
    pub side: Side,
    /// Buy: most money to pay. Sell: least money to take. Zero disables it.
    pub money_limit: i64,
}

impl MsgBancorTrade {
    pub fn symbol(&self) -> String {
        symbol(&self.stock, &self.money)
    }

    pub fn validate_basic(&self) -> Result<(), BancorError> {
        if self.sender.as_str().is_empty() {
            return Err(BancorError::OwnerIsProhibited);
        }
        if self.stock == CET {
            return Err(BancorError::InvalidSymbol);
        }
        require_pool_symbol(&self.stock, &self.money)?;
        if self.amount <= 0 {
            return Err(BancorError::NonPositiveAmount);
        }
        if self.amount > MAX_TRADE_AMOUNT {
            return Err(BancorError::TradeAmountTooLarge);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgBancorCancel {
    pub owner: Address,
    pub stock: String,
    pub money: String,
}

impl MsgBancorCancel {
    pub fn symbol(&self) -> String {
        symbol(&self.stock, &self.money)
    }

    pub fn validate_basic(&self) -> Result<(), BancorError> {
        if self.owner.as_str().is_empty() {
            return Err(BancorError::NotBancorOwner);
        }
        require_pool_symbol(&self.stock, &self.money)
    }
}
