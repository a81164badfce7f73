//! The resting order entity and the fee math tied to it.
//!
//! An order freezes funds when it is created. Fills draw the freeze down and
//! removal returns whatever is left, minus the commission and feature fee the
//! order actually owes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MarketParams;
use crate::types::{assemble_order_id, ceil_i64, round_i64, Address, Price, Side, TimeInForce};

/// A limit order in the book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub sender: Address,
    pub sequence: u64,
    pub identify: u8,
    pub trading_pair: String,
    pub side: Side,
    pub price: Price,
    pub quantity: i64,
    pub height: u64,
    pub time_in_force: TimeInForce,
    pub exist_blocks: u64,
    pub frozen_commission: i64,
    pub frozen_feature_fee: i64,
    pub fee_rate: Decimal,
    pub left_stock: i64,
    pub freeze: i64,
    pub deal_stock: i64,
    pub deal_money: i64,
}

impl Order {
    pub fn order_id(&self) -> String {
        assemble_order_id(&self.sender, self.sequence, self.identify)
    }

    pub fn stock(&self) -> &str {
        self.trading_pair
            .split_once('/')
            .map_or(self.trading_pair.as_str(), |(stock, _)| stock)
    }

    pub fn money(&self) -> &str {
        self.trading_pair.split_once('/').map_or("", |(_, money)| money)
    }

    /// Denom held in `freeze`: money for bids, stock for asks.
    pub fn frozen_denom(&self) -> &str {
        match self.side {
            Side::Buy => self.money(),
            Side::Sell => self.stock(),
        }
    }

    pub fn is_buy(&self) -> bool {
        self.side == Side::Buy
    }

    pub fn is_ioc(&self) -> bool {
        self.time_in_force == TimeInForce::Ioc
    }

    pub fn is_filled(&self) -> bool {
        self.left_stock == 0
    }

    /// A bid whose freeze no longer covers `price * left_stock`.
    pub fn not_enough_money(&self) -> bool {
        if self.side != Side::Buy {
            return false;
        }
        let needed = self
            .price
            .value()
            .checked_mul(Decimal::from(self.left_stock))
            .and_then(round_i64);
        match needed {
            Some(needed) => self.freeze < needed,
            None => true,
        }
    }

    /// Commission actually owed when the order leaves the book.
    pub fn actual_commission(&self, fee_for_zero_deal: i64) -> i64 {
        if self.deal_stock == 0 {
            return fee_for_zero_deal.min(self.frozen_commission);
        }
        if self.quantity <= 0 {
            return self.frozen_commission;
        }
        // rounded half up, pro-rated by dealt stock
        let numer = i128::from(self.frozen_commission) * i128::from(self.deal_stock) * 2
            + i128::from(self.quantity);
        let fee = numer / (i128::from(self.quantity) * 2);
        i64::try_from(fee)
            .unwrap_or(self.frozen_commission)
            .min(self.frozen_commission)
    }

    /// Feature fee actually owed at `current_height`, pro-rated over the blocks past the free lifetime.
    pub fn actual_feature_fee(&self, current_height: u64, lifetime: u64) -> i64 {
        if self.time_in_force != TimeInForce::Gte || self.frozen_feature_fee == 0 {
            return 0;
        }
        let age = current_height.saturating_sub(self.height);
        let billable = self.exist_blocks.saturating_sub(lifetime);
        if age <= lifetime || billable == 0 {
            return 0;
        }
        let used = (age - lifetime).min(billable);
        let fee = i128::from(self.frozen_feature_fee) * i128::from(used) / i128::from(billable);
        i64::try_from(fee)
            .unwrap_or(self.frozen_feature_fee)
            .min(self.frozen_feature_fee)
    }
}

/// Amount a fresh order freezes: `ceil(price * quantity)` of money for a bid,
/// `quantity` of stock for an ask. None when the product leaves i64 range.
pub fn order_freeze(side: Side, price: Price, quantity: i64) -> Option<i64> {
    match side {
        Side::Sell => Some(quantity),
        Side::Buy => price
            .value()
            .checked_mul(Decimal::from(quantity))
            .and_then(ceil_i64)
            .map(|amount| amount.max(1)),
    }
}

/// Feature fee frozen up front for a GTE order that wants to live `exist_blocks`.
pub fn feature_fee_for_exist_blocks(exist_blocks: u64, params: &MarketParams) -> i64 {
    if exist_blocks <= params.gte_order_lifetime {
        return 0;
    }
    let extra = exist_blocks - params.gte_order_lifetime;
    i64::try_from(extra)
        .ok()
        .and_then(|e| e.checked_mul(params.gte_order_feature_fee_by_blocks))
        .unwrap_or(i64::MAX)
}
