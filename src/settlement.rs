// 9.3 settlement.rs: per-trade settlement, CET volume conversion, commission
// and referral rebates. all ledger effects go through a LedgerBatch so a
// failed trade leaves both balances and orders untouched.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::assets::AuthX;
use crate::ledger::{BatchError, Ledger, LedgerBatch};
use crate::market::last_price;
use crate::matching::DealFault;
use crate::order::Order;
use crate::store::{KvStore, StoreError};
use crate::types::{symbol, trunc_i64, Address, Bps, Coin, Side, CET, MAX_ORDER_AMOUNT, PRICE_SCALE};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettlementError {
    #[error("trade volume {0} exceeds the order amount limit")]
    VolumeTooLarge(Decimal),

    #[error("order {order_id} freezes {frozen}, trade needs {needed}")]
    FreezeUnderflow {
        order_id: String,
        side: Side,
        needed: i64,
        frozen: i64,
    },

    #[error("{side:?} side ledger batch failed: {source}")]
    Batch { side: Side, source: BatchError },
}

impl SettlementError {
    pub fn code(&self) -> u32 {
        match self {
            SettlementError::VolumeTooLarge(_) => 701,
            SettlementError::FreezeUnderflow { .. } => 702,
            SettlementError::Batch { .. } => 703,
        }
    }

    /// The order the matcher should drop from the current pass.
    pub fn fault(&self) -> DealFault {
        let side = match self {
            SettlementError::VolumeTooLarge(_) => Side::Buy,
            SettlementError::FreezeUnderflow { side, .. } | SettlementError::Batch { side, .. } => *side,
        };
        match side {
            Side::Buy => DealFault::Bid,
            Side::Sell => DealFault::Ask,
        }
    }
}

/// What one successful trade moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeOutcome {
    pub amount: i64,
    pub money: i64,
    pub price: Decimal,
    /// Stock withheld from the buyer.
    pub stock_fee: i64,
    /// Money withheld from the seller.
    pub money_fee: i64,
}

/// Settle `amount` stock at `price` between a bid and an ask.
///
/// The seller's half of the batch runs first, so a failure index tells which
/// side broke. On error nothing has changed.
pub fn settle_trade<L: Ledger + ?Sized>(
    ledger: &mut L,
    buyer: &mut Order,
    seller: &mut Order,
    amount: i64,
    price: Decimal,
) -> Result<TradeOutcome, SettlementError> {
    let volume = price
        .checked_mul(Decimal::from(amount))
        .ok_or(SettlementError::VolumeTooLarge(Decimal::MAX))?;
    let money = trunc_i64(volume)
        .filter(|m| *m <= MAX_ORDER_AMOUNT)
        .ok_or(SettlementError::VolumeTooLarge(volume))?;
    if buyer.freeze < money {
        return Err(SettlementError::FreezeUnderflow {
            order_id: buyer.order_id(),
            side: Side::Buy,
            needed: money,
            frozen: buyer.freeze,
        });
    }
    if seller.freeze < amount {
        return Err(SettlementError::FreezeUnderflow {
            order_id: seller.order_id(),
            side: Side::Sell,
            needed: amount,
            frozen: seller.freeze,
        });
    }

    let stock_fee = fee_of(buyer.fee_rate, amount);
    let money_fee = fee_of(seller.fee_rate, money);
    let (stock, money_denom) = (seller.stock().to_string(), buyer.money().to_string());

    let mut batch = LedgerBatch::new();
    batch
        .unfreeze(&seller.sender, Coin::new(stock.clone(), amount))
        .to_fee_collector(&seller.sender, Coin::new(stock.clone(), stock_fee))
        .send(&seller.sender, &buyer.sender, Coin::new(stock, amount - stock_fee));
    let seller_ops = batch.ops().len();
    batch
        .unfreeze(&buyer.sender, Coin::new(money_denom.clone(), money))
        .to_fee_collector(&buyer.sender, Coin::new(money_denom.clone(), money_fee))
        .send(&buyer.sender, &seller.sender, Coin::new(money_denom, money - money_fee));

    batch.execute(ledger).map_err(|source| SettlementError::Batch {
        side: if source.index < seller_ops { Side::Sell } else { Side::Buy },
        source,
    })?;

    for order in [&mut *buyer, &mut *seller] {
        order.left_stock -= amount;
        order.deal_stock += amount;
        order.deal_money += money;
    }
    buyer.freeze -= money;
    seller.freeze -= amount;

    Ok(TradeOutcome {
        amount,
        money,
        price,
        stock_fee,
        money_fee,
    })
}

fn fee_of(rate: Decimal, amount: i64) -> i64 {
    rate.checked_mul(Decimal::from(amount))
        .and_then(trunc_i64)
        .unwrap_or(0)
        .clamp(0, amount.max(0))
}

/// Value of a trade in CET, through the first CET market that has a price.
pub fn market_volume<S: KvStore>(
    store: &S,
    stock: &str,
    money: &str,
    stock_amount: i64,
    money_amount: i64,
) -> Result<Decimal, StoreError> {
    if stock == CET {
        return Ok(Decimal::from(stock_amount));
    }
    if money == CET {
        return Ok(Decimal::from(money_amount));
    }

    let money_amount = Decimal::from(money_amount);
    let stock_amount = Decimal::from(stock_amount);
    let chain: [(String, Decimal, bool); 4] = [
        (symbol(CET, money), money_amount, false),
        (symbol(CET, stock), stock_amount, false),
        (symbol(money, CET), money_amount, true),
        (symbol(stock, CET), stock_amount, true),
    ];
    for (market, amount, multiply) in chain {
        let Some(price) = last_price(store, &market)? else {
            continue;
        };
        if price.is_zero() {
            return Ok(Decimal::ZERO);
        }
        let volume = if multiply {
            amount.checked_mul(price)
        } else {
            amount
                .checked_div(price)
                .map(|v| v.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointNearestEven))
        };
        return Ok(volume.unwrap_or(Decimal::MAX));
    }
    Ok(Decimal::ZERO)
}

/// `max(min, trunc(volume * rate))`, saturating at i64::MAX.
pub fn commission(volume: Decimal, rate: Bps, min: i64) -> i64 {
    let fee = volume
        .checked_mul(rate.as_fraction())
        .and_then(trunc_i64)
        .unwrap_or(i64::MAX);
    fee.max(min)
}

/// A CET fee split between the collector and the payer's referrer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeSplit {
    pub total: i64,
    pub rebate: i64,
    pub referrer: Option<Address>,
}

impl FeeSplit {
    pub fn collected(&self) -> i64 {
        self.total - self.rebate
    }
}

pub fn split_fee<X: AuthX + ?Sized>(authx: &X, payer: &Address, fee: i64) -> FeeSplit {
    let base = authx.rebate_ratio_base();
    match authx.get_referrer(payer) {
        Some(referrer) if base > 0 && fee > 0 => {
            let rebate = i128::from(fee) * i128::from(authx.rebate_ratio()) / i128::from(base);
            let rebate = i64::try_from(rebate).unwrap_or(0).clamp(0, fee);
            FeeSplit {
                total: fee,
                rebate,
                referrer: Some(referrer),
            }
        }
        _ => FeeSplit {
            total: fee,
            rebate: 0,
            referrer: None,
        },
    }
}

/// Append the ledger ops for charging `fee` CET from `payer`.
pub fn charge_fee<X: AuthX + ?Sized>(batch: &mut LedgerBatch, authx: &X, payer: &Address, fee: i64) -> FeeSplit {
    let split = split_fee(authx, payer, fee);
    if let Some(referrer) = &split.referrer {
        batch.send(payer, referrer, Coin::cet(split.rebate));
    }
    batch.deduct_fee(payer, Coin::cet(split.collected()));
    split
}
