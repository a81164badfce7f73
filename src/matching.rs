//! Single-price call auction.
//!
//! Once per block and market, all crossing orders trade at one clearing price:
//! the price within the allowed band that executes the most volume. Orders are
//! then paired best-first, bids by price desc and asks by price asc, with ties
//! broken by creation height and then by a per-block hash.

use rust_decimal::Decimal;
use std::cmp::Ordering;

/// What the auction needs to know about an order.
pub trait OrderForTrade {
    fn price(&self) -> Decimal;
    /// Tradable remainder. Zero keeps the order out of the auction.
    fn amount(&self) -> i64;
    fn height(&self) -> u64;
    /// Tie-break bytes for orders with equal price and height.
    fn tie_break(&self) -> &[u8];
}

/// Which side of a pair made `deal` refuse. That order sits out the rest of the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DealFault {
    Bid,
    Ask,
}

/// Allowed clearing price band around the last executed price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBounds {
    pub low: Decimal,
    pub mid: Decimal,
    pub high: Decimal,
}

impl PriceBounds {
    /// `mid·(100−ratio)/100 ..= mid·(100+ratio)/100`. A zero mid means no trade
    /// has happened yet and leaves the band open.
    pub fn around(mid: Decimal, ratio: u32) -> Self {
        let ratio = Decimal::from(ratio);
        let hundred = Decimal::ONE_HUNDRED;
        Self {
            low: mid * (hundred - ratio) / hundred,
            mid,
            high: mid * (hundred + ratio) / hundred,
        }
    }

    pub fn unbounded() -> Self {
        Self {
            low: Decimal::ZERO,
            mid: Decimal::ZERO,
            high: Decimal::ZERO,
        }
    }

    pub fn is_bounded(&self) -> bool {
        !self.mid.is_zero()
    }

    pub fn contains(&self, price: Decimal) -> bool {
        !self.is_bounded() || (self.low <= price && price <= self.high)
    }
}

fn priority<O: OrderForTrade>(a: &O, b: &O) -> Ordering {
    a.height()
        .cmp(&b.height())
        .then_with(|| a.tie_break().cmp(b.tie_break()))
}

pub fn sort_bids<O: OrderForTrade>(bids: &mut [O]) {
    bids.sort_by(|a, b| b.price().cmp(&a.price()).then_with(|| priority(a, b)));
}

pub fn sort_asks<O: OrderForTrade>(asks: &mut [O]) {
    asks.sort_by(|a, b| a.price().cmp(&b.price()).then_with(|| priority(a, b)));
}

/// Clearing price and the volume it executes, for orders already sorted.
pub fn clearing_price<O: OrderForTrade>(bounds: &PriceBounds, bids: &[O], asks: &[O]) -> Option<(Decimal, i128)> {
    let mut candidates: Vec<Decimal> = bids
        .iter()
        .chain(asks.iter())
        .filter(|o| o.amount() > 0)
        .map(OrderForTrade::price)
        .collect();
    if bounds.is_bounded() {
        candidates.extend([bounds.low, bounds.mid, bounds.high]);
    }
    candidates.retain(|p| bounds.contains(*p));
    candidates.sort();
    candidates.dedup();

    // (volume, imbalance, distance to mid, price)
    let mut best: Option<(i128, i128, Decimal, Decimal)> = None;
    for price in candidates {
        let demand: i128 = bids
            .iter()
            .filter(|o| o.price() >= price)
            .map(|o| i128::from(o.amount().max(0)))
            .sum();
        let supply: i128 = asks
            .iter()
            .filter(|o| o.price() <= price)
            .map(|o| i128::from(o.amount().max(0)))
            .sum();
        let volume = demand.min(supply);
        if volume <= 0 {
            continue;
        }
        let imbalance = (demand - supply).abs();
        let distance = if bounds.is_bounded() {
            (price - bounds.mid).abs()
        } else {
            Decimal::ZERO
        };

        let better = match &best {
            None => true,
            Some((v, imb, dist, p)) => {
                volume > *v
                    || (volume == *v && imbalance < *imb)
                    || (volume == *v && imbalance == *imb && distance < *dist)
                    || (volume == *v && imbalance == *imb && distance == *dist && price < *p)
            }
        };
        if better {
            best = Some((volume, imbalance, distance, price));
        }
    }
    best.map(|(volume, _, _, price)| (price, volume))
}

/// Run one auction. `deal(bid, ask, amount, price)` settles one pair and must
/// reduce both amounts on success. Returns the clearing price when anything traded.
pub fn match_orders<O, F>(bounds: &PriceBounds, bids: &mut [O], asks: &mut [O], mut deal: F) -> Option<Decimal>
where
    O: OrderForTrade,
    F: FnMut(&mut O, &mut O, i64, Decimal) -> Result<(), DealFault>,
{
    sort_bids(bids);
    sort_asks(asks);
    let (price, _) = clearing_price(bounds, bids, asks)?;

    let mut traded = false;
    let (mut i, mut j) = (0, 0);
    while i < bids.len() && j < asks.len() {
        if bids[i].price() < price || asks[j].price() > price {
            break;
        }
        let bid_amount = bids[i].amount();
        if bid_amount <= 0 {
            i += 1;
            continue;
        }
        let ask_amount = asks[j].amount();
        if ask_amount <= 0 {
            j += 1;
            continue;
        }

        let amount = bid_amount.min(ask_amount);
        match deal(&mut bids[i], &mut asks[j], amount, price) {
            Ok(()) => {
                traded = true;
                if bids[i].amount() == bid_amount && asks[j].amount() == ask_amount {
                    // deal did not consume anything, skip both to stay finite
                    i += 1;
                    j += 1;
                }
            }
            Err(DealFault::Bid) => i += 1,
            Err(DealFault::Ask) => j += 1,
        }
    }

    traded.then_some(price)
}
