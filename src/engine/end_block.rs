// 8.4 engine/end_block.rs: per-block order lifecycle.
// the first block of each day only cleans up (expired orders, due delists).
// every other block runs one call auction per dirty market.

use chrono::{DateTime, Datelike, Utc};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use super::core::Engine;
use super::results::{EndBlockReport, EngineError};
use crate::assets::{AssetStatus, AuthX};
use crate::events::{CancelReason, EventPayload, FillEvent, MarketDelistedEvent, PriceUpdatedEvent};
use crate::ledger::Ledger;
use crate::market::{
    all_markets, delist_symbols_before, get_market, order_clean_time, remove_delist_requests_before, remove_market,
    set_market, set_order_clean_time,
};
use crate::matching::{match_orders, OrderForTrade, PriceBounds};
use crate::order::Order;
use crate::order_book::{dirty_markets, OrderBook};
use crate::settlement::settle_trade;
use crate::store::KvStore;
use crate::types::BlockContext;
use rust_decimal::Decimal;

/// An order inside one auction pass.
struct WrappedOrder {
    order: Order,
    hash: [u8; 32],
    changed: bool,
}

impl WrappedOrder {
    fn new(order: Order, data_hash: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(order.order_id().as_bytes());
        hasher.update(data_hash);
        Self {
            order,
            hash: hasher.finalize().into(),
            changed: false,
        }
    }
}

impl OrderForTrade for WrappedOrder {
    fn price(&self) -> Decimal {
        self.order.price.value()
    }

    // a bid that can no longer pay for its remainder sits out
    fn amount(&self) -> i64 {
        if self.order.not_enough_money() {
            0
        } else {
            self.order.left_stock
        }
    }

    fn height(&self) -> u64 {
        self.order.height
    }

    fn tie_break(&self) -> &[u8] {
        &self.hash
    }
}

impl<S, L, A, X> Engine<S, L, A, X>
where
    S: KvStore,
    L: Ledger,
    A: AssetStatus,
    X: AuthX,
{
    pub fn end_block(&mut self, ctx: &BlockContext) -> Result<EndBlockReport, EngineError> {
        let mut report = EndBlockReport::default();
        if self.need_cleanup(ctx)? {
            self.cleanup(ctx, &mut report)?;
            return Ok(report);
        }
        for symbol in dirty_markets(&self.store) {
            self.run_auction(ctx, &symbol, &mut report)?;
        }
        Ok(report)
    }

    fn need_cleanup(&self, ctx: &BlockContext) -> Result<bool, EngineError> {
        let last = match order_clean_time(&self.store)?.and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)) {
            Some(last) => last,
            None => return Ok(true),
        };
        if self.config.is_integration_net(&ctx.chain_id) {
            return Ok(last.timestamp().div_euclid(60) != ctx.unix_seconds().div_euclid(60));
        }
        // day of month only, so a gap of whole months reads as the same day
        Ok(last.day() != ctx.time.day())
    }

    fn cleanup(&mut self, ctx: &BlockContext, report: &mut EndBlockReport) -> Result<(), EngineError> {
        report.cleaned = true;
        set_order_clean_time(&mut self.store, ctx.unix_seconds());

        for market in all_markets(&self.store)? {
            let book = OrderBook::new(market.symbol());
            for order in book.get_older_than(&self.store, ctx.height)? {
                if order.height.saturating_add(order.exist_blocks) <= ctx.height {
                    self.remove_order(ctx, &order, CancelReason::GteTimeout);
                    report.expired_orders += 1;
                    report.removed_orders += 1;
                }
            }
        }

        let now = ctx.unix_nanos();
        for symbol in delist_symbols_before(&self.store, now) {
            let book = OrderBook::new(&symbol);
            let orders = book.get_all_orders(&self.store)?;
            for order in &orders {
                self.remove_order(ctx, order, CancelReason::Delisted);
            }
            report.removed_orders += orders.len();
            remove_market(&mut self.store, &symbol);
            book.clear_dirty(&mut self.store);
            info!(symbol = %symbol, removed_orders = orders.len(), "market delisted");

            self.emit_event(
                ctx.height,
                EventPayload::MarketDelisted(MarketDelistedEvent {
                    symbol: symbol.clone(),
                    removed_orders: orders.len(),
                }),
            );
            report.delisted_markets.push(symbol);
        }
        remove_delist_requests_before(&mut self.store, now);

        info!(
            height = ctx.height,
            expired = report.expired_orders,
            delisted = report.delisted_markets.len(),
            "order cleanup"
        );
        Ok(())
    }

    fn run_auction(&mut self, ctx: &BlockContext, symbol: &str, report: &mut EndBlockReport) -> Result<(), EngineError> {
        let book = OrderBook::new(symbol);
        let mut market = match get_market(&self.store, symbol)? {
            Some(market) => market,
            None => {
                book.clear_dirty(&mut self.store);
                return Ok(());
            }
        };
        // stays dirty until the issuer lifts the ban
        if self.assets.is_token_forbidden(&market.stock) || self.assets.is_token_forbidden(&market.money) {
            return Ok(());
        }

        let candidates = book.get_matching_candidates(&mut self.store)?;
        let (mut bids, mut asks) = {
            let assets = &self.assets;
            let tradable = |order: &Order| {
                !assets.is_forbidden_by_token_issuer(&market.stock, &order.sender)
                    && !assets.is_forbidden_by_token_issuer(&market.money, &order.sender)
            };
            let wrap = |orders: Vec<Order>| -> Vec<WrappedOrder> {
                orders
                    .into_iter()
                    .filter(|o| tradable(o))
                    .map(|o| WrappedOrder::new(o, &ctx.data_hash))
                    .collect()
            };
            (wrap(candidates.bids), wrap(candidates.asks))
        };

        let bounds = PriceBounds::around(
            market.last_executed_price,
            self.params.market.max_executed_price_change_ratio,
        );
        let ledger = &mut self.ledger;
        let mut fills = Vec::new();
        let executed = match_orders(&bounds, &mut bids, &mut asks, |bid, ask, amount, price| {
            match settle_trade(ledger, &mut bid.order, &mut ask.order, amount, price) {
                Ok(outcome) => {
                    bid.changed = true;
                    ask.changed = true;
                    debug!(
                        bid = %bid.order.order_id(),
                        ask = %ask.order.order_id(),
                        amount,
                        %price,
                        "trade"
                    );
                    fills.push(FillEvent::from_order(&bid.order, price, amount, outcome.money, outcome.stock_fee));
                    fills.push(FillEvent::from_order(&ask.order, price, amount, outcome.money, outcome.money_fee));
                    Ok(())
                }
                Err(err) => {
                    error!(symbol, %err, code = err.code(), "settlement failed");
                    Err(err.fault())
                }
            }
        });
        for fill in fills {
            self.emit_event(ctx.height, EventPayload::Fill(fill));
        }

        let mut changed: Vec<Order> = bids
            .into_iter()
            .chain(asks)
            .filter(|w| w.changed)
            .map(|w| w.order)
            .collect();
        // IOC orders of this block go away whether or not they crossed
        for order in book.get_orders_at_height(&self.store, ctx.height)? {
            if order.is_ioc() && !changed.iter().any(|c| c.order_id() == order.order_id()) {
                changed.push(order);
            }
        }

        for order in &changed {
            book.update(&mut self.store, order)?;
            let reason = if order.is_ioc() {
                CancelReason::IocType
            } else if order.is_filled() {
                CancelReason::AllFilled
            } else if order.not_enough_money() {
                warn!(order_id = %order.order_id(), freeze = order.freeze, left_stock = order.left_stock, "not enough money left");
                CancelReason::NoEnoughMoney
            } else {
                continue;
            };
            self.remove_order(ctx, order, reason);
            report.removed_orders += 1;
        }

        if let Some(price) = executed {
            let old_price = market.last_executed_price;
            market.last_executed_price = price;
            set_market(&mut self.store, &market)?;
            self.emit_event(
                ctx.height,
                EventPayload::PriceUpdated(PriceUpdatedEvent {
                    symbol: symbol.to_string(),
                    old_price,
                    new_price: price,
                }),
            );
            report.executed.push((symbol.to_string(), price));
        }
        Ok(())
    }
}
