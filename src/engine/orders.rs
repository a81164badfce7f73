//! Order creation, cancellation and removal.

use rust_decimal::Decimal;
use tracing::{debug, error, warn};

use super::core::Engine;
use super::results::{EngineError, OrderCreated};
use crate::assets::{AssetStatus, AuthX};
use crate::events::{CancelReason, EventPayload, OrderCanceledEvent, OrderCreatedEvent};
use crate::ledger::{Ledger, LedgerBatch};
use crate::market::{get_market, MarketError};
use crate::msgs::{MsgCancelOrder, MsgCreateOrder};
use crate::order::{feature_fee_for_exist_blocks, order_freeze, Order};
use crate::order_book::OrderBook;
use crate::settlement::{charge_fee, commission, market_volume};
use crate::store::{KvStore, StoreError};
use crate::types::{assemble_order_id, trunc_i64, BlockContext, Coin, TimeInForce, CET, MAX_ORDER_AMOUNT};

impl<S, L, A, X> Engine<S, L, A, X>
where
    S: KvStore,
    L: Ledger,
    A: AssetStatus,
    X: AuthX,
{
    /// Place a limit order. `sequence` is the sender's account sequence for this tx.
    pub fn create_order(
        &mut self,
        ctx: &BlockContext,
        sequence: u64,
        msg: &MsgCreateOrder,
    ) -> Result<OrderCreated, EngineError> {
        msg.validate_basic()?;
        let market = get_market(&self.store, &msg.trading_pair)?
            .ok_or_else(|| MarketError::InvalidMarket(msg.trading_pair.clone()))?;

        if msg.price_precision > market.price_precision {
            return Err(MarketError::InvalidPricePrecision {
                given: msg.price_precision,
                limit: market.price_precision,
            }
            .into());
        }
        if msg.quantity % market.granularity() != 0 {
            return Err(MarketError::InvalidOrderAmount(format!(
                "quantity {} is not a multiple of {}",
                msg.quantity,
                market.granularity()
            ))
            .into());
        }
        for denom in [&market.stock, &market.money] {
            if self.assets.is_token_forbidden(denom) {
                return Err(MarketError::TokenForbidByIssuer(denom.clone()).into());
            }
            if self.assets.is_forbidden_by_token_issuer(denom, &msg.sender) {
                return Err(MarketError::AddressForbidByIssuer {
                    addr: msg.sender.clone(),
                    denom: denom.clone(),
                }
                .into());
            }
        }

        let price = msg.price().ok_or(MarketError::InvalidPrice)?;
        let freeze = order_freeze(msg.side, price, msg.quantity)
            .filter(|f| *f <= MAX_ORDER_AMOUNT)
            .ok_or_else(|| MarketError::InvalidOrderAmount("frozen amount is too large".to_string()))?;

        let order_id = assemble_order_id(&msg.sender, sequence, msg.identify);
        if OrderBook::get_order(&self.store, &order_id)?.is_some() {
            return Err(MarketError::OrderAlreadyExist(order_id).into());
        }

        let params = &self.params.market;
        let exist_blocks = match msg.time_in_force {
            TimeInForce::Gte if msg.exist_blocks == 0 => params.gte_order_lifetime,
            _ => msg.exist_blocks,
        };
        let money_amount = price
            .value()
            .checked_mul(Decimal::from(msg.quantity))
            .and_then(trunc_i64)
            .unwrap_or(MAX_ORDER_AMOUNT);
        let volume = market_volume(&self.store, &market.stock, &market.money, msg.quantity, money_amount)?;
        let frozen_commission = commission(volume, params.market_fee_rate, params.market_fee_min);
        let frozen_feature_fee = match msg.time_in_force {
            TimeInForce::Gte => feature_fee_for_exist_blocks(exist_blocks, params),
            TimeInForce::Ioc => 0,
        };
        let fees = frozen_commission
            .checked_add(frozen_feature_fee)
            .ok_or(MarketError::InsufficientCoin(Coin::cet(i64::MAX)))?;

        let order = Order {
            sender: msg.sender.clone(),
            sequence,
            identify: msg.identify,
            trading_pair: msg.trading_pair.clone(),
            side: msg.side,
            price,
            quantity: msg.quantity,
            height: ctx.height,
            time_in_force: msg.time_in_force,
            exist_blocks,
            frozen_commission,
            frozen_feature_fee,
            fee_rate: market.fee_rate(msg.side),
            left_stock: msg.quantity,
            freeze,
            deal_stock: 0,
            deal_money: 0,
        };

        // funds check, combined when the order itself freezes CET
        let frozen_denom = order.frozen_denom().to_string();
        if frozen_denom == CET {
            let total = freeze
                .checked_add(fees)
                .ok_or(MarketError::InsufficientCoin(Coin::cet(i64::MAX)))?;
            if !self.ledger.has_coins(&order.sender, &Coin::cet(total)) {
                return Err(MarketError::InsufficientCoin(Coin::cet(total)).into());
            }
        } else {
            let needed = Coin::new(frozen_denom.clone(), freeze);
            if !self.ledger.has_coins(&order.sender, &needed) {
                return Err(MarketError::InsufficientCoin(needed).into());
            }
            if !self.ledger.has_coins(&order.sender, &Coin::cet(fees)) {
                return Err(MarketError::InsufficientCoin(Coin::cet(fees)).into());
            }
        }

        let mut batch = LedgerBatch::new();
        batch
            .freeze(&order.sender, Coin::new(frozen_denom, freeze))
            .freeze(&order.sender, Coin::cet(frozen_commission))
            .freeze(&order.sender, Coin::cet(frozen_feature_fee));
        batch.execute(&mut self.ledger)?;

        OrderBook::new(&order.trading_pair).add(&mut self.store, &order)?;
        debug!(order_id = %order_id, side = ?order.side, price = %price, quantity = order.quantity, "order created");

        self.emit_event(
            ctx.height,
            EventPayload::OrderCreated(OrderCreatedEvent {
                order_id: order_id.clone(),
                trading_pair: order.trading_pair.clone(),
                sender: order.sender.clone(),
                side: order.side,
                price: price.value(),
                quantity: order.quantity,
                freeze,
                frozen_commission,
                frozen_feature_fee,
            }),
        );

        Ok(OrderCreated {
            order_id,
            freeze,
            frozen_commission,
            frozen_feature_fee,
        })
    }

    pub fn cancel_order(&mut self, ctx: &BlockContext, msg: &MsgCancelOrder) -> Result<(), EngineError> {
        msg.validate_basic()?;
        let order = OrderBook::get_order(&self.store, &msg.order_id)?
            .ok_or_else(|| MarketError::OrderNotFound(msg.order_id.clone()))?;
        if order.sender != msg.sender {
            return Err(MarketError::NotMatchSender.into());
        }
        self.remove_order(ctx, &order, CancelReason::Manual);
        Ok(())
    }

    /// Take an order off the book: return its freeze and charge what it owes.
    /// Never fails. Problems are logged and the block goes on.
    pub(super) fn remove_order(&mut self, ctx: &BlockContext, order: &Order, reason: CancelReason) {
        let order_id = order.order_id();
        match OrderBook::get_order(&self.store, &order_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                warn!(order_id = %order_id, ?reason, "order already removed");
                return;
            }
            Err(err) => {
                error!(order_id = %order_id, %err, "failed to load order for removal");
                return;
            }
        }

        let params = &self.params.market;
        let used_commission = if order.frozen_commission != 0 {
            order.actual_commission(params.fee_for_zero_deal)
        } else {
            0
        };
        let used_feature_fee = order.actual_feature_fee(ctx.height, params.gte_order_lifetime);

        let mut batch = LedgerBatch::new();
        batch
            .unfreeze(&order.sender, Coin::new(order.frozen_denom(), order.freeze))
            .unfreeze(&order.sender, Coin::cet(order.frozen_commission));
        let commission_split = charge_fee(&mut batch, &self.authx, &order.sender, used_commission);
        let mut rebate_amount = commission_split.rebate;
        if order.time_in_force == TimeInForce::Gte && order.frozen_feature_fee != 0 {
            batch.unfreeze(&order.sender, Coin::cet(order.frozen_feature_fee));
            rebate_amount += charge_fee(&mut batch, &self.authx, &order.sender, used_feature_fee).rebate;
        }
        if let Err(err) = batch.execute(&mut self.ledger) {
            error!(order_id = %order_id, %err, "ledger rejected order removal");
        }

        if let Err(err) = OrderBook::new(&order.trading_pair).remove(&mut self.store, order) {
            match err {
                StoreError::OrderNotFound(_) => warn!(order_id = %order_id, "order vanished during removal"),
                err => error!(order_id = %order_id, %err, "failed to delete order"),
            }
            return;
        }
        debug!(order_id = %order_id, ?reason, used_commission, used_feature_fee, "order removed");

        self.emit_event(
            ctx.height,
            EventPayload::OrderCanceled(OrderCanceledEvent {
                order_id,
                trading_pair: order.trading_pair.clone(),
                sender: order.sender.clone(),
                reason,
                left_stock: order.left_stock,
                remain_amount: order.freeze,
                deal_stock: order.deal_stock,
                deal_money: order.deal_money,
                used_commission,
                used_feature_fee,
                rebate_amount,
                rebate_referee: commission_split.referrer,
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::*;
    use crate::events::{CancelReason, EventPayload};
    use crate::market::MarketError;
    use crate::msgs::MsgCancelOrder;
    use crate::types::{Address, Side, TimeInForce};
    use crate::engine::EngineError;

    #[test]
    fn sell_order_freezes_stock_and_cancel_returns_it() {
        let (mut engine, ctx) = engine_with_market(2);
        let alice = Address::new("alice");
        let before_cet = engine.ledger().available(&alice, "cet");

        let created = engine
            .create_order(&ctx, 1, &order_msg(&alice, Side::Sell, 100, 8, 10_000_000, TimeInForce::Gte))
            .unwrap();
        assert_eq!(created.freeze, 10_000_000);
        assert_eq!(engine.ledger().frozen(&alice, "abc"), 10_000_000);
        assert_eq!(engine.ledger().frozen(&alice, "cet"), created.frozen_commission);

        let cancel = MsgCancelOrder {
            sender: alice.clone(),
            order_id: created.order_id.clone(),
        };
        engine.cancel_order(&ctx, &cancel).unwrap();
        assert_eq!(engine.ledger().frozen(&alice, "abc"), 0);
        assert_eq!(engine.ledger().available(&alice, "abc"), STOCK_BALANCE);
        // nothing dealt: only the zero-deal fee is kept
        assert_eq!(engine.ledger().available(&alice, "cet"), before_cet - 10);
        assert!(engine.get_order(&created.order_id).unwrap().is_none());

        let reasons: Vec<_> = engine
            .events()
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::OrderCanceled(c) => Some(c.reason),
                _ => None,
            })
            .collect();
        assert_eq!(reasons, vec![CancelReason::Manual]);
    }

    #[test]
    fn removing_twice_is_a_no_op() {
        let (mut engine, ctx) = engine_with_market(2);
        let alice = Address::new("alice");
        let created = engine
            .create_order(&ctx, 1, &order_msg(&alice, Side::Sell, 100, 8, 1_000, TimeInForce::Gte))
            .unwrap();
        let stale = engine.get_order(&created.order_id).unwrap().unwrap();
        let cancel = MsgCancelOrder {
            sender: alice.clone(),
            order_id: created.order_id.clone(),
        };
        engine.cancel_order(&ctx, &cancel).unwrap();
        let balances = |engine: &crate::engine::MemEngine| {
            ["abc", "cet"].map(|d| (engine.ledger().available(&alice, d), engine.ledger().frozen(&alice, d)))
        };
        let after_cancel = balances(&engine);

        engine.remove_order(&ctx, &stale, CancelReason::GteTimeout);
        assert!(matches!(
            engine.cancel_order(&ctx, &cancel),
            Err(EngineError::Market(MarketError::OrderNotFound(_)))
        ));
        engine.end_block(&ctx).unwrap();

        assert_eq!(balances(&engine), after_cancel);
        let canceled = engine
            .events()
            .iter()
            .filter(|e| matches!(e.payload, EventPayload::OrderCanceled(_)))
            .count();
        assert_eq!(canceled, 1);
    }

    #[test]
    fn buy_order_freeze_rounds_up() {
        let (mut engine, ctx) = engine_with_market(2);
        let bob = Address::new("bob");
        let created = engine
            .create_order(&ctx, 1, &order_msg(&bob, Side::Buy, 3, 8, 100_000_100, TimeInForce::Gte))
            .unwrap();
        // 3e-8 * 100000100 = 3.000003
        assert_eq!(created.freeze, 4);
        assert_eq!(engine.ledger().frozen(&bob, "cet"), 4 + created.frozen_commission);
    }

    #[test]
    fn rejects_bad_orders() {
        let (mut engine, ctx) = engine_with_market(2);
        let alice = Address::new("alice");

        let mut msg = order_msg(&alice, Side::Sell, 100, 8, 10_000_000, TimeInForce::Gte);
        msg.trading_pair = "xyz/cet".to_string();
        assert!(matches!(
            engine.create_order(&ctx, 1, &msg),
            Err(EngineError::Market(MarketError::InvalidMarket(_)))
        ));

        let msg = order_msg(&alice, Side::Sell, 100, 9, 10_000_000, TimeInForce::Gte);
        assert!(matches!(
            engine.create_order(&ctx, 1, &msg),
            Err(EngineError::Market(MarketError::InvalidPricePrecision { given: 9, limit: 8 }))
        ));

        let msg = order_msg(&alice, Side::Sell, 100, 8, 10_000_001, TimeInForce::Gte);
        assert!(matches!(
            engine.create_order(&ctx, 1, &msg),
            Err(EngineError::Market(MarketError::InvalidOrderAmount(_)))
        ));

        let msg = order_msg(&alice, Side::Sell, 100, 8, STOCK_BALANCE + 100, TimeInForce::Gte);
        assert!(matches!(
            engine.create_order(&ctx, 1, &msg),
            Err(EngineError::Market(MarketError::InsufficientCoin(_)))
        ));

        let msg = order_msg(&alice, Side::Sell, 100, 8, 100, TimeInForce::Gte);
        engine.create_order(&ctx, 5, &msg).unwrap();
        assert!(matches!(
            engine.create_order(&ctx, 5, &msg),
            Err(EngineError::Market(MarketError::OrderAlreadyExist(_)))
        ));
    }

    #[test]
    fn forbidden_tokens_and_addresses() {
        let (mut engine, ctx) = engine_with_market(2);
        let alice = Address::new("alice");
        let msg = order_msg(&alice, Side::Sell, 100, 8, 100, TimeInForce::Gte);

        engine.assets_mut().forbid_address("abc", &alice);
        assert!(matches!(
            engine.create_order(&ctx, 1, &msg),
            Err(EngineError::Market(MarketError::AddressForbidByIssuer { .. }))
        ));
        engine.assets_mut().forbid_token("abc", true);
        assert!(matches!(
            engine.create_order(&ctx, 1, &msg),
            Err(EngineError::Market(MarketError::TokenForbidByIssuer(_)))
        ));
    }

    #[test]
    fn only_sender_may_cancel() {
        let (mut engine, ctx) = engine_with_market(2);
        let alice = Address::new("alice");
        let created = engine
            .create_order(&ctx, 1, &order_msg(&alice, Side::Sell, 100, 8, 100, TimeInForce::Gte))
            .unwrap();
        let cancel = MsgCancelOrder {
            sender: Address::new("bob"),
            order_id: created.order_id,
        };
        assert_eq!(
            engine.cancel_order(&ctx, &cancel),
            Err(EngineError::Market(MarketError::NotMatchSender))
        );
        let missing = MsgCancelOrder {
            sender: alice,
            order_id: "alice-99-0".to_string(),
        };
        assert!(matches!(
            engine.cancel_order(&ctx, &missing),
            Err(EngineError::Market(MarketError::OrderNotFound(_)))
        ));
    }

    #[test]
    fn long_lived_gte_pays_feature_fee_up_front() {
        let (mut engine, ctx) = engine_with_market(2);
        let alice = Address::new("alice");
        let mut msg = order_msg(&alice, Side::Sell, 100, 8, 100, TimeInForce::Gte);
        msg.exist_blocks = 10_100;
        let created = engine.create_order(&ctx, 1, &msg).unwrap();
        assert_eq!(created.frozen_feature_fee, 100 * 6);

        msg.exist_blocks = 0;
        let created = engine.create_order(&ctx, 2, &msg).unwrap();
        assert_eq!(created.frozen_feature_fee, 0);
        let order = engine.get_order(&created.order_id).unwrap().unwrap();
        assert_eq!(order.exist_blocks, 10_000);
    }
}
