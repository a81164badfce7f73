//! Bancor pool handlers. The owner's pool inventory sits frozen in the
//! owner's own account; trades swap through it.

use rust_decimal::Decimal;
use tracing::{debug, info};

use super::core::Engine;
use super::results::{BancorTradeResult, EngineError};
use crate::assets::{AssetStatus, AuthX};
use crate::bancor::{
    calculate_ar, check_stock_precision, get_pool, remove_pool, set_pool, stock_precision, BancorError, BancorInfo,
};
use crate::events::{BancorCanceledEvent, BancorCreatedEvent, BancorTradeEvent, EventPayload};
use crate::ledger::{Ledger, LedgerBatch};
use crate::msgs::{MsgBancorCancel, MsgBancorInit, MsgBancorTrade};
use crate::settlement::{charge_fee, commission, market_volume};
use crate::store::KvStore;
use crate::types::{BlockContext, Coin, Side, CET};

impl<S, L, A, X> Engine<S, L, A, X>
where
    S: KvStore,
    L: Ledger,
    A: AssetStatus,
    X: AuthX,
{
    pub fn bancor_init(&mut self, ctx: &BlockContext, msg: &MsgBancorInit) -> Result<(), EngineError> {
        msg.validate_basic()?;
        if msg.stock == CET {
            return Err(BancorError::InvalidSymbol.into());
        }
        let symbol = msg.symbol();
        if get_pool(&self.store, &symbol)?.is_some() {
            return Err(BancorError::AlreadyExists.into());
        }
        for denom in [&msg.stock, &msg.money] {
            if !self.assets.is_token_exists(denom) {
                return Err(BancorError::NoSuchToken(denom.clone()).into());
            }
        }
        if !self.assets.is_token_issuer(&msg.stock, &msg.owner) {
            return Err(BancorError::NonOwnerIsProhibited.into());
        }

        let supply = Coin::new(msg.stock.clone(), msg.max_supply);
        let fee = Coin::cet(self.params.bancor.create_bancor_fee);
        for needed in [&supply, &fee] {
            if !self.ledger.has_coins(&msg.owner, needed) {
                return Err(BancorError::InsufficientCoin(needed.clone()).into());
            }
        }
        let mut batch = LedgerBatch::new();
        batch
            .freeze(&msg.owner, supply)
            .deduct_fee(&msg.owner, fee);
        batch.execute(&mut self.ledger)?;

        let ar = calculate_ar(msg.max_supply, msg.max_money, msg.init_price, msg.max_price);
        let pool = BancorInfo {
            owner: msg.owner.clone(),
            stock: msg.stock.clone(),
            money: msg.money.clone(),
            init_price: msg.init_price,
            max_supply: msg.max_supply,
            stock_precision: stock_precision(msg.stock_precision),
            max_price: msg.max_price,
            max_money: msg.max_money,
            ar,
            price: msg.init_price,
            stock_in_pool: msg.max_supply,
            money_in_pool: 0,
            earliest_cancel_time: msg.earliest_cancel_time,
        };
        set_pool(&mut self.store, &pool)?;
        info!(symbol = %symbol, owner = %msg.owner, ar, "bancor pool created");

        self.emit_event(
            ctx.height,
            EventPayload::BancorCreated(BancorCreatedEvent {
                owner: msg.owner.clone(),
                symbol,
                max_supply: msg.max_supply,
                init_price: msg.init_price,
                max_price: msg.max_price,
                max_money: msg.max_money,
                ar,
                earliest_cancel_time: msg.earliest_cancel_time,
            }),
        );
        Ok(())
    }

    /// Buy stock from or sell stock to a pool. Fails without side effects.
    pub fn bancor_trade(&mut self, ctx: &BlockContext, msg: &MsgBancorTrade) -> Result<BancorTradeResult, EngineError> {
        msg.validate_basic()?;
        let symbol = msg.symbol();
        let pool = get_pool(&self.store, &symbol)?.ok_or_else(|| BancorError::NoBancorExists(symbol.clone()))?;
        if msg.sender == pool.owner {
            return Err(BancorError::OwnerIsProhibited.into());
        }
        for denom in [&pool.stock, &pool.money] {
            if self.assets.is_token_forbidden(denom)
                || self.assets.is_forbidden_by_token_issuer(denom, &msg.sender)
                || self.assets.is_forbidden_by_token_issuer(denom, &pool.owner)
            {
                return Err(BancorError::TokenForbiddenByOwner.into());
            }
        }
        if !check_stock_precision(msg.amount, pool.stock_precision) {
            return Err(BancorError::StockAmountPrecisionNotMatch.into());
        }

        let stock_in_pool = match msg.side {
            Side::Buy => pool.stock_in_pool.checked_sub(msg.amount),
            Side::Sell => pool.stock_in_pool.checked_add(msg.amount),
        }
        .ok_or(BancorError::StockInPoolOutOfBound)?;
        let mut next = pool.clone();
        next.update_stock_in_pool(stock_in_pool)?;

        let diff = match msg.side {
            Side::Buy => next.money_in_pool - pool.money_in_pool,
            Side::Sell => pool.money_in_pool - next.money_in_pool,
        };
        if diff <= 0 {
            return Err(BancorError::TradeMoneyNotPositive.into());
        }
        if msg.money_limit != 0 {
            match msg.side {
                Side::Buy if diff > msg.money_limit => return Err(BancorError::MoneyCrossLimit("more than").into()),
                Side::Sell if diff < msg.money_limit => return Err(BancorError::MoneyCrossLimit("less than").into()),
                _ => {}
            }
        }

        let volume = market_volume(&self.store, &pool.stock, &pool.money, msg.amount, diff)?;
        let fee = commission(
            volume,
            self.params.bancor.trade_fee_rate,
            self.params.market.market_fee_min,
        );

        // what the trader pays in, what the pool pays out
        let (to_pool, from_pool) = match msg.side {
            Side::Buy => (Coin::new(pool.money.clone(), diff), Coin::new(pool.stock.clone(), msg.amount)),
            Side::Sell => (Coin::new(pool.stock.clone(), msg.amount), Coin::new(pool.money.clone(), diff)),
        };
        self.require_trade_funds(msg, &to_pool, fee)?;

        let mut batch = LedgerBatch::new();
        batch
            .send(&msg.sender, &pool.owner, to_pool.clone())
            .freeze(&pool.owner, to_pool)
            .unfreeze(&pool.owner, from_pool.clone())
            .send(&pool.owner, &msg.sender, from_pool);
        let split = charge_fee(&mut batch, &self.authx, &msg.sender, fee);
        batch.execute(&mut self.ledger)?;
        set_pool(&mut self.store, &next)?;

        let tx_price = Decimal::from(diff) / Decimal::from(msg.amount);
        let new_price = next.current_price();
        debug!(symbol = %symbol, side = ?msg.side, amount = msg.amount, money = diff, %new_price, "bancor trade");

        self.emit_event(
            ctx.height,
            EventPayload::BancorTrade(BancorTradeEvent {
                sender: msg.sender.clone(),
                symbol,
                side: msg.side,
                amount: msg.amount,
                money: diff,
                tx_price,
                new_price,
                stock_in_pool: next.stock_in_pool,
                money_in_pool: next.money_in_pool,
                commission: fee,
                rebate: split.rebate,
            }),
        );

        Ok(BancorTradeResult {
            money: diff,
            commission: fee,
            rebate: split.rebate,
            referrer: split.referrer,
            new_price,
        })
    }

    fn require_trade_funds(&self, msg: &MsgBancorTrade, to_pool: &Coin, fee: i64) -> Result<(), BancorError> {
        if to_pool.denom == CET {
            let total = Coin::cet(to_pool.amount.checked_add(fee).ok_or(BancorError::Overflow)?);
            if !self.ledger.has_coins(&msg.sender, &total) {
                return Err(BancorError::InsufficientCoin(total));
            }
            return Ok(());
        }
        for needed in [to_pool.clone(), Coin::cet(fee)] {
            if !self.ledger.has_coins(&msg.sender, &needed) {
                return Err(BancorError::InsufficientCoin(needed));
            }
        }
        Ok(())
    }

    pub fn bancor_cancel(&mut self, ctx: &BlockContext, msg: &MsgBancorCancel) -> Result<(), EngineError> {
        msg.validate_basic()?;
        let symbol = msg.symbol();
        let pool = get_pool(&self.store, &symbol)?.ok_or_else(|| BancorError::NoBancorExists(symbol.clone()))?;
        if pool.owner != msg.owner {
            return Err(BancorError::NotBancorOwner.into());
        }
        if ctx.unix_seconds() < pool.earliest_cancel_time {
            return Err(BancorError::EarliestCancelTimeNotArrive(pool.earliest_cancel_time).into());
        }

        let fee = Coin::cet(self.params.bancor.cancel_bancor_fee);
        let mut batch = LedgerBatch::new();
        batch
            .unfreeze(&pool.owner, Coin::new(pool.stock.clone(), pool.stock_in_pool))
            .unfreeze(&pool.owner, Coin::new(pool.money.clone(), pool.money_in_pool))
            .deduct_fee(&pool.owner, fee);
        batch.execute(&mut self.ledger)?;
        remove_pool(&mut self.store, &symbol);
        info!(symbol = %symbol, stock = pool.stock_in_pool, money = pool.money_in_pool, "bancor pool canceled");

        self.emit_event(
            ctx.height,
            EventPayload::BancorCanceled(BancorCanceledEvent {
                owner: pool.owner,
                symbol,
                returned_stock: pool.stock_in_pool,
                returned_money: pool.money_in_pool,
            }),
        );
        Ok(())
    }
}
