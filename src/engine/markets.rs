//! Trading pair administration: creation, delisting and owner settings.

use tracing::info;

use super::core::Engine;
use super::results::EngineError;
use crate::assets::{AssetStatus, AuthX};
use crate::events::{DelistRequestedEvent, EventPayload, MarketCreatedEvent};
use crate::ledger::{Ledger, LedgerBatch};
use crate::market::{add_delist_request, get_market, has_delist_request, market_exists, set_market, MarketError, MarketInfo};
use crate::msgs::{MsgCancelTradingPair, MsgCreateTradingPair, MsgModifyFeeRate, MsgModifyPricePrecision};
use crate::store::KvStore;
use crate::types::{Address, BlockContext, Coin};
use rust_decimal::Decimal;

impl<S, L, A, X> Engine<S, L, A, X>
where
    S: KvStore,
    L: Ledger,
    A: AssetStatus,
    X: AuthX,
{
    pub fn create_trading_pair(&mut self, ctx: &BlockContext, msg: &MsgCreateTradingPair) -> Result<(), EngineError> {
        msg.validate_basic()?;
        for denom in [&msg.stock, &msg.money] {
            if !self.assets.is_token_exists(denom) {
                return Err(MarketError::InvalidToken(denom.clone()).into());
            }
        }
        if !self.assets.is_token_issuer(&msg.stock, &msg.creator) {
            return Err(MarketError::InvalidTokenIssuer(msg.creator.clone()).into());
        }
        let symbol = msg.symbol();
        if market_exists(&self.store, &symbol) {
            return Err(MarketError::RepeatTradingPair(symbol).into());
        }

        let fee = Coin::cet(self.params.market.create_market_fee);
        if !self.ledger.has_coins(&msg.creator, &fee) {
            return Err(MarketError::InsufficientCoin(fee).into());
        }
        let mut batch = LedgerBatch::new();
        batch.deduct_fee(&msg.creator, fee.clone());
        batch.execute(&mut self.ledger)?;

        let info = MarketInfo {
            stock: msg.stock.clone(),
            money: msg.money.clone(),
            price_precision: msg.price_precision,
            order_precision: msg.order_precision,
            last_executed_price: Decimal::ZERO,
            buy_fee_rate: self.params.market.default_buy_fee_rate,
            sell_fee_rate: self.params.market.default_sell_fee_rate,
        };
        set_market(&mut self.store, &info)?;
        info!(symbol = %symbol, creator = %msg.creator, "market created");

        self.emit_event(
            ctx.height,
            EventPayload::MarketCreated(MarketCreatedEvent {
                symbol,
                creator: msg.creator.clone(),
                price_precision: msg.price_precision,
                order_precision: msg.order_precision,
                creation_fee: fee.amount,
            }),
        );
        Ok(())
    }

    /// Queue a market for removal at `effective_time`. The cleanup pass of the
    /// first block past that time cancels its orders and drops it.
    pub fn cancel_trading_pair(&mut self, ctx: &BlockContext, msg: &MsgCancelTradingPair) -> Result<(), EngineError> {
        msg.validate_basic()?;
        self.owned_market(&msg.trading_pair, &msg.sender)?;

        let earliest = ctx
            .unix_nanos()
            .saturating_add(self.params.market.market_min_expired_time);
        if msg.effective_time < earliest {
            return Err(MarketError::InvalidCancelTime(msg.effective_time).into());
        }
        if has_delist_request(&self.store, &msg.trading_pair) {
            return Err(MarketError::DelistRequestExist(msg.trading_pair.clone()).into());
        }

        add_delist_request(&mut self.store, msg.effective_time, &msg.trading_pair);
        info!(symbol = %msg.trading_pair, effective_time = msg.effective_time, "delist requested");
        self.emit_event(
            ctx.height,
            EventPayload::DelistRequested(DelistRequestedEvent {
                symbol: msg.trading_pair.clone(),
                sender: msg.sender.clone(),
                effective_time: msg.effective_time,
            }),
        );
        Ok(())
    }

    pub fn modify_price_precision(&mut self, msg: &MsgModifyPricePrecision) -> Result<(), EngineError> {
        msg.validate_basic()?;
        let mut info = self.owned_market(&msg.trading_pair, &msg.sender)?;
        info.price_precision = msg.price_precision;
        set_market(&mut self.store, &info)?;
        Ok(())
    }

    pub fn modify_fee_rate(&mut self, msg: &MsgModifyFeeRate) -> Result<(), EngineError> {
        msg.validate_basic()?;
        let mut info = self.owned_market(&msg.trading_pair, &msg.sender)?;
        info.buy_fee_rate = msg.buy_fee_rate;
        info.sell_fee_rate = msg.sell_fee_rate;
        set_market(&mut self.store, &info)?;
        Ok(())
    }

    /// The market, provided `sender` owns its stock.
    fn owned_market(&self, trading_pair: &str, sender: &Address) -> Result<MarketInfo, EngineError> {
        let info = get_market(&self.store, trading_pair)?
            .ok_or_else(|| MarketError::InvalidMarket(trading_pair.to_string()))?;
        if self.assets.get_token_owner(&info.stock).as_ref() != Some(sender) {
            return Err(MarketError::NotMatchSender.into());
        }
        Ok(info)
    }
}
