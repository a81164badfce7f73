// 12.0 genesis.rs: chain state snapshot. validated before import so a bad
// file is rejected as a whole instead of half-applied.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::bancor::BancorInfo;
use crate::config::{ConfigError, Params};
use crate::market::MarketInfo;
use crate::order::Order;
use crate::types::{split_symbol, CET, MAX_MARKET_PRECISION};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    pub markets: Vec<MarketInfo>,
    pub orders: Vec<Order>,
    pub pools: Vec<BancorInfo>,
    /// `(effective time in unix nanos, symbol)`.
    pub delist_requests: Vec<(i64, String)>,
    /// Unix seconds of the last cleanup pass.
    pub order_clean_time: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenesisError {
    #[error("invalid params: {0}")]
    Params(#[from] ConfigError),

    #[error("invalid market symbol {0}")]
    InvalidMarket(String),

    #[error("duplicate market {0}")]
    DuplicateMarket(String),

    #[error("order {0} references an unknown market")]
    OrderWithoutMarket(String),

    #[error("duplicate order {0}")]
    DuplicateOrder(String),

    #[error("invalid pool {symbol}: {reason}")]
    InvalidPool { symbol: String, reason: &'static str },

    #[error("delist request for unknown market {0}")]
    InvalidDelistRequest(String),
}

impl GenesisState {
    pub fn validate(&self) -> Result<(), GenesisError> {
        self.params.validate()?;

        let mut symbols = BTreeSet::new();
        for market in &self.markets {
            let symbol = market.symbol();
            if split_symbol(&symbol).is_none()
                || market.price_precision > MAX_MARKET_PRECISION
                || market.order_precision > MAX_MARKET_PRECISION
            {
                return Err(GenesisError::InvalidMarket(symbol));
            }
            if !symbols.insert(symbol.clone()) {
                return Err(GenesisError::DuplicateMarket(symbol));
            }
        }

        let mut order_ids = BTreeSet::new();
        for order in &self.orders {
            let id = order.order_id();
            if !symbols.contains(&order.trading_pair) {
                return Err(GenesisError::OrderWithoutMarket(id));
            }
            if !order_ids.insert(id.clone()) {
                return Err(GenesisError::DuplicateOrder(id));
            }
        }

        for pool in &self.pools {
            validate_pool(pool)?;
        }

        for (_, symbol) in &self.delist_requests {
            if !symbols.contains(symbol) {
                return Err(GenesisError::InvalidDelistRequest(symbol.clone()));
            }
        }
        Ok(())
    }
}

fn validate_pool(pool: &BancorInfo) -> Result<(), GenesisError> {
    let symbol = pool.symbol();
    let invalid = |reason| GenesisError::InvalidPool {
        symbol: symbol.clone(),
        reason,
    };
    if split_symbol(&symbol).is_none() {
        return Err(invalid("malformed symbol"));
    }
    if pool.stock == CET {
        return Err(invalid("stock must not be the fee token"));
    }
    if pool.owner.as_str().is_empty() {
        return Err(invalid("missing owner"));
    }
    if pool.max_supply <= 0 || pool.max_money < 0 || pool.init_price.is_sign_negative() || pool.earliest_cancel_time < 0 {
        return Err(invalid("negative configuration"));
    }
    if pool.stock_precision > MAX_MARKET_PRECISION {
        return Err(invalid("stock precision above 8"));
    }
    if !pool.is_consistent() {
        return Err(invalid("state does not match its curve"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bancor::tests::pool;
    use crate::engine::tests::{engine_with_market, order_msg};
    use crate::engine::{EngineConfig, MemEngine};
    use crate::types::{Address, Side, TimeInForce};
    use rust_decimal_macros::dec;

    fn populated() -> MemEngine {
        populated_with(0)
    }

    fn populated_with(stock_precision: u8) -> MemEngine {
        let (mut engine, ctx) = engine_with_market(0);
        engine.end_block(&ctx).unwrap();
        let alice = Address::new("alice");
        engine
            .create_order(&ctx, 1, &order_msg(&alice, Side::Sell, 100, 8, 10, TimeInForce::Gte))
            .unwrap();
        engine
            .create_order(&ctx, 2, &order_msg(&alice, Side::Buy, 50, 8, 10, TimeInForce::Gte))
            .unwrap();
        engine
            .bancor_init(
                &ctx,
                &crate::msgs::MsgBancorInit {
                    owner: alice,
                    stock: "abc".to_string(),
                    money: "cet".to_string(),
                    init_price: dec!(1),
                    max_price: dec!(10),
                    max_supply: 1000,
                    max_money: 4000,
                    stock_precision,
                    earliest_cancel_time: 0,
                },
            )
            .unwrap();
        engine
    }

    #[test]
    fn export_import_round_trip() {
        let engine = populated();
        let state = engine.export_genesis().unwrap();
        assert_eq!(state.markets.len(), 1);
        assert_eq!(state.orders.len(), 2);
        assert_eq!(state.pools.len(), 1);
        assert!(state.order_clean_time.is_some());
        state.validate().unwrap();

        let json = serde_json::to_string(&state).unwrap();
        let back: GenesisState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);

        let mut fresh = MemEngine::in_memory(EngineConfig::default(), Params::testnet());
        fresh.init_genesis(&back).unwrap();
        assert_eq!(fresh.params(), &Params::default());
        assert_eq!(fresh.export_genesis().unwrap(), state);
    }

    #[test]
    fn oversized_pool_precision_survives_round_trip() {
        let state = populated_with(9).export_genesis().unwrap();
        assert_eq!(state.pools[0].stock_precision, 0);
        state.validate().unwrap();

        let mut fresh = MemEngine::in_memory(EngineConfig::default(), Params::default());
        fresh.init_genesis(&state).unwrap();
        assert_eq!(fresh.export_genesis().unwrap(), state);
    }

    #[test]
    fn orders_need_their_market() {
        let mut state = populated().export_genesis().unwrap();
        state.markets.clear();
        assert!(matches!(state.validate(), Err(GenesisError::OrderWithoutMarket(_))));
    }

    #[test]
    fn duplicates_rejected() {
        let mut state = populated().export_genesis().unwrap();
        let market = state.markets[0].clone();
        state.markets.push(market);
        assert_eq!(state.validate(), Err(GenesisError::DuplicateMarket("abc/cet".to_string())));

        let mut state = populated().export_genesis().unwrap();
        let order = state.orders[0].clone();
        state.orders.push(order);
        assert!(matches!(state.validate(), Err(GenesisError::DuplicateOrder(_))));
    }

    #[test]
    fn pools_must_be_consistent() {
        let mut state = GenesisState::default();
        let mut bad = pool(dec!(1), dec!(10), 1000, 4000);
        bad.money_in_pool = 1;
        state.pools.push(bad);
        assert!(matches!(state.validate(), Err(GenesisError::InvalidPool { .. })));

        let mut cet_stock = pool(dec!(1), dec!(1), 2100, 0);
        cet_stock.stock = "cet".to_string();
        cet_stock.money = "abc".to_string();
        state.pools = vec![cet_stock];
        assert_eq!(
            state.validate(),
            Err(GenesisError::InvalidPool {
                symbol: "cet/abc".to_string(),
                reason: "stock must not be the fee token"
            })
        );

        state.pools = vec![pool(dec!(1), dec!(1), 2100, 0)];
        assert!(state.validate().is_ok());
    }

    #[test]
    fn bad_params_rejected() {
        let mut state = GenesisState::default();
        state.params.market.gte_order_lifetime = 0;
        assert!(matches!(state.validate(), Err(GenesisError::Params(_))));
    }
}
