// 8.5 engine/genesis.rs: snapshot import and export.

use tracing::info;

use super::core::Engine;
use super::results::EngineError;
use crate::assets::{AssetStatus, AuthX};
use crate::bancor::{all_pools, set_pool};
use crate::genesis::GenesisState;
use crate::ledger::Ledger;
use crate::market::{add_delist_request, all_delist_requests, all_markets, order_clean_time, set_market, set_order_clean_time};
use crate::order_book::{all_orders, OrderBook};
use crate::store::KvStore;

impl<S, L, A, X> Engine<S, L, A, X>
where
    S: KvStore,
    L: Ledger,
    A: AssetStatus,
    X: AuthX,
{
    /// Load a snapshot into an empty store. Balances are the ledger's business
    /// and are not touched.
    pub fn init_genesis(&mut self, state: &GenesisState) -> Result<(), EngineError> {
        state.validate()?;
        self.params = state.params.clone();
        for market in &state.markets {
            set_market(&mut self.store, market)?;
        }
        for order in &state.orders {
            OrderBook::new(&order.trading_pair).add(&mut self.store, order)?;
        }
        for pool in &state.pools {
            set_pool(&mut self.store, pool)?;
        }
        for (time, symbol) in &state.delist_requests {
            add_delist_request(&mut self.store, *time, symbol);
        }
        if let Some(secs) = state.order_clean_time {
            set_order_clean_time(&mut self.store, secs);
        }
        info!(
            markets = state.markets.len(),
            orders = state.orders.len(),
            pools = state.pools.len(),
            "genesis imported"
        );
        Ok(())
    }

    pub fn export_genesis(&self) -> Result<GenesisState, EngineError> {
        Ok(GenesisState {
            params: self.params.clone(),
            markets: all_markets(&self.store)?,
            orders: all_orders(&self.store)?,
            pools: all_pools(&self.store)?,
            delist_requests: all_delist_requests(&self.store)?,
            order_clean_time: order_clean_time(&self.store)?,
        })
    }
}
