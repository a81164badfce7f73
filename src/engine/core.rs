// 8.0 engine/core.rs: main engine. owns the store, the capability handles and the event log.

use tracing::debug;

use super::config::EngineConfig;
use super::results::EngineError;
use crate::assets::{AssetStatus, AuthX, InMemoryAssets, InMemoryAuthX};
use crate::bancor::{get_pool, BancorInfo};
use crate::config::Params;
use crate::events::{Event, EventLog, EventPayload};
use crate::ledger::{InMemoryLedger, Ledger};
use crate::market::{get_market, MarketInfo};
use crate::order::Order;
use crate::order_book::{orders_from_user, OrderBook};
use crate::store::{KvStore, MemStore};
use crate::types::Address;

/** 8.1: main engine struct. all persistent state lives in `store` */
#[derive(Debug)]
pub struct Engine<S, L, A, X> {
    pub(super) config: EngineConfig,
    pub(super) params: Params,
    pub(super) store: S,
    pub(super) ledger: L,
    pub(super) assets: A,
    pub(super) authx: X,
    pub(super) events: EventLog,
}

/// Engine wired to the in-memory store and capabilities.
pub type MemEngine = Engine<MemStore, InMemoryLedger, InMemoryAssets, InMemoryAuthX>;

impl MemEngine {
    pub fn in_memory(config: EngineConfig, params: Params) -> Self {
        Engine::new(
            config,
            params,
            MemStore::new(),
            InMemoryLedger::new(),
            InMemoryAssets::new(),
            InMemoryAuthX::default(),
        )
    }
}

impl<S, L, A, X> Engine<S, L, A, X>
where
    S: KvStore,
    L: Ledger,
    A: AssetStatus,
    X: AuthX,
{
    pub fn new(config: EngineConfig, params: Params, store: S, ledger: L, assets: A, authx: X) -> Self {
        let events = EventLog::new(config.max_events);
        Self {
            config,
            params,
            store,
            ledger,
            assets,
            authx,
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn set_params(&mut self, params: Params) -> Result<(), EngineError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut A {
        &mut self.assets
    }

    pub fn authx_mut(&mut self) -> &mut X {
        &mut self.authx
    }

    pub fn get_market(&self, symbol: &str) -> Result<Option<MarketInfo>, EngineError> {
        Ok(get_market(&self.store, symbol)?)
    }

    pub fn get_order(&self, order_id: &str) -> Result<Option<Order>, EngineError> {
        Ok(OrderBook::get_order(&self.store, order_id)?)
    }

    pub fn orders_of(&self, user: &Address) -> Result<Vec<Order>, EngineError> {
        Ok(orders_from_user(&self.store, user.as_str())?)
    }

    pub fn get_pool(&self, symbol: &str) -> Result<Option<BancorInfo>, EngineError> {
        Ok(get_pool(&self.store, symbol)?)
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    pub(super) fn emit_event(&mut self, height: u64, payload: EventPayload) {
        if self.config.verbose {
            debug!(height, ?payload, "event");
        }
        self.events.push(height, payload);
    }
}
