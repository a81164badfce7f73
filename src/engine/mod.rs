// 8.0: exchange engine. message handlers plus the end-of-block order lifecycle.
// deterministic and block-synchronous, every mutation goes through &mut self.

mod bancor;
mod config;
mod core;
mod end_block;
mod genesis;
mod markets;
mod orders;
mod results;

pub use config::EngineConfig;
pub use core::{Engine, MemEngine};
pub use results::{BancorTradeResult, EndBlockReport, EngineError, OrderCreated};
