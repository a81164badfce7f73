// dex-core: exchange module core for a blockchain DEX.
// persistent order book, once-per-block call auction, bancor bonding curves.
// all computation is deterministic with no external I/O.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: Address, Side, Price, Coin, BlockContext
//   2.x  key_codec.rs: order-preserving byte keys for prices and heights
//   3.x  store.rs: ordered key-value store seam + in-memory store
//   4.x  order.rs: order record, freeze and fee math
//   5.x  order_book.rs: per-market order indexes on the store
//   6.x  matching.rs: single-price call auction
//   7.x  config.rs: module params, env presets
//   8.x  engine/: handlers and end-of-block lifecycle
//   9.1  ledger.rs: bank seam, atomic batches
//   9.2  assets.rs: token registry and referrals
//   9.3  settlement.rs: trade settlement, CET volume, commissions
//   10.x curve.rs, bancor.rs: bonding curve pools
//   11.x msgs.rs: transactions and stateless checks
//   12.x genesis.rs: state import/export
//   13.x events.rs, market.rs: event log, trading pair records

// trading modules
pub mod engine;
pub mod events;
pub mod key_codec;
pub mod market;
pub mod matching;
pub mod order;
pub mod order_book;
pub mod settlement;
pub mod store;
pub mod types;

// pools
pub mod bancor;
pub mod curve;

// integration modules
pub mod assets;
pub mod config;
pub mod genesis;
pub mod ledger;
pub mod msgs;

// re exports for convenience
pub use assets::*;
pub use bancor::*;
pub use engine::*;
pub use events::*;
pub use market::*;
pub use matching::*;
pub use msgs::*;
pub use order::*;
pub use order_book::*;
pub use settlement::*;
pub use store::*;
pub use types::*;
pub use config::{BancorParams, ConfigError, Environment, MarketParams, Params};
pub use genesis::{GenesisError, GenesisState};
pub use ledger::{Balance, BatchError, InMemoryLedger, Ledger, LedgerBatch, LedgerError, LedgerOp};
