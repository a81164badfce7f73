// 8.0.2: result types and errors for engine operations.

use rust_decimal::Decimal;

use crate::bancor::BancorError;
use crate::config::ConfigError;
use crate::genesis::GenesisError;
use crate::ledger::BatchError;
use crate::market::MarketError;
use crate::settlement::SettlementError;
use crate::store::StoreError;
use crate::types::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCreated {
    pub order_id: String,
    pub freeze: i64,
    pub frozen_commission: i64,
    pub frozen_feature_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BancorTradeResult {
    /// Money paid into the pool on a buy, taken out on a sell.
    pub money: i64,
    pub commission: i64,
    pub rebate: i64,
    pub referrer: Option<Address>,
    pub new_price: Decimal,
}

/// What one `end_block` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndBlockReport {
    /// True when the block ran the periodic cleanup instead of matching.
    pub cleaned: bool,
    pub expired_orders: usize,
    pub delisted_markets: Vec<String>,
    /// Markets that traded, with their clearing price.
    pub executed: Vec<(String, Decimal)>,
    pub removed_orders: usize,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Market error: {0}")]
    Market(#[from] MarketError),

    #[error("Bancor error: {0}")]
    Bancor(#[from] BancorError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] BatchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Genesis error: {0}")]
    Genesis(#[from] GenesisError),
}

impl EngineError {
    pub fn code(&self) -> u32 {
        match self {
            EngineError::Market(e) => e.code(),
            EngineError::Bancor(e) => e.code(),
            EngineError::Settlement(e) => e.code(),
            EngineError::Ledger(_) => 901,
            EngineError::Store(_) => 902,
            EngineError::Config(_) => 903,
            EngineError::Genesis(_) => 904,
        }
    }
}
