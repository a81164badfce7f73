// 7.0 config.rs: module parameters in one place. fees, lifetimes, price guards.
// 7.1 MarketParams covers the order book, BancorParams the pools.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::Bps;

const NANOS_PER_DAY: i64 = 24 * 60 * 60 * 1_000_000_000;

/** 7.2: order book parameters. amounts are in CET base units. */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketParams {
    // Paid once by the stock issuer to open a trading pair
    pub create_market_fee: i64,
    // Blocks a GTE order may rest before the feature fee starts accruing
    pub gte_order_lifetime: u64,
    // Feature fee per block beyond the lifetime
    pub gte_order_feature_fee_by_blocks: i64,
    // Max move of the clearing price per block, in percent of the last price
    pub max_executed_price_change_ratio: u32,
    // Commission rate charged on order volume
    pub market_fee_rate: Bps,
    // Commission floor
    pub market_fee_min: i64,
    // Commission kept from an order that never traded
    pub fee_for_zero_deal: i64,
    // Minimum notice between a delist request and its effective time, in nanoseconds
    pub market_min_expired_time: i64,
    // Per-trade fee rates new markets start with
    pub default_buy_fee_rate: Decimal,
    pub default_sell_fee_rate: Decimal,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            create_market_fee: 1_000_000_000_000, // 10000 CET
            gte_order_lifetime: 10_000,
            gte_order_feature_fee_by_blocks: 6,
            max_executed_price_change_ratio: 25,
            market_fee_rate: Bps::new(10), // 0.1%
            market_fee_min: 1_000_000,
            fee_for_zero_deal: 10,
            market_min_expired_time: 7 * NANOS_PER_DAY,
            default_buy_fee_rate: Decimal::new(1, 3),
            default_sell_fee_rate: Decimal::new(1, 3),
        }
    }
}

/** 7.3: bancor pool parameters. */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BancorParams {
    pub create_bancor_fee: i64,
    pub cancel_bancor_fee: i64,
    pub trade_fee_rate: Bps,
}

impl Default for BancorParams {
    fn default() -> Self {
        Self {
            create_bancor_fee: 100_000_000_000, // 1000 CET
            cancel_bancor_fee: 10_000_000_000,  // 100 CET
            trade_fee_rate: Bps::new(10),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    pub market: MarketParams,
    pub bancor: BancorParams,
}

impl Params {
    pub fn testnet() -> Self {
        let mut params = Self::default();
        params.market.create_market_fee = 100_000_000; // 1 CET
        params.market.gte_order_lifetime = 100;
        params.market.market_min_expired_time = 60 * 1_000_000_000;
        params.bancor.create_bancor_fee = 100_000_000;
        params.bancor.cancel_bancor_fee = 10_000_000;
        params
    }

    pub fn mainnet() -> Self {
        let mut params = Self::default();
        params.market.max_executed_price_change_ratio = 10;
        params.market.fee_for_zero_deal = 1_000;
        params
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.market;
        if m.create_market_fee < 0 || m.market_fee_min < 0 || m.fee_for_zero_deal < 0 {
            return Err(ConfigError::InvalidFees {
                reason: "market fees must not be negative".to_string(),
            });
        }
        if !(0..=10_000).contains(&m.market_fee_rate.value()) {
            return Err(ConfigError::InvalidFees {
                reason: "market fee rate must be within 0..=10000 bps".to_string(),
            });
        }
        for rate in [m.default_buy_fee_rate, m.default_sell_fee_rate] {
            if rate < Decimal::ZERO || rate >= Decimal::ONE {
                return Err(ConfigError::InvalidFees {
                    reason: "per-trade fee rates must be in [0, 1)".to_string(),
                });
            }
        }
        if m.gte_order_lifetime == 0 || m.gte_order_feature_fee_by_blocks < 0 {
            return Err(ConfigError::InvalidLifetime {
                reason: "GTE lifetime must be positive and its fee non-negative".to_string(),
            });
        }
        if m.max_executed_price_change_ratio == 0 || m.max_executed_price_change_ratio >= 100 {
            return Err(ConfigError::InvalidPriceGuard {
                reason: "price change ratio must be within 1..100".to_string(),
            });
        }
        if m.market_min_expired_time < 0 {
            return Err(ConfigError::InvalidLifetime {
                reason: "delist notice must not be negative".to_string(),
            });
        }

        let b = &self.bancor;
        if b.create_bancor_fee < 0 || b.cancel_bancor_fee < 0 {
            return Err(ConfigError::InvalidFees {
                reason: "bancor fees must not be negative".to_string(),
            });
        }
        if !(0..=10_000).contains(&b.trade_fee_rate.value()) {
            return Err(ConfigError::InvalidFees {
                reason: "bancor trade fee rate must be within 0..=10000 bps".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid fees: {reason}")]
    InvalidFees { reason: String },
    #[error("invalid lifetime: {reason}")]
    InvalidLifetime { reason: String },
    #[error("invalid price guard: {reason}")]
    InvalidPriceGuard { reason: String },
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn params(&self) -> Params {
        match self {
            Environment::Development => Params::default(),
            Environment::Testnet => Params::testnet(),
            Environment::Mainnet => Params::mainnet(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn environment_presets() {
        assert!(Environment::Development.params().validate().is_ok());
        assert!(Environment::Testnet.params().validate().is_ok());
        assert!(Environment::Mainnet.params().validate().is_ok());
        assert_eq!(Environment::Testnet.params().market.gte_order_lifetime, 100);
    }

    #[test]
    fn invalid_price_guard() {
        let mut params = Params::default();
        params.market.max_executed_price_change_ratio = 100;
        assert!(matches!(params.validate(), Err(ConfigError::InvalidPriceGuard { .. })));
    }

    #[test]
    fn invalid_trade_fee_rate() {
        let mut params = Params::default();
        params.market.default_sell_fee_rate = Decimal::ONE;
        assert!(matches!(params.validate(), Err(ConfigError::InvalidFees { .. })));

        let mut params = Params::default();
        params.bancor.trade_fee_rate = Bps::new(10_001);
        assert!(matches!(params.validate(), Err(ConfigError::InvalidFees { .. })));
    }

    #[test]
    fn zero_lifetime_rejected() {
        let mut params = Params::default();
        params.market.gte_order_lifetime = 0;
        assert!(matches!(params.validate(), Err(ConfigError::InvalidLifetime { .. })));
    }

    #[test]
    fn params_serialization() {
        let params = Params::testnet();
        let json = serde_json::to_string(&params).unwrap();
        let back: Params = serde_json::from_str(&json).unwrap();
        assert_eq!(back, params);
    }
}
