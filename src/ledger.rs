// 9.1 ledger.rs: the coin ledger is owned by the host chain. the core only
// talks to it through the Ledger trait. InMemoryLedger is the reference impl
// used by the simulator and the tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{Address, Coin};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("{addr} has insufficient coins, need {needed}")]
    InsufficientCoins { addr: Address, needed: Coin },

    #[error("{addr} has insufficient frozen coins, need {needed}")]
    InsufficientFrozenCoins { addr: Address, needed: Coin },

    #[error("fee collector holds less than {0}")]
    InsufficientFeeCollector(Coin),

    #[error("negative amount {0}")]
    NegativeAmount(Coin),
}

/// Capabilities the core needs from the host ledger.
pub trait Ledger {
    fn has_coins(&self, addr: &Address, coin: &Coin) -> bool;
    fn send_coins(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<(), LedgerError>;
    fn freeze_coins(&mut self, addr: &Address, coin: &Coin) -> Result<(), LedgerError>;
    fn unfreeze_coins(&mut self, addr: &Address, coin: &Coin) -> Result<(), LedgerError>;
    /// Move a fee from `addr` into the fee collector.
    fn deduct_fee(&mut self, addr: &Address, coin: &Coin) -> Result<(), LedgerError>;
    /// Burn coins from `addr`.
    fn subtract_coins(&mut self, addr: &Address, coin: &Coin) -> Result<(), LedgerError>;
    fn send_coins_to_fee_collector(&mut self, from: &Address, coin: &Coin) -> Result<(), LedgerError>;
    /// Undo a collected fee. Only used to revert a failed batch.
    fn refund_from_fee_collector(&mut self, to: &Address, coin: &Coin) -> Result<(), LedgerError>;
}

/// One ledger call, recorded so a batch can be replayed backwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerOp {
    Send { from: Address, to: Address, coin: Coin },
    Freeze { addr: Address, coin: Coin },
    Unfreeze { addr: Address, coin: Coin },
    DeductFee { addr: Address, coin: Coin },
    ToFeeCollector { from: Address, coin: Coin },
}

impl LedgerOp {
    /// The account whose balance the op draws from.
    pub fn payer(&self) -> &Address {
        match self {
            LedgerOp::Send { from, .. } | LedgerOp::ToFeeCollector { from, .. } => from,
            LedgerOp::Freeze { addr, .. }
            | LedgerOp::Unfreeze { addr, .. }
            | LedgerOp::DeductFee { addr, .. } => addr,
        }
    }

    fn apply<L: Ledger + ?Sized>(&self, ledger: &mut L) -> Result<(), LedgerError> {
        match self {
            LedgerOp::Send { from, to, coin } => ledger.send_coins(from, to, coin),
            LedgerOp::Freeze { addr, coin } => ledger.freeze_coins(addr, coin),
            LedgerOp::Unfreeze { addr, coin } => ledger.unfreeze_coins(addr, coin),
            LedgerOp::DeductFee { addr, coin } => ledger.deduct_fee(addr, coin),
            LedgerOp::ToFeeCollector { from, coin } => ledger.send_coins_to_fee_collector(from, coin),
        }
    }

    fn revert<L: Ledger + ?Sized>(&self, ledger: &mut L) -> Result<(), LedgerError> {
        match self {
            LedgerOp::Send { from, to, coin } => ledger.send_coins(to, from, coin),
            LedgerOp::Freeze { addr, coin } => ledger.unfreeze_coins(addr, coin),
            LedgerOp::Unfreeze { addr, coin } => ledger.freeze_coins(addr, coin),
            LedgerOp::DeductFee { addr, coin } | LedgerOp::ToFeeCollector { from: addr, coin } => {
                ledger.refund_from_fee_collector(addr, coin)
            }
        }
    }
}

/// A failed batch: which op broke and why. Everything before it was reverted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ledger op #{index} paid by {payer} failed: {source}")]
pub struct BatchError {
    pub index: usize,
    pub payer: Address,
    pub source: LedgerError,
}

/// Ordered ledger ops applied all-or-nothing. Zero amounts are dropped on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerBatch {
    ops: Vec<LedgerOp>,
}

impl LedgerBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[LedgerOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn send(&mut self, from: &Address, to: &Address, coin: Coin) -> &mut Self {
        if !coin.is_zero() {
            self.ops.push(LedgerOp::Send {
                from: from.clone(),
                to: to.clone(),
                coin,
            });
        }
        self
    }

    pub fn freeze(&mut self, addr: &Address, coin: Coin) -> &mut Self {
        if !coin.is_zero() {
            self.ops.push(LedgerOp::Freeze { addr: addr.clone(), coin });
        }
        self
    }

    pub fn unfreeze(&mut self, addr: &Address, coin: Coin) -> &mut Self {
        if !coin.is_zero() {
            self.ops.push(LedgerOp::Unfreeze { addr: addr.clone(), coin });
        }
        self
    }

    pub fn deduct_fee(&mut self, addr: &Address, coin: Coin) -> &mut Self {
        if !coin.is_zero() {
            self.ops.push(LedgerOp::DeductFee { addr: addr.clone(), coin });
        }
        self
    }

    pub fn to_fee_collector(&mut self, from: &Address, coin: Coin) -> &mut Self {
        if !coin.is_zero() {
            self.ops.push(LedgerOp::ToFeeCollector { from: from.clone(), coin });
        }
        self
    }

    pub fn extend(&mut self, other: LedgerBatch) -> &mut Self {
        self.ops.extend(other.ops);
        self
    }

    /// Apply every op in order. On the first failure, undo the applied ops in reverse.
    pub fn execute<L: Ledger + ?Sized>(&self, ledger: &mut L) -> Result<(), BatchError> {
        for (index, op) in self.ops.iter().enumerate() {
            if let Err(source) = op.apply(ledger) {
                for applied in self.ops[..index].iter().rev() {
                    if let Err(e) = applied.revert(ledger) {
                        tracing::error!(?applied, error = %e, "failed to revert ledger op");
                    }
                }
                return Err(BatchError {
                    index,
                    payer: op.payer().clone(),
                    source,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub available: i64,
    pub frozen: i64,
}

/// BTreeMap-backed ledger with a single fee collector account.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    balances: BTreeMap<(Address, String), Balance>,
    fee_collector: BTreeMap<String, i64>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint spendable coins. Setup only.
    pub fn credit(&mut self, addr: &Address, coin: &Coin) {
        self.entry(addr, &coin.denom).available += coin.amount;
    }

    pub fn balance(&self, addr: &Address, denom: &str) -> Balance {
        self.balances
            .get(&(addr.clone(), denom.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn available(&self, addr: &Address, denom: &str) -> i64 {
        self.balance(addr, denom).available
    }

    pub fn frozen(&self, addr: &Address, denom: &str) -> i64 {
        self.balance(addr, denom).frozen
    }

    pub fn collected_fees(&self, denom: &str) -> i64 {
        self.fee_collector.get(denom).copied().unwrap_or(0)
    }

    /// Sum over every account plus the fee collector. Constant under every op but subtract.
    pub fn total_supply(&self, denom: &str) -> i64 {
        self.balances
            .iter()
            .filter(|((_, d), _)| d == denom)
            .map(|(_, b)| b.available + b.frozen)
            .sum::<i64>()
            + self.collected_fees(denom)
    }

    fn entry(&mut self, addr: &Address, denom: &str) -> &mut Balance {
        self.balances
            .entry((addr.clone(), denom.to_string()))
            .or_default()
    }

    fn take_available(&mut self, addr: &Address, coin: &Coin) -> Result<(), LedgerError> {
        check_amount(coin)?;
        let balance = self.entry(addr, &coin.denom);
        if balance.available < coin.amount {
            return Err(LedgerError::InsufficientCoins {
                addr: addr.clone(),
                needed: coin.clone(),
            });
        }
        balance.available -= coin.amount;
        Ok(())
    }
}

fn check_amount(coin: &Coin) -> Result<(), LedgerError> {
    if coin.amount < 0 {
        return Err(LedgerError::NegativeAmount(coin.clone()));
    }
    Ok(())
}

impl Ledger for InMemoryLedger {
    fn has_coins(&self, addr: &Address, coin: &Coin) -> bool {
        coin.amount >= 0 && self.available(addr, &coin.denom) >= coin.amount
    }

    fn send_coins(&mut self, from: &Address, to: &Address, coin: &Coin) -> Result<(), LedgerError> {
        self.take_available(from, coin)?;
        self.entry(to, &coin.denom).available += coin.amount;
        Ok(())
    }

    fn freeze_coins(&mut self, addr: &Address, coin: &Coin) -> Result<(), LedgerError> {
        self.take_available(addr, coin)?;
        self.entry(addr, &coin.denom).frozen += coin.amount;
        Ok(())
    }

    fn unfreeze_coins(&mut self, addr: &Address, coin: &Coin) -> Result<(), LedgerError> {
        check_amount(coin)?;
        let balance = self.entry(addr, &coin.denom);
        if balance.frozen < coin.amount {
            return Err(LedgerError::InsufficientFrozenCoins {
                addr: addr.clone(),
                needed: coin.clone(),
            });
        }
        balance.frozen -= coin.amount;
        balance.available += coin.amount;
        Ok(())
    }

    fn deduct_fee(&mut self, addr: &Address, coin: &Coin) -> Result<(), LedgerError> {
        self.send_coins_to_fee_collector(addr, coin)
    }

    fn subtract_coins(&mut self, addr: &Address, coin: &Coin) -> Result<(), LedgerError> {
        self.take_available(addr, coin)
    }

    fn send_coins_to_fee_collector(&mut self, from: &Address, coin: &Coin) -> Result<(), LedgerError> {
        self.take_available(from, coin)?;
        *self.fee_collector.entry(coin.denom.clone()).or_insert(0) += coin.amount;
        Ok(())
    }

    fn refund_from_fee_collector(&mut self, to: &Address, coin: &Coin) -> Result<(), LedgerError> {
        check_amount(coin)?;
        let held = self.fee_collector.entry(coin.denom.clone()).or_insert(0);
        if *held < coin.amount {
            return Err(LedgerError::InsufficientFeeCollector(coin.clone()));
        }
        *held -= coin.amount;
        self.entry(to, &coin.denom).available += coin.amount;
        Ok(())
    }
}
