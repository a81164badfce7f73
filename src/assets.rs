// 9.2 assets.rs: token registry and referral lookups, both owned by other modules.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::Address;

/// Token registry as seen by the exchange.
pub trait AssetStatus {
    fn is_token_exists(&self, denom: &str) -> bool;
    /// Globally frozen by its issuer.
    fn is_token_forbidden(&self, denom: &str) -> bool;
    fn is_token_issuer(&self, denom: &str, addr: &Address) -> bool;
    fn is_forbidden_by_token_issuer(&self, denom: &str, addr: &Address) -> bool;
    fn get_token_owner(&self, denom: &str) -> Option<Address>;
}

/// Referral registry. Rebates are `fee * ratio / ratio_base`.
pub trait AuthX {
    fn get_referrer(&self, addr: &Address) -> Option<Address>;
    fn rebate_ratio(&self) -> i64;
    fn rebate_ratio_base(&self) -> i64;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TokenInfo {
    owner: Address,
    forbidden: bool,
    forbidden_addrs: BTreeSet<Address>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAssets {
    tokens: BTreeMap<String, TokenInfo>,
}

impl InMemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, denom: &str, owner: &Address) {
        self.tokens.insert(
            denom.to_string(),
            TokenInfo {
                owner: owner.clone(),
                forbidden: false,
                forbidden_addrs: BTreeSet::new(),
            },
        );
    }

    pub fn forbid_token(&mut self, denom: &str, forbidden: bool) {
        if let Some(token) = self.tokens.get_mut(denom) {
            token.forbidden = forbidden;
        }
    }

    pub fn forbid_address(&mut self, denom: &str, addr: &Address) {
        if let Some(token) = self.tokens.get_mut(denom) {
            token.forbidden_addrs.insert(addr.clone());
        }
    }
}

impl AssetStatus for InMemoryAssets {
    fn is_token_exists(&self, denom: &str) -> bool {
        self.tokens.contains_key(denom)
    }

    fn is_token_forbidden(&self, denom: &str) -> bool {
        self.tokens.get(denom).is_some_and(|t| t.forbidden)
    }

    fn is_token_issuer(&self, denom: &str, addr: &Address) -> bool {
        self.tokens.get(denom).is_some_and(|t| &t.owner == addr)
    }

    fn is_forbidden_by_token_issuer(&self, denom: &str, addr: &Address) -> bool {
        self.tokens
            .get(denom)
            .is_some_and(|t| t.forbidden_addrs.contains(addr))
    }

    fn get_token_owner(&self, denom: &str) -> Option<Address> {
        self.tokens.get(denom).map(|t| t.owner.clone())
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryAuthX {
    referrers: BTreeMap<Address, Address>,
    ratio: i64,
    ratio_base: i64,
}

impl Default for InMemoryAuthX {
    fn default() -> Self {
        Self {
            referrers: BTreeMap::new(),
            ratio: 2_000,
            ratio_base: 10_000,
        }
    }
}

impl InMemoryAuthX {
    pub fn new(ratio: i64, ratio_base: i64) -> Self {
        Self {
            referrers: BTreeMap::new(),
            ratio,
            ratio_base,
        }
    }

    pub fn set_referrer(&mut self, addr: &Address, referrer: &Address) {
        self.referrers.insert(addr.clone(), referrer.clone());
    }
}

impl AuthX for InMemoryAuthX {
    fn get_referrer(&self, addr: &Address) -> Option<Address> {
        self.referrers.get(addr).cloned()
    }

    fn rebate_ratio(&self) -> i64 {
        self.ratio
    }

    fn rebate_ratio_base(&self) -> i64 {
        self.ratio_base
    }
}
