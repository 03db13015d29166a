//! Reward pool accounting
//!
//! Three independent accumulators back every payout:
//! - the active pool, paid to producers each epoch
//! - the bucket pool, a standby reserve released gradually into the active pool
//! - the foundation pool, paid periodically to the foundation account
//!
//! A pool row is created on its first credit and never deleted. Balances can
//! only move through `credit` and `debit`, and a debit larger than the balance
//! is an invariant violation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TreasuryError};

/// Which reward pool an amount belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Active,
    Bucket,
    Foundation,
}

impl PoolKind {
    pub const ALL: [PoolKind; 3] = [PoolKind::Active, PoolKind::Bucket, PoolKind::Foundation];

    /// Name of the action that credits this pool
    pub fn credit_action(&self) -> &'static str {
        match self {
            PoolKind::Active => "bprewdupdate",
            PoolKind::Bucket => "bppoolupdate",
            PoolKind::Foundation => "fdtnrwdupdat",
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoolKind::Active => "active",
            PoolKind::Bucket => "bucket",
            PoolKind::Foundation => "foundation",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for PoolKind {
    type Err = TreasuryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "active" | "bprewards" => Ok(PoolKind::Active),
            "bucket" | "bpbucketpool" => Ok(PoolKind::Bucket),
            "foundation" | "fdtnrewards" => Ok(PoolKind::Foundation),
            other => Err(TreasuryError::not_found("pool", other)),
        }
    }
}

/// Single pool balance in the smallest token unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPool {
    pub amount: u64,
}

impl RewardPool {
    pub fn credit(&mut self, amount: u64) -> Result<()> {
        self.amount = self.amount.checked_add(amount).ok_or_else(|| {
            TreasuryError::InvariantViolation(format!(
                "pool overflow: {} + {}",
                self.amount, amount
            ))
        })?;
        Ok(())
    }

    pub fn debit(&mut self, amount: u64) -> Result<()> {
        if amount > self.amount {
            return Err(TreasuryError::InvariantViolation(format!(
                "debit of {} exceeds pool balance {}",
                amount, self.amount
            )));
        }
        self.amount -= amount;
        Ok(())
    }
}

/// The three treasury pools, keyed by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPools {
    pools: BTreeMap<PoolKind, RewardPool>,
}

impl RewardPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance; a pool that was never written reads as zero
    pub fn amount(&self, kind: PoolKind) -> u64 {
        self.pools.get(&kind).map(|pool| pool.amount).unwrap_or(0)
    }

    pub fn exists(&self, kind: PoolKind) -> bool {
        self.pools.contains_key(&kind)
    }

    pub fn get(&self, kind: PoolKind) -> Option<&RewardPool> {
        self.pools.get(&kind)
    }

    /// Initializes the pool to `amount` on first write, otherwise adds to it.
    /// Returns the new balance.
    pub fn credit(&mut self, kind: PoolKind, amount: u64) -> Result<u64> {
        let pool = self.pools.entry(kind).or_default();
        pool.credit(amount)?;
        Ok(pool.amount)
    }

    /// Returns the new balance.
    pub fn debit(&mut self, kind: PoolKind, amount: u64) -> Result<u64> {
        match self.pools.get_mut(&kind) {
            Some(pool) => {
                pool.debit(amount)?;
                Ok(pool.amount)
            }
            None if amount == 0 => Ok(0),
            None => Err(TreasuryError::InvariantViolation(format!(
                "debit of {} from empty {} pool",
                amount, kind
            ))),
        }
    }

    /// Moves `amount` between pools, failing without change if the source is short
    pub fn transfer(&mut self, from: PoolKind, to: PoolKind, amount: u64) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.debit(from, amount)?;
        self.credit(to, amount)?;
        Ok(())
    }

    /// Empties a pool and returns what it held
    pub fn drain(&mut self, kind: PoolKind) -> Result<u64> {
        let amount = self.amount(kind);
        self.debit(kind, amount)?;
        Ok(amount)
    }

    pub fn total(&self) -> u64 {
        self.pools
            .values()
            .fold(0u64, |acc, pool| acc.saturating_add(pool.amount))
    }

    pub fn iter(&self) -> impl Iterator<Item = (PoolKind, u64)> + '_ {
        self.pools.iter().map(|(kind, pool)| (*kind, pool.amount))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credit_creates_pool() {
        let mut pools = RewardPools::new();
        assert!(!pools.exists(PoolKind::Active));
        assert_eq!(pools.amount(PoolKind::Active), 0);

        pools.credit(PoolKind::Active, 0).unwrap();
        assert!(pools.exists(PoolKind::Active));

        assert_eq!(pools.credit(PoolKind::Active, 500).unwrap(), 500);
        assert_eq!(pools.credit(PoolKind::Active, 250).unwrap(), 750);
        assert!(!pools.exists(PoolKind::Bucket));
    }

    #[test]
    fn test_debit_never_goes_negative() {
        let mut pools = RewardPools::new();
        pools.credit(PoolKind::Foundation, 100).unwrap();

        let err = pools.debit(PoolKind::Foundation, 101).unwrap_err();
        assert!(matches!(err, TreasuryError::InvariantViolation(_)));
        assert_eq!(pools.amount(PoolKind::Foundation), 100);

        assert_eq!(pools.debit(PoolKind::Foundation, 100).unwrap(), 0);
        assert!(pools.debit(PoolKind::Bucket, 1).is_err());
        assert_eq!(pools.debit(PoolKind::Bucket, 0).unwrap(), 0);
    }

    #[test]
    fn test_credit_overflow_is_invariant_violation() {
        let mut pools = RewardPools::new();
        pools.credit(PoolKind::Bucket, u64::MAX).unwrap();
        assert!(pools.credit(PoolKind::Bucket, 1).is_err());
        assert_eq!(pools.amount(PoolKind::Bucket), u64::MAX);
    }

    #[test]
    fn test_transfer_and_drain() {
        let mut pools = RewardPools::new();
        pools.credit(PoolKind::Bucket, 365).unwrap();

        pools.transfer(PoolKind::Bucket, PoolKind::Active, 1).unwrap();
        assert_eq!(pools.amount(PoolKind::Bucket), 364);
        assert_eq!(pools.amount(PoolKind::Active), 1);
        assert!(pools.transfer(PoolKind::Active, PoolKind::Bucket, 2).is_err());

        assert_eq!(pools.drain(PoolKind::Bucket).unwrap(), 364);
        assert_eq!(pools.amount(PoolKind::Bucket), 0);
        assert_eq!(pools.total(), 1);
    }

    #[test]
    fn test_pool_kind_parsing() {
        assert_eq!("active".parse::<PoolKind>().unwrap(), PoolKind::Active);
        assert_eq!("bpbucketpool".parse::<PoolKind>().unwrap(), PoolKind::Bucket);
        assert_eq!("Foundation".parse::<PoolKind>().unwrap(), PoolKind::Foundation);
        assert!("staking".parse::<PoolKind>().is_err());
        assert_eq!(PoolKind::Bucket.credit_action(), "bppoolupdate");
    }
}
