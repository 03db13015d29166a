//! Bounded minting into a reward pool

use log::{debug, info};

use crate::clock::ClockState;
use crate::config::MintConfig;
use crate::error::Result;
use crate::pool::{PoolKind, RewardPools};
use crate::ports::TokenLedger;

/// Tops a pool up to `max_to_mint` while lifetime minting stays under `max_reserve`
pub struct MintGuard<'a> {
    config: &'a MintConfig,
}

impl<'a> MintGuard<'a> {
    pub fn new(config: &'a MintConfig) -> Self {
        Self { config }
    }

    /// Amount that could be minted into a pool holding `pool_amount`
    pub fn headroom(&self, pool_amount: u64) -> u64 {
        self.config.max_to_mint.saturating_sub(pool_amount)
    }

    /// Mints the pool's headroom, clamped to what is left of the reserve cap.
    ///
    /// Returns the amount minted, which is zero when the pool is already at
    /// `max_to_mint` or the reserve is exhausted.
    pub fn request_mint<L: TokenLedger + ?Sized>(
        &self,
        pools: &mut RewardPools,
        kind: PoolKind,
        clock: &mut ClockState,
        ledger: &mut L,
    ) -> Result<u64> {
        let pool_amount = pools.amount(kind);
        if pool_amount >= self.config.max_to_mint
            || clock.reserve_tokens_minted >= self.config.max_reserve
        {
            debug!(
                "No mint for {} pool: balance {}, reserve minted {}",
                kind, pool_amount, clock.reserve_tokens_minted
            );
            return Ok(0);
        }

        let amount = self
            .headroom(pool_amount)
            .min(clock.reserve_remaining(self.config.max_reserve));

        ledger.mint(amount)?;
        pools.credit(kind, amount)?;
        clock.record_mint(amount, self.config.max_reserve)?;

        info!(
            "Minted {} into {} pool (reserve minted {}/{})",
            amount, kind, clock.reserve_tokens_minted, self.config.max_reserve
        );
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TreasuryError;

    #[derive(Default)]
    struct CountingLedger {
        minted: Vec<u64>,
        fail: bool,
    }

    impl TokenLedger for CountingLedger {
        fn transfer(&mut self, _from: &str, _to: &str, _amount: u64, _memo: &str) -> Result<()> {
            Ok(())
        }

        fn mint(&mut self, amount: u64) -> Result<()> {
            if self.fail {
                return Err(TreasuryError::Collaborator("mint disabled".to_string()));
            }
            self.minted.push(amount);
            Ok(())
        }
    }

    fn config(max_to_mint: u64, max_reserve: u64) -> MintConfig {
        MintConfig {
            max_to_mint,
            max_reserve,
        }
    }

    #[test]
    fn test_mints_headroom() {
        let config = config(1000, 10_000);
        let guard = MintGuard::new(&config);
        let mut pools = RewardPools::new();
        let mut clock = ClockState::default();
        let mut ledger = CountingLedger::default();

        pools.credit(PoolKind::Active, 300).unwrap();
        let minted = guard
            .request_mint(&mut pools, PoolKind::Active, &mut clock, &mut ledger)
            .unwrap();

        assert_eq!(minted, 700);
        assert_eq!(pools.amount(PoolKind::Active), 1000);
        assert_eq!(clock.reserve_tokens_minted, 700);
        assert_eq!(ledger.minted, vec![700]);
    }

    #[test]
    fn test_full_pool_mints_nothing() {
        let config = config(1000, 10_000);
        let guard = MintGuard::new(&config);
        let mut pools = RewardPools::new();
        let mut clock = ClockState::default();
        let mut ledger = CountingLedger::default();

        pools.credit(PoolKind::Active, 1500).unwrap();
        let minted = guard
            .request_mint(&mut pools, PoolKind::Active, &mut clock, &mut ledger)
            .unwrap();

        assert_eq!(minted, 0);
        assert!(ledger.minted.is_empty());
        assert_eq!(guard.headroom(1500), 0);
    }

    #[test]
    fn test_reserve_cap_clamps_mint() {
        let config = config(1000, 1200);
        let guard = MintGuard::new(&config);
        let mut pools = RewardPools::new();
        let mut clock = ClockState::default();
        let mut ledger = CountingLedger::default();

        assert_eq!(
            guard
                .request_mint(&mut pools, PoolKind::Active, &mut clock, &mut ledger)
                .unwrap(),
            1000
        );
        pools.debit(PoolKind::Active, 1000).unwrap();

        // Only 200 left under the reserve cap
        assert_eq!(
            guard
                .request_mint(&mut pools, PoolKind::Active, &mut clock, &mut ledger)
                .unwrap(),
            200
        );
        assert_eq!(clock.reserve_tokens_minted, 1200);

        pools.debit(PoolKind::Active, 200).unwrap();
        assert_eq!(
            guard
                .request_mint(&mut pools, PoolKind::Active, &mut clock, &mut ledger)
                .unwrap(),
            0
        );
        assert_eq!(ledger.minted, vec![1000, 200]);
    }

    #[test]
    fn test_ledger_failure_leaves_pool_untouched() {
        let config = config(1000, 10_000);
        let guard = MintGuard::new(&config);
        let mut pools = RewardPools::new();
        let mut clock = ClockState::default();
        let mut ledger = CountingLedger {
            fail: true,
            ..Default::default()
        };

        assert!(guard
            .request_mint(&mut pools, PoolKind::Active, &mut clock, &mut ledger)
            .is_err());
        assert_eq!(pools.amount(PoolKind::Active), 0);
        assert_eq!(clock.reserve_tokens_minted, 0);
    }
}
