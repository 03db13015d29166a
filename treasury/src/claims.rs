//! Claim processing
//!
//! `ClaimProcessor` runs one treasury action against the state and the host
//! ports. It assumes it is already inside the service's critical section and
//! that the caller restores everything if it returns an error.
//!
//! Producer claim ordering within a single call:
//! 1. resolve the address to its owner and reject unknown or expired names
//! 2. sweep an expired schedule's leftovers into the bucket pool
//! 3. open a new schedule if the epoch has expired and none is open
//! 4. pay this producer's entry, then the foundation if its pool is due
//! 5. remove the entry

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::clock::ClockState;
use crate::config::TreasuryConfig;
use crate::error::{Result, TreasuryError};
use crate::mint::MintGuard;
use crate::pool::PoolKind;
use crate::ports::{Host, TpidEntry};
use crate::schedule::PaySchedule;
use crate::state::TreasuryState;

pub const STATUS_OK: &str = "OK";

/// Outcome of `bpclaim`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProducerClaimReceipt {
    pub status: String,
    /// Paid to the producer; zero when it had no entry in the schedule
    pub amount: u64,
    pub schedule_created: bool,
    /// Unclaimed shares moved to the bucket pool by an expiry sweep
    pub swept: u64,
    pub minted: u64,
    pub foundation_paid: u64,
}

impl ProducerClaimReceipt {
    fn new() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            amount: 0,
            schedule_created: false,
            swept: 0,
            minted: 0,
            foundation_paid: 0,
        }
    }

    /// Response body sent back to the caller
    pub fn response(&self) -> Value {
        json!({ "status": self.status, "amount": self.amount })
    }
}

/// Outcome of `tpidclaim`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerClaimReceipt {
    pub status: String,
    pub tpids_paid: u64,
    pub transferred: u64,
    /// Rewards of unresolvable referrers credited to the bucket pool
    pub fallback_credited: u64,
    /// The payout window was still closed
    pub throttled: bool,
}

impl ReferrerClaimReceipt {
    fn new() -> Self {
        Self {
            status: STATUS_OK.to_string(),
            tpids_paid: 0,
            transferred: 0,
            fallback_credited: 0,
            throttled: false,
        }
    }

    pub fn response(&self) -> Value {
        json!({ "status": self.status, "tpids_paid": self.tpids_paid })
    }
}

pub struct ClaimProcessor<'a, H: Host + ?Sized> {
    config: &'a TreasuryConfig,
    state: &'a mut TreasuryState,
    host: &'a mut H,
}

impl<'a, H: Host + ?Sized> ClaimProcessor<'a, H> {
    pub fn new(config: &'a TreasuryConfig, state: &'a mut TreasuryState, host: &'a mut H) -> Self {
        Self {
            config,
            state,
            host,
        }
    }

    /// `bprewdupdate` / `bppoolupdate` / `fdtnrwdupdat`
    pub fn credit_pool(&mut self, signer: &str, kind: PoolKind, amount: u64) -> Result<u64> {
        if !self.config.is_credit_authority(signer) {
            return Err(TreasuryError::unauthorized(signer, kind.credit_action()));
        }

        let balance = self.state.pools.credit(kind, amount)?;
        debug!(
            "{} credited {} to {} pool (balance {})",
            signer, amount, kind, balance
        );
        Ok(balance)
    }

    /// `startclock`: creates the clock once, then makes sure the active pool row exists.
    /// Returns whether the clock was created by this call.
    pub fn start_clock(&mut self, signer: &str) -> Result<bool> {
        self.require_treasury(signer, "startclock")?;

        let created = self.state.clock.is_none();
        if created {
            let clock = ClockState::bootstrap(self.host.now(), self.config);
            info!(
                "Treasury clock started (pay schedule timer {}, referrer timer {})",
                clock.pay_sched_timer, clock.last_referrer_payout
            );
            self.state.clock = Some(clock);
        }

        self.state.pools.credit(PoolKind::Active, 0)?;
        Ok(created)
    }

    /// `updateclock`: stamps the referrer payout timer with the current time
    pub fn update_clock(&mut self, signer: &str) -> Result<()> {
        self.require_treasury(signer, "updateclock")?;

        let now = self.host.now();
        self.clock_mut()?.last_referrer_payout = now;
        Ok(())
    }

    /// `bpclaim`
    pub fn producer_claim(
        &mut self,
        signer: &str,
        fio_address: &str,
        actor: &str,
    ) -> Result<ProducerClaimReceipt> {
        require_actor(signer, actor, "bpclaim")?;

        let now = self.host.now();
        let resolved = self
            .host
            .resolve_owner(fio_address)
            .ok_or_else(|| TreasuryError::not_found("fio_address", fio_address))?;
        if resolved.is_expired(now) {
            return Err(TreasuryError::Expired {
                field: "fio_address",
                value: fio_address.to_string(),
                expired_at: resolved.expires_at,
            });
        }
        let producer = resolved.owner;
        if !self.host.is_producer(&producer) {
            return Err(TreasuryError::not_found("producer", &producer));
        }

        let expired = self
            .clock()?
            .schedule_expired(now, self.config.schedule.epoch_duration);

        let mut receipt = ProducerClaimReceipt::new();
        if expired && !self.state.schedule.is_empty() {
            receipt.swept = self.sweep_schedule()?;
        }
        if expired && self.state.schedule.is_empty() {
            if let Some(minted) = self.open_schedule(now)? {
                receipt.schedule_created = true;
                receipt.minted = minted;
            }
        }

        let payout = match self.state.schedule.get(&producer) {
            Some(entry) => entry.payout(),
            None => {
                debug!("{} has no entry in the current pay schedule", producer);
                return Ok(receipt);
            }
        };

        if payout > 0 {
            self.state.pools.debit(PoolKind::Active, payout)?;
            self.host.transfer(
                &self.config.accounts.treasury,
                &producer,
                payout,
                &self.config.memos.producer,
            )?;
            self.clock_mut()?.record_payout(payout)?;
            self.host.reset_claim(&producer)?;
            info!("Paid producer {} ({}): {}", producer, fio_address, payout);
        }
        receipt.amount = payout;
        receipt.foundation_paid = self.pay_foundation()?;

        self.state.schedule.remove(&producer);
        Ok(receipt)
    }

    /// `tpidclaim`
    pub fn referrer_claim(&mut self, signer: &str, actor: &str) -> Result<ReferrerClaimReceipt> {
        require_actor(signer, actor, "tpidclaim")?;

        let config = self.config;
        let now = self.host.now();
        let mut receipt = ReferrerClaimReceipt::new();

        if !self.clock()?.referrer_window_open(now, config.referrer.window) {
            debug!("Referrer payout window closed at {}", now);
            receipt.throttled = true;
            return Ok(receipt);
        }

        let eligible: Vec<TpidEntry> = self
            .host
            .payable(config.referrer.reward_max, config.referrer.batch_limit);

        for entry in &eligible {
            let amount = entry.accumulated_rewards;
            let owner = self
                .host
                .resolve_owner(&entry.address)
                .filter(|resolved| !resolved.is_expired(now));

            match owner {
                Some(resolved) => {
                    self.host.transfer(
                        &config.accounts.treasury,
                        &resolved.owner,
                        amount,
                        &config.memos.referrer,
                    )?;
                    receipt.transferred = receipt.transferred.saturating_add(amount);
                    debug!("Paid referrer {} ({}): {}", entry.address, resolved.owner, amount);
                }
                None => {
                    self.state.pools.credit(PoolKind::Bucket, amount)?;
                    receipt.fallback_credited = receipt.fallback_credited.saturating_add(amount);
                    warn!(
                        "Referrer {} no longer resolves; {} allocated to the bucket pool",
                        entry.address, amount
                    );
                }
            }

            self.host.mark_paid(&entry.address)?;
            receipt.tpids_paid += 1;
        }

        if receipt.tpids_paid > 0 {
            self.clock_mut()?.last_referrer_payout = now;
            info!(
                "Referrer batch paid {} entries ({} transferred, {} to bucket)",
                receipt.tpids_paid, receipt.transferred, receipt.fallback_credited
            );
        }

        Ok(receipt)
    }

    /// Snapshots the producer set, releases part of the bucket pool, tops up the
    /// active pool and allocates shares. Returns `None` when no producer is active.
    fn open_schedule(&mut self, now: u64) -> Result<Option<u64>> {
        let config = self.config;
        let producers = self.host.producers();
        let mut schedule = PaySchedule::snapshot(&producers, config.schedule.max_entries);
        if schedule.is_empty() {
            warn!("No active producers; pay schedule not opened");
            return Ok(None);
        }

        let TreasuryState { pools, clock, .. } = &mut *self.state;
        let clock = clock.as_mut().ok_or_else(clock_missing)?;

        let release = pools.amount(PoolKind::Bucket) / config.schedule.bucket_release_divisor;
        pools.transfer(PoolKind::Bucket, PoolKind::Active, release)?;

        let minted = MintGuard::new(&config.mint).request_mint(
            pools,
            PoolKind::Active,
            clock,
            &mut *self.host,
        )?;

        let allocation = schedule.allocate(
            pools.amount(PoolKind::Active),
            self.host.total_voted_weight(),
            &config.schedule,
        );
        clock.pay_sched_timer = now;

        info!(
            "Pay schedule opened with {} producers: pool {}, released {}, minted {}, allocated {}",
            schedule.len(),
            allocation.pool_amount,
            release,
            minted,
            allocation.allocated
        );

        self.state.schedule = schedule;
        Ok(Some(minted))
    }

    /// Moves every unclaimed share back to the bucket pool and empties the schedule
    fn sweep_schedule(&mut self) -> Result<u64> {
        let remaining = self.state.schedule.drain();
        let mut swept = 0u64;

        for entry in &remaining {
            let owed = entry.payout();
            self.state
                .pools
                .transfer(PoolKind::Active, PoolKind::Bucket, owed)?;
            swept = swept.saturating_add(owed);
        }

        info!(
            "Pay schedule expired: {} unclaimed entries, {} returned to bucket pool",
            remaining.len(),
            swept
        );
        Ok(swept)
    }

    fn pay_foundation(&mut self) -> Result<u64> {
        if self.state.pools.amount(PoolKind::Foundation) <= self.config.foundation_threshold {
            return Ok(0);
        }

        let amount = self.state.pools.drain(PoolKind::Foundation)?;
        self.host.transfer(
            &self.config.accounts.treasury,
            &self.config.accounts.foundation,
            amount,
            &self.config.memos.foundation,
        )?;
        info!("Paid foundation {}", amount);
        Ok(amount)
    }

    fn require_treasury(&self, signer: &str, action: &str) -> Result<()> {
        if signer != self.config.accounts.treasury {
            return Err(TreasuryError::unauthorized(signer, action));
        }
        Ok(())
    }

    fn clock(&self) -> Result<&ClockState> {
        self.state.clock.as_ref().ok_or_else(clock_missing)
    }

    fn clock_mut(&mut self) -> Result<&mut ClockState> {
        self.state.clock.as_mut().ok_or_else(clock_missing)
    }
}

fn require_actor(signer: &str, actor: &str, action: &str) -> Result<()> {
    if signer != actor {
        return Err(TreasuryError::unauthorized(actor, action));
    }
    Ok(())
}

fn clock_missing() -> TreasuryError {
    TreasuryError::not_found("clockstate", "treasury clock not started")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::sandbox::Sandbox;

    const NOW: u64 = 1_000_000;

    fn sandbox() -> Sandbox {
        let mut host = Sandbox::new("fio.treasury", NOW);
        host.add_producer("bp1", 100.0, true);
        host.register_name("bp1@dapix", "bp1", NOW + 1_000_000);
        host
    }

    #[test]
    fn test_credit_requires_whitelisted_signer() {
        let config = TreasuryConfig::default();
        let mut state = TreasuryState::new();
        let mut host = sandbox();
        let mut processor = ClaimProcessor::new(&config, &mut state, &mut host);

        let err = processor
            .credit_pool("alice", PoolKind::Active, 10)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);

        assert_eq!(
            processor.credit_pool("fio.fee", PoolKind::Active, 10).unwrap(),
            10
        );
        assert_eq!(
            processor.credit_pool("fio.token", PoolKind::Active, 5).unwrap(),
            15
        );
    }

    #[test]
    fn test_start_clock_is_idempotent() {
        let config = TreasuryConfig::default();
        let mut state = TreasuryState::new();
        let mut host = sandbox();

        {
            let mut processor = ClaimProcessor::new(&config, &mut state, &mut host);
            assert!(processor.start_clock("bp1").is_err());
            assert!(processor.start_clock("fio.treasury").unwrap());
        }
        let first = state.clock;

        host.advance(500);
        {
            let mut processor = ClaimProcessor::new(&config, &mut state, &mut host);
            assert!(!processor.start_clock("fio.treasury").unwrap());
        }
        assert_eq!(state.clock, first);
        assert!(state.pools.exists(PoolKind::Active));
    }

    #[test]
    fn test_claims_before_startclock_fail() {
        let config = TreasuryConfig::default();
        let mut state = TreasuryState::new();
        let mut host = sandbox();
        let mut processor = ClaimProcessor::new(&config, &mut state, &mut host);

        let err = processor
            .producer_claim("bp1", "bp1@dapix", "bp1")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(
            processor.referrer_claim("bp1", "bp1").unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            processor.update_clock("fio.treasury").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_claim_signed_by_someone_else_is_rejected() {
        let config = TreasuryConfig::default();
        let mut state = TreasuryState::new();
        let mut host = sandbox();
        let mut processor = ClaimProcessor::new(&config, &mut state, &mut host);
        processor.start_clock("fio.treasury").unwrap();

        let err = processor
            .producer_claim("mallory", "bp1@dapix", "bp1")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn test_receipt_responses() {
        let mut receipt = ProducerClaimReceipt::new();
        receipt.amount = 42;
        assert_eq!(receipt.response(), json!({"status": "OK", "amount": 42}));

        let receipt = ReferrerClaimReceipt::new();
        assert_eq!(receipt.response(), json!({"status": "OK", "tpids_paid": 0}));
    }
}
