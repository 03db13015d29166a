//! Treasury service
//!
//! Owns the treasury state and the host behind a single mutex. Every action
//! runs as one unit of work: the lock is held for the whole call, the host is
//! checkpointed first, and any error restores both the state and the host to
//! what they were before the call.

use log::warn;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::claims::{ClaimProcessor, ProducerClaimReceipt, ReferrerClaimReceipt};
use crate::clock::ClockState;
use crate::config::TreasuryConfig;
use crate::error::Result;
use crate::pool::{PoolKind, RewardPools};
use crate::ports::Host;
use crate::schedule::{PaySchedule, ScheduleStatus};
use crate::state::TreasuryState;

/// A treasury action as submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Action {
    BpClaim { fio_address: String, actor: String },
    TpidClaim { actor: String },
    BpRewdUpdate { amount: u64 },
    BpPoolUpdate { amount: u64 },
    FdtnRwdUpdat { amount: u64 },
    UpdateClock,
    StartClock,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::BpClaim { .. } => "bpclaim",
            Action::TpidClaim { .. } => "tpidclaim",
            Action::BpRewdUpdate { .. } => "bprewdupdate",
            Action::BpPoolUpdate { .. } => "bppoolupdate",
            Action::FdtnRwdUpdat { .. } => "fdtnrwdupdat",
            Action::UpdateClock => "updateclock",
            Action::StartClock => "startclock",
        }
    }
}

struct Inner<H> {
    state: TreasuryState,
    host: H,
}

pub struct Treasury<H: Host> {
    config: TreasuryConfig,
    inner: Mutex<Inner<H>>,
}

impl<H: Host> Treasury<H> {
    pub fn new(config: TreasuryConfig, host: H) -> Result<Self> {
        Self::from_state(config, TreasuryState::new(), host)
    }

    /// Resumes a treasury from previously persisted state
    pub fn from_state(config: TreasuryConfig, state: TreasuryState, host: H) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            inner: Mutex::new(Inner { state, host }),
        })
    }

    pub fn config(&self) -> &TreasuryConfig {
        &self.config
    }

    pub fn producer_claim(
        &self,
        signer: &str,
        fio_address: &str,
        actor: &str,
    ) -> Result<ProducerClaimReceipt> {
        self.transact("bpclaim", |processor| {
            processor.producer_claim(signer, fio_address, actor)
        })
    }

    pub fn referrer_claim(&self, signer: &str, actor: &str) -> Result<ReferrerClaimReceipt> {
        self.transact("tpidclaim", |processor| processor.referrer_claim(signer, actor))
    }

    pub fn credit_active_pool(&self, signer: &str, amount: u64) -> Result<u64> {
        self.credit_pool(signer, PoolKind::Active, amount)
    }

    pub fn credit_bucket_pool(&self, signer: &str, amount: u64) -> Result<u64> {
        self.credit_pool(signer, PoolKind::Bucket, amount)
    }

    pub fn credit_foundation_pool(&self, signer: &str, amount: u64) -> Result<u64> {
        self.credit_pool(signer, PoolKind::Foundation, amount)
    }

    pub fn credit_pool(&self, signer: &str, kind: PoolKind, amount: u64) -> Result<u64> {
        self.transact(kind.credit_action(), |processor| {
            processor.credit_pool(signer, kind, amount)
        })
    }

    pub fn update_clock(&self, signer: &str) -> Result<()> {
        self.transact("updateclock", |processor| processor.update_clock(signer))
    }

    pub fn start_clock(&self, signer: &str) -> Result<bool> {
        self.transact("startclock", |processor| processor.start_clock(signer))
    }

    /// Runs an action and returns the response body for the caller
    pub fn dispatch(&self, signer: &str, action: &Action) -> Result<Value> {
        let status = serde_json::json!({ "status": crate::claims::STATUS_OK });
        match action {
            Action::BpClaim { fio_address, actor } => self
                .producer_claim(signer, fio_address, actor)
                .map(|receipt| receipt.response()),
            Action::TpidClaim { actor } => self
                .referrer_claim(signer, actor)
                .map(|receipt| receipt.response()),
            Action::BpRewdUpdate { amount } => {
                self.credit_active_pool(signer, *amount).map(|_| status)
            }
            Action::BpPoolUpdate { amount } => {
                self.credit_bucket_pool(signer, *amount).map(|_| status)
            }
            Action::FdtnRwdUpdat { amount } => {
                self.credit_foundation_pool(signer, *amount).map(|_| status)
            }
            Action::UpdateClock => self.update_clock(signer).map(|_| status),
            Action::StartClock => self.start_clock(signer).map(|_| status),
        }
    }

    pub fn state(&self) -> TreasuryState {
        self.inner.lock().state.clone()
    }

    pub fn pools(&self) -> RewardPools {
        self.inner.lock().state.pools.clone()
    }

    pub fn pool_amount(&self, kind: PoolKind) -> u64 {
        self.inner.lock().state.pools.amount(kind)
    }

    pub fn clock(&self) -> Option<ClockState> {
        self.inner.lock().state.clock
    }

    pub fn schedule(&self) -> PaySchedule {
        self.inner.lock().state.schedule.clone()
    }

    pub fn schedule_status(&self) -> ScheduleStatus {
        let inner = self.inner.lock();
        let now = inner.host.now();
        match &inner.state.clock {
            Some(clock) => {
                inner
                    .state
                    .schedule
                    .status(clock, now, self.config.schedule.epoch_duration)
            }
            None => ScheduleStatus::NoSchedule,
        }
    }

    /// Read access to the host, e.g. to inspect ledger balances
    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.inner.lock().host)
    }

    /// Mutable access to the host outside of any action, e.g. to advance block time
    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.inner.lock().host)
    }

    pub fn into_parts(self) -> (TreasuryState, H) {
        let inner = self.inner.into_inner();
        (inner.state, inner.host)
    }

    fn transact<R>(
        &self,
        action: &str,
        f: impl FnOnce(&mut ClaimProcessor<'_, H>) -> Result<R>,
    ) -> Result<R> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let snapshot = inner.state.clone();
        inner.host.checkpoint();

        let result = {
            let mut processor = ClaimProcessor::new(&self.config, &mut inner.state, &mut inner.host);
            f(&mut processor)
        };

        match result {
            Ok(value) => {
                inner.host.release();
                Ok(value)
            }
            Err(e) => {
                inner.state = snapshot;
                inner.host.rollback();
                warn!("{} rolled back: {}", action, e);
                Err(e)
            }
        }
    }
}
