//! Producer pay schedule
//!
//! A schedule is a frozen snapshot of the active producers taken when the
//! first claim of an epoch arrives. Each entry carries the producer's vote
//! weight and the two shares computed from the active pool:
//! - `active_share`: an even slice of the top-tier portion, for the top
//!   `active_tier_slots` producers by votes
//! - `standby_share`: the standby portion weighted by the producer's votes
//!   against the registry-wide vote total
//!
//! Entries leave the schedule one at a time as producers claim. Whatever is
//! left when the epoch expires is swept back into the bucket pool.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::clock::ClockState;
use crate::config::ScheduleConfig;
use crate::ports::ProducerInfo;

/// One producer's claim for the current epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteShareEntry {
    pub owner: String,
    pub votes: f64,
    pub active_share: u64,
    pub standby_share: u64,
}

impl VoteShareEntry {
    pub fn new(owner: String, votes: f64) -> Self {
        Self {
            owner,
            votes,
            active_share: 0,
            standby_share: 0,
        }
    }

    pub fn payout(&self) -> u64 {
        self.active_share.saturating_add(self.standby_share)
    }
}

/// Lifecycle of the schedule as observed at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    NoSchedule,
    Active,
    ExpiredPendingReset,
}

/// How the active pool was divided when a schedule opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub pool_amount: u64,
    pub active_tier: u64,
    pub standby_tier: u64,
    pub active_share_each: u64,
    pub active_tier_entries: usize,
    /// Sum of all shares handed out; never exceeds `pool_amount`
    pub allocated: u64,
}

/// Vote-share entries keyed by producer account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaySchedule {
    entries: BTreeMap<String, VoteShareEntry>,
}

impl PaySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the `max_entries` highest-voted active producers (ties by owner)
    pub fn snapshot(producers: &[ProducerInfo], max_entries: usize) -> Self {
        let mut active: Vec<&ProducerInfo> = producers
            .iter()
            .filter(|producer| producer.is_active)
            .collect();
        active.sort_by(|a, b| {
            b.total_votes
                .total_cmp(&a.total_votes)
                .then_with(|| a.owner.cmp(&b.owner))
        });

        let entries = active
            .into_iter()
            .take(max_entries)
            .map(|producer| {
                (
                    producer.owner.clone(),
                    VoteShareEntry::new(producer.owner.clone(), producer.total_votes.max(0.0)),
                )
            })
            .collect();

        Self { entries }
    }

    pub fn status(&self, clock: &ClockState, now: u64, epoch_duration: u64) -> ScheduleStatus {
        if self.entries.is_empty() {
            ScheduleStatus::NoSchedule
        } else if clock.schedule_expired(now, epoch_duration) {
            ScheduleStatus::ExpiredPendingReset
        } else {
            ScheduleStatus::Active
        }
    }

    /// Splits `pool_amount` into per-entry shares.
    ///
    /// The top-tier portion is divided by `active_tier_slots`, not by the
    /// number of entries, so a short producer set leaves the unused slots in
    /// the pool. Standby shares use double-precision vote ratios; the
    /// denominator is never smaller than the snapshot's own vote sum, which
    /// keeps the standby total within its portion.
    pub fn allocate(
        &mut self,
        pool_amount: u64,
        registry_votes: f64,
        config: &ScheduleConfig,
    ) -> Allocation {
        let standby_tier = percent_of(pool_amount, config.standby_percent);
        let active_tier = percent_of(pool_amount, config.active_tier_percent);
        let active_share_each = active_tier / config.active_tier_slots as u64;

        let snapshot_votes: f64 = self.entries.values().map(|entry| entry.votes).sum();
        let denominator = registry_votes.max(snapshot_votes);

        let mut ranked: Vec<(String, f64)> = self
            .entries
            .values()
            .map(|entry| (entry.owner.clone(), entry.votes))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        let active_tier_entries = ranked.len().min(config.active_tier_slots);

        for (rank, (owner, _)) in ranked.iter().enumerate() {
            if let Some(entry) = self.entries.get_mut(owner) {
                entry.active_share = if rank < config.active_tier_slots {
                    active_share_each
                } else {
                    0
                };
                entry.standby_share = if denominator > 0.0 {
                    (standby_tier as f64 * entry.votes / denominator) as u64
                } else {
                    0
                };
            }
        }

        Allocation {
            pool_amount,
            active_tier,
            standby_tier,
            active_share_each,
            active_tier_entries,
            allocated: self.total_owed(),
        }
    }

    pub fn get(&self, owner: &str) -> Option<&VoteShareEntry> {
        self.entries.get(owner)
    }

    pub fn remove(&mut self, owner: &str) -> Option<VoteShareEntry> {
        self.entries.remove(owner)
    }

    /// Removes and returns every remaining entry
    pub fn drain(&mut self) -> Vec<VoteShareEntry> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &VoteShareEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of unclaimed payouts
    pub fn total_owed(&self) -> u64 {
        self.entries
            .values()
            .fold(0u64, |acc, entry| acc.saturating_add(entry.payout()))
    }
}

fn percent_of(amount: u64, percent: u64) -> u64 {
    (amount as u128 * percent as u128 / 100) as u64
}
