//! Index-vs-cache reconciliation.
//!
//! # Responsibility
//! - Compute evictions and the fetch change set from `syncnum` markers.
//! - Apply evictions only after the full plan has been computed.
//!
//! # Invariants
//! - Change set order: changed cached keys (ascending key order), then new
//!   keys in index order.
//! - Duplicate index keys: the last entry's `syncnum` wins, the first
//!   occurrence decides position; each key appears at most once.
//! - An incomplete index never evicts anything.

use crate::cache::CacheStore;
use crate::model::note::{IndexSnapshot, NoteKey};
use log::{info, warn};
use std::collections::{HashMap, HashSet};

/// Pure reconciliation result, computed before any cache mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// Cached keys absent from the index.
    pub evict: Vec<NoteKey>,
    /// Cached keys whose `syncnum` differs from the index.
    pub changed: Vec<NoteKey>,
    /// Index keys with no cache entry.
    pub added: Vec<NoteKey>,
    /// Cached keys kept only because the index is incomplete.
    pub eviction_skipped: usize,
}

/// Outcome of one `reconcile` pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Keys removed from the cache.
    pub evicted: Vec<NoteKey>,
    /// Keys to fetch, changed first then new.
    pub to_fetch: Vec<NoteKey>,
    pub eviction_skipped: usize,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty() && self.to_fetch.is_empty()
    }
}

impl From<ReconcilePlan> for ChangeSet {
    fn from(plan: ReconcilePlan) -> Self {
        let mut to_fetch = plan.changed;
        to_fetch.extend(plan.added);
        Self {
            evicted: plan.evict,
            to_fetch,
            eviction_skipped: plan.eviction_skipped,
        }
    }
}

/// Computes the reconciliation plan without mutating anything.
///
/// `cached` yields `(key, syncnum)` pairs in cache iteration order.
pub fn plan_reconcile<'a, I>(index: &IndexSnapshot, cached: I) -> ReconcilePlan
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    let mut remote: HashMap<&str, i64> = HashMap::with_capacity(index.entries.len());
    let mut index_order: Vec<&str> = Vec::with_capacity(index.entries.len());
    for entry in &index.entries {
        if remote.insert(entry.key.as_str(), entry.syncnum).is_none() {
            index_order.push(entry.key.as_str());
        }
    }

    let mut plan = ReconcilePlan::default();
    let mut cached_keys: HashSet<&str> = HashSet::new();
    for (key, syncnum) in cached {
        cached_keys.insert(key);
        match remote.get(key) {
            Some(remote_syncnum) if *remote_syncnum != syncnum => {
                plan.changed.push(key.to_string());
            }
            Some(_) => {}
            None if index.complete => plan.evict.push(key.to_string()),
            None => plan.eviction_skipped += 1,
        }
    }

    plan.added = index_order
        .into_iter()
        .filter(|key| !cached_keys.contains(key))
        .map(str::to_string)
        .collect();
    plan
}

/// Evicts stale cache entries and returns the keys that need a fetch.
pub fn reconcile(index: &IndexSnapshot, cache: &mut CacheStore) -> ChangeSet {
    let plan = plan_reconcile(index, cache.revisions());

    if plan.eviction_skipped > 0 {
        warn!(
            "event=reconcile module=sync status=eviction_skipped reason=incomplete_index kept={}",
            plan.eviction_skipped
        );
    }
    for key in &plan.evict {
        cache.delete(key);
    }

    info!(
        "event=reconcile module=sync status=ok index={} cached={} evicted={} changed={} added={}",
        index.len(),
        cache.len(),
        plan.evict.len(),
        plan.changed.len(),
        plan.added.len()
    );
    ChangeSet::from(plan)
}
