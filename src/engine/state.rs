//! Per-subject runtime state.
//!
//! Two caches per subject:
//!
//! - **Holder cache**: the last provider query, reused for a short TTL so
//!   that bursts of triggers don't re-query every provider.
//! - **Previous holders**: what the last reconciliation enabled against.
//!   Kept until the subject disconnects or goes idle; expired entries are
//!   handed back for teardown rather than silently dropped.
//!
//! Locks are held only for map operations, never across provider or handler
//! calls.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::core::{SubjectId, Tick};
use crate::holders::HolderSet;

use super::cache::ExpiringCache;

/// Runtime caches for every tracked subject.
pub struct SubjectStates {
    holders: Mutex<ExpiringCache<SubjectId, HolderSet>>,
    previous: Mutex<ExpiringCache<SubjectId, HolderSet>>,
    in_flight: Mutex<FxHashSet<SubjectId>>,
    now: AtomicU64,
}

impl SubjectStates {
    pub fn new(holder_cache_ttl: u64, idle_ttl: u64) -> Self {
        Self {
            holders: Mutex::new(ExpiringCache::new(holder_cache_ttl)),
            previous: Mutex::new(ExpiringCache::new(idle_ttl)),
            in_flight: Mutex::new(FxHashSet::default()),
            now: AtomicU64::new(0),
        }
    }

    /// Latest tick seen.
    #[must_use]
    pub fn now(&self) -> Tick {
        Tick::new(self.now.load(Ordering::Acquire))
    }

    /// Advance the clock. Never moves backwards.
    pub fn advance(&self, now: Tick) {
        self.now.fetch_max(now.raw(), Ordering::AcqRel);
    }

    /// Unexpired cached provider result.
    #[must_use]
    pub fn cached_holders(&self, subject: SubjectId) -> Option<HolderSet> {
        self.holders.lock().get(&subject, self.now()).cloned()
    }

    pub fn cache_holders(&self, subject: SubjectId, holders: HolderSet) {
        let now = self.now();
        self.holders.lock().insert(subject, holders, now);
    }

    pub fn clear_holders(&self, subject: SubjectId) {
        self.holders.lock().remove(&subject);
    }

    pub fn clear_all_holders(&self) {
        self.holders.lock().clear();
    }

    /// Record `after` as the subject's holders and return the previous ones
    /// (empty for a first pass). Expired-but-unevicted state still counts.
    pub fn replace_previous(&self, subject: SubjectId, after: HolderSet) -> HolderSet {
        let now = self.now();
        self.previous
            .lock()
            .insert(subject, after, now)
            .unwrap_or_default()
    }

    /// Mark `subjects` as still online so their previous holders don't go idle.
    pub fn touch<I>(&self, subjects: I)
    where
        I: IntoIterator<Item = SubjectId>,
    {
        let now = self.now();
        let mut previous = self.previous.lock();
        for subject in subjects {
            previous.touch(&subject, now);
        }
    }

    /// Holders the last reconciliation recorded.
    #[must_use]
    pub fn previous(&self, subject: SubjectId) -> Option<HolderSet> {
        self.previous.lock().peek(&subject).cloned()
    }

    /// Drop all state for `subject`, returning its previous holders.
    pub fn forget(&self, subject: SubjectId) -> Option<HolderSet> {
        self.holders.lock().remove(&subject);
        self.previous.lock().remove(&subject)
    }

    /// Subjects with previous holders, sorted.
    #[must_use]
    pub fn tracked(&self) -> Vec<SubjectId> {
        let mut subjects: Vec<SubjectId> = self.previous.lock().keys().copied().collect();
        subjects.sort();
        subjects
    }

    /// Evict expired entries. Returns the idle subjects whose previous
    /// holders still need teardown.
    pub fn expire(&self) -> Vec<(SubjectId, HolderSet)> {
        let now = self.now();
        let stale = self.holders.lock().evict_expired(now).len();
        let mut idle = self.previous.lock().evict_expired(now);
        idle.sort_by_key(|(subject, _)| *subject);

        if stale > 0 || !idle.is_empty() {
            tracing::debug!(%now, stale_holder_caches = stale, idle_subjects = idle.len(), "evicted subject state");
        }
        idle
    }

    /// Claim `subject` for one reconciliation. `None` if one is already running.
    pub fn begin(&self, subject: SubjectId) -> Option<FlightGuard<'_>> {
        let claimed = self.in_flight.lock().insert(subject);
        claimed.then(|| FlightGuard { states: self, subject })
    }
}

impl std::fmt::Debug for SubjectStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubjectStates")
            .field("now", &self.now())
            .field("tracked", &self.previous.lock().len())
            .field("cached", &self.holders.lock().len())
            .finish()
    }
}

/// Releases a subject's reconciliation claim on drop.
pub struct FlightGuard<'a> {
    states: &'a SubjectStates,
    subject: SubjectId,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.states.in_flight.lock().remove(&self.subject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::holders::Holder;

    fn set(ids: &[&str]) -> HolderSet {
        ids.iter().map(|id| Holder::builder(*id).build()).collect()
    }

    #[test]
    fn test_holder_cache_ttl() {
        let states = SubjectStates::new(40, 6000);
        let subject = SubjectId::new(1);
        states.cache_holders(subject, set(&["a"]));

        states.advance(Tick::new(39));
        assert!(states.cached_holders(subject).is_some());
        states.advance(Tick::new(40));
        assert!(states.cached_holders(subject).is_none());
    }

    #[test]
    fn test_clock_is_monotonic() {
        let states = SubjectStates::new(40, 6000);
        states.advance(Tick::new(10));
        states.advance(Tick::new(3));
        assert_eq!(states.now(), Tick::new(10));
    }

    #[test]
    fn test_replace_previous_returns_before() {
        let states = SubjectStates::new(40, 6000);
        let subject = SubjectId::new(1);

        assert!(states.replace_previous(subject, set(&["a"])).is_empty());
        assert_eq!(states.replace_previous(subject, set(&["b"])), set(&["a"]));
        assert_eq!(states.previous(subject), Some(set(&["b"])));
        assert_eq!(states.tracked(), vec![subject]);
    }

    #[test]
    fn test_expire_hands_back_idle_subjects() {
        let states = SubjectStates::new(40, 100);
        states.replace_previous(SubjectId::new(2), set(&["b"]));
        states.replace_previous(SubjectId::new(1), set(&["a"]));

        states.advance(Tick::new(99));
        assert!(states.expire().is_empty());

        states.advance(Tick::new(100));
        let idle = states.expire();
        assert_eq!(idle.len(), 2);
        assert_eq!(idle[0].0, SubjectId::new(1));
        assert!(states.tracked().is_empty());
    }

    #[test]
    fn test_touched_subjects_stay_tracked() {
        let states = SubjectStates::new(40, 100);
        let online = SubjectId::new(1);
        states.replace_previous(online, set(&["a"]));
        states.replace_previous(SubjectId::new(2), set(&["b"]));

        states.advance(Tick::new(90));
        states.touch([online]);
        states.advance(Tick::new(150));

        let idle = states.expire();
        assert_eq!(idle.len(), 1);
        assert_eq!(idle[0].0, SubjectId::new(2));
        assert_eq!(states.tracked(), vec![online]);
    }

    #[test]
    fn test_forget() {
        let states = SubjectStates::new(40, 100);
        let subject = SubjectId::new(1);
        states.cache_holders(subject, set(&["a"]));
        states.replace_previous(subject, set(&["a"]));

        assert_eq!(states.forget(subject), Some(set(&["a"])));
        assert!(states.cached_holders(subject).is_none());
        assert_eq!(states.forget(subject), None);
    }

    #[test]
    fn test_single_flight_guard() {
        let states = SubjectStates::new(40, 100);
        let subject = SubjectId::new(1);

        let guard = states.begin(subject);
        assert!(guard.is_some());
        assert!(states.begin(subject).is_none());
        assert!(states.begin(SubjectId::new(2)).is_some());

        drop(guard);
        assert!(states.begin(subject).is_some());
    }
}
