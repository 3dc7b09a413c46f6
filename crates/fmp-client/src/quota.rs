use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use evaluation_core::{FetchError, QuotaStatus};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::time::Instant;

/// One-way hash of a credential; the raw key never reaches the map or logs.
pub(crate) fn credential_key(credential: &str) -> String {
    hex::encode(Sha256::digest(credential.as_bytes()))
}

#[derive(Debug)]
struct QuotaState {
    last_call: Option<Instant>,
    last_call_time: Option<DateTime<Utc>>,
    daily_count: u32,
    /// Slots reserved by admitted calls that have not completed yet. Counted
    /// against the daily limit so concurrent callers cannot overshoot it.
    in_flight: u32,
    reset_date: NaiveDate,
}

impl QuotaState {
    fn new(today: NaiveDate) -> Self {
        Self {
            last_call: None,
            last_call_time: None,
            daily_count: 0,
            in_flight: 0,
            reset_date: today,
        }
    }

    fn roll_day(&mut self, today: NaiveDate) {
        if self.reset_date != today {
            self.daily_count = 0;
            self.reset_date = today;
        }
    }
}

/// Per-credential rate bookkeeping, keyed by credential hash. Entries are
/// created lazily and live for the process lifetime; each DashMap shard locks
/// independently, so unrelated credentials never contend.
pub struct QuotaLedger {
    entries: DashMap<String, QuotaState>,
    daily_limit: u32,
    per_minute_limit: u32,
}

impl QuotaLedger {
    pub fn new(daily_limit: u32, per_minute_limit: u32) -> Self {
        Self {
            entries: DashMap::new(),
            daily_limit,
            per_minute_limit: per_minute_limit.max(1),
        }
    }

    fn min_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / self.per_minute_limit as f64)
    }

    /// Admission check before a network call. Reserves one daily slot under
    /// the entry lock and rejects when completed plus in-flight calls have
    /// spent the budget, so concurrent callers sharing a credential cannot
    /// push the count past the limit. On success, returns how long the caller
    /// must pace before issuing the request; the entry lock is released on
    /// return, so pacing itself stays advisory.
    ///
    /// Every reservation must be settled with `record_success` or `release`.
    pub fn admit(&self, key: &str, today: NaiveDate, now: Instant) -> Result<Duration, FetchError> {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| QuotaState::new(today));
        entry.roll_day(today);

        if entry.daily_count + entry.in_flight >= self.daily_limit {
            return Err(FetchError::DailyQuotaExceeded {
                used: entry.daily_count + entry.in_flight,
                limit: self.daily_limit,
            });
        }
        entry.in_flight += 1;

        let wait = match entry.last_call {
            Some(last) => self
                .min_interval()
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        };
        Ok(wait)
    }

    /// Settle an admitted call that got a 2xx: the reservation becomes a
    /// counted daily call. Only successful calls count against the budget.
    pub fn record_success(&self, key: &str, today: NaiveDate, now: Instant) {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| QuotaState::new(today));
        entry.roll_day(today);
        entry.in_flight = entry.in_flight.saturating_sub(1);
        entry.daily_count += 1;
        entry.last_call = Some(now);
        entry.last_call_time = Some(Utc::now());
    }

    /// Settle an admitted call that failed: the reserved slot goes back to
    /// the budget.
    pub fn release(&self, key: &str) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            entry.in_flight = entry.in_flight.saturating_sub(1);
        }
    }

    /// Read-only snapshot; applies the daily-reset check so a stale count
    /// from yesterday is never reported.
    pub fn status(&self, key: &str, today: NaiveDate) -> QuotaStatus {
        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| QuotaState::new(today));
        entry.roll_day(today);

        QuotaStatus {
            used: entry.daily_count,
            remaining: self
                .daily_limit
                .saturating_sub(entry.daily_count + entry.in_flight),
            daily_limit: self.daily_limit,
            minute_limit: self.per_minute_limit,
            last_call_time: entry.last_call_time,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn counts_and_rejects_at_daily_limit() {
        let ledger = QuotaLedger::new(3, 60);
        let key = credential_key("test-key-a");
        let today = day("2025-06-01");

        for _ in 0..3 {
            ledger.admit(&key, today, Instant::now()).unwrap();
            ledger.record_success(&key, today, Instant::now());
        }

        let status = ledger.status(&key, today);
        assert_eq!(status.used, 3);
        assert_eq!(status.remaining, 0);

        let err = ledger.admit(&key, today, Instant::now()).unwrap_err();
        assert!(matches!(
            err,
            FetchError::DailyQuotaExceeded { used: 3, limit: 3 }
        ));
    }

    #[tokio::test]
    async fn daily_count_resets_on_date_change() {
        let ledger = QuotaLedger::new(2, 60);
        let key = credential_key("test-key-b");

        let yesterday = day("2025-06-01");
        for _ in 0..2 {
            ledger.admit(&key, yesterday, Instant::now()).unwrap();
            ledger.record_success(&key, yesterday, Instant::now());
        }
        assert!(ledger.admit(&key, yesterday, Instant::now()).is_err());

        // New day: the counter rolls over and admission succeeds again.
        let today = day("2025-06-02");
        ledger.admit(&key, today, Instant::now()).unwrap();
        assert_eq!(ledger.status(&key, today).used, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pacing_wait_derives_from_minute_limit() {
        // 5 calls/minute -> 12s between calls on one credential.
        let ledger = QuotaLedger::new(100, 5);
        let key = credential_key("test-key-c");
        let today = day("2025-06-01");

        let wait = ledger.admit(&key, today, Instant::now()).unwrap();
        assert_eq!(wait, Duration::ZERO);
        ledger.record_success(&key, today, Instant::now());

        let wait = ledger.admit(&key, today, Instant::now()).unwrap();
        assert_eq!(wait, Duration::from_secs(12));

        tokio::time::advance(Duration::from_secs(7)).await;
        let wait = ledger.admit(&key, today, Instant::now()).unwrap();
        assert_eq!(wait, Duration::from_secs(5));

        tokio::time::advance(Duration::from_secs(5)).await;
        let wait = ledger.admit(&key, today, Instant::now()).unwrap();
        assert_eq!(wait, Duration::ZERO);
    }

    #[tokio::test]
    async fn admitted_calls_reserve_daily_slots() {
        let ledger = QuotaLedger::new(2, 60);
        let key = credential_key("test-key-d");
        let today = day("2025-06-01");

        // Two admitted-but-unfinished calls hold the whole budget.
        ledger.admit(&key, today, Instant::now()).unwrap();
        ledger.admit(&key, today, Instant::now()).unwrap();
        let err = ledger.admit(&key, today, Instant::now()).unwrap_err();
        assert!(matches!(
            err,
            FetchError::DailyQuotaExceeded { used: 2, limit: 2 }
        ));
        assert_eq!(ledger.status(&key, today).remaining, 0);

        // One settles as success, one as failure: only the success counts,
        // and the released slot is admittable again.
        ledger.record_success(&key, today, Instant::now());
        ledger.release(&key);
        let status = ledger.status(&key, today);
        assert_eq!(status.used, 1);
        assert_eq!(status.remaining, 1);
        ledger.admit(&key, today, Instant::now()).unwrap();
    }

    #[tokio::test]
    async fn credentials_are_tracked_independently() {
        let ledger = QuotaLedger::new(1, 60);
        let today = day("2025-06-01");
        let a = credential_key("key-a");
        let b = credential_key("key-b");

        ledger.admit(&a, today, Instant::now()).unwrap();
        ledger.record_success(&a, today, Instant::now());
        assert!(ledger.admit(&a, today, Instant::now()).is_err());

        // A second credential still has its full budget.
        ledger.admit(&b, today, Instant::now()).unwrap();
    }

    #[test]
    fn credential_key_is_not_the_raw_secret() {
        let key = credential_key("super-secret-api-key");
        assert_ne!(key, "super-secret-api-key");
        assert_eq!(key.len(), 64);
        assert_eq!(key, credential_key("super-secret-api-key"));
    }
}
