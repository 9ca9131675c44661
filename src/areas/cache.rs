use chrono::{DateTime, Duration, Utc};
use std::sync::Mutex;

use super::Municipalities;

/// Single-entry, time-bounded cache for the unfiltered municipality list.
///
/// Starts empty, is filled by the first successful unfiltered fetch and goes
/// stale after `ttl`. Concurrent refreshes race harmlessly: last writer wins.
pub struct MunicipalityCache {
    ttl: Duration,
    entry: Mutex<Option<Municipalities>>,
}

impl MunicipalityCache {
    pub fn new(ttl: std::time::Duration) -> Self {
        Self {
            ttl: Duration::from_std(ttl).unwrap_or_else(|_| Duration::minutes(30)),
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn get(&self) -> Option<Municipalities> {
        self.get_at(Utc::now())
    }

    /// Cached list if it has not expired at `now`.
    pub fn get_at(&self, now: DateTime<Utc>) -> Option<Municipalities> {
        let entry = self.entry.lock().ok()?;
        entry.as_ref().filter(|m| m.expires > now.timestamp_millis()).cloned()
    }

    /// Stores `municipios` with an expiry of `now + ttl` and returns the entry.
    pub fn set_at(&self, municipios: Vec<String>, now: DateTime<Utc>) -> Municipalities {
        let payload = Municipalities { municipios, expires: (now + self.ttl).timestamp_millis() };
        if let Ok(mut entry) = self.entry.lock() {
            *entry = Some(payload.clone());
        }
        payload
    }

    pub fn invalidate(&self) {
        if let Ok(mut entry) = self.entry.lock() {
            *entry = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn entry_expires_after_ttl() {
        let cache = MunicipalityCache::new(std::time::Duration::from_secs(1800));
        let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert!(cache.get_at(t0).is_none());

        let stored = cache.set_at(vec!["Recife".into()], t0);
        assert_eq!(stored.expires, (t0 + Duration::minutes(30)).timestamp_millis());
        assert_eq!(cache.get_at(t0 + Duration::minutes(29)).unwrap().municipios, vec!["Recife"]);
        assert!(cache.get_at(t0 + Duration::minutes(30)).is_none());
    }

    #[test]
    fn invalidate_clears_entry() {
        let cache = MunicipalityCache::new(std::time::Duration::from_secs(60));
        let now = Utc::now();
        cache.set_at(vec!["Olinda".into()], now);
        cache.invalidate();
        assert!(cache.get_at(now).is_none());
    }
}
