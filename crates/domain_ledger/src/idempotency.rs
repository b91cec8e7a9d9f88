//! Short-lived idempotency key store
//!
//! Maps a client key to the settlement it produced. A resubmission with the
//! same payload replays the original receipt; the same key with a different
//! payload is a conflict. Records older than the TTL are forgotten.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use core_kernel::{EntryId, SettlementId};
use crate::error::LedgerError;
use crate::settlement::{IdempotencyKey, SettlementReceipt};

/// Default lifetime of a key record
pub fn default_key_ttl() -> Duration {
    Duration::hours(24)
}

/// What was committed under a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub settlement_id: SettlementId,
    pub fingerprint: String,
    pub entry_ids: Vec<EntryId>,
    pub recorded_at: DateTime<Utc>,
}

impl KeyRecord {
    /// Resolves a resubmission against this record
    pub fn replay(&self, key: &IdempotencyKey, fingerprint: &str) -> Result<SettlementReceipt, LedgerError> {
        if self.fingerprint != fingerprint {
            return Err(LedgerError::IdempotencyConflict(key.to_string()));
        }
        Ok(SettlementReceipt {
            settlement_id: self.settlement_id,
            entry_ids: self.entry_ids.clone(),
            replayed: true,
        })
    }
}

/// In-memory key records with expiry
#[derive(Debug)]
pub struct IdempotencyStore {
    ttl: Duration,
    records: HashMap<IdempotencyKey, KeyRecord>,
}

impl IdempotencyStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            records: HashMap::new(),
        }
    }

    /// Drops records recorded before `now - ttl`
    pub fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - self.ttl;
        self.records.retain(|_, record| record.recorded_at >= cutoff);
    }

    /// Looks a key up, returning a replay receipt if it was already committed
    pub fn check(
        &mut self,
        key: &IdempotencyKey,
        fingerprint: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SettlementReceipt>, LedgerError> {
        self.prune(now);
        self.records
            .get(key)
            .map(|record| record.replay(key, fingerprint))
            .transpose()
    }

    pub fn record(&mut self, key: IdempotencyKey, record: KeyRecord) {
        self.records.insert(key, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for IdempotencyStore {
    fn default() -> Self {
        Self::new(default_key_ttl())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fingerprint: &str, at: DateTime<Utc>) -> KeyRecord {
        KeyRecord {
            settlement_id: SettlementId::new(),
            fingerprint: fingerprint.to_string(),
            entry_ids: vec![EntryId::new()],
            recorded_at: at,
        }
    }

    #[test]
    fn test_replay_and_conflict() {
        let now = Utc::now();
        let key = IdempotencyKey::parse("abc").unwrap();
        let mut store = IdempotencyStore::default();
        assert!(store.check(&key, "f1", now).unwrap().is_none());

        store.record(key.clone(), record("f1", now));
        let replay = store.check(&key, "f1", now).unwrap().unwrap();
        assert!(replay.replayed);

        assert!(matches!(store.check(&key, "f2", now), Err(LedgerError::IdempotencyConflict(_))));
    }

    #[test]
    fn test_expired_records_are_forgotten() {
        let now = Utc::now();
        let key = IdempotencyKey::parse("abc").unwrap();
        let mut store = IdempotencyStore::new(Duration::minutes(5));
        store.record(key.clone(), record("f1", now - Duration::minutes(6)));

        assert!(store.check(&key, "f2", now).unwrap().is_none());
        assert!(store.is_empty());
    }
}
