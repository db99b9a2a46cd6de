//! Record store: the authoritative holder of all records.
//!
//! The store knows nothing about wire formatting or visibility rules beyond
//! the serialized size used for quota accounting. Expiry is lazy: [`all`]
//! re-evaluates every record against the `now` it is given, so expired
//! records are invisible the moment their expiry passes, and
//! [`purge_expired`] actually drops them as an optimization.
//!
//! [`all`]: RecordStore::all
//! [`purge_expired`]: RecordStore::purge_expired

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::errors::JarError;
use crate::record::Record;
use crate::wire;

/// Authoritative set of records for one jar, keyed by the identity tuple
/// `(name, path, domain)`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces by identity tuple. Replacement is whole-record:
    /// the prior record is returned, never merged into.
    ///
    /// Fails with [`JarError::InvalidRecord`] when the name is empty or
    /// contains an unescaped separator.
    pub fn upsert(&mut self, record: Record) -> Result<Option<Record>, JarError> {
        validate_name(&record.name)?;

        let existing = self
            .records
            .iter()
            .position(|r| r.has_identity(&record.name, &record.path, record.domain.as_deref()));
        match existing {
            Some(pos) => Ok(Some(std::mem::replace(&mut self.records[pos], record))),
            None => {
                self.records.push(record);
                Ok(None)
            }
        }
    }

    /// Deletes the record with the given identity tuple. Idempotent: absence
    /// is not an error.
    pub fn remove_by_identity(&mut self, name: &str, path: &str, domain: Option<&str>) {
        self.records.retain(|r| !r.has_identity(name, path, domain));
    }

    /// The record with the given identity tuple, expired or not.
    pub fn get_by_identity(&self, name: &str, path: &str, domain: Option<&str>) -> Option<&Record> {
        self.records.iter().find(|r| r.has_identity(name, path, domain))
    }

    /// Every stored record, expired ones included, in insertion order.
    /// Persistence backends use this; reads go through [`Self::all`].
    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// All records that are live at `now`, in insertion order. Each call
    /// re-evaluates expiry, so the same store can answer differently as time
    /// advances.
    pub fn all(&self, now: OffsetDateTime) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| !r.is_expired(now))
    }

    /// Summed serialized size of the live records counting against `domain`.
    pub fn total_size_for_domain(&self, domain: &str, now: OffsetDateTime) -> usize {
        self.all(now)
            .filter(|r| r.effective_domain() == domain)
            .map(wire::serialized_len)
            .sum()
    }

    /// Drops expired records. Purely an optimization: [`Self::all`] already
    /// hides them.
    pub fn purge_expired(&mut self, now: OffsetDateTime) {
        self.records.retain(|r| !r.is_expired(now));
    }

    /// Drops every session-scoped record (those without an expiry).
    pub fn clear_session(&mut self) {
        self.records.retain(|r| !r.is_session());
    }

    /// Drops everything.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of stored records, including not-yet-purged expired ones.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn validate_name(name: &str) -> Result<(), JarError> {
    if name.is_empty() {
        return Err(JarError::InvalidRecord("name must not be empty".into()));
    }
    if name.contains('=') || name.contains(';') {
        return Err(JarError::InvalidRecord(format!(
            "name {:?} contains a separator character",
            name
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SameSite;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2025-06-01 12:00:00 UTC);

    fn record(name: &str, value: &str, path: &str, domain: Option<&str>) -> Record {
        Record {
            name: name.to_string(),
            value: value.to_string(),
            path: path.to_string(),
            domain: domain.map(str::to_string),
            origin: "example.com".to_string(),
            secure: false,
            expires: None,
            same_site: SameSite::default(),
        }
    }

    #[test]
    fn upsert_replaces_same_identity() {
        let mut store = RecordStore::new();
        assert!(store.upsert(record("a", "1", "/", None)).unwrap().is_none());

        let prior = store.upsert(record("a", "2", "/", None)).unwrap();
        assert_eq!(prior.unwrap().value, "1");
        assert_eq!(store.len(), 1);
        assert_eq!(store.all(NOW).next().unwrap().value, "2");
    }

    #[test]
    fn different_scopes_coexist_under_one_name() {
        let mut store = RecordStore::new();
        store.upsert(record("a", "1", "/", None)).unwrap();
        store.upsert(record("a", "2", "/x", None)).unwrap();
        store.upsert(record("a", "3", "/", Some("example.com"))).unwrap();
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn upsert_rejects_illegal_names() {
        let mut store = RecordStore::new();
        for name in ["", "a=b", "a;b"] {
            let err = store.upsert(record(name, "v", "/", None)).unwrap_err();
            assert!(matches!(err, JarError::InvalidRecord(_)), "name {:?}", name);
        }
        assert!(store.is_empty());
    }

    #[test]
    fn all_hides_expired_records_lazily() {
        let mut store = RecordStore::new();
        let mut live = record("live", "1", "/", None);
        live.expires = Some(NOW + time::Duration::hours(1));
        let mut dead = record("dead", "1", "/", None);
        dead.expires = Some(NOW - time::Duration::hours(1));

        store.upsert(live).unwrap();
        store.upsert(dead).unwrap();

        let names: Vec<_> = store.all(NOW).map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["live"]);

        // Still physically present until purged.
        assert_eq!(store.len(), 2);
        store.purge_expired(NOW);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn all_reevaluates_against_the_given_now() {
        let mut store = RecordStore::new();
        let mut r = record("a", "1", "/", None);
        r.expires = Some(NOW + time::Duration::minutes(5));
        store.upsert(r).unwrap();

        assert_eq!(store.all(NOW).count(), 1);
        assert_eq!(store.all(NOW + time::Duration::minutes(10)).count(), 0);
    }

    #[test]
    fn size_accounting_is_per_effective_domain() {
        let mut store = RecordStore::new();
        store.upsert(record("a", "1", "/", None)).unwrap();
        store.upsert(record("b", "2", "/", Some("example.com"))).unwrap();
        store.upsert(record("c", "3", "/", Some("other.com"))).unwrap();

        let example = store.total_size_for_domain("example.com", NOW);
        assert_eq!(
            example,
            wire::serialized_len(store.get_by_identity("a", "/", None).unwrap())
                + wire::serialized_len(store.get_by_identity("b", "/", Some("example.com")).unwrap())
        );
        assert_eq!(
            store.total_size_for_domain("other.com", NOW),
            wire::serialized_len(store.get_by_identity("c", "/", Some("other.com")).unwrap())
        );
        assert_eq!(store.total_size_for_domain("unseen.com", NOW), 0);
    }

    #[test]
    fn remove_by_identity_is_idempotent_and_scope_exact() {
        let mut store = RecordStore::new();
        store.upsert(record("a", "1", "/", None)).unwrap();
        store.upsert(record("a", "2", "/x", None)).unwrap();

        store.remove_by_identity("a", "/", None);
        assert_eq!(store.len(), 1);

        // Absent identity: no error, no change.
        store.remove_by_identity("a", "/", None);
        store.remove_by_identity("missing", "/", None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_session_keeps_only_persistent_records() {
        let mut store = RecordStore::new();
        store.upsert(record("session", "1", "/", None)).unwrap();
        let mut persistent = record("keep", "2", "/", None);
        persistent.expires = Some(NOW + time::Duration::days(1));
        store.upsert(persistent).unwrap();

        store.clear_session();
        let names: Vec<_> = store.all(NOW).map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["keep"]);
    }
}
