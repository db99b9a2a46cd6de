use std::any::Any;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::JarConfig;
use crate::context::ReadContext;
use crate::errors::JarError;
use crate::jar::{Jar, SetOptions, WireLoadReport};
use crate::matcher;
use crate::record::{Record, SameSite};
use crate::store::RecordStore;
use crate::wire::{self, MalformedToken};

/// In-memory reference jar for a single origin. Performs no persistence of
/// its own; persistence backends snapshot it via `serde` or wrap it in a
/// `PersistentJar`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryJar {
    origin: String,
    config: JarConfig,
    store: RecordStore,
}

impl MemoryJar {
    /// Creates an empty jar for `origin` with the default configuration.
    pub fn new(origin: impl Into<String>) -> Self {
        Self::with_config(origin, JarConfig::default())
    }

    pub fn with_config(origin: impl Into<String>, config: JarConfig) -> Self {
        MemoryJar {
            origin: origin.into(),
            config,
            store: RecordStore::new(),
        }
    }

    /// Rebuilds a jar from persisted parts. Records that fail validation are
    /// dropped with a warning rather than poisoning the whole jar.
    pub fn from_parts(
        origin: impl Into<String>,
        config: JarConfig,
        records: Vec<Record>,
    ) -> Self {
        let mut jar = Self::with_config(origin, config);
        for record in records {
            let name = record.name.clone();
            if let Err(error) = jar.store.upsert(record) {
                log::warn!("Jar[{}]: dropping persisted record {:?}: {}", jar.origin, name, error);
            }
        }
        jar
    }

    pub fn config(&self) -> &JarConfig {
        &self.config
    }

    /// Borrowed origin; the trait's [`Jar::origin`] clones for object safety.
    pub fn origin_str(&self) -> &str {
        &self.origin
    }

    /// All stored records, expired ones included. Used by persistence
    /// backends that write one row per record.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.store.iter()
    }

    /// Number of stored records (expired-but-unpurged ones included).
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn validate(&self, options: &SetOptions, path: &str) -> Result<(), JarError> {
        if !path.starts_with('/') {
            return Err(JarError::InvalidRecord(format!(
                "path {:?} must start with '/'",
                path
            )));
        }
        if options.same_site == SameSite::None && !options.secure {
            return Err(JarError::InvalidRecord(
                "samesite=none requires the secure flag".into(),
            ));
        }
        if let Some(domain) = &options.domain {
            let within_origin =
                self.origin == *domain || self.origin.ends_with(&format!(".{}", domain));
            if !within_origin {
                return Err(JarError::InvalidRecord(format!(
                    "domain {:?} would broaden scope beyond origin {:?}",
                    domain, self.origin
                )));
            }
        }
        Ok(())
    }
}

impl Jar for MemoryJar {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn set(&mut self, name: &str, value: &str, options: SetOptions) -> Result<(), JarError> {
        let now = OffsetDateTime::now_utc();
        self.store.purge_expired(now);

        let path = options.path.clone().unwrap_or_else(|| "/".to_string());
        self.validate(&options, &path)?;

        let record = Record {
            name: name.to_string(),
            value: value.to_string(),
            path,
            domain: options.domain,
            origin: self.origin.clone(),
            secure: options.secure,
            expires: options.expires,
            same_site: options.same_site,
        };

        // Quota check accounts for the record being replaced, so an
        // oversized jar can still shrink a record in place.
        let domain_key = record.effective_domain().to_string();
        let replaced = self
            .store
            .get_by_identity(&record.name, &record.path, record.domain.as_deref())
            .map(wire::serialized_len)
            .unwrap_or(0);
        let attempted = self.store.total_size_for_domain(&domain_key, now) - replaced
            + wire::serialized_len(&record);
        if attempted > self.config.max_domain_bytes {
            return Err(JarError::SizeExceeded {
                domain: domain_key,
                attempted,
                limit: self.config.max_domain_bytes,
            });
        }

        self.store.upsert(record)?;
        log::debug!("Jar[{}]: set {:?} ({} bytes for {})", self.origin, name, attempted, domain_key);
        Ok(())
    }

    fn get(&self, name: &str, ctx: &ReadContext) -> Option<String> {
        let now = OffsetDateTime::now_utc();
        let candidates = self
            .store
            .all(now)
            .filter(|r| r.name == name && matcher::record_matches(r, ctx));
        matcher::select_winner(candidates).map(|r| r.value.clone())
    }

    fn delete(&mut self, name: &str, path: &str, domain: Option<&str>) {
        let existed = self.store.get_by_identity(name, path, domain).is_some();

        // Expiry at the epoch shares the one invariant with natural expiry:
        // in the past means invisible to every read. The tombstone is purged
        // on the next write pass.
        let tombstone = Record {
            name: name.to_string(),
            value: String::new(),
            path: path.to_string(),
            domain: domain.map(str::to_string),
            origin: self.origin.clone(),
            secure: false,
            expires: Some(OffsetDateTime::UNIX_EPOCH),
            same_site: SameSite::default(),
        };
        if self.store.upsert(tombstone).is_err() {
            // Illegal names can never have been stored in the first place.
            return;
        }

        if existed {
            log::debug!("Jar[{}]: explicitly cleared {:?} (path={:?}, domain={:?})", self.origin, name, path, domain);
        } else {
            log::debug!("Jar[{}]: delete of never-set {:?}", self.origin, name);
        }
    }

    fn enumerate(&self, ctx: &ReadContext) -> Vec<(String, String)> {
        let now = OffsetDateTime::now_utc();
        let visible: Vec<&Record> = self
            .store
            .all(now)
            .filter(|r| matcher::record_matches(r, ctx))
            .collect();

        // Emit each name's winner at the winner's own store position, so the
        // output order is the insertion order of the winning records.
        let mut pairs: Vec<(String, String)> = Vec::new();
        for record in &visible {
            let winner =
                matcher::select_winner(visible.iter().copied().filter(|c| c.name == record.name));
            if winner.is_some_and(|w| std::ptr::eq(*record, w)) {
                pairs.push((record.name.clone(), record.value.clone()));
            }
        }
        pairs
    }

    fn enumerate_wire(&self, ctx: &ReadContext) -> String {
        let pairs = self.enumerate(ctx);
        wire::serialize_all(pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }

    fn load_from_wire(&mut self, wire_str: &str) -> WireLoadReport {
        let parsed = wire::parse_all(wire_str);
        let mut report = WireLoadReport {
            loaded: 0,
            skipped: parsed.malformed,
        };

        for (name, value) in parsed.pairs {
            match self.set(&name, &value, SetOptions::default()) {
                Ok(()) => report.loaded += 1,
                Err(error) => {
                    log::warn!("Jar[{}]: skipping rejected wire pair {:?}: {}", self.origin, name, error);
                    report.skipped.push(MalformedToken {
                        token: format!("{}={}", name, value),
                        error,
                    });
                }
            }
        }

        log::debug!("Jar[{}]: hydrated {} records ({} skipped)", self.origin, report.loaded, report.skipped.len());
        report
    }

    fn clear_session(&mut self) {
        self.store.clear_session();
        log::debug!("Jar[{}]: session records cleared", self.origin);
    }

    fn clear(&mut self) {
        self.store.clear();
    }

    fn origin(&self) -> String {
        self.origin.clone()
    }
}
