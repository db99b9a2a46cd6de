//! SQLite-backed jar store.
//!
//! `SqliteJarStore` persists **all** jars in a single SQLite database. It
//! implements the [`JarStore`] trait and returns jars wrapped in a
//! [`PersistentJar`], so that **every mutation** to a jar triggers a snapshot
//! write back to this store.
//!
//! ## Design
//! - One row per jar in `jars` (origin + config), one row per record in
//!   `records`.
//! - In-memory cache: `jars: RwLock<HashMap<JarId, JarHandle>>` for quick reuse.
//! - The store keeps a self handle (`store_self`) so persistent jars can
//!   call back into `persist_snapshot`.
//! - Database access is via an `r2d2` pool for safe multi-threaded use.
//!
//! ## I/O characteristics & caveats
//! - `save_jar` **rewrites** the rows for a jar (DELETE + INSERT) inside a
//!   transaction.
//! - Pool and schema setup panic at construction time; runtime load/save
//!   failures are logged and degrade to empty/unsaved state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::rusqlite::{params, Transaction};
use r2d2_sqlite::SqliteConnectionManager;
use time::OffsetDateTime;

use crate::config::JarConfig;
use crate::jar::{jar_handle, Jar, JarHandle, JarId, MemoryJar};
use crate::persist::{JarStore, JarStoreHandle, PersistentJar};
use crate::record::{Record, SameSite};

/// A SQLite-based jar store that persists jars across sessions.
///
/// Mints jars on demand, caches them in memory, and snapshots them back to
/// SQLite after each mutation (via [`PersistentJar`]).
pub struct SqliteJarStore {
    /// Connection pool for the SQLite database (so it can run multithreaded)
    pool: Pool<SqliteConnectionManager>,
    /// Minted jars per id
    jars: RwLock<HashMap<JarId, JarHandle>>,
    /// Self handle provided to persistent jars for callback persistence.
    store_self: RwLock<Option<JarStoreHandle>>,
}

impl SqliteJarStore {
    /// Opens (or creates) a SQLite database at `path` and ensures the schema
    /// exists.
    ///
    /// # Panics
    /// Panics if the pool cannot be created or the schema cannot be applied.
    pub fn new(path: PathBuf) -> Arc<Self> {
        let manager = SqliteConnectionManager::file(path);
        let pool = Pool::new(manager).expect("Failed to create SQLite pool");

        {
            let conn = pool.get().expect("DB connection");
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS jars (
                    jar_id TEXT PRIMARY KEY,
                    origin TEXT NOT NULL,
                    max_domain_bytes INTEGER NOT NULL
                );
                CREATE TABLE IF NOT EXISTS records (
                    jar_id TEXT NOT NULL,
                    name TEXT NOT NULL,
                    value TEXT NOT NULL,
                    path TEXT NOT NULL,
                    domain TEXT,
                    origin TEXT NOT NULL,
                    secure INTEGER NOT NULL,
                    expires_unix INTEGER,
                    same_site TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS records_by_jar ON records (jar_id);",
            )
            .expect("Failed to create jar tables");
        }

        let store = Arc::new(Self {
            pool,
            jars: RwLock::new(HashMap::new()),
            store_self: RwLock::new(None),
        });

        {
            let mut self_ref = store.store_self.write().unwrap();
            *self_ref = Some(store.clone() as JarStoreHandle);
        }

        store
    }

    /// Borrows a pooled SQLite connection, logging on failure.
    fn conn(&self) -> Option<PooledConnection<SqliteConnectionManager>> {
        match self.pool.get() {
            Ok(conn) => Some(conn),
            Err(e) => {
                log::error!("Cannot get DB connection: {}", e);
                None
            }
        }
    }

    /// Loads the jar for `jar_id` from the database, or `None` if the jar
    /// has never been persisted (or the database is unreadable).
    fn load_jar(&self, jar_id: JarId) -> Option<MemoryJar> {
        let conn = self.conn()?;

        let (origin, config) = conn
            .query_row(
                "SELECT origin, max_domain_bytes FROM jars WHERE jar_id = ?1",
                [jar_id.to_string()],
                |row| {
                    let origin: String = row.get(0)?;
                    let max_domain_bytes: i64 = row.get(1)?;
                    Ok((
                        origin,
                        JarConfig {
                            max_domain_bytes: max_domain_bytes as usize,
                        },
                    ))
                },
            )
            .ok()?;

        let mut stmt = conn
            .prepare(
                "SELECT name, value, path, domain, origin, secure, expires_unix, same_site
                 FROM records WHERE jar_id = ?1",
            )
            .ok()?;

        let rows = stmt
            .query_map([jar_id.to_string()], |row| {
                let secure: i64 = row.get(5)?;
                let expires_unix: Option<i64> = row.get(6)?;
                let same_site: String = row.get(7)?;
                Ok(Record {
                    name: row.get(0)?,
                    value: row.get(1)?,
                    path: row.get(2)?,
                    domain: row.get(3)?,
                    origin: row.get(4)?,
                    secure: secure != 0,
                    expires: expires_unix
                        .and_then(|t| OffsetDateTime::from_unix_timestamp(t).ok()),
                    same_site: SameSite::from_wire_str(&same_site).unwrap_or_default(),
                })
            })
            .ok()?;

        let records: Vec<Record> = rows.filter_map(Result::ok).collect();
        Some(MemoryJar::from_parts(origin, config, records))
    }

    /// Replaces all rows for `jar_id` with the contents of `jar` in a
    /// transaction. Failures are logged; the previous rows stay in place.
    fn save_jar(&self, jar_id: JarId, jar: &MemoryJar) {
        let Some(mut conn) = self.conn() else {
            return;
        };

        let tx = match conn.transaction() {
            Ok(tx) => tx,
            Err(e) => {
                log::error!("Jar[{}]: cannot begin transaction: {}", jar_id, e);
                return;
            }
        };

        if let Err(e) = write_jar_rows(&tx, jar_id, jar) {
            log::error!("Jar[{}]: cannot persist: {}", jar_id, e);
            return;
        }

        if let Err(e) = tx.commit() {
            log::error!("Jar[{}]: commit failed: {}", jar_id, e);
        }
    }

    /// Deletes all rows for `jar_id` from the database.
    fn remove_jar_from_db(&self, jar_id: JarId) {
        let Some(conn) = self.conn() else {
            return;
        };
        let id = jar_id.to_string();
        for sql in [
            "DELETE FROM records WHERE jar_id = ?1",
            "DELETE FROM jars WHERE jar_id = ?1",
        ] {
            if let Err(e) = conn.execute(sql, [&id]) {
                log::error!("Jar[{}]: cannot delete rows: {}", jar_id, e);
            }
        }
    }
}

fn write_jar_rows(
    tx: &Transaction<'_>,
    jar_id: JarId,
    jar: &MemoryJar,
) -> Result<(), r2d2_sqlite::rusqlite::Error> {
    let id = jar_id.to_string();

    tx.execute("DELETE FROM records WHERE jar_id = ?1", [&id])?;
    tx.execute("DELETE FROM jars WHERE jar_id = ?1", [&id])?;

    tx.execute(
        "INSERT INTO jars (jar_id, origin, max_domain_bytes) VALUES (?1, ?2, ?3)",
        params![id, jar.origin_str(), jar.config().max_domain_bytes as i64],
    )?;

    let mut stmt = tx.prepare(
        "INSERT INTO records (jar_id, name, value, path, domain, origin, secure, expires_unix, same_site)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )?;

    for record in jar.records() {
        stmt.execute(params![
            id,
            record.name,
            record.value,
            record.path,
            record.domain,
            record.origin,
            record.secure as i64,
            record.expires.map(|t| t.unix_timestamp()),
            record.same_site.as_wire_str(),
        ])?;
    }

    Ok(())
}

impl JarStore for SqliteJarStore {
    /// Returns the jar handle for `jar_id`, creating it if needed.
    ///
    /// A cached jar is returned as-is; otherwise the jar is loaded from
    /// SQLite (or minted empty for `origin`) and wrapped in a
    /// [`PersistentJar`] bound to this store.
    fn jar_for(&self, jar_id: JarId, origin: &str) -> Option<JarHandle> {
        {
            let jars = self.jars.read().unwrap();
            if let Some(jar) = jars.get(&jar_id) {
                return Some(jar.clone());
            }
        }

        let jar = self
            .load_jar(jar_id)
            .unwrap_or_else(|| MemoryJar::new(origin));
        let inner = jar_handle(jar);

        let store_ref = self.store_self.read().unwrap();
        let store = store_ref.as_ref()?.clone();

        let persistent = jar_handle(PersistentJar::new(jar_id, inner, store));
        self.jars.write().unwrap().insert(jar_id, persistent.clone());

        Some(persistent)
    }

    /// Persists a snapshot of one jar to SQLite.
    ///
    /// Called by [`PersistentJar`] after each mutation.
    fn persist_snapshot(&self, jar_id: JarId, snapshot: &MemoryJar) {
        self.save_jar(jar_id, snapshot);
    }

    /// Removes `jar_id` from both the in-memory cache and the database.
    fn remove_jar(&self, jar_id: JarId) {
        self.jars.write().unwrap().remove(&jar_id);
        self.remove_jar_from_db(jar_id);
    }

    /// Persists **all** cached jars to SQLite by snapshotting them.
    ///
    /// Only jars of type [`PersistentJar`] wrapping a [`MemoryJar`] are
    /// snapshotted, which keeps the on-disk format stable.
    fn persist_all(&self) {
        let jars = self.jars.read().unwrap();

        for (jar_id, handle) in jars.iter() {
            if let Ok(jar) = handle.read() {
                if let Some(persist) = jar.as_any().downcast_ref::<PersistentJar>() {
                    if let Ok(inner) = persist.inner.read() {
                        if let Some(memory) = inner.as_any().downcast_ref::<MemoryJar>() {
                            self.save_jar(*jar_id, memory);
                        }
                    }
                }
            }
        }
    }
}
