//! Jar store infrastructure.
//!
//! A **jar store** is a provisioner and persistence layer for jars.
//! - A caller only *holds a [`JarHandle`]*, never a store.
//! - A [`JarStore`] can *mint* a jar for a given [`JarId`] and optionally
//!   persist/flush all jars in one place (a single JSON file or SQLite DB).
//!
//! This module exports three reference implementations:
//! - [`InMemoryJarStore`]: no persistence, useful for tests and ephemeral jars.
//! - [`JsonJarStore`]: file-backed JSON store (good for simple setups).
//! - [`SqliteJarStore`]: SQLite-backed store (good for concurrency and scale).
//!
//! ## Design notes
//! - Stores are only consulted to obtain a jar; afterwards callers talk to
//!   the [`JarHandle`] directly.
//! - Implementations are `Send + Sync` and internally synchronized; the
//!   trait methods take `&self`.
//! - `JarStore::jar_for(jar_id, origin)` returns the *same logical jar
//!   instance* for an id for the lifetime of the store, so all handles
//!   observe consistent state.
//! - Persisting stores wrap minted jars in a [`PersistentJar`], so every
//!   mutation snapshots back into the store.

mod in_memory;
mod json;
mod persistent_jar;
#[cfg(feature = "sqlite_store")]
mod sqlite;

use std::sync::Arc;

use crate::jar::{JarHandle, JarId, MemoryJar};

pub use in_memory::InMemoryJarStore;
pub use json::JsonJarStore;
pub use persistent_jar::PersistentJar;
#[cfg(feature = "sqlite_store")]
pub use sqlite::SqliteJarStore;

/// A handle to a jar store trait object.
///
/// Store implementations manage their own internal synchronization; callers
/// hold only `&self` when invoking trait methods.
pub type JarStoreHandle = Arc<dyn JarStore + Send + Sync>;

/// A jar **store** mints jars by id and (optionally) persists them.
pub trait JarStore: Send + Sync {
    /// Returns (or creates and returns) the jar handle for `jar_id`.
    ///
    /// `origin` is used only when a new jar has to be minted; an existing
    /// jar keeps the origin it was created with.
    ///
    /// Returns `None` if the store no longer manages this jar or if
    /// provisioning fails irrecoverably.
    fn jar_for(&self, jar_id: JarId, origin: &str) -> Option<JarHandle>;

    /// Persists the state for `jar_id` from a provided snapshot.
    ///
    /// Best-effort: implementations log failures rather than panicking.
    fn persist_snapshot(&self, jar_id: JarId, snapshot: &MemoryJar);

    /// Removes all persisted data for `jar_id` and drops any cached handle,
    /// so a subsequent [`JarStore::jar_for`] mints a fresh, empty jar.
    /// Idempotent.
    fn remove_jar(&self, jar_id: JarId);

    /// Persists all known jars to durable storage. Called at explicit flush
    /// points or graceful shutdown. Best-effort.
    fn persist_all(&self);
}
