//! scopejar: an attribute-scoped key/value store.
//!
//! Each record carries matching and lifetime metadata (path, domain, expiry,
//! secure flag, SameSite policy); reads filter by a caller-supplied
//! [`ReadContext`] and resolve duplicate names by specificity. The wire
//! format is the semicolon-delimited `name=value` convention of the browser
//! cookie header.
//!
//! Start with [`MemoryJar`] for an explicit, single-owner jar, or mint jars
//! from a [`persist::JarStore`] backend when state should survive restarts.

pub mod config;
pub mod context;
pub mod errors;
pub mod jar;
pub mod matcher;
pub mod persist;
pub mod record;
pub mod store;
pub mod wire;

pub use config::JarConfig;
pub use context::ReadContext;
pub use errors::JarError;
pub use jar::{jar_handle, Jar, JarHandle, JarId, MemoryJar, SetOptions, WireLoadReport};
pub use persist::{InMemoryJarStore, JarStore, JarStoreHandle, JsonJarStore, PersistentJar};
#[cfg(feature = "sqlite_store")]
pub use persist::SqliteJarStore;
pub use record::{Record, SameSite};
pub use store::RecordStore;
