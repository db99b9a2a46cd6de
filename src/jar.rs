//! Jar API: the [`Jar`] trait, handles, and the in-memory reference
//! implementation.
//!
//! A **jar** is the public surface over one origin's records: `set`, `get`,
//! `delete`, `enumerate`, plus wire-format hydration. There is no ambient
//! global jar; callers construct or are handed an explicit instance, which
//! keeps independent jars trivial in tests.
//!
//! # Concurrency model
//! - [`JarHandle`] is `Arc<RwLock<dyn Jar + Send + Sync>>`. Callers take a
//!   read lock for queries and a write lock for mutations, so the
//!   check-then-act inside `set` (size check, then identity replace) is
//!   atomic with respect to other writers.
//! - A jar itself is a single-owner synchronous structure; no operation
//!   blocks or suspends.
//!
//! # Typical usage
//! ```rust
//! use scopejar::{MemoryJar, Jar, ReadContext, SetOptions};
//!
//! let mut jar = MemoryJar::new("app.example.com");
//! jar.set("lang", "en", SetOptions::default()).unwrap();
//!
//! let ctx = ReadContext::new("app.example.com", "/");
//! assert_eq!(jar.get("lang", &ctx).as_deref(), Some("en"));
//! ```

mod memory;

pub use memory::MemoryJar;

use std::any::Any;
use std::fmt::Display;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::context::ReadContext;
use crate::errors::JarError;
use crate::record::SameSite;
use crate::wire::MalformedToken;

/// A unique identifier for a jar, represented as a UUID.
///
/// Persistence backends address jars by this id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JarId(Uuid);

impl JarId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JarId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for JarId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Display for JarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A handle to a jar trait object.
///
/// Reference-counted, read/write-locked pointer to a type-erased [`Jar`].
/// One jar equals one logical owner; all writers serialize behind the lock.
pub type JarHandle = Arc<RwLock<dyn Jar + Send + Sync>>;

/// Wraps a concrete jar in a [`JarHandle`].
pub fn jar_handle<J: Jar + 'static>(jar: J) -> JarHandle {
    Arc::new(RwLock::new(jar))
}

/// Optional attributes for [`Jar::set`]. Every field has the documented
/// default: root path, host-only scope, insecure, session-scoped, `Lax`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Absolute expiry; `None` means session-scoped.
    pub expires: Option<OffsetDateTime>,

    /// Path scope; `None` means `"/"`.
    pub path: Option<String>,

    /// Domain scope; `None` means host-only (the jar's origin, exactly).
    pub domain: Option<String>,

    /// Restrict visibility to secure-context reads.
    pub secure: bool,

    /// SameSite policy; `SameSite::None` requires `secure`.
    pub same_site: SameSite,
}

impl SetOptions {
    pub fn expires(mut self, at: OffsetDateTime) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = same_site;
        self
    }
}

/// Outcome of [`Jar::load_from_wire`]: how many records were hydrated, and
/// every token that was skipped (malformed or rejected by validation),
/// with the reason attached. Skipping is never fatal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireLoadReport {
    pub loaded: usize,
    pub skipped: Vec<MalformedToken>,
}

/// An attribute-scoped key/value jar for a single origin.
///
/// Types implementing this trait encapsulate storage, scoping and wire
/// formatting for one origin's records.
///
/// ### Type erasure
/// `as_any` / `as_any_mut` enable downcasting when callers need the concrete
/// implementation (e.g. for snapshotting/persistence).
pub trait Jar: Send + Sync {
    /// Returns a type-erased reference to the jar.
    fn as_any(&self) -> &dyn Any;

    /// Returns a mutable type-erased reference to the jar.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Validates and upserts one record. Replacement by identity tuple
    /// `(name, path, domain)` is whole-record and atomic; on error the jar
    /// is unchanged.
    fn set(&mut self, name: &str, value: &str, options: SetOptions) -> Result<(), JarError>;

    /// The single winning value for `name` under `ctx`, after visibility
    /// filtering and the specificity tie-break. Absence is a normal result,
    /// never an error.
    fn get(&self, name: &str, ctx: &ReadContext) -> Option<String>;

    /// Clears the record with the given identity tuple by writing an
    /// expiry strictly in the past. Idempotent; absence is not an error.
    fn delete(&mut self, name: &str, path: &str, domain: Option<&str>);

    /// The visible `(name, value)` pairs under `ctx`, deduplicated by name
    /// via the tie-break, in store order.
    fn enumerate(&self, ctx: &ReadContext) -> Vec<(String, String)>;

    /// [`Self::enumerate`] rendered in the bulk wire form
    /// (`"a=1; b=2"`, attributes never echoed).
    fn enumerate_wire(&self, ctx: &ReadContext) -> String;

    /// Hydrates the jar from a bulk wire string. Every recovered pair is
    /// upserted as a session-scoped, default-attribute record. Malformed or
    /// rejected tokens are reported, not fatal.
    fn load_from_wire(&mut self, wire: &str) -> WireLoadReport;

    /// Ends the host session: drops every session-scoped record.
    fn clear_session(&mut self);

    /// Removes all records from the jar.
    fn clear(&mut self);

    /// The origin this jar was created for.
    fn origin(&self) -> String;
}
