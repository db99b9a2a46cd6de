//! Record core types.
//!
//! A [`Record`] is one stored name/value pair plus the scoping and lifetime
//! attributes that govern its visibility: `path`, `domain`, `secure`,
//! `expires` and `same_site`. Records are suitable for persistence
//! (JSON, SQLite) via `serde`.
//!
//! ```rust
//! use scopejar::record::{Record, SameSite};
//!
//! let r = Record {
//!     name: "session".into(),
//!     value: "abc123".into(),
//!     path: "/".into(),
//!     domain: Some("example.com".into()),
//!     origin: "app.example.com".into(),
//!     secure: true,
//!     expires: None, // session-scoped
//!     same_site: SameSite::Lax,
//! };
//! assert!(r.is_session());
//! ```

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// SameSite policy governing visibility under cross-site read contexts.
///
/// `None` requires `secure = true` at write time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    /// Wire-format token (`samesite=<token>`), lowercase.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "strict",
            SameSite::Lax => "lax",
            SameSite::None => "none",
        }
    }

    /// Parses a wire token, case-insensitively. Unknown tokens yield `None`.
    pub fn from_wire_str(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("strict") {
            Some(SameSite::Strict)
        } else if s.eq_ignore_ascii_case("lax") {
            Some(SameSite::Lax)
        } else if s.eq_ignore_ascii_case("none") {
            Some(SameSite::None)
        } else {
            None
        }
    }
}

/// One stored entry in the jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Record name (case-sensitive). Non-empty, never contains `=` or `;`.
    pub name: String,

    /// Raw value. May be empty; opaque to the store. Percent-encoding is
    /// applied only at the wire boundary.
    pub value: String,

    /// Path scoping, default `"/"`. Visible to request paths that the record
    /// path prefixes on a segment boundary.
    pub path: String,

    /// Domain scoping. `None` means host-only: the record is visible to the
    /// creating origin exactly. When present, suffix matching applies.
    pub domain: Option<String>,

    /// The origin that created this record. Always recorded, even when
    /// `domain` is absent; host-only matching compares against it.
    pub origin: String,

    /// If `true`, visible only to secure-context reads.
    pub secure: bool,

    /// Absolute expiry. `None` means session-scoped: alive until
    /// `clear_session`. An expiry at or before "now" makes the record
    /// invisible to every read.
    #[serde(with = "time::serde::rfc3339::option")]
    pub expires: Option<OffsetDateTime>,

    /// SameSite policy, default `Lax`.
    pub same_site: SameSite,
}

impl Record {
    /// The domain this record counts against for the size ceiling, and the
    /// one suffix-matched at read time when `domain` is present.
    pub fn effective_domain(&self) -> &str {
        self.domain.as_deref().unwrap_or(&self.origin)
    }

    /// Whether this record shares the identity tuple `(name, path, domain)`.
    pub fn has_identity(&self, name: &str, path: &str, domain: Option<&str>) -> bool {
        self.name == name && self.path == path && self.domain.as_deref() == domain
    }

    /// `true` when the record is session-scoped (no expiry).
    pub fn is_session(&self) -> bool {
        self.expires.is_none()
    }

    /// `true` when the record's expiry is at or before `now`.
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        match self.expires {
            Some(at) => at <= now,
            None => false,
        }
    }
}
