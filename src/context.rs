//! Read-time request context.

/// The parameters a caller supplies when reading from the jar. A record is
/// visible only when its scoping attributes all admit this context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadContext {
    /// Requested path (e.g. `"/app/settings"`).
    pub path: String,

    /// Requesting domain (e.g. `"app.example.com"`).
    pub domain: String,

    /// Whether the read happens in a secure context. Records with
    /// `secure = true` are invisible otherwise.
    pub is_secure: bool,

    /// Whether the requesting peer is same-site. Gates `Strict` and `Lax`
    /// records.
    pub is_same_site_peer: bool,

    /// Whether this read models a top-level navigation. `Lax` records remain
    /// visible to cross-site top-level reads. Defaults to `true` for callers
    /// without a navigation concept.
    pub is_top_level_read: bool,
}

impl ReadContext {
    /// Context with the common defaults: insecure, same-site, top-level.
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            domain: domain.into(),
            is_secure: false,
            is_same_site_peer: true,
            is_top_level_read: true,
        }
    }

    pub fn secure(mut self, is_secure: bool) -> Self {
        self.is_secure = is_secure;
        self
    }

    pub fn same_site_peer(mut self, is_same_site_peer: bool) -> Self {
        self.is_same_site_peer = is_same_site_peer;
        self
    }

    pub fn top_level_read(mut self, is_top_level_read: bool) -> Self {
        self.is_top_level_read = is_top_level_read;
        self
    }
}
