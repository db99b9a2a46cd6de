#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JarError {
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Size ceiling exceeded for domain '{domain}' ({attempted} > {limit} bytes)")]
    SizeExceeded {
        domain: String,
        attempted: usize,
        limit: usize,
    },

    #[error("Malformed wire token: {0}")]
    MalformedRecord(String),
}
