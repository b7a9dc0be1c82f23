//! Error types for DevChain

/// Crate-wide error taxonomy.
///
/// The four variants map one-to-one onto JSON-RPC error codes at the API
/// boundary, so a client can always distinguish a malformed request from a
/// rejected authorization or a failed execution.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NodeError {
    /// Malformed parameters: wrong shape, bad hex, zero block counts.
    /// Rejected before any state is touched.
    #[error("validation error: {0}")]
    Validation(String),

    /// The transaction origin has neither a valid signature nor an
    /// impersonation grant. Rejected before execution; no nonce or balance
    /// is consumed.
    #[error("authorization error: {0}")]
    Authorization(String),

    /// Nonce mismatch, insufficient funds, or a failure reported by the
    /// execution backend.
    #[error("execution error: {0}")]
    Execution(String),

    /// Engine invariant violation. Fatal to the in-flight request, never
    /// silently swallowed.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<std::io::Error> for NodeError {
    fn from(err: std::io::Error) -> Self {
        NodeError::Internal(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, NodeError>;
