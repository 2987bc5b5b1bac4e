//! Error types for the ctxgraph core library.
//!
//! Only conditions that abort a whole call live here. Unresolved or ambiguous
//! symbols and edges to missing nodes degrade to omitted edges and are counted
//! in [`crate::indexer::pipeline::BuildStats`] instead.

/// Top-level error enum for the ctxgraph core library.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A record or entry is missing a required identity field.
    #[error("Malformed record {origin}: {reason}")]
    MalformedRecord { origin: String, reason: String },

    /// The identifier scheme was asked for a kind it does not know.
    #[error("Invalid entity kind: {0}")]
    InvalidKind(String),

    #[error("No loadable extraction records under {0}")]
    NoRecords(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl GraphError {
    pub fn malformed(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        GraphError::MalformedRecord {
            origin: origin.into(),
            reason: reason.into(),
        }
    }
}

pub type GraphResult<T> = Result<T, GraphError>;
