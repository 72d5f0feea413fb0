//! Error types for the archive search layer.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Every failure the search layer can surface.
///
/// Index write paths classify errors with [`ArchiveError::is_unavailable`] and
/// [`ArchiveError::is_not_found`] before deciding whether to swallow them.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The search engine could not be reached, or the call timed out.
    #[error("Search engine unavailable: {0}")]
    EngineUnavailable(String),

    /// No index document matches the requested entity.
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// A caller supplied an argument that cannot be used.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An alphabet violates its uniqueness or size invariants.
    #[error("Invalid alphabet: {0}")]
    InvalidAlphabet(String),

    /// A rebuild aborted; the alias was left untouched.
    #[error("Rebuild of '{alias}' failed: {reason}")]
    RebuildFailure { alias: String, reason: String },

    /// Another rebuild holds the lease for this alias.
    #[error("Rebuild already in progress for '{0}'")]
    RebuildInProgress(String),

    /// Another recalculation job is running for this site.
    #[error("Collation job already running for site '{0}'")]
    CollationJobInProgress(String),

    /// The engine rejected an operation for a reason other than connectivity.
    #[error("Engine error: {0}")]
    Engine(String),

    /// The system of record failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        ArchiveError::EngineUnavailable(msg.into())
    }

    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        ArchiveError::DocumentNotFound(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        ArchiveError::InvalidArgument(msg.into())
    }

    pub fn invalid_alphabet<S: Into<String>>(msg: S) -> Self {
        ArchiveError::InvalidAlphabet(msg.into())
    }

    pub fn engine<S: Into<String>>(msg: S) -> Self {
        ArchiveError::Engine(msg.into())
    }

    pub fn store<S: Into<String>>(msg: S) -> Self {
        ArchiveError::Store(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        ArchiveError::Config(msg.into())
    }

    pub fn rebuild<A: Into<String>, S: Into<String>>(alias: A, reason: S) -> Self {
        ArchiveError::RebuildFailure {
            alias: alias.into(),
            reason: reason.into(),
        }
    }

    /// True for connectivity failures and timeouts.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ArchiveError::EngineUnavailable(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ArchiveError::DocumentNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ArchiveError::unavailable("connection refused").is_unavailable());
        assert!(!ArchiveError::unavailable("x").is_not_found());
        assert!(ArchiveError::not_found("entry 7").is_not_found());
        assert!(!ArchiveError::engine("mapping conflict").is_unavailable());
    }

    #[test]
    fn test_rebuild_message() {
        let err = ArchiveError::rebuild("songs", "bulk rejected");
        assert_eq!(err.to_string(), "Rebuild of 'songs' failed: bulk rejected");
    }
}
