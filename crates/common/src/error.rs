use thiserror::Error;

/// Error surface shared by every stage of the index pipeline.
///
/// Variants map directly onto the error kinds a query facade reports to its
/// caller: `InvalidArgument`/`NotFound` carry no state change, `ParseFailure`/
/// `IoFailure` are per-file and non-fatal to the rest of an index run, and
/// `CacheCorruption`/`Config` mean "ignore the stored artifact and rebuild".
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("parse failure for {path}: {reason}")]
    ParseFailure { path: String, reason: String },

    #[error("io failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache corrupted: {0}")]
    CacheCorruption(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("project directory not set")]
    Uninitialized,
}

impl CoreError {
    /// Stable error code for the `{code, message}` shape the query facade returns.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::InvalidArgument(_) => "InvalidArgument",
            CoreError::NotFound(_) => "NotFound",
            CoreError::ParseFailure { .. } => "ParseFailure",
            CoreError::Io(_) => "IOFailure",
            CoreError::CacheCorruption(_) => "CacheCorruption",
            CoreError::Config(_) => "Config",
            CoreError::Uninitialized => "Uninitialized",
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::CacheCorruption(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_matches_variant() {
        assert_eq!(CoreError::Uninitialized.code(), "Uninitialized");
        assert_eq!(
            CoreError::InvalidArgument("bad regex".into()).code(),
            "InvalidArgument"
        );
    }
}
