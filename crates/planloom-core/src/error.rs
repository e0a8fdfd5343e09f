//! Error types for Planloom

use thiserror::Error;

/// Result type alias using Planloom's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Planloom error types
///
/// Absence (an ineligible task, an empty conflict list, no candidates) is
/// never an error; these variants cover real failures only.
#[derive(Error, Debug)]
pub enum Error {
    // Not-found errors (E001-E099)
    #[error("Plan '{0}' not found. Run a full reindex to pick up new plan directories.")]
    PlanNotFound(String),

    #[error("Task '{0}' not found in the provided plan records.")]
    TaskNotFound(String),

    #[error("Entity '{0}' not found in the graph.")]
    EntityNotFound(String),

    // Integrity errors (E100-E199)
    #[error("Relationship endpoint '{0}' does not exist in the graph")]
    MissingEndpoint(String),

    #[error("Relationship references local id {0} which no entity in the batch defines")]
    UnmappedLocalId(u32),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Config errors (E600-E699)
    #[error("Configuration error: {0}")]
    Config(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlanNotFound(_) => "E001",
            Self::TaskNotFound(_) => "E002",
            Self::EntityNotFound(_) => "E003",
            Self::MissingEndpoint(_) => "E100",
            Self::UnmappedLocalId(_) => "E101",
            Self::Database(_) => "E400",
            Self::Config(_) => "E600",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Whether the error marks a referential-integrity violation
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::MissingEndpoint(_) | Self::UnmappedLocalId(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::PlanNotFound("007".into()).code(), "E001");
        assert_eq!(Error::TaskNotFound("007#001".into()).code(), "E002");
        assert_eq!(Error::MissingEndpoint("abc".into()).code(), "E100");
        assert_eq!(Error::Other("oops".into()).code(), "E9999");
    }

    #[test]
    fn test_integrity_classification() {
        assert!(Error::MissingEndpoint("abc".into()).is_integrity_violation());
        assert!(Error::UnmappedLocalId(3).is_integrity_violation());
        assert!(!Error::PlanNotFound("007".into()).is_integrity_violation());
    }

    #[test]
    fn test_error_display() {
        let err = Error::MissingEndpoint("entity-1".into());
        assert!(err.to_string().contains("entity-1"));
    }
}
