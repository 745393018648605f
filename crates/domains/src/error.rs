//! # DomainError
//!
//! Centralized error handling for the content engine.
//! Maps lifecycle failures to actionable error types.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Referenced entity does not exist (e.g., deleted concurrently).
    #[error("{0} not found with ID {1}")]
    NotFound(&'static str, String),

    /// Malformed input to a form-level operation (e.g., empty title).
    #[error("validation error: {0}")]
    Validation(String),

    /// Publish refused because one or more languages are incomplete.
    /// Nothing was mutated.
    #[error("translation incomplete: {}", .0.join("; "))]
    IncompleteTranslation(Vec<String>),

    /// A template declares a slot category the engine does not know.
    /// Indicates a template/engine version mismatch.
    #[error("unknown slot category '{0}'")]
    UnknownSlotCategory(String),

    /// Storing, copying or removing a backing file failed.
    #[error("file operation failed: {0}")]
    FileOperation(String),

    /// A storage constraint rejected the write (duplicate slug, stale version).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Infrastructure failure (e.g., database unavailable).
    #[error("internal service error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound(entity, id.to_string())
    }

    /// True for errors a caller may retry once the conflicting write settled.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

/// A specialized Result type for content engine logic.
pub type Result<T> = std::result::Result<T, DomainError>;
