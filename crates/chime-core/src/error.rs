//! Error taxonomy shared by the registry, compiler, scheduler and gateway.

use thiserror::Error;

/// What part of a definition failed validation.
///
/// The admin API maps each kind to its own response code, so keep the set
/// stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    RegexArity,
    RegexSyntax,
    CronSpec,
    Template,
    TriggerArity,
    MatcherType,
    RateLimit,
    ItemType,
    Tree,
}

#[derive(Debug, Error)]
pub enum ChimeError {
    #[error("{1}")]
    Validation(ValidationKind, String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChimeError {
    pub fn validation(kind: ValidationKind, message: impl Into<String>) -> Self {
        Self::Validation(kind, message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ChimeError>;
