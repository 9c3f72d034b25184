//! User-facing error taxonomy.
//!
//! Every variant displays its text verbatim so the coordinator can surface
//! a collaborator's reason without rewording it.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// A required field was empty or malformed.
    #[error("{0}")]
    Validation(String),

    /// A repository or controller refused the request.
    #[error("{0}")]
    Domain(String),

    /// The runtime environment cannot support the application.
    #[error("{0}")]
    Environment(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain(message.into())
    }

    pub fn environment(message: impl Into<String>) -> Self {
        Self::Environment(message.into())
    }

    /// Storage failures reach the user as domain errors carrying the full
    /// context chain.
    pub fn storage(err: &anyhow::Error) -> Self {
        Self::Domain(format!("{err:#}"))
    }

    pub fn no_session() -> Self {
        Self::Domain("no user is logged in".to_string())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Domain(_) => "domain",
            Self::Environment(_) => "environment",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
