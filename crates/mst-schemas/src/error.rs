use std::fmt;

/// Discriminated error kind shared by every caller-facing operation in the
/// workspace. Internal stack traces are logged via `tracing`, never
/// returned to a caller — only the kind and a human-readable message cross
/// the boundary.
#[derive(Debug, Clone)]
pub enum AppError {
    /// Malformed input, out-of-range parameter, threshold invariant violated.
    /// Never retried.
    Validation(String),
    /// Entity missing (backtest id, holding, symbol).
    NotFound(String),
    /// Brokerage 5xx, LLM timeout, news-source rate limit, transient DB
    /// error. Retried with backoff upstream; surfaced once exhausted.
    DependencyTransient(String),
    /// Brokerage auth rejected, invalid API key, quota exceeded. Not
    /// retried.
    DependencyPermanent(String),
    /// Dedupe collision, stale holding, invalid state transition. Callers
    /// recover locally (skip the record, log, continue).
    Integrity(String),
    /// Database unavailable at startup, configuration missing. The process
    /// exits with a non-zero code.
    Fatal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn dependency_transient(msg: impl Into<String>) -> Self {
        Self::DependencyTransient(msg.into())
    }

    pub fn dependency_permanent(msg: impl Into<String>) -> Self {
        Self::DependencyPermanent(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn fatal(msg: impl Into<String>) -> Self {
        Self::Fatal(msg.into())
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::Validation(m)
            | AppError::NotFound(m)
            | AppError::DependencyTransient(m)
            | AppError::DependencyPermanent(m)
            | AppError::Integrity(m)
            | AppError::Fatal(m) => m,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::DependencyTransient(_) => "dependency_transient",
            AppError::DependencyPermanent(_) => "dependency_permanent",
            AppError::Integrity(_) => "integrity",
            AppError::Fatal(_) => "fatal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::DependencyTransient(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind_name(), self.message())
    }
}

impl std::error::Error for AppError {}

#[cfg(feature = "db")]
impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => AppError::NotFound(e.to_string()),
            sqlx::Error::Database(db_err) => {
                // Postgres unique_violation / foreign_key_violation.
                match db_err.code().as_deref() {
                    Some("23505") | Some("23503") => AppError::Integrity(e.to_string()),
                    _ => AppError::DependencyTransient(e.to_string()),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                AppError::DependencyTransient(e.to_string())
            }
            _ => AppError::DependencyTransient(e.to_string()),
        }
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            AppError::DependencyTransient(e.to_string())
        } else if let Some(status) = e.status() {
            if status.is_server_error() || status.as_u16() == 429 {
                AppError::DependencyTransient(e.to_string())
            } else {
                AppError::DependencyPermanent(e.to_string())
            }
        } else {
            AppError::DependencyTransient(e.to_string())
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
