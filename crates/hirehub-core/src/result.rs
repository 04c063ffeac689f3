//! Convenience result type alias for HireHub.

use crate::error::AppError;

/// A specialized `Result` type for HireHub operations.
pub type AppResult<T> = Result<T, AppError>;
