//! Core error type

use thiserror::Error;
use warden_store::StoreError;

use crate::TokenError;

/// Failures that escape a core entrypoint.
///
/// Confirmation outcomes, store conflicts and collaborator failures are
/// not errors at this level; they are folded into outcomes and summaries.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),
}

pub type CoreResult<T> = Result<T, CoreError>;
