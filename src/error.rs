use thiserror::Error;

use crate::decl::DeclError;
use crate::types::{ConfigError, ValidateError};

/// Unified error type covering declaration parsing, form compilation,
/// pass-aborting validation failures, and I/O.
///
/// Returned by convenience paths that cross those layers, e.g. loading a
/// declaration file and compiling it in one go.
#[derive(Debug, Error)]
pub enum FormicError {
    #[error(transparent)]
    Decl(#[from] DeclError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
