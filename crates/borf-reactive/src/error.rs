#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors raised while constructing reactive values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    #[error("merge requires at least one source readable")]
    EmptySources,
}
