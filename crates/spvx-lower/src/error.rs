//! Error types for lowering.

use spvx_ast::SourceLocation;

use crate::IndexPath;

/// Errors that stop a lowering call.
///
/// Recoverable problems are not errors here: they are recorded in
/// [`Diagnostics`](crate::Diagnostics) and lowering keeps going.
#[derive(Debug, thiserror::Error)]
pub enum LowerError {
    /// Lowering cannot produce anything; the compile aborts.
    #[error("{loc}: {message}")]
    Fatal {
        message: String,
        loc: SourceLocation,
    },

    /// No value could be produced. The cause is already in the diagnostics.
    #[error("declaration could not be lowered (see diagnostics)")]
    Invalid,

    /// The module rejected a request.
    #[error(transparent)]
    Ir(#[from] spvx_ir::IrError),

    #[error(transparent)]
    Counter(#[from] CounterError),
}

/// A counter assignment that cannot be planned.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CounterError {
    #[error("no counter at path {0} of the destination")]
    MissingPath(IndexPath),

    #[error("counter at path {0} of the destination is not an alias")]
    NotAlias(IndexPath),

    #[error("declaration has no counter metadata")]
    NoCounters,
}
