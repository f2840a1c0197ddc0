//! Error types for the module sink.

/// Errors raised when a request names something the module does not hold.
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A handle index is out of bounds for its arena.
    #[error("handle index {index} out of bounds (arena size: {size})")]
    BadHandle { index: usize, size: usize },

    /// A struct member index is past the end of the struct.
    #[error("member {member} out of range for a struct of {count} members")]
    BadMember { member: u32, count: usize },

    /// A handle does not refer to a type of the expected shape.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
}
