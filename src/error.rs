//! Error types for the library.
//!
//! Only precondition failures are surfaced as errors; malformed-input
//! conditions inside a walk (missing `/Pg`, missing crop box, an absent map
//! entry) are recovered locally with a logged fallback and never abort the
//! enclosing operation.

/// Result type alias for tagwalk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while walking a document graph.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Referenced object not found in the graph arena
    #[error("Object not found: {0}")]
    ObjectNotFound(crate::object::ObjectRef),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Operand of the wrong type on the operand stack
    #[error("Invalid operand for '{operator}': numeric operand expected, found {found}")]
    InvalidOperand {
        /// Operator being executed
        operator: String,
        /// Actual operand type found
        found: String,
    },

    /// Document catalog has no structure tree root
    #[error("No StructTreeRoot found")]
    MissingStructTree,

    /// Page tree is malformed beyond recovery
    #[error("Invalid page tree: {0}")]
    InvalidPageTree(String),

    /// Content-stream tokenizer error at a byte offset
    #[error("Failed to tokenize content stream at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where tokenizing failed
        offset: usize,
        /// Reason for the failure
        reason: String,
    },
}
