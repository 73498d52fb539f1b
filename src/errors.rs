use thiserror::Error;

/// Errors raised by structural tree operations.
///
/// These signal contract violations by the caller, not transient conditions:
/// there is no retry or recovery path, the operation is rejected and the tree
/// is left untouched.
#[derive(Error, Debug)]
pub enum TreeError {
    #[error("node id <{0}> doesn't exist in tree")]
    NotFound(String),

    #[error("a tree takes one root merely: {0}")]
    MultipleRoot(String),

    #[error("node id <{0}> already exists in tree")]
    DuplicateId(String),

    #[error("already present node for key <{key}> under node <{parent_id}>")]
    DuplicateKey { parent_id: String, key: String },

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("ambiguous tree insertion: {0}")]
    AmbiguousInsertion(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type TreeResult<T> = Result<T, TreeError>;
