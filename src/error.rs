//! Error type shared by the signing-session operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EsignError {
    /// No session token was supplied; the session cannot be initialised.
    #[error("missing session token")]
    MissingSessionToken,

    #[error("missing session identifier: {0}")]
    MissingIdentifier(&'static str),

    #[error("unknown signature block: {0}")]
    UnknownBlock(String),

    #[error("signature block {0} is already completed")]
    BlockAlreadyCompleted(String),

    #[error("empty {0} value")]
    EmptySignature(String),

    #[error("block {block} expects a {expected} value, got {found}")]
    TypeMismatch {
        block: String,
        expected: String,
        found: String,
    },

    /// Only one prompt may be open at a time.
    #[error("a signature prompt is already open for block {0}")]
    PromptAlreadyOpen(String),

    #[error("no signature prompt is open")]
    NoPromptOpen,

    #[error("document is not ready for submission ({completed}/{required} required blocks signed)")]
    NotSubmittable { completed: usize, required: usize },

    #[error("document {0} has already been submitted")]
    AlreadySubmitted(String),

    #[error("signing request failed: {0}")]
    Submission(String),

    #[error("failed to render signature image: {0}")]
    ImageRender(String),
}

pub type Result<T, E = EsignError> = std::result::Result<T, E>;
