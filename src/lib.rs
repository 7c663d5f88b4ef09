//! Signature-block state machine for typed e-signing.
//!
//! This crate tracks the signature and initial blocks placed on a multi-page
//! document, fills them from typed input (reusing one value per block type),
//! steps through them in page order and decides when the document can be
//! submitted. [`session::SigningSession`] ties the pieces together.
//!
//! The binary `esignflow` loads templates and session data from disk and
//! prints the resulting state as JSON.

pub mod capture;
pub mod completion;
pub mod error;
pub mod model;
pub mod navigation;
pub mod registry;
pub mod session;
pub mod submit;
pub mod template;
pub mod type_cache;

pub use error::EsignError;
pub use session::{SessionConfig, SessionData, SessionEvent, SigningSession};
