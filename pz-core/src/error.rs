//! Error handling for pz-core
//!
//! Re-exports the shared error type from pz-error.

pub use pz_error::{PinzoneError, Result};
