//! Error types for MIME decoding.

use std::str::Utf8Error;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME decoding errors.
///
/// Only two conditions abort a decode. Every other irregularity in the input
/// (a header line without a colon, a multipart type without a boundary, an
/// empty section) is absorbed by a well-defined fallback.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Input bytes are not valid UTF-8.
    #[error("Invalid UTF-8 input: {0}")]
    InvalidUtf8(#[from] Utf8Error),

    /// The top-level header block contained no `key: value` lines.
    #[error("No headers found before the message body")]
    NoHeaders,
}
