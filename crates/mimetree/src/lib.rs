//! # mimetree
//!
//! Round-trip MIME decoding and encoding (RFC 2045/2046).
//!
//! ## Features
//!
//! - **Ordered headers**: case-insensitive lookup, duplicates and original
//!   order preserved
//! - **Header attributes**: `value; name=value; name="value"` parsing
//! - **Part tree**: leaf and container parts nested to any depth
//! - **Decoding/Encoding**: the encoder is the structural inverse of the
//!   decoder
//! - **Queries and validation**: depth-first part search and rule-based
//!   header checks
//!
//! Bodies are kept verbatim: content-transfer-encodings are not decoded and
//! charsets are not applied.
//!
//! ## Quick Start
//!
//! ### Decoding
//!
//! ```
//! use mimetree::{Message, PartFilter};
//!
//! let raw = "From: sender@example.com\r\n\
//!            Content-Type: multipart/mixed; boundary=\"simple\"\r\n\
//!            \r\n\
//!            --simple\r\n\
//!            Content-Type: text/plain\r\n\
//!            \r\n\
//!            Hello, World!\r\n\
//!            --simple--\r\n";
//!
//! let message = Message::parse(raw)?;
//! assert_eq!(message.parts().len(), 2);
//! assert_eq!(message.parts()[1].body(), "Hello, World!");
//!
//! let text = message.first_part(&PartFilter::Header {
//!     name: "content-type",
//!     value: "text/plain",
//! });
//! assert!(text.is_some());
//! # Ok::<(), mimetree::Error>(())
//! ```
//!
//! ### Building and Encoding
//!
//! ```
//! use mimetree::{ContentType, Headers, Message, Part};
//!
//! let mut headers = Headers::new();
//! headers.add("From", "sender@example.com");
//! headers.add("Content-Type", ContentType::multipart("alternative", "b1").to_string());
//!
//! let message = Message::multipart(
//!     headers,
//!     vec![
//!         Part::leaf(Headers::from([("Content-Type", "text/plain")]), "Plain text"),
//!         Part::leaf(Headers::from([("Content-Type", "text/html")]), "<p>HTML</p>"),
//!     ],
//! );
//!
//! let bytes = message.to_bytes();
//! assert_eq!(Message::from_bytes(&bytes)?, message);
//! # Ok::<(), mimetree::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod attributes;
mod content_type;
mod decode;
mod encode;
mod error;
mod header;
mod message;
mod part;
mod query;

pub mod validate;

pub use attributes::HeaderAttributes;
pub use content_type::ContentType;
pub use decode::{DEFAULT_MAX_DEPTH, DecodeOptions, Decoder};
pub use encode::{EncodeOptions, Encoder, LineEnding};
pub use error::{Error, Result};
pub use header::{HeaderEntry, Headers};
pub use message::Message;
pub use part::{Body, Part, PartId};
pub use query::{PartFilter, Walk};
pub use validate::{Report, Rule, Validator};

/// Decodes a message from raw bytes with default options.
///
/// # Errors
///
/// Returns [`Error::InvalidUtf8`] or [`Error::NoHeaders`].
pub fn decode(bytes: &[u8]) -> Result<Message> {
    Decoder::new().decode(bytes)
}

/// Decodes a message from text with default options.
///
/// # Errors
///
/// Returns [`Error::NoHeaders`] if the text has no header block.
pub fn decode_str(text: &str) -> Result<Message> {
    Decoder::new().decode_str(text)
}

/// Encodes a message with default options.
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    Encoder::new().encode_message(message)
}

/// Encodes a single part with default options.
#[must_use]
pub fn encode_part(part: &Part) -> Vec<u8> {
    Encoder::new().encode_part(part)
}
