//! MIME message structure and handling.

use crate::decode::Decoder;
use crate::encode::Encoder;
use crate::error::Result;
use crate::header::Headers;
use crate::part::Part;
use chrono::{DateTime, FixedOffset};
use std::fmt;

/// MIME message: an ordered, non-empty list of root parts.
///
/// The first part is the envelope. For a single-part message it is the only
/// part, carrying the message headers and the whole body. For a multipart
/// message it carries the top-level headers with an empty body, and the
/// remaining root parts are the sections between the top-level boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<Part>", into = "Vec<Part>"))]
pub struct Message {
    parts: Vec<Part>,
}

impl Message {
    /// Creates a single-part message.
    #[must_use]
    pub fn single_part(headers: Headers, body: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::leaf(headers, body)],
        }
    }

    /// Creates a multipart message from top-level headers and its sections.
    ///
    /// The headers should declare a multipart `Content-Type` with a
    /// `boundary` attribute.
    #[must_use]
    pub fn multipart(headers: Headers, sections: Vec<Part>) -> Self {
        let mut parts = Vec::with_capacity(sections.len() + 1);
        parts.push(Part::leaf(headers, String::new()));
        parts.extend(sections);
        Self { parts }
    }

    /// Creates a message from its root parts. Returns `None` if `parts` is
    /// empty.
    #[must_use]
    pub fn from_parts(parts: Vec<Part>) -> Option<Self> {
        if parts.is_empty() {
            None
        } else {
            Some(Self { parts })
        }
    }

    /// Parses a message from text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoHeaders`](crate::Error::NoHeaders) if the text does
    /// not start with a header block.
    pub fn parse(text: &str) -> Result<Self> {
        Decoder::new().decode_str(text)
    }

    /// Parses a message from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not UTF-8 or carry no headers.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Decoder::new().decode(bytes)
    }

    /// Encodes the message with default options.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        Encoder::new().encode_message(self)
    }

    /// Returns the root parts, envelope first.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Consumes the message, returning its root parts.
    #[must_use]
    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    /// Appends a root part.
    #[must_use]
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Returns the envelope (first root part).
    #[must_use]
    pub fn envelope(&self) -> &Part {
        &self.parts[0]
    }

    /// Returns the top-level headers.
    #[must_use]
    pub fn headers(&self) -> &Headers {
        self.envelope().headers()
    }

    /// Checks if the envelope declares a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.envelope()
            .content_type()
            .is_some_and(|ct| ct.is_multipart())
    }

    /// Gets the From header.
    #[must_use]
    pub fn from(&self) -> Option<&str> {
        self.headers().get("from")
    }

    /// Gets the To header.
    #[must_use]
    pub fn to(&self) -> Option<&str> {
        self.headers().get("to")
    }

    /// Gets the Subject header.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.headers().get("subject")
    }

    /// Gets the Message-ID header.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.headers().get("message-id")
    }

    /// Parses the Date header as an RFC 2822 date.
    ///
    /// Returns `None` if the header is missing or malformed.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.headers().get("date")?;
        DateTime::parse_from_rfc2822(raw.trim()).ok()
    }
}

impl TryFrom<Vec<Part>> for Message {
    type Error = &'static str;

    fn try_from(parts: Vec<Part>) -> std::result::Result<Self, Self::Error> {
        Self::from_parts(parts).ok_or("a message needs at least one part")
    }
}

impl From<Message> for Vec<Part> {
    fn from(message: Message) -> Self {
        message.parts
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Encoder::new().message_to_string(self))
    }
}
