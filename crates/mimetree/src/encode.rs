//! MIME message encoding.
//!
//! The encoder is the structural inverse of the [decoder](crate::Decoder):
//! decoding its output yields an equivalent tree. It is not byte-for-byte
//! faithful to an externally authored input, since header folding, preamble
//! and epilogue text and trailing blank lines are normalised away.

use crate::decode::boundary_of;
use crate::header::Headers;
use crate::message::Message;
use crate::part::{Body, Part};
use std::fmt;
use tracing::warn;

/// Line terminator written by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LineEnding {
    /// `\r\n`, as required on the wire by RFC 5322.
    #[default]
    Crlf,
    /// `\n`, for local storage formats such as mbox.
    Lf,
}

impl LineEnding {
    /// Returns the terminator string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Crlf => "\r\n",
            Self::Lf => "\n",
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crlf => write!(f, "CRLF"),
            Self::Lf => write!(f, "LF"),
        }
    }
}

/// Encoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncodeOptions {
    /// Line terminator used for header lines, delimiters and body lines.
    pub line_ending: LineEnding,
}

/// MIME message encoder. Encoding never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Encoder {
    options: EncodeOptions,
}

impl Encoder {
    /// Creates an encoder with default options (CRLF line endings).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an encoder with the given options.
    #[must_use]
    pub const fn with_options(options: EncodeOptions) -> Self {
        Self { options }
    }

    /// Returns the encoder options.
    #[must_use]
    pub const fn options(&self) -> &EncodeOptions {
        &self.options
    }

    /// Encodes a message to UTF-8 bytes.
    #[must_use]
    pub fn encode_message(&self, message: &Message) -> Vec<u8> {
        self.message_to_string(message).into_bytes()
    }

    /// Encodes a single part (and its children) to UTF-8 bytes.
    #[must_use]
    pub fn encode_part(&self, part: &Part) -> Vec<u8> {
        self.part_to_string(part).into_bytes()
    }

    /// Encodes a message to a string.
    ///
    /// A message with one root part is that part's encoding. Otherwise the
    /// envelope's headers are written, followed by every other root part
    /// behind the envelope's boundary. The envelope's own body is not written
    /// in that case.
    #[must_use]
    pub fn message_to_string(&self, message: &Message) -> String {
        let mut out = String::new();

        let Some((envelope, sections)) = message.parts().split_first() else {
            return out;
        };

        if sections.is_empty() {
            self.write_part(&mut out, envelope);
            return out;
        }

        let Some(boundary) = boundary_of(envelope.headers()) else {
            warn!(
                sections = sections.len(),
                "Envelope has no boundary, encoding envelope only"
            );
            self.write_part(&mut out, envelope);
            return out;
        };

        self.write_headers(&mut out, envelope.headers());
        self.write_children(&mut out, sections, &boundary);
        out
    }

    /// Encodes a single part to a string.
    #[must_use]
    pub fn part_to_string(&self, part: &Part) -> String {
        let mut out = String::new();
        self.write_part(&mut out, part);
        out
    }

    fn eol(&self) -> &'static str {
        self.options.line_ending.as_str()
    }

    /// Writes every header line followed by the blank separator line.
    fn write_headers(&self, out: &mut String, headers: &Headers) {
        let eol = self.eol();
        for (name, value) in headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str(eol);
        }
        out.push_str(eol);
    }

    fn write_part(&self, out: &mut String, part: &Part) {
        self.write_headers(out, part.headers());

        match part.content() {
            Body::Leaf(text) => {
                self.write_body(out, text);
                out.push_str(self.eol());
            }
            Body::Container(children) => match boundary_of(part.headers()) {
                Some(boundary) => self.write_children(out, children, &boundary),
                None => warn!(
                    children = children.len(),
                    "Container part has no boundary, children not encoded"
                ),
            },
        }
    }

    fn write_children(&self, out: &mut String, children: &[Part], boundary: &str) {
        let eol = self.eol();
        for child in children {
            out.push_str("--");
            out.push_str(boundary);
            out.push_str(eol);
            self.write_part(out, child);
        }
        out.push_str("--");
        out.push_str(boundary);
        out.push_str("--");
        out.push_str(eol);
    }

    /// Writes body text with its line breaks normalised to the configured
    /// ending.
    fn write_body(&self, out: &mut String, text: &str) {
        let eol = self.eol();
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                out.push_str(eol);
            }
            out.push_str(line.trim_end_matches('\r'));
        }
    }
}
