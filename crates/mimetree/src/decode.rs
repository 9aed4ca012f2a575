//! MIME message decoding.
//!
//! Decoding is a recursive split over borrowed lines: each level parses a
//! header block, looks up the `boundary` attribute of its `Content-Type`, and
//! if one is present splits its body at the delimiter lines and recurses into
//! each section. No state is shared between levels.

use crate::attributes::HeaderAttributes;
use crate::error::{Error, Result};
use crate::header::{Headers, split_block};
use crate::message::Message;
use crate::part::Part;
use tracing::{debug, trace, warn};

/// Default limit on container nesting below the top level.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Decoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DecodeOptions {
    /// Maximum number of nested container levels below the top level.
    ///
    /// A section that would nest deeper is kept as a leaf holding its raw,
    /// unsplit body.
    pub max_depth: usize,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// MIME message decoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    /// Creates a decoder with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a decoder with the given options.
    #[must_use]
    pub const fn with_options(options: DecodeOptions) -> Self {
        Self { options }
    }

    /// Returns the decoder options.
    #[must_use]
    pub const fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decodes a message from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`] if the bytes are not UTF-8, or
    /// [`Error::NoHeaders`] if the message has no header block.
    pub fn decode(&self, bytes: &[u8]) -> Result<Message> {
        let text = std::str::from_utf8(bytes)?;
        self.decode_str(text)
    }

    /// Decodes a message from text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoHeaders`] if the message has no header block.
    pub fn decode_str(&self, text: &str) -> Result<Message> {
        let lines: Vec<&str> = split_lines(text).collect();
        let (headers, body) = split_block(&lines);

        if headers.is_empty() {
            return Err(Error::NoHeaders);
        }

        let Some(boundary) = boundary_of(&headers) else {
            debug!(headers = headers.len(), "Decoded single-part message");
            return Ok(Message::single_part(headers, body.join("\n")));
        };

        let sections = self.decode_sections(body, &[boundary.as_str()], 1);
        debug!(
            headers = headers.len(),
            sections = sections.len(),
            %boundary,
            "Decoded multipart message"
        );
        Ok(Message::multipart(headers, sections))
    }

    /// Decodes the sections of a body split at the last of `boundaries`.
    /// The others belong to enclosing containers.
    fn decode_sections(&self, lines: &[&str], boundaries: &[&str], depth: usize) -> Vec<Part> {
        let Some(boundary) = boundaries.last() else {
            return Vec::new();
        };
        split_sections(lines, boundary)
            .into_iter()
            .map(|section| self.decode_section(section, boundaries, depth))
            .collect()
    }

    fn decode_section(&self, lines: &[&str], enclosing: &[&str], depth: usize) -> Part {
        let (headers, body) = split_block(trim_trailing_blank(lines));

        let Some(boundary) = boundary_of(&headers) else {
            return Part::leaf(headers, body.join("\n"));
        };

        if let Some(outer) = enclosing
            .iter()
            .find(|outer| delimiters_collide(outer, &boundary))
        {
            warn!(
                depth,
                %boundary,
                %outer,
                "Nested boundary collides with an enclosing one, keeping section as a leaf"
            );
            return Part::leaf(headers, body.join("\n"));
        }

        if depth > self.options.max_depth {
            warn!(
                depth,
                %boundary,
                max_depth = self.options.max_depth,
                "Multipart nesting too deep, keeping section as a leaf"
            );
            return Part::leaf(headers, body.join("\n"));
        }

        trace!(depth, %boundary, "Descending into nested multipart");
        let mut boundaries = enclosing.to_vec();
        boundaries.push(boundary.as_str());
        let children = self.decode_sections(body, &boundaries, depth + 1);
        Part::container(headers, children)
    }
}

/// Returns the non-empty `boundary` attribute of the `Content-Type` header.
pub(crate) fn boundary_of(headers: &Headers) -> Option<String> {
    HeaderAttributes::parse(headers.get("content-type"))
        .get("boundary")
        .filter(|b| !b.is_empty())
        .map(String::from)
}

/// Splits a multipart body into the line ranges between delimiter lines.
///
/// Delimiters are whole lines: `--boundary` opens a section and
/// `--boundary--` closes the body, trailing whitespace allowed on both.
/// Lines before the first delimiter (preamble) and after the close delimiter
/// (epilogue) are discarded. A blank final section left open by a missing
/// close delimiter is dropped.
fn split_sections<'a, 'l>(lines: &'l [&'a str], boundary: &str) -> Vec<&'l [&'a str]> {
    let open = format!("--{boundary}");
    let close = format!("--{boundary}--");

    let mut sections = Vec::new();
    let mut start: Option<usize> = None;

    for (index, line) in lines.iter().enumerate() {
        let line = line.trim_end();
        if line == close {
            if let Some(start) = start {
                sections.push(&lines[start..index]);
            }
            return sections;
        }
        if line == open {
            if let Some(start) = start {
                sections.push(&lines[start..index]);
            }
            start = Some(index + 1);
        }
    }

    if let Some(start) = start {
        let rest = &lines[start..];
        if rest.iter().any(|line| !line.trim().is_empty()) {
            sections.push(rest);
        } else {
            trace!(%boundary, "Multipart body ended without close delimiter");
        }
    }

    sections
}

/// Splits text into lines, dropping `\n`, `\r\n` and any other trailing
/// carriage returns.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(|line| line.trim_end_matches('\r'))
}

/// Returns true if a delimiter line of one boundary is also a delimiter line
/// of the other, e.g. `b` and `b--` both accept `--b--`.
fn delimiters_collide(a: &str, b: &str) -> bool {
    a == b || a.strip_suffix("--") == Some(b) || b.strip_suffix("--") == Some(a)
}

fn trim_trailing_blank<'a, 'l>(lines: &'l [&'a str]) -> &'l [&'a str] {
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(0, |last| last + 1);
    &lines[..end]
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::needless_collect,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::part::Body;

    #[test]
    fn test_decode_single_part() {
        let raw = "From: sender@example.com\r\nSubject: Test\r\n\r\nHello,\r\nWorld!\r\n";
        let message = Decoder::new().decode(raw.as_bytes()).unwrap();

        assert_eq!(message.parts().len(), 1);
        assert_eq!(message.subject(), Some("Test"));
        assert_eq!(message.envelope().body(), "Hello,\nWorld!");
    }

    #[test]
    fn test_decode_basic_multipart() {
        let raw = concat!(
            "From: sender@example.com\n",
            "Content-Type: multipart/mixed; boundary=\"simple\"\n",
            "\n",
            "--simple\n",
            "Content-Type: text/plain\n",
            "\n",
            "Hello, World!\n",
            "--simple\n",
            "Content-Type: text/html\n",
            "\n",
            "<h1>Hello, World!</h1>\n",
            "--simple--\n",
        );
        let message = Decoder::new().decode_str(raw).unwrap();

        assert_eq!(message.parts().len(), 3);
        assert_eq!(message.envelope().body(), "");
        assert!(message.envelope().children().is_empty());
        assert_eq!(message.parts()[1].body(), "Hello, World!");
        assert_eq!(message.parts()[2].body(), "<h1>Hello, World!</h1>");
        assert_eq!(
            message.parts()[2].headers().get("content-type"),
            Some("text/html")
        );
    }

    #[test]
    fn test_decode_discards_preamble_and_epilogue() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\n",
            "\n",
            "This is a multi-part message in MIME format.\n",
            "--b\n",
            "Content-Type: text/plain\n",
            "\n",
            "only\n",
            "--b--\n",
            "epilogue text\n",
        );
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 2);
        assert_eq!(message.parts()[1].body(), "only");
    }

    #[test]
    fn test_decode_boundary_must_be_whole_line() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\n",
            "\n",
            "--b\n",
            "Content-Type: text/plain\n",
            "\n",
            "a line mentioning --b in passing\n",
            "--b--\n",
        );
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 2);
        assert_eq!(message.parts()[1].body(), "a line mentioning --b in passing");
    }

    #[test]
    fn test_decode_delimiter_with_trailing_whitespace() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b  \nX: 1\n\nbody\n--b-- \t\n";
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 2);
        assert_eq!(message.parts()[1].body(), "body");
    }

    #[test]
    fn test_decode_nested_boundary_prefix() {
        // Inner boundary starts with the outer one.
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=a\n",
            "\n",
            "--a\n",
            "Content-Type: multipart/alternative; boundary=ab\n",
            "\n",
            "--ab\n",
            "Content-Type: text/plain\n",
            "\n",
            "inner\n",
            "--ab--\n",
            "--a--\n",
        );
        let message = Decoder::new().decode_str(raw).unwrap();
        let container = &message.parts()[1];
        assert!(container.is_container());
        assert_eq!(container.children().len(), 1);
        assert_eq!(container.children()[0].body(), "inner");
    }

    #[test]
    fn test_decode_reused_boundary_stays_leaf() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\n",
            "\n",
            "--b\n",
            "Content-Type: multipart/alternative; boundary=b\n",
            "\n",
            "--b\n",
            "Content-Type: text/plain\n",
            "\n",
            "two\n",
            "--b--\n",
        );
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 3);
        assert!(message.parts()[1].is_leaf());
        assert_eq!(message.parts()[2].body(), "two");

        let again = Decoder::new().decode(&message.to_bytes()).unwrap();
        assert_eq!(again, message);
    }

    #[test]
    fn test_decode_boundary_colliding_with_close_delimiter() {
        // `--b--` opens a section of the outer `b--` and closes the inner `b`.
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=\"b--\"\n",
            "\n",
            "--b--\n",
            "Content-Type: multipart/alternative; boundary=b\n",
            "\n",
            "--b----\n",
        );
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 2);
        assert!(message.parts()[1].is_leaf());

        let again = Decoder::new().decode(&message.to_bytes()).unwrap();
        assert_eq!(again, message);
    }

    #[test]
    fn test_delimiters_collide() {
        assert!(delimiters_collide("b", "b"));
        assert!(delimiters_collide("b", "b--"));
        assert!(delimiters_collide("b--", "b"));
        assert!(!delimiters_collide("a", "ab"));
        assert!(!delimiters_collide("b", "b-"));
    }

    #[test]
    fn test_decode_lone_carriage_returns() {
        let message = Decoder::new().decode_str("From: a\n\nx\r\r\ny\r").unwrap();
        assert_eq!(message.envelope().body(), "x\ny");

        let again = Decoder::new().decode(&message.to_bytes()).unwrap();
        assert_eq!(again, message);
    }

    #[test]
    fn test_decode_empty_leaf_body() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=b\n",
            "\n",
            "--b\n",
            "Content-Type: text/plain\n",
            "\n",
            "--b\n",
            "Content-Type: text/plain\n",
            "--b--\n",
        );
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 3);
        for part in &message.parts()[1..] {
            assert!(part.is_leaf());
            assert_eq!(part.body(), "");
            assert_eq!(part.headers().get("Content-Type"), Some("text/plain"));
        }
    }

    #[test]
    fn test_decode_empty_section_between_delimiters() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\n--b\nX: 1\n\nx\n--b--\n";
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 3);
        assert!(message.parts()[1].headers().is_empty());
        assert_eq!(message.parts()[1].content(), &Body::Leaf(String::new()));
    }

    #[test]
    fn test_decode_headerless_section() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\n\nplain text\n--b--\n";
        let message = Decoder::new().decode_str(raw).unwrap();
        let part = &message.parts()[1];
        assert!(part.headers().is_empty());
        assert_eq!(part.body(), "plain text");
    }

    #[test]
    fn test_decode_keeps_inner_blank_lines() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\nX: 1\n\n\nfirst\n\nsecond\n\n\n--b--\n";
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts()[1].body(), "\nfirst\n\nsecond");
    }

    #[test]
    fn test_decode_missing_close_delimiter() {
        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\nX: 1\n\none\n--b\nX: 2\n\ntwo\n";
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 3);
        assert_eq!(message.parts()[2].body(), "two");

        let raw = "Content-Type: multipart/mixed; boundary=b\n\n--b\nX: 1\n\none\n--b\n\n";
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 2);
    }

    #[test]
    fn test_decode_multipart_without_boundary() {
        let raw = concat!(
            "Content-Type: multipart/mixed\n",
            "\n",
            "--test\n",
            "Content-Type: text/plain\n",
            "\n",
            "Hello\n",
            "--test--\n",
        );
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 1);
        assert_eq!(
            message.envelope().body(),
            "--test\nContent-Type: text/plain\n\nHello\n--test--"
        );
    }

    #[test]
    fn test_decode_empty_boundary_is_ignored() {
        let raw = "Content-Type: multipart/mixed; boundary=\"\"\n\n--\nbody\n";
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(message.parts().len(), 1);
        assert_eq!(message.envelope().body(), "--\nbody");
    }

    #[test]
    fn test_decode_folded_content_type() {
        let raw = concat!(
            "Content-Type: multipart/mixed;\n",
            "\tboundary=\"folded\"\n",
            "\n",
            "--folded\n",
            "X: 1\n",
            "\n",
            "body\n",
            "--folded--\n",
        );
        let message = Decoder::new().decode_str(raw).unwrap();
        assert_eq!(
            message.headers().get("content-type"),
            Some("multipart/mixed; boundary=\"folded\"")
        );
        assert_eq!(message.parts().len(), 2);
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let err = Decoder::new().decode(&[0xFF, 0xFE, 0xFD]).unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8(_)));
    }

    #[test]
    fn test_decode_empty_input() {
        assert_eq!(Decoder::new().decode_str("").unwrap_err(), Error::NoHeaders);
        assert_eq!(Decoder::new().decode(b"").unwrap_err(), Error::NoHeaders);
    }

    #[test]
    fn test_decode_leading_blank_line() {
        assert_eq!(
            Decoder::new().decode_str("\nFrom: a@example.com\n").unwrap_err(),
            Error::NoHeaders
        );
    }

    #[test]
    fn test_decode_only_garbage_headers() {
        assert_eq!(
            Decoder::new().decode_str("no colon here\n\nbody").unwrap_err(),
            Error::NoHeaders
        );
    }

    #[test]
    fn test_decode_depth_limit() {
        let raw = concat!(
            "Content-Type: multipart/mixed; boundary=outer\n",
            "\n",
            "--outer\n",
            "Content-Type: multipart/alternative; boundary=inner\n",
            "\n",
            "--inner\n",
            "Content-Type: text/plain\n",
            "\n",
            "deep\n",
            "--inner--\n",
            "--outer--\n",
        );

        let decoder = Decoder::with_options(DecodeOptions { max_depth: 0 });
        let message = decoder.decode_str(raw).unwrap();
        let part = &message.parts()[1];
        assert!(part.is_leaf());
        assert_eq!(
            part.body(),
            "--inner\nContent-Type: text/plain\n\ndeep\n--inner--"
        );

        let message = Decoder::new().decode_str(raw).unwrap();
        assert!(message.parts()[1].is_container());
    }

    #[test]
    fn test_split_sections() {
        let lines = ["pre", "--x", "a", "--x", "b", "c", "--x--", "post"];
        let sections = split_sections(&lines, "x");
        assert_eq!(sections, vec![&["a"][..], &["b", "c"][..]]);
    }

    #[test]
    fn test_trim_trailing_blank() {
        let lines = ["a", "", " b", "", "  ", "\t"];
        assert_eq!(trim_trailing_blank(&lines), &["a", "", " b"]);
        assert!(trim_trailing_blank(&["", " "]).is_empty());
    }
}
