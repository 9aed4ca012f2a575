//! MIME part tree.

use crate::attributes::HeaderAttributes;
use crate::content_type::ContentType;
use crate::decode::boundary_of;
use crate::encode::Encoder;
use crate::header::Headers;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_PART_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a [`Part`].
///
/// Allocated when a part is constructed and carried along by `Clone`, so a
/// cloned part keeps the identity of its original while a freshly decoded
/// copy of the same content does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(u64);

impl PartId {
    fn next() -> Self {
        Self(NEXT_PART_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for PartId {
    fn default() -> Self {
        Self::next()
    }
}

/// Content of a part: opaque body text or nested parts, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Body {
    /// Body text, kept exactly as decoded (no transfer decoding).
    Leaf(String),
    /// Ordered child parts.
    Container(Vec<Part>),
}

/// MIME message part.
///
/// Every part owns its own headers. Equality compares headers and content
/// only; use [`Part::id`] to compare identity.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Part {
    #[cfg_attr(feature = "serde", serde(skip))]
    id: PartId,
    headers: Headers,
    body: Body,
}

impl Part {
    /// Creates a leaf part with body text.
    #[must_use]
    pub fn leaf(headers: Headers, body: impl Into<String>) -> Self {
        Self {
            id: PartId::next(),
            headers,
            body: Body::Leaf(body.into()),
        }
    }

    /// Creates a container part holding `children`.
    ///
    /// The headers should carry a `Content-Type` with a `boundary` attribute,
    /// otherwise the children cannot be encoded.
    #[must_use]
    pub fn container(headers: Headers, children: Vec<Self>) -> Self {
        Self {
            id: PartId::next(),
            headers,
            body: Body::Container(children),
        }
    }

    /// Returns the identity of this part.
    #[must_use]
    pub const fn id(&self) -> PartId {
        self.id
    }

    /// Returns the part headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the part content.
    #[must_use]
    pub const fn content(&self) -> &Body {
        &self.body
    }

    /// Returns the body text, or `""` for a container.
    #[must_use]
    pub fn body(&self) -> &str {
        match &self.body {
            Body::Leaf(text) => text,
            Body::Container(_) => "",
        }
    }

    /// Returns the child parts, empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        match &self.body {
            Body::Leaf(_) => &[],
            Body::Container(children) => children,
        }
    }

    /// Returns true if this part holds body text.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.body, Body::Leaf(_))
    }

    /// Returns true if this part holds nested parts.
    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self.body, Body::Container(_))
    }

    /// Parses the first value of `name` into its attribute set.
    ///
    /// An absent header yields an empty set.
    #[must_use]
    pub fn header_attributes(&self, name: &str) -> HeaderAttributes {
        HeaderAttributes::parse(self.headers.get(name))
    }

    /// Gets the content type, if the part declares a well-formed one.
    #[must_use]
    pub fn content_type(&self) -> Option<ContentType> {
        ContentType::from_attributes(self.header_attributes("content-type"))
    }

    /// Returns the non-empty `boundary` attribute of the `Content-Type`.
    #[must_use]
    pub fn boundary(&self) -> Option<String> {
        boundary_of(&self.headers)
    }

    /// Encodes the part with default options.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        Encoder::new().encode_part(self)
    }

    /// Replaces the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Replaces the content with body text, dropping any children.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Body::Leaf(body.into());
        self
    }

    /// Appends a child, turning a leaf into a container.
    ///
    /// Leaf text is discarded when the part becomes a container.
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        match &mut self.body {
            Body::Container(children) => children.push(child),
            Body::Leaf(_) => self.body = Body::Container(vec![child]),
        }
        self
    }

    /// Removes the child at `index`. Out-of-range indices and leaves are left
    /// unchanged.
    #[must_use]
    pub fn without_child(mut self, index: usize) -> Self {
        if let Body::Container(children) = &mut self.body {
            if index < children.len() {
                children.remove(index);
            }
        }
        self
    }

    /// Splits the part into headers and content.
    #[must_use]
    pub fn into_parts(self) -> (Headers, Body) {
        (self.headers, self.body)
    }
}

impl PartialEq for Part {
    fn eq(&self, other: &Self) -> bool {
        self.headers == other.headers && self.body == other.body
    }
}

impl Eq for Part {}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Encoder::new().part_to_string(self))
    }
}
