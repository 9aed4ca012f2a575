//! MIME content type handling.

use crate::attributes::{HeaderAttributes, write_attribute};
use std::fmt;

/// MIME content type with parameters.
///
/// A typed view over the attribute set of a `Content-Type` header. Type and
/// subtype are lowercased; parameters keep their original values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    main_type: String,
    sub_type: String,
    attributes: HeaderAttributes,
}

impl ContentType {
    /// Creates a new content type without parameters.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        let main_type = main_type.into().to_lowercase();
        let sub_type = sub_type.into().to_lowercase();
        let attributes = HeaderAttributes::new(format!("{main_type}/{sub_type}"));
        Self {
            main_type,
            sub_type,
            attributes,
        }
    }

    /// Creates a multipart content type with a boundary.
    #[must_use]
    pub fn multipart(sub_type: impl Into<String>, boundary: impl Into<String>) -> Self {
        Self::new("multipart", sub_type).with_parameter("boundary", boundary)
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: &str, value: impl Into<String>) -> Self {
        self.attributes = self.attributes.with_attribute(key, value);
        self
    }

    /// Builds a content type from an already parsed header value.
    ///
    /// Returns `None` when the primary value is not of the form
    /// `type/subtype`.
    #[must_use]
    pub fn from_attributes(attributes: HeaderAttributes) -> Option<Self> {
        let (main_type, sub_type) = attributes.value().split_once('/')?;
        let main_type = main_type.trim().to_lowercase();
        let sub_type = sub_type.trim().to_lowercase();
        if main_type.is_empty() || sub_type.is_empty() {
            return None;
        }
        Some(Self {
            main_type,
            sub_type,
            attributes,
        })
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2=value2`
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::from_attributes(HeaderAttributes::from(s))
    }

    /// Main type (e.g., "text", "image", "multipart").
    #[must_use]
    pub fn main_type(&self) -> &str {
        &self.main_type
    }

    /// Subtype (e.g., "plain", "html", "mixed").
    #[must_use]
    pub fn sub_type(&self) -> &str {
        &self.sub_type
    }

    /// Returns `type/subtype`, lowercased.
    #[must_use]
    pub fn mime_type(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }

    /// Returns true if this is `mime` (`type/subtype`), ignoring case.
    #[must_use]
    pub fn is(&self, mime: &str) -> bool {
        mime.split_once('/').is_some_and(|(main, sub)| {
            self.main_type.eq_ignore_ascii_case(main.trim())
                && self.sub_type.eq_ignore_ascii_case(sub.trim())
        })
    }

    /// Gets a parameter by case-insensitive name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    /// Returns the charset parameter if present.
    ///
    /// The charset is informational only; bodies are never transcoded.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameter("charset")
    }

    /// Returns the boundary parameter if present and non-empty.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameter("boundary").filter(|b| !b.is_empty())
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Checks if this is a text content type.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.main_type == "text"
    }

    /// Returns the underlying attribute set.
    #[must_use]
    pub const fn attributes(&self) -> &HeaderAttributes {
        &self.attributes
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in self.attributes.iter() {
            write_attribute(f, key, value)?;
        }

        Ok(())
    }
}
