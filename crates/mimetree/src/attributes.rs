//! Header attribute (parameter) parsing.

use std::collections::BTreeMap;
use std::fmt;

/// A header value split into its primary value and `name=value` attributes.
///
/// For `multipart/mixed; boundary="abc"; charset=utf-8` the primary value is
/// `multipart/mixed` and the attributes are `boundary -> abc` and
/// `charset -> utf-8`. Attribute names are stored lowercased and looked up
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderAttributes {
    value: String,
    attributes: BTreeMap<String, String>,
}

impl HeaderAttributes {
    /// Creates an attribute set with a primary value and no attributes.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds an attribute, replacing any previous value for the same name.
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.insert(name.to_lowercase(), value.into());
        self
    }

    /// Parses a header value.
    ///
    /// An absent value yields an empty set. The value is split on every `;`,
    /// so a quoted attribute value that itself contains `;` is cut short.
    /// Segments without `=` are dropped, and one pair of surrounding double
    /// quotes is stripped from attribute values. No escape processing is
    /// done inside quotes.
    #[must_use]
    pub fn parse(header_value: Option<&str>) -> Self {
        let Some(header_value) = header_value else {
            return Self::default();
        };

        let mut segments = header_value.split(';');
        let mut parsed = Self::new(segments.next().unwrap_or_default().trim());

        for segment in segments {
            let Some((name, value)) = segment.split_once('=') else {
                continue;
            };
            parsed
                .attributes
                .insert(name.trim().to_lowercase(), unquote(value.trim()).to_string());
        }

        parsed
    }

    /// Returns the primary value (the text before the first `;`).
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Gets an attribute value by case-insensitive name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(&name.to_lowercase())
            .map(String::as_str)
    }

    /// Returns true if the attribute is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.contains_key(&name.to_lowercase())
    }

    /// Returns an iterator over `(name, value)` pairs, names lowercased.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns true if there is neither a primary value nor attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.attributes.is_empty()
    }
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

impl From<&str> for HeaderAttributes {
    fn from(value: &str) -> Self {
        Self::parse(Some(value))
    }
}

impl fmt::Display for HeaderAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;

        for (key, value) in &self.attributes {
            write_attribute(f, key, value)?;
        }

        Ok(())
    }
}

/// Writes `; key=value`, quoting the value if it contains special characters.
pub(crate) fn write_attribute(f: &mut fmt::Formatter<'_>, key: &str, value: &str) -> fmt::Result {
    if value.is_empty()
        || value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c))
    {
        write!(f, "; {key}=\"{value}\"")
    } else {
        write!(f, "; {key}={value}")
    }
}
