//! MIME header handling.

use std::fmt;

/// A single header field as it appeared in the message.
///
/// The key keeps its original casing for encoding; lookups through
/// [`Headers`] ignore ASCII case.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HeaderEntry {
    key: String,
    value: String,
}

impl HeaderEntry {
    /// Creates a new header entry.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Returns the header name with its original casing.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the header value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    fn matches(&self, name: &str) -> bool {
        self.key.eq_ignore_ascii_case(name)
    }
}

/// Ordered collection of email headers.
///
/// Unlike a map, the collection keeps every entry in insertion order and
/// tolerates duplicate keys (repeated `Received:` lines, for example), which
/// is what allows a decoded message to be encoded back with its headers
/// exactly where they were.
///
/// Lookups compare keys ASCII-case-insensitively. Equality between two
/// collections is literal: same length, and the same key (case included) and
/// value at every position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Headers {
    entries: Vec<HeaderEntry>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, keeping any existing entries with the same name.
    ///
    /// This is the only way to create duplicates.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push(HeaderEntry::new(name, value));
    }

    /// Sets a header value.
    ///
    /// The first entry matching `name` takes the new value in place and every
    /// other matching entry is removed. When nothing matches, the header is
    /// appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        let Some(first) = self.entries.iter().position(|e| e.matches(&name)) else {
            self.entries.push(HeaderEntry::new(name, value));
            return;
        };

        let key = self.entries[first].key.clone();
        self.entries[first] = HeaderEntry::new(key, value);

        let mut index = 0;
        self.entries.retain(|e| {
            let keep = index <= first || !e.matches(&name);
            index += 1;
            keep
        });
    }

    /// Sets a header when `value` is present, removes it otherwise.
    pub fn set_or_remove(&mut self, name: impl Into<String>, value: Option<String>) {
        match value {
            Some(value) => self.set(name, value),
            None => self.remove_all(&name.into()),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.matches(name))
            .map(HeaderEntry::value)
    }

    /// Gets all values for a header, in message order.
    #[must_use]
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.matches(name))
            .map(HeaderEntry::value)
            .collect()
    }

    /// Returns true if at least one entry has this name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.matches(name))
    }

    /// Removes all values for a header.
    pub fn remove_all(&mut self, name: &str) {
        self.entries.retain(|e| !e.matches(name));
    }

    /// Returns the number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the collection holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|e| (e.key(), e.value()))
    }

    /// Returns the underlying entries.
    #[must_use]
    pub fn entries(&self) -> &[HeaderEntry] {
        &self.entries
    }

    /// Parses the header block at the start of `text`.
    ///
    /// Parsing stops at the first blank line. Anything after it is ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        split_block(&lines).0
    }
}

/// Splits `lines` into a header collection and the body lines following the
/// first blank line.
///
/// Folded lines (starting with a space or tab) continue the pending header
/// with a single space. A line without a colon commits the pending header and
/// is dropped, as is a continuation with nothing pending.
pub(crate) fn split_block<'a, 'l>(lines: &'l [&'a str]) -> (Headers, &'l [&'a str]) {
    let mut headers = Headers::new();
    let mut current: Option<(String, String)> = None;
    let mut body_start = lines.len();

    for (index, line) in lines.iter().enumerate() {
        if line.trim().is_empty() {
            body_start = index + 1;
            break;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = current.as_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }

        if let Some((name, value)) = current.take() {
            headers.add(name, value.trim());
        }

        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            if !name.is_empty() {
                current = Some((name.to_string(), value.trim().to_string()));
            }
        }
    }

    if let Some((name, value)) = current {
        headers.add(name, value.trim());
    }

    (headers, &lines[body_start.min(lines.len())..])
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| HeaderEntry::new(k, v))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Headers {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl<'a> IntoIterator for &'a Headers {
    type Item = (&'a str, &'a str);
    type IntoIter = std::iter::Map<
        std::slice::Iter<'a, HeaderEntry>,
        fn(&'a HeaderEntry) -> (&'a str, &'a str),
    >;

    fn into_iter(self) -> Self::IntoIter {
        let pair: fn(&'a HeaderEntry) -> (&'a str, &'a str) = |e| (e.key(), e.value());
        self.entries.iter().map(pair)
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in self {
            write!(f, "{name}: {value}\r\n")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
        assert_eq!(headers.len(), 0);
    }

    #[test]
    fn test_headers_case_insensitive_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert_eq!(headers.get("CONTENT-TYPE"), Some("text/plain"));
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert!(headers.contains("cOnTeNt-TyPe"));
        assert_eq!(headers.get("Subject"), None);
    }

    #[test]
    fn test_headers_duplicates() {
        let mut headers = Headers::new();
        headers.add("Received", "a");
        headers.add("Received", "b");
        headers.add("Received", "c");
        assert_eq!(headers.get_all("Received"), vec!["a", "b", "c"]);
        assert_eq!(headers.get("received"), Some("a"));
    }

    #[test]
    fn test_headers_set_collapses_duplicates() {
        let mut headers = Headers::new();
        headers.add("Received", "a");
        headers.add("Received", "b");
        headers.add("Received", "c");

        headers.set("Received", "single");
        assert_eq!(headers.get_all("Received"), vec!["single"]);
    }

    #[test]
    fn test_headers_set_keeps_first_position() {
        let mut headers = Headers::from([
            ("From", "a@example.com"),
            ("To", "one@example.com"),
            ("Subject", "Hi"),
            ("to", "two@example.com"),
        ]);

        headers.set("TO", "three@example.com");

        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("From", "a@example.com"),
                ("To", "three@example.com"),
                ("Subject", "Hi"),
            ]
        );
    }

    #[test]
    fn test_headers_set_appends_when_missing() {
        let mut headers = Headers::from([("From", "a@example.com")]);
        headers.set("Subject", "New");
        assert_eq!(headers.iter().last(), Some(("Subject", "New")));
    }

    #[test]
    fn test_headers_set_or_remove() {
        let mut headers = Headers::from([("X-Tag", "1"), ("X-Tag", "2")]);
        headers.set_or_remove("x-tag", None);
        assert!(!headers.contains("X-Tag"));

        headers.set_or_remove("X-Tag", Some("3".to_string()));
        assert_eq!(headers.get("X-Tag"), Some("3"));
    }

    #[test]
    fn test_headers_remove_all() {
        let mut headers = Headers::new();
        headers.add("Subject", "Test");
        headers.add("Received", "a");
        headers.add("received", "b");

        headers.remove_all("RECEIVED");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Subject"), Some("Test"));
    }

    #[test]
    fn test_headers_equality_is_literal() {
        let a = Headers::from([("Subject", "Hi")]);
        let b = Headers::from([("subject", "Hi")]);
        assert_ne!(a, b);
        assert_eq!(a, Headers::from([("Subject", "Hi")]));
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            " charset=utf-8\r\n",
            "\r\n",
            "Ignored: body\r\n"
        );

        let headers = Headers::parse(text);
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get("From"), Some("sender@example.com"));
        assert_eq!(headers.get("Subject"), Some("Test Message"));
        assert_eq!(
            headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert!(!headers.contains("Ignored"));
    }

    #[test]
    fn test_split_block_drops_lines_without_colon() {
        let lines = [
            "Subject: one",
            "garbage line",
            "\tfolded onto nothing",
            "To: x@example.com",
            "",
            "body",
        ];
        let (headers, body) = split_block(&lines);
        let pairs: Vec<_> = headers.iter().collect();
        assert_eq!(pairs, vec![("Subject", "one"), ("To", "x@example.com")]);
        assert_eq!(body, &["body"]);
    }

    #[test]
    fn test_split_block_without_blank_line() {
        let lines = ["Subject: one", " two"];
        let (headers, body) = split_block(&lines);
        assert_eq!(headers.get("subject"), Some("one two"));
        assert!(body.is_empty());
    }

    #[test]
    fn test_headers_display() {
        let headers = Headers::from([("From", "sender@example.com"), ("To", "r@example.com")]);
        assert_eq!(
            headers.to_string(),
            "From: sender@example.com\r\nTo: r@example.com\r\n"
        );
    }

    proptest! {
        #[test]
        fn add_preserves_order(values in proptest::collection::vec("[a-z]{1,8}", 0..16)) {
            let mut headers = Headers::new();
            for value in &values {
                headers.add("X-Item", value.clone());
            }
            let all: Vec<String> = headers.get_all("x-item").into_iter().map(String::from).collect();
            prop_assert_eq!(all, values);
        }

        #[test]
        fn set_leaves_exactly_one(count in 0usize..8, value in "[a-z]{1,8}") {
            let mut headers = Headers::new();
            for i in 0..count {
                headers.add("Received", i.to_string());
            }
            headers.set("RECEIVED", value.clone());
            prop_assert_eq!(headers.get_all("received"), vec![value.as_str()]);
        }
    }
}
