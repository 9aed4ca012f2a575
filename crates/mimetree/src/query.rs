//! Depth-first search over a decoded part tree.

use crate::message::Message;
use crate::part::Part;

/// Criterion for finding parts in a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartFilter<'a> {
    /// A part with header `name` whose primary value (the text before any
    /// `;`) equals `value`, ignoring ASCII case. Every occurrence of the
    /// header is considered.
    Header {
        /// Header name.
        name: &'a str,
        /// Expected primary value.
        value: &'a str,
    },
    /// A part whose header `header` carries attribute `name` equal to `value`
    /// exactly.
    Attribute {
        /// Header name, e.g. `Content-Disposition`.
        header: &'a str,
        /// Attribute name, e.g. `filename`.
        name: &'a str,
        /// Expected attribute value.
        value: &'a str,
    },
}

impl PartFilter<'_> {
    /// Returns true if `part` satisfies the filter.
    #[must_use]
    pub fn matches(&self, part: &Part) -> bool {
        match *self {
            Self::Header { name, value } => part.headers().get_all(name).into_iter().any(|v| {
                let primary = v.split(';').next().unwrap_or_default().trim();
                primary.eq_ignore_ascii_case(value.trim())
            }),
            Self::Attribute { header, name, value } => {
                part.header_attributes(header).get(name) == Some(value)
            }
        }
    }
}

/// Depth-first, pre-order iterator over a forest of parts.
#[derive(Debug, Clone)]
pub struct Walk<'a> {
    stack: Vec<&'a Part>,
}

impl<'a> Walk<'a> {
    fn new(roots: &'a [Part]) -> Self {
        Self {
            stack: roots.iter().rev().collect(),
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a Part;

    fn next(&mut self) -> Option<Self::Item> {
        let part = self.stack.pop()?;
        self.stack.extend(part.children().iter().rev());
        Some(part)
    }
}

impl Part {
    /// Walks this part and all of its descendants, depth first.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(std::slice::from_ref(self))
    }

    /// Finds the first part (this one included) matching `filter`.
    #[must_use]
    pub fn first_part(&self, filter: &PartFilter<'_>) -> Option<&Self> {
        self.walk().find(|p| filter.matches(p))
    }

    /// Finds every part (this one included) matching `filter`, in
    /// depth-first order.
    #[must_use]
    pub fn all_parts(&self, filter: &PartFilter<'_>) -> Vec<&Self> {
        self.walk().filter(|p| filter.matches(p)).collect()
    }
}

impl Message {
    /// Walks every root part and its descendants, depth first, envelope
    /// first.
    #[must_use]
    pub fn walk(&self) -> Walk<'_> {
        Walk::new(self.parts())
    }

    /// Finds the first part matching `filter`.
    #[must_use]
    pub fn first_part(&self, filter: &PartFilter<'_>) -> Option<&Part> {
        self.walk().find(|p| filter.matches(p))
    }

    /// Finds every part matching `filter`, in depth-first order.
    #[must_use]
    pub fn all_parts(&self, filter: &PartFilter<'_>) -> Vec<&Part> {
        self.walk().filter(|p| filter.matches(p)).collect()
    }

    /// Finds every part whose content type is `mime` (`type/subtype`),
    /// ignoring case.
    #[must_use]
    pub fn parts_with_content_type(&self, mime: &str) -> Vec<&Part> {
        self.walk()
            .filter(|p| p.content_type().is_some_and(|ct| ct.is(mime)))
            .collect()
    }

    /// Finds the first part named `name`, either by its
    /// `Content-Disposition` `filename` or its `Content-Type` `name`
    /// attribute.
    #[must_use]
    pub fn part_named(&self, name: &str) -> Option<&Part> {
        let by_filename = PartFilter::Attribute {
            header: "content-disposition",
            name: "filename",
            value: name,
        };
        let by_type_name = PartFilter::Attribute {
            header: "content-type",
            name: "name",
            value: name,
        };
        self.walk()
            .find(|p| by_filename.matches(p) || by_type_name.matches(p))
    }

    /// Returns the body of the first `text/plain` leaf.
    #[must_use]
    pub fn text_body(&self) -> Option<&str> {
        self.first_leaf_of("text/plain")
    }

    /// Returns the body of the first `text/html` leaf.
    #[must_use]
    pub fn html_body(&self) -> Option<&str> {
        self.first_leaf_of("text/html")
    }

    fn first_leaf_of(&self, mime: &str) -> Option<&str> {
        self.walk()
            .filter(|p| p.is_leaf())
            .find(|p| p.content_type().is_some_and(|ct| ct.is(mime)))
            .map(Part::body)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::needless_collect)]
mod tests {
    use super::*;
    use crate::header::Headers;

    fn leaf(content_type: &str, body: &str) -> Part {
        Part::leaf(Headers::from([("Content-Type", content_type)]), body)
    }

    fn sample() -> Message {
        let related = Part::container(
            Headers::from([("Content-Type", "multipart/related; boundary=rel")]),
            vec![
                Part::leaf(
                    Headers::from([("Content-Type", "text/html"), ("Content-ID", "<html@x>")]),
                    "<p>hi</p>",
                ),
                Part::leaf(
                    Headers::from([
                        ("Content-Type", "image/png; name=\"logo.png\""),
                        ("Content-Disposition", "inline; filename=\"logo.png\""),
                    ]),
                    "iVBORw0KGgo=",
                ),
            ],
        );
        let alternative = Part::container(
            Headers::from([("Content-Type", "multipart/alternative; boundary=alt")]),
            vec![leaf("text/plain; charset=utf-8", "hi"), related],
        );
        Message::multipart(
            Headers::from([("Content-Type", "multipart/mixed; boundary=mix")]),
            vec![alternative, leaf("application/pdf; name=report.pdf", "JVBERi0=")],
        )
    }

    #[test]
    fn test_walk_order() {
        let message = sample();
        let types: Vec<String> = message
            .walk()
            .map(|p| p.content_type().unwrap().mime_type())
            .collect();
        assert_eq!(
            types,
            vec![
                "multipart/mixed",
                "multipart/alternative",
                "text/plain",
                "multipart/related",
                "text/html",
                "image/png",
                "application/pdf",
            ]
        );
    }

    #[test]
    fn test_first_part_by_header() {
        let message = sample();
        let html = message
            .first_part(&PartFilter::Header {
                name: "content-type",
                value: "TEXT/HTML",
            })
            .unwrap();
        assert_eq!(html.headers().get("Content-ID"), Some("<html@x>"));
    }

    #[test]
    fn test_first_part_by_attribute() {
        let message = sample();
        let filter = PartFilter::Attribute {
            header: "Content-Disposition",
            name: "FILENAME",
            value: "logo.png",
        };
        assert_eq!(message.first_part(&filter).unwrap().body(), "iVBORw0KGgo=");

        let missing = PartFilter::Attribute {
            header: "Content-Disposition",
            name: "filename",
            value: "LOGO.PNG",
        };
        assert!(message.first_part(&missing).is_none());
    }

    #[test]
    fn test_all_parts() {
        let message = sample();
        let multiparts = message.all_parts(&PartFilter::Header {
            name: "Content-Type",
            value: "multipart/related",
        });
        assert_eq!(multiparts.len(), 1);
        assert_eq!(multiparts[0].children().len(), 2);
    }

    #[test]
    fn test_part_walk_includes_self() {
        let message = sample();
        let alternative = &message.parts()[1];
        assert_eq!(alternative.walk().count(), 5);
        assert!(
            alternative
                .first_part(&PartFilter::Header {
                    name: "content-type",
                    value: "multipart/alternative",
                })
                .is_some_and(|p| p.id() == alternative.id())
        );
    }

    #[test]
    fn test_parts_with_content_type() {
        let message = sample();
        assert_eq!(message.parts_with_content_type("text/plain").len(), 1);
        assert_eq!(message.parts_with_content_type("image/*").len(), 0);
    }

    #[test]
    fn test_part_named() {
        let message = sample();
        assert_eq!(message.part_named("logo.png").unwrap().body(), "iVBORw0KGgo=");
        assert_eq!(message.part_named("report.pdf").unwrap().body(), "JVBERi0=");
        assert!(message.part_named("missing.txt").is_none());
    }

    #[test]
    fn test_text_and_html_body() {
        let message = sample();
        assert_eq!(message.text_body(), Some("hi"));
        assert_eq!(message.html_body(), Some("<p>hi</p>"));
    }
}
