//! Rule-based header validation over a decoded message tree.
//!
//! A [`Validator`] holds a list of [`Rule`]s. Each rule targets parts by
//! content type and lists headers that must be present, headers that should
//! be present, and substrings expected inside header values. Validation
//! never fails; it produces a [`Report`] of [`Issue`]s.

use crate::message::Message;
use crate::part::Part;
use std::fmt;
use tracing::{debug, trace};

/// Rule target matching the envelope (first root part) only.
pub const ENVELOPE: &str = "envelope";

/// Rule target matching every part.
pub const ANY: &str = "*";

/// Content type assumed for a part without a usable `Content-Type`
/// (RFC 2045 section 5.2).
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// A substring expected in a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Expectation {
    /// Header name.
    pub header: String,
    /// Substring that one of the header's values must contain, ignoring
    /// ASCII case.
    pub contains: String,
}

/// Header requirements for one kind of part.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    /// Target: `type/subtype`, `type/*`, [`ANY`] or [`ENVELOPE`].
    pub content_type: String,
    /// Headers that must be present.
    #[cfg_attr(feature = "serde", serde(default))]
    pub required: Vec<String>,
    /// Headers that should be present.
    #[cfg_attr(feature = "serde", serde(default))]
    pub recommended: Vec<String>,
    /// Expected header value substrings.
    #[cfg_attr(feature = "serde", serde(default))]
    pub expected: Vec<Expectation>,
}

impl Rule {
    /// Creates an empty rule for a target.
    #[must_use]
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            required: Vec::new(),
            recommended: Vec::new(),
            expected: Vec::new(),
        }
    }

    /// Adds a required header.
    #[must_use]
    pub fn require(mut self, header: impl Into<String>) -> Self {
        self.required.push(header.into());
        self
    }

    /// Adds a recommended header.
    #[must_use]
    pub fn recommend(mut self, header: impl Into<String>) -> Self {
        self.recommended.push(header.into());
        self
    }

    /// Adds an expected header value substring.
    #[must_use]
    pub fn expect(mut self, header: impl Into<String>, contains: impl Into<String>) -> Self {
        self.expected.push(Expectation {
            header: header.into(),
            contains: contains.into(),
        });
        self
    }

    fn applies_to(&self, mime_type: &str, is_envelope: bool) -> bool {
        let target = self.content_type.trim();
        if target == ANY {
            return true;
        }
        if target.eq_ignore_ascii_case(ENVELOPE) {
            return is_envelope;
        }
        match target.strip_suffix("/*") {
            Some(main) => mime_type
                .split_once('/')
                .is_some_and(|(m, _)| m.eq_ignore_ascii_case(main)),
            None => mime_type.eq_ignore_ascii_case(target),
        }
    }
}

/// How serious an issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Severity {
    /// A recommended header is missing.
    Warning,
    /// A required header is missing or a value is not as expected.
    Error,
}

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IssueKind {
    /// A required header is absent.
    MissingRequired(String),
    /// A recommended header is absent.
    MissingRecommended(String),
    /// No value of the header contains the expected substring.
    UnexpectedValue {
        /// Header name.
        header: String,
        /// Substring that was expected.
        expected: String,
        /// First value of the header, if present.
        actual: Option<String>,
    },
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRequired(header) => write!(f, "missing required header {header}"),
            Self::MissingRecommended(header) => {
                write!(f, "missing recommended header {header}")
            }
            Self::UnexpectedValue {
                header,
                expected,
                actual: Some(actual),
            } => write!(f, "{header} should contain \"{expected}\", got \"{actual}\""),
            Self::UnexpectedValue {
                header,
                expected,
                actual: None,
            } => write!(f, "{header} should contain \"{expected}\" but is absent"),
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Issue {
    /// Position of the part: root index followed by child indices.
    pub path: Vec<usize>,
    /// Content type the part was checked as.
    pub content_type: String,
    /// Severity.
    pub severity: Severity,
    /// Description.
    pub kind: IssueKind,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".");
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{severity}: part {path} ({}): {}", self.content_type, self.kind)
    }
}

/// Outcome of validating a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    issues: Vec<Issue>,
}

impl Report {
    /// Returns every issue, in tree order.
    #[must_use]
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Returns true if no issue has [`Severity::Error`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// Returns the issues with [`Severity::Error`].
    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    /// Returns the issues with [`Severity::Warning`].
    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }
}

/// Checks decoded messages against a set of rules.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Validator {
    rules: Vec<Rule>,
}

impl Default for Validator {
    /// Rules drawn from RFC 5322 and RFC 2045/2046.
    fn default() -> Self {
        Self::new(vec![
            Rule::new(ENVELOPE)
                .require("From")
                .require("Date")
                .recommend("MIME-Version")
                .recommend("Message-ID")
                .recommend("Subject"),
            Rule::new("multipart/*").expect("Content-Type", "boundary="),
            Rule::new("image/*").recommend("Content-Transfer-Encoding"),
            Rule::new("application/*").recommend("Content-Transfer-Encoding"),
        ])
    }
}

impl Validator {
    /// Creates a validator with the given rules.
    #[must_use]
    pub const fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// Returns the rules.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Adds a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Validates every part of `message`.
    #[must_use]
    pub fn validate(&self, message: &Message) -> Report {
        let mut issues = Vec::new();
        let mut path = Vec::new();

        for (index, part) in message.parts().iter().enumerate() {
            path.push(index);
            self.check_part(part, index == 0, &mut path, &mut issues);
            path.pop();
        }

        debug!(
            issues = issues.len(),
            rules = self.rules.len(),
            "Validated message"
        );
        Report { issues }
    }

    fn check_part(
        &self,
        part: &Part,
        is_envelope: bool,
        path: &mut Vec<usize>,
        issues: &mut Vec<Issue>,
    ) {
        let mime_type = part
            .content_type()
            .map_or_else(|| DEFAULT_CONTENT_TYPE.to_string(), |ct| ct.mime_type());

        for rule in self
            .rules
            .iter()
            .filter(|rule| rule.applies_to(&mime_type, is_envelope))
        {
            for kind in check_rule(rule, part) {
                let severity = match kind {
                    IssueKind::MissingRecommended(_) => Severity::Warning,
                    IssueKind::MissingRequired(_) | IssueKind::UnexpectedValue { .. } => {
                        Severity::Error
                    }
                };
                trace!(?path, %mime_type, %kind, "Validation issue");
                issues.push(Issue {
                    path: path.clone(),
                    content_type: mime_type.clone(),
                    severity,
                    kind,
                });
            }
        }

        for (index, child) in part.children().iter().enumerate() {
            path.push(index);
            self.check_part(child, false, path, issues);
            path.pop();
        }
    }
}

fn check_rule(rule: &Rule, part: &Part) -> Vec<IssueKind> {
    let headers = part.headers();
    let mut found = Vec::new();

    for header in &rule.required {
        if !headers.contains(header) {
            found.push(IssueKind::MissingRequired(header.clone()));
        }
    }

    for header in &rule.recommended {
        if !headers.contains(header) {
            found.push(IssueKind::MissingRecommended(header.clone()));
        }
    }

    for expectation in &rule.expected {
        let needle = expectation.contains.to_ascii_lowercase();
        let values = headers.get_all(&expectation.header);
        if !values
            .iter()
            .any(|v| v.to_ascii_lowercase().contains(&needle))
        {
            found.push(IssueKind::UnexpectedValue {
                header: expectation.header.clone(),
                expected: expectation.contains.clone(),
                actual: values.first().map(|v| (*v).to_string()),
            });
        }
    }

    found
}
