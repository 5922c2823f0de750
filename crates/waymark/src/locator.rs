//! Locator candidates and logical elements.
//!
//! A *logical element* is a conceptual UI control ("the agree checkbox")
//! described by an ordered, non-empty list of [`LocatorCandidate`]s. Order
//! encodes preference: the most specific, most stable selector first, looser
//! structural fallbacks last.
//!
//! ```
//! use waymark::{LocatorCandidate, LogicalElement};
//!
//! let get_started = LogicalElement::new(
//!     "get started link",
//!     LocatorCandidate::css("a.header_signup__VSWAE[href='/sign_up/']"),
//! )
//! .or(LocatorCandidate::link_text("Get Started"))
//! .or(LocatorCandidate::partial_link_text("Get Started"))
//! .or(LocatorCandidate::xpath("//a[contains(@href, 'sign_up')]"));
//!
//! assert_eq!(get_started.len(), 4);
//! ```

use crate::result::{WaymarkError, WaymarkResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a candidate locates its element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// CSS selector (attribute match)
    Css,
    /// Exact visible text of a link
    LinkText,
    /// Substring of a link's visible text
    PartialLinkText,
    /// XPath expression (structural path)
    #[serde(rename = "xpath")]
    XPath,
}

impl Strategy {
    /// Short name used in traces and logs
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Css => "css",
            Self::LinkText => "link text",
            Self::PartialLinkText => "partial link text",
            Self::XPath => "xpath",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete way to locate a logical element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorCandidate {
    /// Lookup strategy
    pub strategy: Strategy,
    /// Selector payload, interpreted according to `strategy`
    pub selector: String,
    /// Optional label shown in traces instead of the raw selector
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl LocatorCandidate {
    /// Create a candidate
    #[must_use]
    pub fn new(strategy: Strategy, selector: impl Into<String>) -> Self {
        Self {
            strategy,
            selector: selector.into(),
            label: None,
        }
    }

    /// CSS candidate
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Strategy::Css, selector)
    }

    /// XPath candidate
    #[must_use]
    pub fn xpath(selector: impl Into<String>) -> Self {
        Self::new(Strategy::XPath, selector)
    }

    /// Exact link text candidate
    #[must_use]
    pub fn link_text(text: impl Into<String>) -> Self {
        Self::new(Strategy::LinkText, text)
    }

    /// Partial link text candidate
    #[must_use]
    pub fn partial_link_text(text: impl Into<String>) -> Self {
        Self::new(Strategy::PartialLinkText, text)
    }

    /// Attach a trace label
    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Lower the candidate to an XPath expression.
    ///
    /// Link-text strategies have no native CSS form, so browsers that only
    /// speak CSS and XPath receive them as XPath. Returns `None` for CSS.
    #[must_use]
    pub fn to_xpath(&self) -> Option<String> {
        match self.strategy {
            Strategy::Css => None,
            Strategy::XPath => Some(self.selector.clone()),
            Strategy::LinkText => Some(format!(
                "//a[normalize-space(.)={}]",
                xpath_literal(self.selector.trim())
            )),
            Strategy::PartialLinkText => Some(format!(
                "//a[contains(normalize-space(.), {})]",
                xpath_literal(self.selector.trim())
            )),
        }
    }

    /// JavaScript expression counting matches in the current document.
    ///
    /// Evaluates to `-1` when the selector is syntactically invalid, so a
    /// driver can tell "no match" apart from "malformed selector".
    #[must_use]
    pub fn to_count_query(&self) -> String {
        let count = match self.to_xpath() {
            None => format!("document.querySelectorAll({:?}).length", self.selector),
            Some(xpath) => format!(
                "document.evaluate({xpath:?}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null).snapshotLength"
            ),
        };
        format!("(() => {{ try {{ return {count}; }} catch (e) {{ return -1; }} }})()")
    }
}

impl fmt::Display for LocatorCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{label} ({} `{}`)", self.strategy, self.selector),
            None => write!(f, "{} `{}`", self.strategy, self.selector),
        }
    }
}

/// Quote a string as an XPath literal, handling embedded quotes
fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    let parts: Vec<String> = text.split('\'').map(|p| format!("'{p}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// A named UI control with its ordered, non-empty candidate list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLogicalElement")]
pub struct LogicalElement {
    name: String,
    candidates: Vec<LocatorCandidate>,
}

/// Selector-table shape of a [`LogicalElement`] before the non-empty check
#[derive(Deserialize)]
struct RawLogicalElement {
    name: String,
    candidates: Vec<LocatorCandidate>,
}

impl TryFrom<RawLogicalElement> for LogicalElement {
    type Error = WaymarkError;

    fn try_from(raw: RawLogicalElement) -> WaymarkResult<Self> {
        Self::from_candidates(raw.name, raw.candidates)
    }
}

impl LogicalElement {
    /// Create a logical element from its preferred candidate
    #[must_use]
    pub fn new(name: impl Into<String>, first: LocatorCandidate) -> Self {
        Self {
            name: name.into(),
            candidates: vec![first],
        }
    }

    /// Append a fallback candidate (tried after all earlier ones)
    #[must_use]
    pub fn or(mut self, candidate: LocatorCandidate) -> Self {
        self.candidates.push(candidate);
        self
    }

    /// Build from an arbitrary list, e.g. one loaded from a selector table
    ///
    /// # Errors
    ///
    /// Returns [`WaymarkError::EmptyCandidates`] for an empty list.
    pub fn from_candidates(
        name: impl Into<String>,
        candidates: Vec<LocatorCandidate>,
    ) -> WaymarkResult<Self> {
        let name = name.into();
        if candidates.is_empty() {
            return Err(WaymarkError::EmptyCandidates { element: name });
        }
        Ok(Self { name, candidates })
    }

    /// Logical element name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidates in declared order
    #[must_use]
    pub fn candidates(&self) -> &[LocatorCandidate] {
        &self.candidates
    }

    /// Number of candidates (never zero)
    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false; present for API symmetry with `len`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl fmt::Display for LogicalElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
