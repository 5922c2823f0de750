//! Browser driver abstraction.
//!
//! The interaction core never talks to a browser directly. Everything it
//! needs from a live page is expressed by [`BrowserDriver`], so the same
//! resolver and executor run against the in-memory [`MockDriver`] in unit
//! tests and against Chromium over CDP in real scenarios.
//!
//! [`MockDriver`]: crate::mock::MockDriver

use crate::locator::LocatorCandidate;
use crate::result::{WaymarkError, WaymarkResult};
use std::fmt;
use thiserror::Error;

/// Result type for driver calls
pub type DriverResult<T> = Result<T, DriverError>;

/// Errors reported by a browser driver
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Selector syntax rejected by the browser
    #[error("Invalid selector `{selector}`: {message}")]
    InvalidSelector {
        /// Offending selector
        selector: String,
        /// Browser message
        message: String,
    },

    /// Element exists but cannot receive the interaction (occluded,
    /// disabled, zero-size, off-screen)
    #[error("Element not interactable: {message}")]
    NotInteractable {
        /// Error message
        message: String,
    },

    /// Element detached from the document
    #[error("Stale element: {message}")]
    StaleElement {
        /// Error message
        message: String,
    },

    /// Injected script threw
    #[error("Script error: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Transport or protocol failure
    #[error("Protocol error: {message}")]
    Protocol {
        /// Error message
        message: String,
    },
}

impl DriverError {
    /// Create an invalid selector error
    #[must_use]
    pub fn invalid_selector(selector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidSelector {
            selector: selector.into(),
            message: message.into(),
        }
    }

    /// Create a not-interactable error
    #[must_use]
    pub fn not_interactable(message: impl Into<String>) -> Self {
        Self::NotInteractable {
            message: message.into(),
        }
    }

    /// Create a stale element error
    #[must_use]
    pub fn stale(message: impl Into<String>) -> Self {
        Self::StaleElement {
            message: message.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }

    /// Create a protocol error
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Whether retrying the same call can never succeed
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::InvalidSelector { .. })
    }
}

/// Synchronous browser operations needed by the interaction core.
///
/// Implementations must be usable from a single foreground thread; drivers
/// backed by an async client block on each call internally.
pub trait BrowserDriver {
    /// Driver-specific live element reference
    type Element: Clone + fmt::Debug;

    /// Locate the first element matching `candidate`.
    ///
    /// Returns `Ok(None)` when nothing matches and
    /// [`DriverError::InvalidSelector`] when the selector is malformed.
    fn find_element(&self, candidate: &LocatorCandidate) -> DriverResult<Option<Self::Element>>;

    /// Whether the element is rendered and visible
    fn is_displayed(&self, element: &Self::Element) -> DriverResult<bool>;

    /// Whether the element accepts input
    fn is_enabled(&self, element: &Self::Element) -> DriverResult<bool>;

    /// Native pointer click
    fn click(&self, element: &Self::Element) -> DriverResult<()>;

    /// Native keyboard input
    fn send_keys(&self, element: &Self::Element, text: &str) -> DriverResult<()>;

    /// Visible text of the element
    fn text(&self, element: &Self::Element) -> DriverResult<String>;

    /// Run a script body with `this` bound to the element
    fn execute_script(&self, script: &str, element: &Self::Element) -> DriverResult<()>;

    /// URL of the current document
    fn current_url(&self) -> DriverResult<String>;

    /// Load a new document
    fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// Counter that changes whenever a new document replaces the current one
    fn page_generation(&self) -> DriverResult<u64>;
}

/// A resolved live element, tagged with the page it was resolved on.
#[derive(Debug, Clone)]
pub struct ElementHandle<E> {
    inner: E,
    generation: u64,
    element: String,
    candidate_index: usize,
}

impl<E> ElementHandle<E> {
    /// Wrap a driver element
    #[must_use]
    pub fn new(inner: E, generation: u64, element: impl Into<String>, candidate_index: usize) -> Self {
        Self {
            inner,
            generation,
            element: element.into(),
            candidate_index,
        }
    }

    /// Page generation at resolution time
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Logical element name
    #[must_use]
    pub fn element(&self) -> &str {
        &self.element
    }

    /// Index of the candidate that produced this handle
    #[must_use]
    pub const fn candidate_index(&self) -> usize {
        self.candidate_index
    }

    /// Borrow the driver element without a freshness check
    #[must_use]
    pub const fn raw(&self) -> &E {
        &self.inner
    }

    /// Borrow the driver element, rejecting it if the page has changed
    ///
    /// # Errors
    ///
    /// [`WaymarkError::StaleElement`] when the driver's generation moved on.
    pub fn live<D>(&self, driver: &D) -> WaymarkResult<&E>
    where
        D: BrowserDriver<Element = E>,
    {
        if driver.page_generation()? != self.generation {
            return Err(WaymarkError::StaleElement {
                element: self.element.clone(),
            });
        }
        Ok(&self.inner)
    }
}
