//! Waymark: resilient element interaction for end-to-end browser tests.
//!
//! Real sites rename classes, cover buttons with overlays and put CAPTCHAs in
//! front of forms. Waymark keeps a test moving anyway:
//!
//! - every UI control is a [`LogicalElement`] with an ordered list of
//!   [`LocatorCandidate`]s, tried in order by the [`Resolver`];
//! - every readiness check goes through the [`Waiter`], never a fixed sleep;
//! - clicks scroll the target into view, try a native click and fall back to
//!   a script-dispatched click ([`ActionExecutor`]);
//! - obstacles only a human can clear go through the time-boxed
//!   [`InterventionGate`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │   pages (HomePage, SignupPage, LoginPage, ProfilePage, ...)     │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                │
//! ┌──────────────────────────────▼──────────────────────────────────┐
//! │ Session ── Resolver ── ActionExecutor ── InterventionGate       │
//! │    │           │              │                                 │
//! │    └─────── Waiter ───────────┘            InteractionTrace     │
//! └──────────────────────────────┬──────────────────────────────────┘
//!                                │ BrowserDriver
//!                 ┌──────────────┴──────────────┐
//!                 │ CdpDriver (chromium)        │ MockDriver (tests)
//!                 └─────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use waymark::{
//!     InteractionConfig, LocatorCandidate, LogicalElement, MockDriver, MockElement, Session,
//! };
//!
//! let driver = MockDriver::new("https://example.test/sign_up/")
//!     .with_element(MockElement::new(LocatorCandidate::css("input[type='checkbox']")));
//! let mut session = Session::new(driver, InteractionConfig::fast());
//!
//! let agree = LogicalElement::new("agree checkbox", LocatorCandidate::css(".broken-selector"))
//!     .or(LocatorCandidate::css("input[type='checkbox']"));
//! assert!(session.perform_click(&agree).is_success());
//! assert_eq!(session.trace().failures().len(), 1);
//! assert_eq!(session.trace().successes().len(), 1);
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

mod action;
mod config;
mod data;
mod driver;
mod intervention;
mod locator;
mod mock;
mod resolver;
mod result;
mod session;
mod trace;
mod wait;

/// Page objects for the site under test
pub mod pages;

/// Chromium over CDP (requires the `browser` feature)
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]
pub mod cdp;

pub use action::{
    ActionExecutor, ActionMethod, ActionOutcome, FailureKind, SCRIPT_CLICK, SCROLL_INTO_VIEW_SCRIPT,
};
pub use config::InteractionConfig;
pub use data::{
    generate_email, generate_password, generate_password_with, Persona, DEFAULT_EMAIL_DOMAIN,
    PASSWORD_MAX_BODY, PASSWORD_MIN_BODY, PASSWORD_SUFFIX,
};
pub use driver::{BrowserDriver, DriverError, DriverResult, ElementHandle};
pub use intervention::{
    ChannelSignal, ConsoleSignal, GateState, InterventionGate, InterventionOutcome,
    InterventionRequest, OperatorSignal, SignalSender,
};
pub use locator::{LocatorCandidate, LogicalElement, Strategy};
pub use mock::{ClickBehavior, MockDriver, MockElement, MockHandle};
pub use resolver::{FailureReason, Resolution, Resolver};
pub use result::{CandidateFailure, WaymarkError, WaymarkResult};
pub use session::Session;
pub use trace::{InteractionTrace, TraceEntry, TraceKind};
pub use wait::{
    inspect_element, probe_element, wait_for_element, wait_for_url, ElementCondition,
    ElementMiss, PageCondition, Probe, UrlPattern, WaitOptions, Waiter,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::pages::{
        ContactsPage, HomePage, LoginOutcome, LoginPage, Office, PageObject, ProfilePage,
        RegistrationOutcome, SignupPage, Site,
    };
    pub use super::{
        ActionMethod, ActionOutcome, BrowserDriver, ElementCondition, InteractionConfig,
        InteractionTrace, LocatorCandidate, LogicalElement, PageCondition, Persona, Session,
        UrlPattern, WaymarkError, WaymarkResult,
    };
}
