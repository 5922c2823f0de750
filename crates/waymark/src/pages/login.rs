//! Sign-in form.

use super::{PageObject, Site};
use crate::driver::BrowserDriver;
use crate::locator::{LocatorCandidate, LogicalElement};
use crate::result::WaymarkResult;
use crate::session::Session;
use crate::wait::{Probe, WaitOptions, Waiter};
use tracing::{info, warn};

/// Banner shown for a wrong email/password pair
pub const EXPECTED_LOGIN_ERROR: &str =
    "Invalid email or password. Try clicking 'Forgot Password' if you're having trouble signing in.";

/// What the site did with the submitted credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Browser left the sign-in page
    LoggedIn {
        /// URL landed on
        url: String,
    },
    /// Error banner appeared
    Rejected,
}

impl LoginOutcome {
    /// Whether the credentials were accepted
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn { .. })
    }
}

/// Sign-in page
#[derive(Debug, Clone)]
pub struct LoginPage {
    url: String,
    email: LogicalElement,
    password: LogicalElement,
    submit: LogicalElement,
    error: LogicalElement,
}

impl LoginPage {
    /// Sign-in page of `site`
    #[must_use]
    pub fn new(site: &Site) -> Self {
        Self {
            url: site.url("/sign_in/"),
            email: LogicalElement::new("email field", LocatorCandidate::css("input[type='email']")),
            password: LogicalElement::new(
                "password field",
                LocatorCandidate::css("input[type='password']"),
            ),
            submit: LogicalElement::new("login button", LocatorCandidate::css("button[type='submit']")),
            error: LogicalElement::new(
                "login error",
                LocatorCandidate::css("div.bg-error.fs-16-inter-medium"),
            ),
        }
    }

    /// Type the credentials
    pub fn fill_form<D: BrowserDriver>(
        &self,
        session: &mut Session<D>,
        email: &str,
        password: &str,
    ) -> WaymarkResult<()> {
        session.type_text(&self.email, email)?;
        session.type_text(&self.password, password)
    }

    /// Verify the page, fill, submit and wait for either the error banner or
    /// a redirect away from the sign-in URL.
    ///
    /// # Errors
    ///
    /// [`crate::WaymarkError::NotOnExpectedPage`] when the form is not
    /// showing; [`crate::WaymarkError::Timeout`] when the site neither
    /// redirects nor complains within the default timeout.
    pub fn login<D: BrowserDriver>(
        &self,
        session: &mut Session<D>,
        email: &str,
        password: &str,
    ) -> WaymarkResult<LoginOutcome> {
        self.verify(session)?;
        self.fill_form(session, email, password)?;
        session.click(&self.submit)?;

        let sign_in = self.url_pattern();
        let options = WaitOptions::from_config(session.config());
        let outcome = Waiter::await_condition("login response", &options, || {
            if session.is_displayed(&self.error) {
                return Probe::Ready(LoginOutcome::Rejected);
            }
            match session.current_url() {
                Ok(url) if !sign_in.matches(&url) => Probe::Ready(LoginOutcome::LoggedIn { url }),
                Ok(url) => Probe::Pending(format!("still on {url}")),
                Err(err) => Probe::Pending(err.to_string()),
            }
        })?;
        info!(email, ?outcome, "login submitted");
        Ok(outcome)
    }

    /// Error banner text, if one is showing
    pub fn error_message<D: BrowserDriver>(&self, session: &mut Session<D>) -> Option<String> {
        if !session.is_displayed(&self.error) {
            return None;
        }
        session.get_text(&self.error).ok()
    }

    /// Whether the banner shows exactly the invalid-credentials message
    pub fn is_login_error_present<D: BrowserDriver>(&self, session: &mut Session<D>) -> bool {
        match self.error_message(session) {
            Some(text) if text == EXPECTED_LOGIN_ERROR => true,
            Some(text) => {
                warn!(expected = EXPECTED_LOGIN_ERROR, actual = %text, "login error text mismatch");
                false
            }
            None => false,
        }
    }
}

impl PageObject for LoginPage {
    fn page_name(&self) -> &'static str {
        "login"
    }

    fn url(&self) -> &str {
        &self.url
    }
}
