//! Registration form.
//!
//! The terms checkbox is the page's fragile spot: its markup has changed
//! several times, so it carries the longest candidate cascade in the suite.
//! The form may also be guarded by a reCAPTCHA, which only an operator can
//! clear.

use super::{PageObject, Site};
use crate::action::ActionOutcome;
use crate::driver::BrowserDriver;
use crate::locator::{LocatorCandidate, LogicalElement};
use crate::result::WaymarkResult;
use crate::session::Session;
use tracing::{info, warn};

/// Text of the server-side email rejection
pub const EMAIL_NOT_VALID: &str = "Email not valid! Please try other";

const CAPTCHA_OBSTACLE: &str = "reCAPTCHA on the registration form";

/// How a registration attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Form submitted
    Submitted,
    /// A CAPTCHA blocked the form and nobody solved it in time (or the
    /// intervention gate is disabled)
    BlockedByCaptcha,
}

impl RegistrationOutcome {
    /// Whether the form went out
    #[must_use]
    pub const fn is_submitted(&self) -> bool {
        matches!(self, Self::Submitted)
    }
}

/// Registration page
#[derive(Debug, Clone)]
pub struct SignupPage {
    url: String,
    email: LogicalElement,
    password: LogicalElement,
    confirm_password: LogicalElement,
    submit: LogicalElement,
    agree: LogicalElement,
    captcha: LogicalElement,
    email_error: LogicalElement,
    error_banner: LogicalElement,
}

impl SignupPage {
    /// Registration page of `site`
    #[must_use]
    pub fn new(site: &Site) -> Self {
        const AGREE_LABEL: &str =
            "//label[contains(text(), 'agree') or contains(text(), 'terms') or contains(text(), 'consent')]";

        Self {
            url: site.url("/sign_up/"),
            email: LogicalElement::new("email field", LocatorCandidate::css("input[type='email']")),
            password: LogicalElement::new(
                "password field",
                LocatorCandidate::css("input[type='password']"),
            ),
            confirm_password: LogicalElement::new(
                "confirm password field",
                LocatorCandidate::css("input[id*='confirm']"),
            ),
            submit: LogicalElement::new("sign up button", LocatorCandidate::css("button[type='submit']")),
            agree: LogicalElement::new(
                "agree checkbox",
                LocatorCandidate::css(".input-bool_check__Nov61").labeled("exact"),
            )
            .or(LocatorCandidate::css(".input-bool_check__Nov61 svg").labeled("exact svg"))
            .or(LocatorCandidate::css("input[type='checkbox']").labeled("checkbox type"))
            .or(LocatorCandidate::css(
                "input[id*='agree'], input[id*='terms'], input[id*='consent']",
            )
            .labeled("by id"))
            .or(LocatorCandidate::css(
                "input[name*='agree'], input[name*='terms'], input[name*='consent']",
            )
            .labeled("by name"))
            .or(LocatorCandidate::css(
                "input[class*='agree'], input[class*='terms'], input[class*='consent']",
            )
            .labeled("by class"))
            .or(LocatorCandidate::xpath(
                "//input[@type='checkbox'][contains(@id, 'agree') or contains(@name, 'agree') \
                 or contains(@class, 'agree') or contains(@id, 'terms') or contains(@name, 'terms')]",
            )
            .labeled("by xpath"))
            .or(LocatorCandidate::xpath(format!(
                "{AGREE_LABEL}/input[@type='checkbox'] \
                 | {AGREE_LABEL}/preceding-sibling::input[@type='checkbox'] \
                 | {AGREE_LABEL}/following-sibling::input[@type='checkbox']"
            ))
            .labeled("by label")),
            captcha: LogicalElement::new(
                "captcha frame",
                LocatorCandidate::css(
                    "iframe[title*='recaptcha'], iframe[src*='recaptcha'], iframe[name*='recaptcha']",
                ),
            ),
            email_error: LogicalElement::new(
                "email validation error",
                LocatorCandidate::xpath(format!("//div[text()='{EMAIL_NOT_VALID}']")),
            )
            .or(LocatorCandidate::xpath("//div[contains(text(), 'Email not valid')]")),
            error_banner: LogicalElement::new("error banner", LocatorCandidate::css("div.bg-error")),
        }
    }

    /// Terms checkbox cascade
    #[must_use]
    pub const fn agree_checkbox(&self) -> &LogicalElement {
        &self.agree
    }

    /// Type email, password and confirmation
    pub fn fill_form<D: BrowserDriver>(
        &self,
        session: &mut Session<D>,
        email: &str,
        password: &str,
    ) -> WaymarkResult<()> {
        session.type_text(&self.email, email)?;
        session.type_text(&self.password, password)?;
        session.type_text(&self.confirm_password, password)?;
        Ok(())
    }

    /// Tick the terms checkbox, walking the whole cascade
    pub fn check_agree<D: BrowserDriver>(&self, session: &mut Session<D>) -> ActionOutcome {
        session.perform_click(&self.agree)
    }

    /// Whether a reCAPTCHA frame is showing right now
    pub fn is_captcha_present<D: BrowserDriver>(&self, session: &Session<D>) -> bool {
        session.is_displayed(&self.captcha)
    }

    /// Submit the form
    pub fn submit<D: BrowserDriver>(&self, session: &mut Session<D>) -> WaymarkResult<()> {
        session.click(&self.submit).map(|_| ())
    }

    /// Whether the server rejected the email address.
    ///
    /// Looks for the exact message, then a partial match, then any error
    /// banner whose text mentions the rejection.
    pub fn is_email_validation_error_present<D: BrowserDriver>(&self, session: &mut Session<D>) -> bool {
        if session.wait_until_displayed(&self.email_error) {
            return true;
        }
        if !session.is_displayed(&self.error_banner) {
            return false;
        }
        session
            .get_text(&self.error_banner)
            .is_ok_and(|text| text.contains("Email not valid"))
    }

    /// Full registration: verify page, fill, agree, clear the CAPTCHA
    /// (operator) if one shows, submit.
    ///
    /// # Errors
    ///
    /// [`crate::WaymarkError::NotOnExpectedPage`] when the form is not
    /// showing; any failure to type into or submit the form.
    pub fn register<D: BrowserDriver>(
        &self,
        session: &mut Session<D>,
        email: &str,
        password: &str,
    ) -> WaymarkResult<RegistrationOutcome> {
        self.verify(session)?;
        self.fill_form(session, email, password)?;

        let agreed = self.check_agree(session);
        if !agreed.is_success() {
            warn!(outcome = ?agreed, "terms checkbox could not be ticked, submitting anyway");
        }

        if self.is_captcha_present(session) {
            warn!("CAPTCHA detected on the registration form; automation cannot solve it");
            if !session.request_intervention(CAPTCHA_OBSTACLE) {
                warn!("CAPTCHA not cleared, registration aborted");
                return Ok(RegistrationOutcome::BlockedByCaptcha);
            }
        }

        self.submit(session)?;
        info!(email, "registration form submitted");
        Ok(RegistrationOutcome::Submitted)
    }
}

impl PageObject for SignupPage {
    fn page_name(&self) -> &'static str {
        "signup"
    }

    fn url(&self) -> &str {
        &self.url
    }
}
