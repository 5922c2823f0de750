//! Account profile, shown after a successful sign-in.

use super::{PageObject, Site};
use crate::driver::BrowserDriver;
use crate::locator::{LocatorCandidate, LogicalElement};
use crate::result::WaymarkResult;
use crate::session::Session;
use tracing::warn;

/// Heading of the personal details section
pub const PERSONAL_INFORMATION: &str = "Personal information";

/// Profile page
#[derive(Debug, Clone)]
pub struct ProfilePage {
    url: String,
    personal_info_header: LogicalElement,
    email: LogicalElement,
}

impl ProfilePage {
    /// Profile page of `site`
    #[must_use]
    pub fn new(site: &Site) -> Self {
        Self {
            url: site.url("/profile/"),
            personal_info_header: LogicalElement::new(
                "personal information header",
                LocatorCandidate::css("h3.fs-22-manrope-semibold"),
            )
            .or(LocatorCandidate::xpath(format!(
                "//h3[normalize-space(.)='{PERSONAL_INFORMATION}']"
            ))),
            email: LogicalElement::new(
                "profile email",
                LocatorCandidate::css("span.fs-18-manrope-semibold.mt-3.flex.items-center.text-black"),
            ),
        }
    }

    /// Whether the personal information heading is showing with its exact
    /// text
    pub fn is_personal_information_visible<D: BrowserDriver>(&self, session: &mut Session<D>) -> bool {
        match session.get_text(&self.personal_info_header) {
            Ok(text) if text == PERSONAL_INFORMATION => true,
            Ok(text) => {
                warn!(expected = PERSONAL_INFORMATION, actual = %text, "profile header text mismatch");
                false
            }
            Err(err) => {
                warn!(error = %err, "profile header not found");
                false
            }
        }
    }

    /// Email address the profile shows
    pub fn displayed_email<D: BrowserDriver>(&self, session: &mut Session<D>) -> WaymarkResult<String> {
        session.get_text(&self.email)
    }

    /// Whether the profile shows `expected`
    pub fn verify_email<D: BrowserDriver>(&self, session: &mut Session<D>, expected: &str) -> bool {
        match self.displayed_email(session) {
            Ok(actual) if actual == expected => true,
            Ok(actual) => {
                warn!(expected, %actual, "profile email mismatch");
                false
            }
            Err(err) => {
                warn!(error = %err, "profile email not found");
                false
            }
        }
    }
}

impl PageObject for ProfilePage {
    fn page_name(&self) -> &'static str {
        "profile"
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::InteractionConfig;
    use crate::mock::{MockDriver, MockElement};

    fn page() -> ProfilePage {
        ProfilePage::new(&Site::new("https://site"))
    }

    fn profile(header: &str, email: &str) -> Session<MockDriver> {
        let driver = MockDriver::new("https://site/profile/")
            .with_element(MockElement::new(LocatorCandidate::css("h3.fs-22-manrope-semibold")).with_text(header))
            .with_element(
                MockElement::new(LocatorCandidate::css(
                    "span.fs-18-manrope-semibold.mt-3.flex.items-center.text-black",
                ))
                .with_text(email),
            );
        Session::new(driver, InteractionConfig::fast())
    }

    #[test]
    fn test_header_and_email() {
        let mut session = profile("Personal information", " user@test.com ");
        assert!(page().is_loaded(&session));
        assert!(page().is_personal_information_visible(&mut session));
        assert_eq!(page().displayed_email(&mut session).unwrap(), "user@test.com");
        assert!(page().verify_email(&mut session, "user@test.com"));
        assert!(!page().verify_email(&mut session, "other@test.com"));
    }

    #[test]
    fn test_wrong_header_text() {
        let mut session = profile("Security", "user@test.com");
        assert!(!page().is_personal_information_visible(&mut session));
    }

    #[test]
    fn test_header_found_by_text_fallback() {
        let driver = MockDriver::new("https://site/profile/").with_element(
            MockElement::new(LocatorCandidate::xpath("//h3[normalize-space(.)='Personal information']"))
                .with_text("Personal information"),
        );
        let mut session = Session::new(driver, InteractionConfig::fast());
        assert!(page().is_personal_information_visible(&mut session));
    }
}
