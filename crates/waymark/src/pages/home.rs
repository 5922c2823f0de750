//! Landing page: header links and the "Contact us" button further down.

use super::{PageObject, Site};
use crate::driver::BrowserDriver;
use crate::locator::{LocatorCandidate, LogicalElement};
use crate::result::WaymarkResult;
use crate::session::Session;
use crate::wait::{PageCondition, UrlPattern};
use tracing::info;

/// Home page
#[derive(Debug, Clone)]
pub struct HomePage {
    url: String,
    get_started: LogicalElement,
    login: LogicalElement,
    contact_us: LogicalElement,
}

impl HomePage {
    /// Home page of `site`
    #[must_use]
    pub fn new(site: &Site) -> Self {
        Self {
            url: site.base_url.clone(),
            get_started: LogicalElement::new(
                "get started link",
                LocatorCandidate::css("a.header_signup__VSWAE[href='/sign_up/']"),
            )
            .or(LocatorCandidate::link_text("Get Started"))
            .or(LocatorCandidate::partial_link_text("Get Started"))
            .or(LocatorCandidate::xpath(
                "//a[contains(@class, 'header_signup') or contains(@href, 'sign_up')]",
            )),
            login: LogicalElement::new(
                "login link",
                LocatorCandidate::css("a.header_login__VSWAE[href='/sign_in/']"),
            )
            .or(LocatorCandidate::link_text("Login"))
            .or(LocatorCandidate::partial_link_text("Login"))
            .or(LocatorCandidate::xpath(
                "//a[contains(@class, 'header_login') or contains(@href, 'sign_in')]",
            )),
            contact_us: LogicalElement::new(
                "contact us button",
                LocatorCandidate::css("a.questions_button__Bb3zE[href='/contacts/']"),
            )
            .or(LocatorCandidate::link_text("Contact us"))
            .or(LocatorCandidate::partial_link_text("Contact"))
            .or(LocatorCandidate::xpath(
                "//a[contains(@class, 'questions_button') or contains(@href, '/contacts/')]",
            )),
        }
    }

    /// "Get Started" header link
    #[must_use]
    pub const fn get_started(&self) -> &LogicalElement {
        &self.get_started
    }

    /// "Login" header link
    #[must_use]
    pub const fn login(&self) -> &LogicalElement {
        &self.login
    }

    /// "Contact us" button
    #[must_use]
    pub const fn contact_us(&self) -> &LogicalElement {
        &self.contact_us
    }

    /// Click "Get Started" and wait for the registration form
    pub fn go_to_signup<D: BrowserDriver>(&self, session: &mut Session<D>) -> WaymarkResult<()> {
        self.follow(session, &self.get_started, "/sign_up")
    }

    /// Click "Login" and wait for the sign-in form
    pub fn go_to_login<D: BrowserDriver>(&self, session: &mut Session<D>) -> WaymarkResult<()> {
        self.follow(session, &self.login, "/sign_in")
    }

    /// Click "Contact us" and wait for the contacts page
    pub fn go_to_contacts<D: BrowserDriver>(&self, session: &mut Session<D>) -> WaymarkResult<()> {
        self.follow(session, &self.contact_us, "/contacts")
    }

    fn follow<D: BrowserDriver>(
        &self,
        session: &mut Session<D>,
        link: &LogicalElement,
        fragment: &str,
    ) -> WaymarkResult<()> {
        let expected = PageCondition::url_contains(fragment);
        let method = session.perform_click_expecting(link, &expected).into_result()?;
        info!(link = link.name(), %method, fragment, "navigated from home page");
        Ok(())
    }
}

impl PageObject for HomePage {
    fn page_name(&self) -> &'static str {
        "home"
    }

    fn url(&self) -> &str {
        &self.url
    }

    /// The landing page answers with or without the trailing slash
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::Regex(format!("^{}/?$", regex::escape(&self.url)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::InteractionConfig;
    use crate::mock::{ClickBehavior, MockDriver, MockElement};

    fn home() -> HomePage {
        HomePage::new(&Site::new("https://site"))
    }

    fn session(driver: MockDriver) -> Session<MockDriver> {
        Session::new(driver, InteractionConfig::fast())
    }

    mod navigation_tests {
        use super::*;

        #[test]
        fn test_get_started_by_exact_css() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(LocatorCandidate::css("a.header_signup__VSWAE[href='/sign_up/']"))
                    .navigates_to("https://site/sign_up/"),
            );
            let mut session = session(driver);
            home().go_to_signup(&mut session).unwrap();
            assert_eq!(session.current_url().unwrap(), "https://site/sign_up/");
        }

        #[test]
        fn test_login_falls_back_to_link_text() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(LocatorCandidate::link_text("Login")).navigates_to("https://site/sign_in/"),
            );
            let mut session = session(driver);
            home().go_to_login(&mut session).unwrap();
            assert!(session
                .driver()
                .was_looked_up("a.header_login__VSWAE[href='/sign_in/']"));
            assert_eq!(session.current_url().unwrap(), "https://site/sign_in/");
        }

        #[test]
        fn test_contacts_with_dead_native_click_uses_script() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(LocatorCandidate::css("a.questions_button__Bb3zE[href='/contacts/']"))
                    .with_click(ClickBehavior::Ignored)
                    .navigates_to("https://site/contacts/"),
            );
            let mut session = session(driver);
            home().go_to_contacts(&mut session).unwrap();
            assert!(session.driver().was_called("scroll #0"));
            assert!(session.driver().was_called("script-click #0"));
        }

        #[test]
        fn test_missing_link_is_an_error() {
            let mut session = session(MockDriver::new("https://site/"));
            let err = home().go_to_signup(&mut session).unwrap_err();
            assert_eq!(err.candidate_failures().len(), 4);
        }
    }

    mod verify_tests {
        use super::*;

        #[test]
        fn test_with_and_without_trailing_slash() {
            let pattern = home().url_pattern();
            assert!(pattern.matches("https://site"));
            assert!(pattern.matches("https://site/"));
            assert!(!pattern.matches("https://site/sign_in/"));
        }
    }
}
