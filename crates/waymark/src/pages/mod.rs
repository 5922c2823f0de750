//! Page Object Model for the site under test.
//!
//! Each page owns its [`LogicalElement`] tables (every logical control with
//! its ordered fallback candidates) and expresses its flows purely through a
//! [`Session`], so the same page drives a real browser or a [`MockDriver`].
//!
//! [`LogicalElement`]: crate::locator::LogicalElement
//! [`MockDriver`]: crate::mock::MockDriver

mod contacts;
mod home;
mod login;
mod profile;
mod signup;

pub use contacts::{ContactsPage, Office, OfficeReport};
pub use home::HomePage;
pub use login::{LoginOutcome, LoginPage, EXPECTED_LOGIN_ERROR};
pub use profile::{ProfilePage, PERSONAL_INFORMATION};
pub use signup::{RegistrationOutcome, SignupPage, EMAIL_NOT_VALID};

use crate::driver::BrowserDriver;
use crate::result::WaymarkResult;
use crate::session::Session;
use crate::wait::UrlPattern;
use serde::{Deserialize, Serialize};

/// Production site
pub const DEFAULT_BASE_URL: &str = "https://btcbit.net";

/// Where the site lives; every page URL hangs off `base_url`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    /// Scheme and host, no trailing slash
    pub base_url: String,
}

impl Default for Site {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Site {
    /// Site rooted at `base_url` (a trailing slash is dropped)
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute URL for `path` (`"/sign_up/"` -> `"https://host/sign_up/"`)
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

/// Trait for page objects.
///
/// A page knows its canonical URL and the pattern the browser URL must match
/// for the page to count as shown.
pub trait PageObject {
    /// Page name for logging/debugging
    fn page_name(&self) -> &'static str;

    /// Canonical URL used by [`Self::open`]
    fn url(&self) -> &str;

    /// Pattern the current URL must match
    fn url_pattern(&self) -> UrlPattern {
        UrlPattern::Exact(self.url().to_string())
    }

    /// Load the page directly
    fn open<D: BrowserDriver>(&self, session: &mut Session<D>) -> WaymarkResult<()> {
        session.navigate(self.url())
    }

    /// Wait until the browser shows this page
    ///
    /// # Errors
    ///
    /// [`crate::WaymarkError::NotOnExpectedPage`] once the default timeout
    /// elapses.
    fn verify<D: BrowserDriver>(&self, session: &Session<D>) -> WaymarkResult<String> {
        session.expect_url(&self.url_pattern())
    }

    /// [`Self::verify`] as a flag
    fn is_loaded<D: BrowserDriver>(&self, session: &Session<D>) -> bool {
        self.verify(session).is_ok()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::InteractionConfig;
    use crate::mock::MockDriver;

    mod site_tests {
        use super::*;

        #[test]
        fn test_default_site() {
            assert_eq!(Site::default().base_url, "https://btcbit.net");
        }

        #[test]
        fn test_trailing_slash_dropped() {
            let site = Site::new("http://localhost:8080/");
            assert_eq!(site.url("/sign_in/"), "http://localhost:8080/sign_in/");
            assert_eq!(site.url("contacts/"), "http://localhost:8080/contacts/");
        }
    }

    mod page_object_tests {
        use super::*;

        #[test]
        fn test_open_then_verify() {
            let page = LoginPage::new(&Site::new("https://site"));
            let mut session = Session::new(MockDriver::new("about:blank"), InteractionConfig::fast());
            page.open(&mut session).unwrap();
            assert_eq!(page.verify(&session).unwrap(), "https://site/sign_in/");
            assert!(page.is_loaded(&session));
        }

        #[test]
        fn test_wrong_page_is_not_loaded() {
            let page = ProfilePage::new(&Site::new("https://site"));
            let session = Session::new(MockDriver::new("https://site/sign_in/"), InteractionConfig::fast());
            assert!(!page.is_loaded(&session));
        }
    }
}
