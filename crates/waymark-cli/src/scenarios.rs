//! End-to-end scenarios against the site under test.
//!
//! Each scenario drives a [`Session`] through page objects and turns a broken
//! expectation into [`CliError::ScenarioFailed`]. They are generic over the
//! driver so the same flows run against chromium and against [`waymark::MockDriver`].

use crate::error::{ensure, CliError, CliResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use waymark::pages::{
    ContactsPage, HomePage, LoginOutcome, LoginPage, Office, PageObject, ProfilePage,
    RegistrationOutcome, SignupPage, Site,
};
use waymark::{generate_password, BrowserDriver, Persona, Session};

/// A named end-to-end flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Sign up a freshly generated persona
    Registration,
    /// Sign in with a wrong password and expect the error banner
    FailedLogin,
    /// Sign in with real credentials and check the profile
    SuccessfulLogin,
    /// Check both office sections on the contacts page
    Contacts,
}

impl Scenario {
    /// Every scenario, in run order
    #[must_use]
    pub const fn all() -> [Self; 4] {
        [
            Self::Registration,
            Self::FailedLogin,
            Self::SuccessfulLogin,
            Self::Contacts,
        ]
    }

    /// Name used on the command line and for trace files
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Registration => "registration",
            Self::FailedLogin => "failed-login",
            Self::SuccessfulLogin => "successful-login",
            Self::Contacts => "contacts",
        }
    }

    /// One-line description
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::Registration => "register a generated user through the sign-up form",
            Self::FailedLogin => "sign in with a random password and expect the credentials error",
            Self::SuccessfulLogin => "sign in with real credentials and check the profile page",
            Self::Contacts => "check the Poland and Estonia office details on the contacts page",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Account used by the login scenarios
#[derive(Clone, Default)]
pub struct Credentials {
    /// Account email
    pub email: Option<String>,
    /// Account password
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Inputs shared by every scenario
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    /// Site under test
    pub site: Site,
    /// Login account
    pub credentials: Credentials,
}

impl ScenarioContext {
    /// Context for `site` with no credentials
    #[must_use]
    pub const fn new(site: Site) -> Self {
        Self {
            site,
            credentials: Credentials {
                email: None,
                password: None,
            },
        }
    }

    /// Set the login account
    #[must_use]
    pub fn with_credentials(mut self, email: Option<String>, password: Option<String>) -> Self {
        self.credentials = Credentials { email, password };
        self
    }
}

/// How a scenario ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioStatus {
    /// Every check held
    Passed {
        /// Something the operator should know (e.g. a CAPTCHA stopped the flow)
        note: Option<String>,
    },
    /// Not run
    Skipped {
        /// Why
        reason: String,
    },
}

impl ScenarioStatus {
    const fn passed() -> Self {
        Self::Passed { note: None }
    }

    fn passed_with(note: impl Into<String>) -> Self {
        Self::Passed {
            note: Some(note.into()),
        }
    }
}

/// Run `scenario` in `session`
///
/// # Errors
///
/// [`CliError::ScenarioFailed`] when a check does not hold;
/// [`CliError::Waymark`] when the flow cannot proceed.
pub fn run_scenario<D: BrowserDriver>(
    scenario: Scenario,
    session: &mut Session<D>,
    ctx: &ScenarioContext,
) -> CliResult<ScenarioStatus> {
    info!(%scenario, base_url = %ctx.site.base_url, "scenario started");
    match scenario {
        Scenario::Registration => registration(session, ctx),
        Scenario::FailedLogin => failed_login(session, ctx),
        Scenario::SuccessfulLogin => successful_login(session, ctx),
        Scenario::Contacts => contacts(session, ctx),
    }
}

fn open_home<D: BrowserDriver>(session: &mut Session<D>, site: &Site) -> CliResult<HomePage> {
    let home = HomePage::new(site);
    home.open(session)?;
    home.verify(session)?;
    Ok(home)
}

fn registration<D: BrowserDriver>(
    session: &mut Session<D>,
    ctx: &ScenarioContext,
) -> CliResult<ScenarioStatus> {
    let persona = Persona::random();
    info!(
        first_name = %persona.first_name,
        last_name = %persona.last_name,
        email = %persona.email,
        "registration persona"
    );

    open_home(session, &ctx.site)?.go_to_signup(session)?;
    let signup = SignupPage::new(&ctx.site);
    ensure(signup.is_loaded(session), "should be on the registration page")?;

    let outcome = signup.register(session, &persona.email, &persona.password)?;
    if outcome == RegistrationOutcome::BlockedByCaptcha {
        return Ok(ScenarioStatus::passed_with(
            "CAPTCHA blocked the form; rerun with --allow-manual-intervention to complete it",
        ));
    }
    if signup.is_email_validation_error_present(session) {
        warn!(email = %persona.email, "site rejected the generated email");
        return Ok(ScenarioStatus::passed_with(format!(
            "form submitted; the site rejected {} as not valid",
            persona.email
        )));
    }
    Ok(ScenarioStatus::passed_with(format!(
        "form submitted for {}",
        persona.email
    )))
}

fn failed_login<D: BrowserDriver>(
    session: &mut Session<D>,
    ctx: &ScenarioContext,
) -> CliResult<ScenarioStatus> {
    let email = ctx
        .credentials
        .email
        .clone()
        .unwrap_or_else(|| Persona::random().email);
    let password = generate_password();

    open_home(session, &ctx.site)?.go_to_login(session)?;
    let login = LoginPage::new(&ctx.site);
    ensure(login.is_loaded(session), "should be on the login page")?;

    let outcome = login.login(session, &email, &password)?;
    ensure(
        !outcome.is_logged_in(),
        "login should fail with an invalid password",
    )?;
    ensure(
        login.is_login_error_present(session),
        "error message should be displayed with the expected text",
    )?;
    Ok(ScenarioStatus::passed())
}

fn successful_login<D: BrowserDriver>(
    session: &mut Session<D>,
    ctx: &ScenarioContext,
) -> CliResult<ScenarioStatus> {
    let (Some(email), Some(password)) = (&ctx.credentials.email, &ctx.credentials.password) else {
        return Ok(ScenarioStatus::Skipped {
            reason: "no credentials (set WAYMARK_LOGIN_EMAIL and WAYMARK_LOGIN_PASSWORD)".into(),
        });
    };

    open_home(session, &ctx.site)?.go_to_login(session)?;
    let login = LoginPage::new(&ctx.site);
    ensure(login.is_loaded(session), "should be on the login page")?;

    match login.login(session, email, password)? {
        LoginOutcome::LoggedIn { url } => info!(%url, "signed in"),
        LoginOutcome::Rejected => {
            let banner = login.error_message(session).unwrap_or_default();
            return Err(CliError::scenario_failed(format!(
                "login should succeed with valid credentials (site said: {banner})"
            )));
        }
    }

    let profile = ProfilePage::new(&ctx.site);
    ensure(
        profile.is_loaded(session),
        "should be redirected to the profile page after login",
    )?;
    ensure(
        profile.is_personal_information_visible(session),
        "personal information section should be visible",
    )?;
    ensure(
        profile.verify_email(session, email),
        format!("profile should display {email}"),
    )?;
    Ok(ScenarioStatus::passed())
}

fn contacts<D: BrowserDriver>(
    session: &mut Session<D>,
    ctx: &ScenarioContext,
) -> CliResult<ScenarioStatus> {
    open_home(session, &ctx.site)?.go_to_contacts(session)?;
    let page = ContactsPage::new(&ctx.site);
    ensure(page.is_loaded(session), "should be on the contacts page")?;

    let mut problems = Vec::new();
    for office in [Office::poland(), Office::estonia()] {
        let report = page.check_office(session, &office);
        problems.extend(report.missing.into_iter().map(|name| format!("{name} missing")));
        problems.extend(report.mismatched.into_iter().map(|name| format!("{name} mismatched")));
    }
    if problems.is_empty() {
        Ok(ScenarioStatus::passed())
    } else {
        Err(CliError::scenario_failed(problems.join(", ")))
    }
}
