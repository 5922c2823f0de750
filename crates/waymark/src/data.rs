//! Test data for the registration and login scenarios.
//!
//! Everything is drawn from `rand`. The `*_with` variants take the generator
//! explicitly so tests can pin a seed.

use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Domain appended to generated addresses
pub const DEFAULT_EMAIL_DOMAIN: &str = "@test.com";

/// Appended to every generated password so that the site's digit, upper,
/// lower and symbol rules are always met
pub const PASSWORD_SUFFIX: &str = "!1Aa";

/// Shortest random password body
pub const PASSWORD_MIN_BODY: usize = 10;

/// Longest random password body
pub const PASSWORD_MAX_BODY: usize = 15;

const FIRST_NAMES: &[&str] = &[
    "Olivia", "Liam", "Emma", "Noah", "Amelia", "Oliver", "Sophia", "Elijah", "Isabella", "James",
    "Charlotte", "William", "Mia", "Benjamin", "Harper", "Lucas", "Evelyn", "Henry", "Abigail", "Theodore",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Williams", "Brown", "Jones", "Garcia", "Miller", "Davis", "Rodriguez", "Martinez",
    "Hernandez", "Lopez", "Wilson", "Anderson", "Thomas", "Taylor", "Moore", "Jackson", "Martin", "Lee",
];

/// Email built from the first three characters of each name, lower-cased
///
/// ```
/// assert_eq!(waymark::generate_email("John", "Smith", "@test.com"), "joh.smi@test.com");
/// ```
#[must_use]
pub fn generate_email(first_name: &str, last_name: &str, domain: &str) -> String {
    let prefix = |name: &str| name.chars().take(3).collect::<String>().to_lowercase();
    format!("{}.{}{domain}", prefix(first_name), prefix(last_name))
}

/// Random password: 10 to 15 alphanumeric characters plus [`PASSWORD_SUFFIX`]
#[must_use]
pub fn generate_password() -> String {
    generate_password_with(&mut rand::thread_rng())
}

/// [`generate_password`] drawing from `rng`
pub fn generate_password_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    let body_len = rng.gen_range(PASSWORD_MIN_BODY..=PASSWORD_MAX_BODY);
    let mut password: String = rng
        .sample_iter(&Alphanumeric)
        .take(body_len)
        .map(char::from)
        .collect();
    password.push_str(PASSWORD_SUFFIX);
    password
}

/// A made-up registrant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Derived address
    pub email: String,
    /// Generated password
    pub password: String,
}

impl Persona {
    /// Persona with the given names and a fresh password
    #[must_use]
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>, domain: &str) -> Self {
        let first_name = first_name.into();
        let last_name = last_name.into();
        Self {
            email: generate_email(&first_name, &last_name, domain),
            password: generate_password(),
            first_name,
            last_name,
        }
    }

    /// Persona with names drawn from a built-in list
    #[must_use]
    pub fn random() -> Self {
        Self::random_with(&mut rand::thread_rng())
    }

    /// [`Persona::random`] drawing from `rng`
    pub fn random_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let first = FIRST_NAMES.choose(rng).copied().unwrap_or_default();
        let last = LAST_NAMES.choose(rng).copied().unwrap_or_default();
        let first_name = first.to_string();
        let last_name = last.to_string();
        Self {
            email: generate_email(first, last, DEFAULT_EMAIL_DOMAIN),
            password: generate_password_with(rng),
            first_name,
            last_name,
        }
    }
}
