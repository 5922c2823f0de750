//! Contacts page: one section per registered office.

use super::{PageObject, Site};
use crate::driver::BrowserDriver;
use crate::locator::{LocatorCandidate, LogicalElement};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Published details of one office
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
    /// Section heading (country)
    pub country: String,
    /// Legal entity name
    pub company: String,
    /// Street line of the address
    pub street: String,
    /// City line of the address
    pub city: String,
    /// Company registration number
    pub registration_number: String,
    /// Phone number as dialled (`tel:` link target)
    pub phone_dial: String,
    /// Phone number as displayed
    pub phone_display: String,
}

impl Office {
    /// Krakow office
    #[must_use]
    pub fn poland() -> Self {
        Self {
            country: "Poland".into(),
            company: "BTCBIT Sp. z o.o.".into(),
            street: "Ul. Gesia 8 - 205, 31-535 ".into(),
            city: "Krakow, Poland".into(),
            registration_number: "369827363".into(),
            phone_dial: "+48588813222".into(),
            phone_display: "+48 588 813 222".into(),
        }
    }

    /// Tallinn office
    #[must_use]
    pub fn estonia() -> Self {
        Self {
            country: "Estonia".into(),
            company: "BTCBIT OÜ".into(),
            street: "Pikk tn 33-3, 10133".into(),
            city: "Tallinn, Estonia".into(),
            registration_number: "16121208".into(),
            phone_dial: "+3728803222".into(),
            phone_display: "+372 8 803 222".into(),
        }
    }

    /// Section heading
    #[must_use]
    pub fn header(&self) -> LogicalElement {
        LogicalElement::new(
            format!("{} office header", self.country),
            LocatorCandidate::xpath(format!("//h2[text()='{}']", self.country)),
        )
    }

    /// Address lines that only need to be visible
    #[must_use]
    pub fn lines(&self) -> Vec<LogicalElement> {
        vec![
            LogicalElement::new(
                format!("{} company name", self.country),
                LocatorCandidate::xpath(format!("//h3[contains(text(), '{}')]", self.company)),
            ),
            LogicalElement::new(
                format!("{} address company line", self.country),
                LocatorCandidate::xpath(format!("//h3[contains(.,'{} ')]", self.company)),
            ),
            LogicalElement::new(
                format!("{} address street line", self.country),
                LocatorCandidate::xpath(format!("//h3[contains(.,'{}')]", self.street)),
            ),
            LogicalElement::new(
                format!("{} address city line", self.country),
                LocatorCandidate::xpath(format!("//h3[contains(.,'{}')]", self.city)),
            ),
        ]
    }

    /// Registration number paragraph
    #[must_use]
    pub fn registration(&self) -> LogicalElement {
        LogicalElement::new(
            format!("{} registration number", self.country),
            LocatorCandidate::xpath(format!(
                "//div//p[contains(text(), '{}')]",
                self.registration_number
            )),
        )
    }

    /// Phone link
    #[must_use]
    pub fn phone(&self) -> LogicalElement {
        LogicalElement::new(
            format!("{} phone", self.country),
            LocatorCandidate::xpath(format!("//li/a[@href='tel:{}']", self.phone_dial)),
        )
    }
}

/// Result of checking one office section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfficeReport {
    /// Elements that never became visible
    pub missing: Vec<String>,
    /// Elements whose text did not contain the expected value
    pub mismatched: Vec<String>,
}

impl OfficeReport {
    /// Whether every detail was found with the right text
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }
}

/// Contacts page
#[derive(Debug, Clone)]
pub struct ContactsPage {
    url: String,
}

impl ContactsPage {
    /// Contacts page of `site`
    #[must_use]
    pub fn new(site: &Site) -> Self {
        Self {
            url: site.url("/contacts/"),
        }
    }

    /// Scroll to the office section and check every published detail
    pub fn check_office<D: BrowserDriver>(&self, session: &mut Session<D>, office: &Office) -> OfficeReport {
        let mut report = OfficeReport::default();
        let header = office.header();
        if let Err(err) = session.scroll_to(&header) {
            warn!(office = %office.country, error = %err, "office section not found");
            report.missing.push(header.name().to_string());
            return report;
        }

        for line in office.lines() {
            if !session.wait_until_displayed(&line) {
                report.missing.push(line.name().to_string());
            }
        }

        let expected_text = [
            (office.registration(), office.registration_number.as_str()),
            (office.phone(), office.phone_display.as_str()),
        ];
        for (element, expected) in expected_text {
            match session.get_text(&element) {
                Ok(text) if text.contains(expected) => {}
                Ok(text) => {
                    warn!(element = element.name(), expected, actual = %text, "office detail mismatch");
                    report.mismatched.push(element.name().to_string());
                }
                Err(_) => report.missing.push(element.name().to_string()),
            }
        }

        if report.is_complete() {
            info!(office = %office.country, "office details verified");
        } else {
            warn!(office = %office.country, ?report, "office details incomplete");
        }
        report
    }

    /// [`Self::check_office`] as a flag
    pub fn verify_office<D: BrowserDriver>(&self, session: &mut Session<D>, office: &Office) -> bool {
        self.check_office(session, office).is_complete()
    }
}

impl PageObject for ContactsPage {
    fn page_name(&self) -> &'static str {
        "contacts"
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

    /// Render `office` with the phone shown as `phone_text`
    fn render(driver: &MockDriver, office: &Office, phone_text: &str) {
        driver.add_element(MockElement::new(office.header().candidates()[0].clone()));
        for line in office.lines() {
            driver.add_element(MockElement::new(line.candidates()[0].clone()));
        }
        driver.add_element(
            MockElement::new(office.registration().candidates()[0].clone())
                .with_text(format!("Reg. number: {}", office.registration_number)),
        );
        driver.add_element(MockElement::new(office.phone().candidates()[0].clone()).with_text(phone_text));
    }

    fn page() -> ContactsPage {
        ContactsPage::new(&Site::new("https://site"))
    }

    fn session(driver: MockDriver) -> Session<MockDriver> {
        Session::new(driver, InteractionConfig::fast())
    }

    #[test]
    fn test_both_offices_verified() {
        let driver = MockDriver::new("https://site/contacts/");
        render(&driver, &Office::poland(), "+48 588 813 222");
        render(&driver, &Office::estonia(), "+372 8 803 222");
        let mut session = session(driver);
        assert!(page().is_loaded(&session));
        assert!(page().verify_office(&mut session, &Office::poland()));
        assert!(page().verify_office(&mut session, &Office::estonia()));
        assert_eq!(session.driver().call_count("scroll #"), 2);
    }

    #[test]
    fn test_phone_text_mismatch() {
        let driver = MockDriver::new("https://site/contacts/");
        render(&driver, &Office::poland(), "+48 000 000 000");
        let report = page().check_office(&mut session(driver), &Office::poland());
        assert!(report.missing.is_empty());
        assert_eq!(report.mismatched, ["Poland phone"]);
    }

    #[test]
    fn test_missing_section_stops_early() {
        let report = page().check_office(&mut session(MockDriver::new("https://site/contacts/")), &Office::estonia());
        assert_eq!(report.missing, ["Estonia office header"]);
    }

    #[test]
    fn test_selectors_match_published_markup() {
        let poland = Office::poland();
        assert_eq!(poland.header().candidates()[0].selector, "//h2[text()='Poland']");
        assert_eq!(
            poland.lines()[1].candidates()[0].selector,
            "//h3[contains(.,'BTCBIT Sp. z o.o. ')]"
        );
        assert_eq!(poland.phone().candidates()[0].selector, "//li/a[@href='tel:+48588813222']");
        assert_eq!(
            Office::estonia().registration().candidates()[0].selector,
            "//div//p[contains(text(), '16121208')]"
        );
    }
}
