//! Scripted in-memory browser for unit and scenario tests.
//!
//! A [`MockDriver`] holds a list of [`MockElement`]s keyed by locator
//! candidate. Each element can be hidden, disabled, delayed, occluded, or
//! wired to navigate when clicked, which is enough to exercise every branch
//! of the resolver and the action executor without a browser.
//!
//! Every driver call is appended to a textual history (`"find css `a`"`,
//! `"click #2"`, `"scroll #2"`, `"script-click #2"`, ...) for verification.

use crate::driver::{BrowserDriver, DriverError, DriverResult};
use crate::locator::LocatorCandidate;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// What a native click does to a mock element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickBehavior {
    /// Click registers
    #[default]
    Ok,
    /// Click is rejected as not interactable (e.g. covered by an overlay)
    NotInteractable,
    /// Click is accepted but has no effect
    Ignored,
}

/// A scripted element
#[derive(Debug, Clone)]
pub struct MockElement {
    candidate: LocatorCandidate,
    page: Option<String>,
    displayed: bool,
    enabled: bool,
    text: String,
    appears_after: Duration,
    click: ClickBehavior,
    script_click_works: bool,
    navigates_to: Option<String>,
    navigation_delay: Duration,
}

impl MockElement {
    /// Visible, enabled element matched by `candidate`
    #[must_use]
    pub fn new(candidate: LocatorCandidate) -> Self {
        Self {
            candidate,
            page: None,
            displayed: true,
            enabled: true,
            text: String::new(),
            appears_after: Duration::ZERO,
            click: ClickBehavior::Ok,
            script_click_works: true,
            navigates_to: None,
            navigation_delay: Duration::ZERO,
        }
    }

    /// Only present while the current URL contains `url_fragment`
    #[must_use]
    pub fn on_page(mut self, url_fragment: impl Into<String>) -> Self {
        self.page = Some(url_fragment.into());
        self
    }

    /// Present in the DOM but not rendered
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    /// Rendered but disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Visible text
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Absent until `delay` after the current page loaded
    #[must_use]
    pub const fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = delay;
        self
    }

    /// Native click behaviour
    #[must_use]
    pub const fn with_click(mut self, behavior: ClickBehavior) -> Self {
        self.click = behavior;
        self
    }

    /// Script-injected clicks throw
    #[must_use]
    pub const fn script_click_fails(mut self) -> Self {
        self.script_click_works = false;
        self
    }

    /// A registered click navigates to `url`
    #[must_use]
    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.navigates_to = Some(url.into());
        self
    }

    /// Navigation triggered by a click lands after `delay`
    #[must_use]
    pub const fn with_navigation_delay(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    fn matches(&self, candidate: &LocatorCandidate) -> bool {
        self.candidate.strategy == candidate.strategy && self.candidate.selector == candidate.selector
    }
}

/// Element reference handed out by [`MockDriver`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockHandle {
    id: usize,
    generation: u64,
}

impl MockHandle {
    /// Index of the element in registration order
    #[must_use]
    pub const fn id(&self) -> usize {
        self.id
    }
}

#[derive(Debug)]
struct MockState {
    url: String,
    generation: u64,
    loaded_at: Instant,
    elements: Vec<MockElement>,
    values: Vec<String>,
    invalid: HashSet<String>,
    pending_navigation: Option<(String, Instant)>,
    registered_clicks: Vec<usize>,
    history: Vec<String>,
}

impl MockState {
    fn settle_navigation(&mut self) {
        if let Some((url, at)) = &self.pending_navigation {
            if Instant::now() >= *at {
                let url = url.clone();
                self.pending_navigation = None;
                self.load(url);
            }
        }
    }

    fn load(&mut self, url: String) {
        self.url = url;
        self.generation += 1;
        self.loaded_at = Instant::now();
    }

    fn is_present(&self, element: &MockElement) -> bool {
        let on_page = element
            .page
            .as_ref()
            .map_or(true, |fragment| self.url.contains(fragment.as_str()));
        on_page && self.loaded_at.elapsed() >= element.appears_after
    }

    fn element(&self, handle: &MockHandle) -> DriverResult<&MockElement> {
        if handle.generation != self.generation {
            return Err(DriverError::stale(format!(
                "element #{} belongs to page generation {}",
                handle.id, handle.generation
            )));
        }
        self.elements
            .get(handle.id)
            .ok_or_else(|| DriverError::stale(format!("element #{} detached", handle.id)))
    }

    fn register_click(&mut self, id: usize) {
        self.registered_clicks.push(id);
        let Some(element) = self.elements.get(id) else {
            return;
        };
        if let Some(url) = element.navigates_to.clone() {
            let delay = element.navigation_delay;
            if delay.is_zero() {
                self.load(url);
            } else {
                self.pending_navigation = Some((url, Instant::now() + delay));
            }
        }
    }
}

/// Scripted browser implementing [`BrowserDriver`]
#[derive(Debug)]
pub struct MockDriver {
    state: Mutex<MockState>,
}

impl MockDriver {
    /// Create a driver showing `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(MockState {
                url: url.into(),
                generation: 1,
                loaded_at: Instant::now(),
                elements: Vec::new(),
                values: Vec::new(),
                invalid: HashSet::new(),
                pending_navigation: None,
                registered_clicks: Vec::new(),
                history: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an element
    pub fn add_element(&self, element: MockElement) {
        let mut state = self.state();
        state.elements.push(element);
        state.values.push(String::new());
    }

    /// Builder form of [`Self::add_element`]
    #[must_use]
    pub fn with_element(self, element: MockElement) -> Self {
        self.add_element(element);
        self
    }

    /// Make lookups of `selector` fail with a syntax error
    pub fn mark_invalid(&self, selector: impl Into<String>) {
        self.state().invalid.insert(selector.into());
    }

    /// Replace the current document after `delay`
    pub fn schedule_navigation(&self, url: impl Into<String>, delay: Duration) {
        self.state().pending_navigation = Some((url.into(), Instant::now() + delay));
    }

    /// Recorded calls, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state().history.clone()
    }

    /// Whether any recorded call starts with `prefix`
    #[must_use]
    pub fn was_called(&self, prefix: &str) -> bool {
        self.state().history.iter().any(|c| c.starts_with(prefix))
    }

    /// Number of recorded calls starting with `prefix`
    #[must_use]
    pub fn call_count(&self, prefix: &str) -> usize {
        self.state()
            .history
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    /// Whether any lookup was issued for `selector`
    #[must_use]
    pub fn was_looked_up(&self, selector: &str) -> bool {
        self.state()
            .history
            .iter()
            .any(|c| c.starts_with("find ") && c.ends_with(&format!("`{selector}`")))
    }

    /// Clicks (native or scripted) that took effect on the element matched
    /// by `selector`
    #[must_use]
    pub fn registered_clicks(&self, selector: &str) -> usize {
        let state = self.state();
        state
            .registered_clicks
            .iter()
            .filter(|id| {
                state
                    .elements
                    .get(**id)
                    .is_some_and(|e| e.candidate.selector == selector)
            })
            .count()
    }

    /// Text typed into the element matched by `selector`
    #[must_use]
    pub fn typed_text(&self, selector: &str) -> Option<String> {
        let state = self.state();
        state
            .elements
            .iter()
            .position(|e| e.candidate.selector == selector)
            .and_then(|id| state.values.get(id).cloned())
    }
}

impl BrowserDriver for MockDriver {
    type Element = MockHandle;

    fn find_element(&self, candidate: &LocatorCandidate) -> DriverResult<Option<MockHandle>> {
        let mut state = self.state();
        state.settle_navigation();
        state.history.push(format!("find {candidate}"));
        if state.invalid.contains(&candidate.selector) {
            return Err(DriverError::invalid_selector(
                candidate.selector.clone(),
                "not a valid selector",
            ));
        }
        let generation = state.generation;
        let found = state
            .elements
            .iter()
            .enumerate()
            .find(|(_, e)| e.matches(candidate) && state.is_present(e))
            .map(|(id, _)| MockHandle { id, generation });
        Ok(found)
    }

    fn is_displayed(&self, element: &MockHandle) -> DriverResult<bool> {
        let mut state = self.state();
        state.settle_navigation();
        Ok(state.element(element)?.displayed)
    }

    fn is_enabled(&self, element: &MockHandle) -> DriverResult<bool> {
        let mut state = self.state();
        state.settle_navigation();
        Ok(state.element(element)?.enabled)
    }

    fn click(&self, element: &MockHandle) -> DriverResult<()> {
        let mut state = self.state();
        state.settle_navigation();
        state.history.push(format!("click #{}", element.id));
        let target = state.element(element)?;
        if !target.displayed {
            return Err(DriverError::not_interactable("element is not rendered"));
        }
        let behavior = target.click;
        match behavior {
            ClickBehavior::Ok => {
                state.register_click(element.id);
                Ok(())
            }
            ClickBehavior::NotInteractable => Err(DriverError::not_interactable(
                "another element would receive the click",
            )),
            ClickBehavior::Ignored => Ok(()),
        }
    }

    fn send_keys(&self, element: &MockHandle, text: &str) -> DriverResult<()> {
        let mut state = self.state();
        state.settle_navigation();
        state.history.push(format!("type #{} {text}", element.id));
        let target = state.element(element)?;
        if !target.displayed || !target.enabled {
            return Err(DriverError::not_interactable("element cannot receive input"));
        }
        if let Some(value) = state.values.get_mut(element.id) {
            value.push_str(text);
        }
        Ok(())
    }

    fn text(&self, element: &MockHandle) -> DriverResult<String> {
        let mut state = self.state();
        state.settle_navigation();
        Ok(state.element(element)?.text.clone())
    }

    fn execute_script(&self, script: &str, element: &MockHandle) -> DriverResult<()> {
        let mut state = self.state();
        state.settle_navigation();
        let works = state.element(element)?.script_click_works;
        if script.contains("scrollIntoView") {
            state.history.push(format!("scroll #{}", element.id));
            return Ok(());
        }
        if script.contains(".click()") {
            state.history.push(format!("script-click #{}", element.id));
            if !works {
                return Err(DriverError::script("click handler threw"));
            }
            state.register_click(element.id);
            return Ok(());
        }
        state.history.push(format!("script #{}", element.id));
        Ok(())
    }

    fn current_url(&self) -> DriverResult<String> {
        let mut state = self.state();
        state.settle_navigation();
        Ok(state.url.clone())
    }

    fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.history.push(format!("navigate {url}"));
        state.pending_navigation = None;
        state.load(url.to_string());
        Ok(())
    }

    fn page_generation(&self) -> DriverResult<u64> {
        let mut state = self.state();
        state.settle_navigation();
        Ok(state.generation)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn button() -> LocatorCandidate {
        LocatorCandidate::css("button")
    }

    mod lookup_tests {
        use super::*;

        #[test]
        fn test_find_registered_element() {
            let driver = MockDriver::new("https://site/").with_element(MockElement::new(button()));
            assert!(driver.find_element(&button()).unwrap().is_some());
            assert!(driver.was_looked_up("button"));
        }

        #[test]
        fn test_missing_element_is_none() {
            let driver = MockDriver::new("https://site/");
            assert!(driver.find_element(&button()).unwrap().is_none());
        }

        #[test]
        fn test_invalid_selector_errors() {
            let driver = MockDriver::new("https://site/");
            driver.mark_invalid("div[");
            let err = driver.find_element(&LocatorCandidate::css("div[")).unwrap_err();
            assert!(err.is_permanent());
        }

        #[test]
        fn test_page_scoped_elements() {
            let mut driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(button()).on_page("/sign_in"));
            assert!(driver.find_element(&button()).unwrap().is_none());
            driver.navigate("https://site/sign_in/").unwrap();
            assert!(driver.find_element(&button()).unwrap().is_some());
        }

        #[test]
        fn test_delayed_element() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(button()).appears_after(Duration::from_millis(30)));
            assert!(driver.find_element(&button()).unwrap().is_none());
            std::thread::sleep(Duration::from_millis(40));
            assert!(driver.find_element(&button()).unwrap().is_some());
        }
    }

    mod interaction_tests {
        use super::*;

        #[test]
        fn test_click_registers_and_navigates() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(button()).navigates_to("https://site/next"));
            let handle = driver.find_element(&button()).unwrap().unwrap();
            driver.click(&handle).unwrap();
            assert_eq!(driver.current_url().unwrap(), "https://site/next");
            assert_eq!(driver.registered_clicks("button"), 1);
            assert_eq!(driver.page_generation().unwrap(), 2);
        }

        #[test]
        fn test_ignored_click_has_no_effect() {
            let driver = MockDriver::new("https://site/").with_element(
                MockElement::new(button())
                    .with_click(ClickBehavior::Ignored)
                    .navigates_to("https://site/next"),
            );
            let handle = driver.find_element(&button()).unwrap().unwrap();
            driver.click(&handle).unwrap();
            assert_eq!(driver.current_url().unwrap(), "https://site/");
            assert_eq!(driver.registered_clicks("button"), 0);
        }

        #[test]
        fn test_occluded_click_fails_but_script_click_works() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(button()).with_click(ClickBehavior::NotInteractable));
            let handle = driver.find_element(&button()).unwrap().unwrap();
            assert!(matches!(
                driver.click(&handle),
                Err(DriverError::NotInteractable { .. })
            ));
            driver.execute_script("this.click();", &handle).unwrap();
            assert_eq!(driver.registered_clicks("button"), 1);
        }

        #[test]
        fn test_send_keys_accumulates() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css("input")));
            let handle = driver.find_element(&LocatorCandidate::css("input")).unwrap().unwrap();
            driver.send_keys(&handle, "abc").unwrap();
            driver.send_keys(&handle, "def").unwrap();
            assert_eq!(driver.typed_text("input").unwrap(), "abcdef");
        }

        #[test]
        fn test_disabled_input_rejects_keys() {
            let driver = MockDriver::new("https://site/")
                .with_element(MockElement::new(LocatorCandidate::css("input")).disabled());
            let handle = driver.find_element(&LocatorCandidate::css("input")).unwrap().unwrap();
            assert!(driver.send_keys(&handle, "x").is_err());
        }

        #[test]
        fn test_stale_handle_after_navigation() {
            let mut driver = MockDriver::new("https://site/").with_element(MockElement::new(button()));
            let handle = driver.find_element(&button()).unwrap().unwrap();
            driver.navigate("https://site/other").unwrap();
            assert!(matches!(
                driver.click(&handle),
                Err(DriverError::StaleElement { .. })
            ));
        }

        #[test]
        fn test_scheduled_navigation() {
            let driver = MockDriver::new("https://site/");
            driver.schedule_navigation("https://site/later", Duration::from_millis(20));
            assert_eq!(driver.current_url().unwrap(), "https://site/");
            std::thread::sleep(Duration::from_millis(30));
            assert_eq!(driver.current_url().unwrap(), "https://site/later");
        }

        #[test]
        fn test_history_records_calls() {
            let driver = MockDriver::new("https://site/").with_element(MockElement::new(button()));
            let handle = driver.find_element(&button()).unwrap().unwrap();
            driver
                .execute_script("this.scrollIntoView({block: 'center'});", &handle)
                .unwrap();
            driver.click(&handle).unwrap();
            assert_eq!(
                driver.history(),
                vec!["find css `button`", "scroll #0", "click #0"]
            );
            assert_eq!(driver.call_count("click"), 1);
            assert!(driver.was_called("scroll"));
        }
    }
}
