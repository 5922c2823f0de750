//! Chromium driver over the Chrome DevTools Protocol.
//!
//! [`CdpDriver`] implements [`BrowserDriver`] with chromiumoxide. It owns a
//! small tokio runtime and blocks on each protocol call, so the resolver,
//! executor and pages stay synchronous whichever driver they run on.

use crate::driver::{BrowserDriver, DriverError, DriverResult};
use crate::locator::{LocatorCandidate, Strategy};
use crate::result::{WaymarkError, WaymarkResult};
use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a window
    pub headless: bool,
    /// Window width
    pub viewport_width: u32,
    /// Window height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// Extra command-line switches
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            chromium_path: None,
            sandbox: true,
            args: vec!["--start-maximized".into(), "--disable-notifications".into()],
        }
    }
}

impl BrowserConfig {
    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Add a command-line switch
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn to_cdp(&self) -> WaymarkResult<CdpConfig> {
        let mut builder = CdpConfig::builder()
            .window_size(self.viewport_width, self.viewport_height)
            .args(self.args.clone());
        if !self.headless {
            builder = builder.with_head();
        }
        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = self.chromium_path {
            builder = builder.chrome_executable(path);
        }
        builder
            .build()
            .map_err(|message| WaymarkError::BrowserLaunch { message })
    }
}

/// Live DOM node; cheap to clone
#[derive(Debug, Clone)]
pub struct CdpElement(Arc<Element>);

const IS_DISPLAYED: &str = "function() { \
    if (!this.isConnected) { return null; } \
    const r = this.getBoundingClientRect(); \
    const s = window.getComputedStyle(this); \
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none'; }";

const IS_ENABLED: &str = "function() { \
    if (!this.isConnected) { return null; } \
    return !this.disabled; }";

const RECEIVES_CLICK: &str = "function() { \
    if (!this.isConnected) { return null; } \
    const r = this.getBoundingClientRect(); \
    const hit = document.elementFromPoint(r.left + r.width / 2, r.top + r.height / 2); \
    return hit !== null && (hit === this || this.contains(hit)); }";

/// Chromium driven through CDP
#[derive(Debug)]
pub struct CdpDriver {
    runtime: Runtime,
    browser: Browser,
    page: Page,
    handler: tokio::task::JoinHandle<()>,
}

impl CdpDriver {
    /// Launch chromium and open a blank page
    ///
    /// # Errors
    ///
    /// [`WaymarkError::BrowserLaunch`] when chromium cannot be started.
    pub fn launch(config: &BrowserConfig) -> WaymarkResult<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("waymark-cdp")
            .enable_all()
            .build()?;
        let cdp_config = config.to_cdp()?;

        let (browser, page, handler) = runtime.block_on(async {
            let (browser, mut handler) =
                Browser::launch(cdp_config)
                    .await
                    .map_err(|e| WaymarkError::BrowserLaunch {
                        message: e.to_string(),
                    })?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });
            let page = browser
                .new_page("about:blank")
                .await
                .map_err(|e| WaymarkError::BrowserLaunch {
                    message: e.to_string(),
                })?;
            Ok::<_, WaymarkError>((browser, page, handler))
        })?;

        info!(headless = config.headless, "chromium launched");
        Ok(Self {
            runtime,
            browser,
            page,
            handler,
        })
    }

    /// Close the browser
    pub fn close(mut self) -> WaymarkResult<()> {
        let closed = self.runtime.block_on(self.browser.close());
        self.handler.abort();
        closed.map(|_| ()).map_err(|e| WaymarkError::BrowserLaunch {
            message: e.to_string(),
        })
    }

    fn evaluate<T: serde::de::DeserializeOwned>(&self, expression: &str) -> DriverResult<T> {
        self.runtime.block_on(async {
            self.page
                .evaluate(expression)
                .await
                .map_err(|e| DriverError::script(e.to_string()))?
                .into_value::<T>()
                .map_err(|e| DriverError::script(e.to_string()))
        })
    }

    /// Call `function` with `this` bound to the element; `null` means the
    /// node left the document
    fn call_bool(&self, element: &CdpElement, function: &str) -> DriverResult<bool> {
        let returns = self
            .runtime
            .block_on(element.0.call_js_fn(function, false))
            .map_err(|e| stale_or_protocol(&e.to_string()))?;
        match returns.result.value {
            Some(serde_json::Value::Bool(flag)) => Ok(flag),
            Some(serde_json::Value::Null) | None => Err(DriverError::stale("node is detached")),
            Some(other) => Err(DriverError::script(format!("expected a boolean, got {other}"))),
        }
    }
}

fn stale_or_protocol(message: &str) -> DriverError {
    if message.contains("No node") || message.contains("Could not find node") {
        DriverError::stale(message)
    } else {
        DriverError::protocol(message)
    }
}

impl BrowserDriver for CdpDriver {
    type Element = CdpElement;

    fn find_element(&self, candidate: &LocatorCandidate) -> DriverResult<Option<CdpElement>> {
        let count: i64 = self.evaluate(&candidate.to_count_query())?;
        debug!(candidate = %candidate, count, "lookup");
        if count < 0 {
            return Err(DriverError::invalid_selector(
                candidate.selector.clone(),
                "document rejected the selector",
            ));
        }
        if count == 0 {
            return Ok(None);
        }
        let found = self.runtime.block_on(async {
            match (candidate.strategy, candidate.to_xpath()) {
                (Strategy::Css, _) | (_, None) => self.page.find_element(candidate.selector.as_str()).await,
                (_, Some(xpath)) => self.page.find_xpath(xpath).await,
            }
        });
        match found {
            Ok(element) => Ok(Some(CdpElement(Arc::new(element)))),
            // removed between the count and the lookup
            Err(err) => {
                warn!(candidate = %candidate, error = %err, "counted match vanished");
                Ok(None)
            }
        }
    }

    fn is_displayed(&self, element: &CdpElement) -> DriverResult<bool> {
        self.call_bool(element, IS_DISPLAYED)
    }

    fn is_enabled(&self, element: &CdpElement) -> DriverResult<bool> {
        self.call_bool(element, IS_ENABLED)
    }

    fn click(&self, element: &CdpElement) -> DriverResult<()> {
        if !self.call_bool(element, RECEIVES_CLICK)? {
            return Err(DriverError::not_interactable(
                "another element would receive the click",
            ));
        }
        self.runtime
            .block_on(element.0.click())
            .map(|_| ())
            .map_err(|e| DriverError::not_interactable(e.to_string()))
    }

    fn send_keys(&self, element: &CdpElement, text: &str) -> DriverResult<()> {
        self.runtime
            .block_on(async {
                element.0.focus().await?;
                element.0.type_str(text).await
            })
            .map(|_| ())
            .map_err(|e| DriverError::not_interactable(e.to_string()))
    }

    fn text(&self, element: &CdpElement) -> DriverResult<String> {
        self.runtime
            .block_on(element.0.inner_text())
            .map(Option::unwrap_or_default)
            .map_err(|e| stale_or_protocol(&e.to_string()))
    }

    fn execute_script(&self, script: &str, element: &CdpElement) -> DriverResult<()> {
        let function = format!("function() {{ {script} }}");
        self.runtime
            .block_on(element.0.call_js_fn(function, false))
            .map(|_| ())
            .map_err(|e| DriverError::script(e.to_string()))
    }

    fn current_url(&self) -> DriverResult<String> {
        self.runtime
            .block_on(self.page.url())
            .map(Option::unwrap_or_default)
            .map_err(|e| DriverError::protocol(e.to_string()))
    }

    fn navigate(&mut self, url: &str) -> DriverResult<()> {
        self.runtime
            .block_on(self.page.goto(url))
            .map(|_| ())
            .map_err(|e| DriverError::protocol(format!("navigation to {url} failed: {e}")))
    }

    fn page_generation(&self) -> DriverResult<u64> {
        let origin: f64 = self.evaluate("performance.timeOrigin")?;
        Ok((origin * 1000.0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_suite_window() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert_eq!((config.viewport_width, config.viewport_height), (1920, 1080));
        assert!(config.args.iter().any(|a| a == "--disable-notifications"));
    }

    #[test]
    fn test_builders() {
        let config = BrowserConfig::default()
            .with_headless(false)
            .with_no_sandbox()
            .with_viewport(1280, 720)
            .with_arg("--lang=en-US");
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.viewport_width, 1280);
        assert_eq!(config.args.last().map(String::as_str), Some("--lang=en-US"));
    }
}
