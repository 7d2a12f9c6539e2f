//! WebDriver-backed browser engine.
//!
//! Talks to a chromedriver endpoint through thirtyfour. Each automaton
//! session maps to one WebDriver session; frame-scoped selectors switch
//! into the frame for the duration of a single operation and always
//! restore the default content afterwards.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use portal_flow::{
    BrowserEngine, BrowserSession, PortalError, Result, Selector, SessionOptions, Settle,
};
use thirtyfour::components::SelectElement;
use thirtyfour::prelude::*;
use thirtyfour::ChromeCapabilities;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const CONNECT_ATTEMPTS: usize = 3;
const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(500);
const QUERY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const SETTLE_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct WebDriverEngine {
    server_url: String,
}

impl WebDriverEngine {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
        }
    }

    fn capabilities(options: &SessionOptions) -> Result<ChromeCapabilities> {
        let mut caps = DesiredCapabilities::chrome();
        let mut args = options.launch_args.clone();
        if options.headless {
            args.push("--headless=new".to_string());
        }
        args.push(format!("--user-agent={}", options.user_agent));
        for arg in &args {
            caps.add_arg(arg)
                .map_err(|e| PortalError::Launch(format!("chrome arg {arg:?}: {e}")))?;
        }
        Ok(caps)
    }
}

#[async_trait]
impl BrowserEngine for WebDriverEngine {
    async fn open_session(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>> {
        let caps = Self::capabilities(options)?;

        let mut driver = None;
        for attempt in 1..=CONNECT_ATTEMPTS {
            match WebDriver::new(&self.server_url, caps.clone()).await {
                Ok(d) => {
                    driver = Some(d);
                    break;
                }
                Err(e) if attempt < CONNECT_ATTEMPTS => {
                    warn!(attempt, error = %e, "webdriver connection failed, retrying");
                    tokio::time::sleep(CONNECT_RETRY_DELAY).await;
                }
                Err(e) => {
                    return Err(PortalError::Launch(format!(
                        "webdriver at {}: {e}",
                        self.server_url
                    )));
                }
            }
        }
        let driver = driver.expect("driver set on the successful attempt");

        let timeouts = TimeoutConfiguration::new(
            Some(options.timeout),
            Some(options.timeout),
            Some(options.timeout),
        );
        driver
            .update_timeouts(timeouts)
            .await
            .map_err(|e| PortalError::Launch(format!("webdriver timeouts: {e}")))?;

        Ok(Box::new(WebDriverSession {
            driver: Mutex::new(Some(driver)),
        }))
    }
}

pub struct WebDriverSession {
    /// Taken on close so that a second close is a no-op.
    driver: Mutex<Option<WebDriver>>,
}

/// Selector broken into the frames to enter and the locator to run inside
/// the innermost one.
fn flatten(selector: &Selector) -> (Vec<&str>, By) {
    let mut frames = Vec::new();
    let mut current = selector;
    loop {
        match current {
            Selector::Css(css) => return (frames, By::Css(css.as_ref())),
            // Text needles carry apostrophes, so the XPath literal is
            // double-quoted.
            Selector::Text(text) => {
                let xpath = format!(r#"//*[text()[contains(., "{text}")]]"#);
                return (frames, By::XPath(xpath.as_str()));
            }
            Selector::InFrame { frame, inner } => {
                frames.push(frame.as_ref());
                current = inner;
            }
        }
    }
}

fn interaction(selector: &Selector, err: impl std::fmt::Display) -> PortalError {
    PortalError::Interaction {
        selector: selector.to_string(),
        message: err.to_string(),
    }
}

impl WebDriverSession {
    async fn driver(&self) -> Result<WebDriver> {
        self.driver
            .lock()
            .await
            .clone()
            .ok_or_else(|| PortalError::Navigation("session already closed".to_string()))
    }

    async fn enter_frames(&self, driver: &WebDriver, frames: &[&str]) -> WebDriverResult<bool> {
        for frame in frames {
            let found = driver.find_all(By::Css(*frame)).await?;
            match found.into_iter().next() {
                Some(elem) => elem.enter_frame().await?,
                None => {
                    driver.enter_default_frame().await?;
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    async fn leave_frames(&self, driver: &WebDriver, frames: &[&str]) {
        if !frames.is_empty() {
            if let Err(e) = driver.enter_default_frame().await {
                debug!(error = %e, "could not restore default frame");
            }
        }
    }

    /// Locate the element, run `op` on it inside its frame, restore the
    /// default content. Missing frames and missing elements are errors.
    async fn with_element<T, F, Fut>(&self, selector: &Selector, op: F) -> Result<T>
    where
        F: FnOnce(WebDriver, WebElement) -> Fut + Send,
        Fut: std::future::Future<Output = WebDriverResult<T>> + Send,
        T: Send,
    {
        let driver = self.driver().await?;
        let (frames, by) = flatten(selector);
        let entered = self
            .enter_frames(&driver, &frames)
            .await
            .map_err(|e| interaction(selector, e))?;
        if !entered {
            return Err(interaction(selector, "containing frame not found"));
        }
        let result = match driver.find(by).await {
            Ok(elem) => op(driver.clone(), elem).await,
            Err(e) => {
                self.leave_frames(&driver, &frames).await;
                return Err(interaction(selector, e));
            }
        };
        self.leave_frames(&driver, &frames).await;
        result.map_err(|e| interaction(selector, e))
    }

    /// Non-failing variant for classification probes: absent frames or
    /// elements yield `default` instead of an error.
    async fn probe<T, F, Fut>(&self, selector: &Selector, default: T, op: F) -> Result<T>
    where
        F: FnOnce(Vec<WebElement>) -> Fut + Send,
        Fut: std::future::Future<Output = WebDriverResult<T>> + Send,
        T: Send,
    {
        let driver = self.driver().await?;
        let (frames, by) = flatten(selector);
        let entered = self
            .enter_frames(&driver, &frames)
            .await
            .map_err(|e| interaction(selector, e))?;
        if !entered {
            return Ok(default);
        }
        let result = match driver.find_all(by).await {
            Ok(found) if found.is_empty() => Ok(default),
            Ok(found) => op(found).await.map_err(|e| interaction(selector, e)),
            Err(e) => Err(interaction(selector, e)),
        };
        self.leave_frames(&driver, &frames).await;
        result
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn goto(&self, url: &str, settle: Settle) -> Result<()> {
        let driver = self.driver().await?;
        driver
            .goto(url)
            .await
            .map_err(|e| PortalError::Navigation(format!("{url}: {e}")))?;
        self.wait_settle(settle, Duration::from_secs(60)).await
    }

    async fn click(&self, selector: &Selector) -> Result<()> {
        self.with_element(selector, |_, elem| async move { elem.click().await })
            .await
    }

    async fn fill(&self, selector: &Selector, value: &str) -> Result<()> {
        let value = value.to_string();
        self.with_element(selector, |_, elem| async move {
            elem.clear().await?;
            elem.send_keys(value.as_str()).await
        })
        .await
    }

    async fn select_value(&self, selector: &Selector, value: &str) -> Result<()> {
        let value = value.to_string();
        self.with_element(selector, |_, elem| async move {
            SelectElement::new(&elem).await?.select_by_value(&value).await
        })
        .await
    }

    async fn set_checked(&self, selector: &Selector) -> Result<()> {
        self.with_element(selector, |_, elem| async move {
            if !elem.is_selected().await? {
                elem.click().await?;
            }
            Ok(())
        })
        .await
    }

    async fn is_visible(&self, selector: &Selector) -> Result<bool> {
        self.probe(selector, false, |found| async move {
            found[0].is_displayed().await
        })
        .await
    }

    async fn count(&self, selector: &Selector) -> Result<usize> {
        self.probe(selector, 0, |found| async move { Ok(found.len()) })
            .await
    }

    async fn inner_text(&self, selector: &Selector) -> Result<String> {
        self.probe(selector, String::new(), |found| async move {
            found[0].text().await
        })
        .await
    }

    async fn eval(&self, selector: &Selector, script: &str) -> Result<()> {
        let script = script.to_string();
        self.with_element(selector, |driver, elem| async move {
            driver.execute(&script, vec![elem.to_json()?]).await?;
            Ok(())
        })
        .await
    }

    async fn wait_visible(&self, selector: &Selector, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.is_visible(selector).await? {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PortalError::Timeout(selector.to_string()));
            }
            tokio::time::sleep(QUERY_POLL_INTERVAL).await;
        }
    }

    async fn wait_settle(&self, settle: Settle, timeout: Duration) -> Result<()> {
        let driver = self.driver().await?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let ready: String = driver
                .execute("return document.readyState", vec![])
                .await
                .and_then(|r| r.convert())
                .unwrap_or_default();
            if ready == "complete" {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PortalError::Timeout("document.readyState".to_string()));
            }
            tokio::time::sleep(SETTLE_POLL_INTERVAL).await;
        }
        // WebDriver exposes no network instrumentation; approximate idle
        // with a grace period after the document settles.
        if settle == Settle::NetworkIdle {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        Ok(())
    }

    async fn screenshot(&self, path: &Path) -> Result<()> {
        let driver = self.driver().await?;
        let png = driver
            .screenshot_as_png()
            .await
            .map_err(|e| PortalError::Navigation(format!("screenshot: {e}")))?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let taken = self.driver.lock().await.take();
        if let Some(driver) = taken {
            driver
                .quit()
                .await
                .map_err(|e| PortalError::Navigation(format!("quit: {e}")))?;
        }
        Ok(())
    }
}
