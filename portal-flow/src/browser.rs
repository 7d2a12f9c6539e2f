use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Locator expression understood by the browser engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector.
    Css(Cow<'static, str>),
    /// Match an element by its text content.
    Text(Cow<'static, str>),
    /// Selector scoped inside a nested frame located by a CSS selector.
    InFrame {
        frame: Cow<'static, str>,
        inner: Box<Selector>,
    },
}

impl Selector {
    pub fn css(selector: impl Into<Cow<'static, str>>) -> Self {
        Selector::Css(selector.into())
    }

    pub fn text(text: impl Into<Cow<'static, str>>) -> Self {
        Selector::Text(text.into())
    }

    pub fn in_frame(frame: impl Into<Cow<'static, str>>, inner: Selector) -> Self {
        Selector::InFrame {
            frame: frame.into(),
            inner: Box::new(inner),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(css) => write!(f, "{css}"),
            Selector::Text(text) => write!(f, "text={text}"),
            Selector::InFrame { frame, inner } => write!(f, "{frame} >> {inner}"),
        }
    }
}

/// Page settling condition after a navigation or submit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settle {
    /// The document finished loading.
    Load,
    /// Network activity has quiesced.
    NetworkIdle,
}

/// Options applied when opening a browser session.
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub headless: bool,
    pub user_agent: String,
    pub launch_args: Vec<String>,
    /// Default timeout for page operations.
    pub timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: false,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36"
                .to_string(),
            launch_args: vec!["--disable-redirect-limits".to_string()],
            timeout: Duration::from_secs(60),
        }
    }
}

/// One live browser session (context + active page), owned exclusively by a
/// single automaton. Sessions are created at the top of each outer-loop
/// iteration and torn down at the bottom, never reused.
///
/// Contract notes:
/// * `is_visible` and `count` return `Ok` for absent elements.
/// * `inner_text` returns an empty string when the element is absent.
/// * `eval` runs an inline page script against the located element.
/// * `close` must be idempotent: closing an already-closed session is a
///   no-op, never an error.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn goto(&self, url: &str, settle: Settle) -> Result<()>;
    async fn click(&self, selector: &Selector) -> Result<()>;
    async fn fill(&self, selector: &Selector, value: &str) -> Result<()>;
    async fn select_value(&self, selector: &Selector, value: &str) -> Result<()>;
    async fn set_checked(&self, selector: &Selector) -> Result<()>;
    async fn is_visible(&self, selector: &Selector) -> Result<bool>;
    async fn count(&self, selector: &Selector) -> Result<usize>;
    async fn inner_text(&self, selector: &Selector) -> Result<String>;
    async fn eval(&self, selector: &Selector, script: &str) -> Result<()>;
    async fn wait_visible(&self, selector: &Selector, timeout: Duration) -> Result<()>;
    async fn wait_settle(&self, settle: Settle, timeout: Duration) -> Result<()>;
    async fn screenshot(&self, path: &Path) -> Result<()>;
    async fn close(&self) -> Result<()>;
}

/// Factory for isolated browser sessions. The engine itself (WebDriver,
/// CDP, ...) is an external collaborator behind this seam.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    async fn open_session(&self, options: &SessionOptions) -> Result<Box<dyn BrowserSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_display() {
        assert_eq!(Selector::css("#btn").to_string(), "#btn");
        assert_eq!(Selector::text("Rechercher").to_string(), "text=Rechercher");
        let framed = Selector::in_frame("iframe[src*='hub']", Selector::css("button#confirm"));
        assert_eq!(framed.to_string(), "iframe[src*='hub'] >> button#confirm");
    }
}
