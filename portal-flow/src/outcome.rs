use std::borrow::Cow;

use crate::browser::{BrowserSession, Selector};
use crate::error::Result;

/// What one poll iteration observed on the results page. Recomputed every
/// iteration; no identity is carried between polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    NoSlotAvailable,
    SlotFound,
    TransientError,
    Unparseable,
}

/// A single observable page condition.
#[derive(Clone, Debug)]
pub enum Probe {
    /// The element is present and visible.
    Visible(Selector),
    /// At least one matching element exists.
    Present(Selector),
    /// The text content of `scope` contains `needle`.
    TextContains {
        scope: Selector,
        needle: Cow<'static, str>,
    },
}

impl Probe {
    pub async fn matches(&self, session: &dyn BrowserSession) -> Result<bool> {
        match self {
            Probe::Visible(selector) => session.is_visible(selector).await,
            Probe::Present(selector) => Ok(session.count(selector).await? > 0),
            Probe::TextContains { scope, needle } => {
                Ok(session.inner_text(scope).await?.contains(needle.as_ref()))
            }
        }
    }
}

/// Per-portal marker lists driving classification.
#[derive(Clone, Debug, Default)]
pub struct MarkerSet {
    pub no_slot: Vec<Probe>,
    pub slot_found: Vec<Probe>,
    pub error_banner: Vec<Probe>,
}

/// Classify the current page into exactly one [`Outcome`].
///
/// Order matters: the no-slot and slot-found markers are mutually exclusive
/// by construction of the target pages, but the error banner can co-occur
/// with stale no-slot text, so the banner is checked last before falling
/// through to [`Outcome::Unparseable`].
pub async fn classify(session: &dyn BrowserSession, markers: &MarkerSet) -> Result<Outcome> {
    for probe in &markers.no_slot {
        if probe.matches(session).await? {
            return Ok(Outcome::NoSlotAvailable);
        }
    }
    for probe in &markers.slot_found {
        if probe.matches(session).await? {
            return Ok(Outcome::SlotFound);
        }
    }
    for probe in &markers.error_banner {
        if probe.matches(session).await? {
            return Ok(Outcome::TransientError);
        }
    }
    Ok(Outcome::Unparseable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Settle;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::path::Path;
    use std::time::Duration;

    /// Page stub: a set of visible selectors plus a body text.
    struct PageStub {
        visible: HashSet<String>,
        body: String,
    }

    impl PageStub {
        fn new(visible: &[&str], body: &str) -> Self {
            Self {
                visible: visible.iter().map(|s| s.to_string()).collect(),
                body: body.to_string(),
            }
        }
    }

    #[async_trait]
    impl BrowserSession for PageStub {
        async fn goto(&self, _url: &str, _settle: Settle) -> Result<()> {
            Ok(())
        }
        async fn click(&self, _selector: &Selector) -> Result<()> {
            Ok(())
        }
        async fn fill(&self, _selector: &Selector, _value: &str) -> Result<()> {
            Ok(())
        }
        async fn select_value(&self, _selector: &Selector, _value: &str) -> Result<()> {
            Ok(())
        }
        async fn set_checked(&self, _selector: &Selector) -> Result<()> {
            Ok(())
        }
        async fn is_visible(&self, selector: &Selector) -> Result<bool> {
            Ok(self.visible.contains(&selector.to_string()))
        }
        async fn count(&self, selector: &Selector) -> Result<usize> {
            Ok(usize::from(self.visible.contains(&selector.to_string())))
        }
        async fn inner_text(&self, _selector: &Selector) -> Result<String> {
            Ok(self.body.clone())
        }
        async fn eval(&self, _selector: &Selector, _script: &str) -> Result<()> {
            Ok(())
        }
        async fn wait_visible(&self, _selector: &Selector, _timeout: Duration) -> Result<()> {
            Ok(())
        }
        async fn wait_settle(&self, _settle: Settle, _timeout: Duration) -> Result<()> {
            Ok(())
        }
        async fn screenshot(&self, _path: &Path) -> Result<()> {
            Ok(())
        }
        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn markers() -> MarkerSet {
        MarkerSet {
            no_slot: vec![
                Probe::Visible(Selector::css("#no-slots")),
                Probe::TextContains {
                    scope: Selector::css("body"),
                    needle: "Aucun rendez-vous".into(),
                },
            ],
            slot_found: vec![Probe::Visible(Selector::css("#clinic-list"))],
            error_banner: vec![Probe::Present(Selector::css("div.t-alert-content"))],
        }
    }

    #[tokio::test]
    async fn no_slot_wins_even_with_stale_error_text() {
        let page = PageStub::new(&["#no-slots", "div.t-alert-content"], "");
        let outcome = classify(&page, &markers()).await.unwrap();
        assert_eq!(outcome, Outcome::NoSlotAvailable);
    }

    #[tokio::test]
    async fn slot_found_precedes_the_error_banner() {
        let page = PageStub::new(&["#clinic-list", "div.t-alert-content"], "");
        let outcome = classify(&page, &markers()).await.unwrap();
        assert_eq!(outcome, Outcome::SlotFound);
    }

    #[tokio::test]
    async fn banner_alone_is_transient() {
        let page = PageStub::new(&["div.t-alert-content"], "");
        let outcome = classify(&page, &markers()).await.unwrap();
        assert_eq!(outcome, Outcome::TransientError);
    }

    #[tokio::test]
    async fn nothing_matching_is_unparseable() {
        let page = PageStub::new(&[], "something else entirely");
        let outcome = classify(&page, &markers()).await.unwrap();
        assert_eq!(outcome, Outcome::Unparseable);
    }

    #[tokio::test]
    async fn text_markers_match_page_text() {
        let page = PageStub::new(&[], "Aucun rendez-vous ne correspond");
        let outcome = classify(&page, &markers()).await.unwrap();
        assert_eq!(outcome, Outcome::NoSlotAvailable);
    }
}
