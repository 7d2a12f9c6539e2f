pub mod bonjour_sante;
pub mod rvsq;

pub use bonjour_sante::BonjourSanteFlow;
pub use rvsq::RvsqFlow;

#[cfg(test)]
pub(crate) mod testutil {
    use async_trait::async_trait;
    use portal_flow::{PortalError, Result, Selector, Settle};
    use std::collections::{HashMap, HashSet};
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Session fake for flow tests: records every operation in order and
    /// answers visibility/text queries from configured page state.
    #[derive(Default)]
    pub struct RecordingSession {
        pub ops: Mutex<Vec<String>>,
        pub visible: Mutex<HashSet<String>>,
        pub texts: Mutex<HashMap<String, String>>,
        /// Selectors whose `wait_visible` should time out.
        pub wait_timeouts: Mutex<HashSet<String>>,
    }

    impl RecordingSession {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn show(&self, selector: &str) {
            self.visible.lock().unwrap().insert(selector.to_string());
        }

        pub fn set_text(&self, selector: &str, text: &str) {
            self.texts
                .lock()
                .unwrap()
                .insert(selector.to_string(), text.to_string());
        }

        pub fn time_out_on(&self, selector: &str) {
            self.wait_timeouts
                .lock()
                .unwrap()
                .insert(selector.to_string());
        }

        pub fn ops(&self) -> Vec<String> {
            self.ops.lock().unwrap().clone()
        }

        fn record(&self, op: String) {
            self.ops.lock().unwrap().push(op);
        }
    }

    #[async_trait]
    impl portal_flow::BrowserSession for RecordingSession {
        async fn goto(&self, url: &str, _settle: Settle) -> Result<()> {
            self.record(format!("goto {url}"));
            Ok(())
        }
        async fn click(&self, selector: &Selector) -> Result<()> {
            self.record(format!("click {selector}"));
            Ok(())
        }
        async fn fill(&self, selector: &Selector, value: &str) -> Result<()> {
            self.record(format!("fill {selector}={value}"));
            Ok(())
        }
        async fn select_value(&self, selector: &Selector, value: &str) -> Result<()> {
            self.record(format!("select {selector}={value}"));
            Ok(())
        }
        async fn set_checked(&self, selector: &Selector) -> Result<()> {
            self.record(format!("check {selector}"));
            Ok(())
        }
        async fn is_visible(&self, selector: &Selector) -> Result<bool> {
            Ok(self.visible.lock().unwrap().contains(&selector.to_string()))
        }
        async fn count(&self, selector: &Selector) -> Result<usize> {
            Ok(usize::from(
                self.visible.lock().unwrap().contains(&selector.to_string()),
            ))
        }
        async fn inner_text(&self, selector: &Selector) -> Result<String> {
            Ok(self
                .texts
                .lock()
                .unwrap()
                .get(&selector.to_string())
                .cloned()
                .unwrap_or_default())
        }
        async fn eval(&self, selector: &Selector, script: &str) -> Result<()> {
            self.record(format!("eval {selector}: {script}"));
            Ok(())
        }
        async fn wait_visible(&self, selector: &Selector, _timeout: Duration) -> Result<()> {
            let key = selector.to_string();
            if self.wait_timeouts.lock().unwrap().contains(&key) {
                return Err(PortalError::Timeout(key));
            }
            self.record(format!("wait {key}"));
            Ok(())
        }
        async fn wait_settle(&self, _settle: Settle, _timeout: Duration) -> Result<()> {
            Ok(())
        }
        async fn screenshot(&self, path: &Path) -> Result<()> {
            self.record(format!("screenshot {}", path.display()));
            Ok(())
        }
        async fn close(&self) -> Result<()> {
            self.record("close".to_string());
            Ok(())
        }
    }

    /// Position of `needle` inside the recorded op list.
    pub fn op_index(ops: &[String], needle: &str) -> usize {
        ops.iter()
            .position(|op| op.contains(needle))
            .unwrap_or_else(|| panic!("operation {needle:?} not recorded in {ops:#?}"))
    }
}
