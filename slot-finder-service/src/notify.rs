use std::io::Write;
use std::time::Duration;

use async_trait::async_trait;
use portal_flow::Notifier;
use tracing::info;

/// Rings the terminal bell so an operator at the keyboard hears the hit
/// even when the log is scrolled away.
pub struct BellNotifier {
    rings: usize,
}

impl BellNotifier {
    pub fn new() -> Self {
        Self { rings: 3 }
    }
}

impl Default for BellNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for BellNotifier {
    async fn slot_found(&self, portal: &str) {
        info!(portal, "slot found");
        for _ in 0..self.rings {
            print!("\x07");
            let _ = std::io::stdout().flush();
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
    }
}
