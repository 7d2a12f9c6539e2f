use async_trait::async_trait;

/// Outward notification surface. Fired exactly once per SlotFound
/// detection; purely a side effect, no return value.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn slot_found(&self, portal: &str);
}

/// Notifier that only logs. Useful as a default and in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn slot_found(&self, portal: &str) {
        tracing::info!(portal, "SLOT FOUND");
    }
}
