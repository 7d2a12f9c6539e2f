pub mod artifacts;
pub mod automaton;
pub mod browser;
pub mod control;
pub mod error;
pub mod flow;
pub mod notify;
pub mod outcome;
pub mod policy;
pub mod profile;

// Re-export commonly used types
pub use artifacts::{ArtifactStore, SnapshotKind};
pub use automaton::{AutomatonExit, SiteAutomaton};
pub use browser::{BrowserEngine, BrowserSession, Selector, SessionOptions, Settle};
pub use control::RunController;
pub use error::{PortalError, Result};
pub use flow::{BookingCompleter, BookingResult, BranchDecision, PortalFlow};
pub use notify::{LogNotifier, Notifier};
pub use outcome::{MarkerSet, Outcome, Probe, classify};
pub use policy::PollPolicy;
pub use profile::PatientProfile;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controller_defaults_to_stopped() {
        let controller = RunController::new();
        assert!(!controller.get());
    }

    #[test]
    fn error_channel_distinguishes_session_faults() {
        assert!(PortalError::Timeout("#confirm".into()).is_session_fault());
        assert!(!PortalError::HoldExpired.is_session_fault());
        assert!(!PortalError::UnrecognizedPage.is_session_fault());
    }
}
