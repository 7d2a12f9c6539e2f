use thiserror::Error;

/// Errors surfaced by the automation framework.
///
/// Session-level faults (launch, navigation, interaction, timeout) are kept
/// separate from expected page outcomes: a page with no open slots is an
/// [`Outcome`](crate::outcome::Outcome), never an error.
#[derive(Debug, Error)]
pub enum PortalError {
    #[error("failed to launch browser session: {0}")]
    Launch(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("page interaction failed on {selector}: {message}")]
    Interaction { selector: String, message: String },

    #[error("timed out waiting for {0}")]
    Timeout(String),

    #[error("could not determine family physician status: neither page marker present")]
    BranchAmbiguous,

    #[error("page matched no known marker set")]
    UnrecognizedPage,

    #[error("slot hold expired without a manual booking")]
    HoldExpired,

    #[error("booking sequence did not reach confirmation")]
    BookingIncomplete,

    #[error("invalid patient profile: {0}")]
    InvalidProfile(String),

    #[error("a run is already active")]
    AlreadyRunning,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PortalError>;

impl PortalError {
    /// Session-level faults force a full teardown and outer-loop restart.
    /// Domain failures like [`PortalError::HoldExpired`] do too, but callers
    /// sometimes want to log them differently.
    pub fn is_session_fault(&self) -> bool {
        matches!(
            self,
            PortalError::Launch(_)
                | PortalError::Navigation(_)
                | PortalError::Interaction { .. }
                | PortalError::Timeout(_)
        )
    }
}
