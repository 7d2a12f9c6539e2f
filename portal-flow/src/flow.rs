use async_trait::async_trait;

use crate::browser::BrowserSession;
use crate::error::Result;
use crate::outcome::MarkerSet;
use crate::profile::PatientProfile;

/// Whether the patient has a registered family physician. Decides the
/// navigation path on portals that distinguish the two; portals without
/// such a step report [`BranchDecision::NotApplicable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchDecision {
    FamilyPhysician,
    NoFamilyPhysician,
    NotApplicable,
}

/// Terminal result of the booking completer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingResult {
    Confirmed,
    /// The confirmation marker never appeared within the timeout.
    TimedOut,
}

/// Per-portal strategy: the steps and markers that differ between portals,
/// driven by the one generic [`SiteAutomaton`](crate::automaton::SiteAutomaton).
#[async_trait]
pub trait PortalFlow: Send + Sync {
    /// Short portal identifier used in logs and artifact names.
    fn name(&self) -> &str;

    /// Markers the classifier evaluates each poll iteration.
    fn markers(&self) -> &MarkerSet;

    /// One-time session setup: navigate, accept consent, fill identity
    /// fields, submit.
    async fn setup(&self, session: &dyn BrowserSession, profile: &PatientProfile) -> Result<()>;

    /// Resolve the family-physician branch from the two page markers.
    /// Neither marker present is a [`PortalError::BranchAmbiguous`](crate::PortalError::BranchAmbiguous)
    /// error, fatal to the current session.
    async fn resolve_branch(&self, session: &dyn BrowserSession) -> Result<BranchDecision>;

    /// Branch-specific navigation plus search parameters (consultation
    /// reason, radius, dates).
    async fn configure_search(
        &self,
        session: &dyn BrowserSession,
        profile: &PatientProfile,
        branch: BranchDecision,
    ) -> Result<()>;

    /// Submit one search attempt. Called every poll iteration.
    async fn submit_search(
        &self,
        session: &dyn BrowserSession,
        profile: &PatientProfile,
    ) -> Result<()>;

    /// Portal-specific re-entry into the criteria step after a no-slot
    /// result. Defaults to nothing: most portals re-poll in place.
    async fn acknowledge_no_slot(&self, _session: &dyn BrowserSession) -> Result<()> {
        Ok(())
    }

    /// Dismiss a site-reported error banner via the site's own controls,
    /// without tearing the session down.
    async fn dismiss_error(&self, _session: &dyn BrowserSession) -> Result<()> {
        Ok(())
    }

    /// The self-service booking completer, for portals that support it.
    fn booking(&self) -> Option<&dyn BookingCompleter> {
        None
    }
}

/// Finalizes a reservation from a SlotFound position: confirm the
/// selection, fill contact details, accept terms, submit, and wait for the
/// confirmation marker. No retry — any failure propagates and the slot is
/// presumed lost.
#[async_trait]
pub trait BookingCompleter: Send + Sync {
    async fn complete(
        &self,
        session: &dyn BrowserSession,
        profile: &PatientProfile,
    ) -> Result<BookingResult>;
}
