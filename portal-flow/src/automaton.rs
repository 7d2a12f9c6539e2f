use std::sync::Arc;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::artifacts::{ArtifactStore, SnapshotKind};
use crate::browser::{BrowserEngine, BrowserSession, SessionOptions, Settle};
use crate::control::RunController;
use crate::error::{PortalError, Result};
use crate::flow::{BookingResult, PortalFlow};
use crate::notify::Notifier;
use crate::outcome::{Outcome, classify};
use crate::policy::PollPolicy;
use crate::profile::PatientProfile;

/// Why the automaton's task finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutomatonExit {
    /// The run controller was cleared.
    Stopped,
    /// This automaton completed a booking (and cleared the controller).
    BookingConfirmed,
}

/// How one session cycle ended without an error.
enum CycleEnd {
    Stopped,
    BookingConfirmed,
}

/// Drives one portal through the session-lifecycle retry loop and the
/// inner poll loop. One automaton owns one browser session at a time;
/// the only shared state is the [`RunController`].
pub struct SiteAutomaton {
    flow: Arc<dyn PortalFlow>,
    engine: Arc<dyn BrowserEngine>,
    controller: RunController,
    profile: Arc<PatientProfile>,
    artifacts: ArtifactStore,
    notifier: Arc<dyn Notifier>,
    policy: PollPolicy,
    session_options: SessionOptions,
    auto_book: bool,
}

impl SiteAutomaton {
    pub fn new(
        flow: Arc<dyn PortalFlow>,
        engine: Arc<dyn BrowserEngine>,
        controller: RunController,
        profile: Arc<PatientProfile>,
        artifacts: ArtifactStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            flow,
            engine,
            controller,
            profile,
            artifacts,
            notifier,
            policy: PollPolicy::default(),
            session_options: SessionOptions::default(),
            auto_book: false,
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_session_options(mut self, options: SessionOptions) -> Self {
        self.session_options = options;
        self
    }

    pub fn with_auto_book(mut self, auto_book: bool) -> Self {
        self.auto_book = auto_book;
        self
    }

    /// Outer session-lifecycle loop. Every failure inside a cycle is
    /// caught here: diagnostic snapshot, session teardown, immediate
    /// restart while the controller stays true. The task itself never
    /// terminates on error.
    pub async fn run(&self) -> AutomatonExit {
        let portal = self.flow.name().to_string();
        while self.controller.get() {
            info!(portal, "starting browser session");
            let session = match self.engine.open_session(&self.session_options).await {
                Ok(session) => session,
                Err(err) => {
                    warn!(portal, error = %err, "session launch failed");
                    sleep(self.policy.launch_retry_delay).await;
                    continue;
                }
            };

            let cycle = self.run_cycle(session.as_ref()).await;

            match &cycle {
                Ok(CycleEnd::Stopped) => {}
                Ok(CycleEnd::BookingConfirmed) => {}
                Err(err) => {
                    error!(portal, error = %err, "cycle failed; tearing down session");
                    if let Err(snap_err) = self
                        .artifacts
                        .capture(session.as_ref(), SnapshotKind::Error, &portal)
                        .await
                    {
                        warn!(portal, error = %snap_err, "could not capture error snapshot");
                    }
                }
            }

            if let Err(err) = session.close().await {
                warn!(portal, error = %err, "session close failed");
            }

            match cycle {
                Ok(CycleEnd::BookingConfirmed) => {
                    info!(portal, "booking confirmed; run stopped");
                    return AutomatonExit::BookingConfirmed;
                }
                Ok(CycleEnd::Stopped) => break,
                Err(_) => {}
            }
        }
        info!(portal, "automaton stopped");
        AutomatonExit::Stopped
    }

    /// One full setup-to-poll cycle on a live session.
    async fn run_cycle(&self, session: &dyn BrowserSession) -> Result<CycleEnd> {
        let portal = self.flow.name();

        self.flow.setup(session, &self.profile).await?;
        let branch = self.flow.resolve_branch(session).await?;
        info!(portal, ?branch, "branch resolved");
        self.flow
            .configure_search(session, &self.profile, branch)
            .await?;

        loop {
            if !self.controller.get() {
                return Ok(CycleEnd::Stopped);
            }

            info!(portal, "searching for slots");
            self.flow.submit_search(session, &self.profile).await?;
            session
                .wait_settle(Settle::NetworkIdle, self.policy.page_timeout)
                .await?;
            sleep(self.policy.settle_delay).await;

            if !self.controller.get() {
                return Ok(CycleEnd::Stopped);
            }

            match classify(session, self.flow.markers()).await? {
                Outcome::NoSlotAvailable => {
                    info!(portal, "no slots available");
                    self.flow.acknowledge_no_slot(session).await?;
                }
                Outcome::SlotFound => {
                    info!(portal, "slot found");
                    self.notifier.slot_found(portal).await;
                    self.artifacts
                        .capture(session, SnapshotKind::SlotFound, portal)
                        .await?;
                    return self.on_slot_found(session).await;
                }
                Outcome::TransientError => {
                    warn!(portal, "site reported an error; dismissing in place");
                    self.flow.dismiss_error(session).await?;
                }
                Outcome::Unparseable => {
                    return Err(PortalError::UnrecognizedPage);
                }
            }

            if !self.controller.get() {
                return Ok(CycleEnd::Stopped);
            }
            sleep(self.policy.jitter()).await;
        }
    }

    /// Either finalize the booking or hold position for a human. The hold
    /// expiring is an error on purpose: the slot is not guaranteed to
    /// still exist, so the cycle restarts from a clean session.
    async fn on_slot_found(&self, session: &dyn BrowserSession) -> Result<CycleEnd> {
        let portal = self.flow.name();
        if self.auto_book {
            if let Some(booking) = self.flow.booking() {
                return match booking.complete(session, &self.profile).await? {
                    BookingResult::Confirmed => {
                        self.artifacts
                            .capture(session, SnapshotKind::BookingConfirmed, portal)
                            .await?;
                        // Booking is single-shot across the whole run.
                        self.controller.set(false);
                        Ok(CycleEnd::BookingConfirmed)
                    }
                    BookingResult::TimedOut => Err(PortalError::BookingIncomplete),
                };
            }
            warn!(portal, "auto-book enabled but portal has no booking flow");
        }
        sleep(self.policy.hold).await;
        Err(PortalError::HoldExpired)
    }
}
