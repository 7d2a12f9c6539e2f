//! Wires the two portal automatons to one shared run controller.
//!
//! RVSQ never books by itself; its hits always wait for a human. Bonjour
//! Santé carries the booking completer, armed by the auto-book flag.

use std::sync::Arc;

use portal_flow::{
    ArtifactStore, AutomatonExit, BrowserEngine, Notifier, PatientProfile, PollPolicy,
    PortalError, RunController, SessionOptions, SiteAutomaton,
};
use tokio::task::JoinHandle;
use tracing::{Instrument, error, info, info_span};
use uuid::Uuid;

use crate::portals::{BonjourSanteFlow, RvsqFlow};

pub struct RunOptions {
    pub profile: PatientProfile,
    pub artifacts: ArtifactStore,
    pub session_options: SessionOptions,
    pub policy: PollPolicy,
    /// Let the Bonjour Santé automaton complete bookings on its own.
    pub auto_book: bool,
}

/// A started run: both portal tasks plus the controller that stops them.
#[derive(Debug)]
pub struct RunHandle {
    run_id: Uuid,
    controller: RunController,
    tasks: Vec<JoinHandle<AutomatonExit>>,
}

impl RunHandle {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn controller(&self) -> &RunController {
        &self.controller
    }

    /// Ask both automatons to stop at their next checkpoint.
    pub fn stop(&self) {
        self.controller.set(false);
    }

    /// Wait for both portal tasks to wind down.
    pub async fn join(self) -> Vec<AutomatonExit> {
        let mut exits = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            match task.await {
                Ok(exit) => exits.push(exit),
                Err(e) => error!(error = %e, "portal task aborted"),
            }
        }
        exits
    }
}

/// Validate the profile and launch both automatons. The profile check runs
/// before the controller is touched, so a rejected start leaves a cleared
/// controller cleared.
pub fn start(
    engine: Arc<dyn BrowserEngine>,
    notifier: Arc<dyn Notifier>,
    controller: RunController,
    options: RunOptions,
) -> portal_flow::Result<RunHandle> {
    options.profile.validate()?;

    if !controller.try_start() {
        return Err(PortalError::AlreadyRunning);
    }

    let run_id = Uuid::new_v4();
    let profile = Arc::new(options.profile);
    info!(%run_id, auto_book = options.auto_book, "run started");

    let rvsq = SiteAutomaton::new(
        Arc::new(RvsqFlow::new()),
        Arc::clone(&engine),
        controller.clone(),
        Arc::clone(&profile),
        options.artifacts.clone(),
        Arc::clone(&notifier),
    )
    .with_policy(options.policy.clone())
    .with_session_options(options.session_options.clone());

    let bonjour = SiteAutomaton::new(
        Arc::new(BonjourSanteFlow::new()),
        engine,
        controller.clone(),
        Arc::clone(&profile),
        options.artifacts,
        notifier,
    )
    .with_policy(options.policy)
    .with_session_options(options.session_options)
    .with_auto_book(options.auto_book);

    let tasks = vec![
        tokio::spawn(
            async move { rvsq.run().await }
                .instrument(info_span!("portal", %run_id, name = "rvsq")),
        ),
        tokio::spawn(
            async move { bonjour.run().await }
                .instrument(info_span!("portal", %run_id, name = "bonjour_sante")),
        ),
    ];

    Ok(RunHandle {
        run_id,
        controller,
        tasks,
    })
}
