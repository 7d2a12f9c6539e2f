mod config;
#[cfg(feature = "webdriver")]
mod engine;
mod notify;
mod orchestrator;
mod portals;

use std::sync::Arc;

use portal_flow::{ArtifactStore, BrowserEngine, PollPolicy, RunController, SessionOptions};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::AppConfig;
use crate::notify::BellNotifier;

/// Initialize structured tracing based on environment variables
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "slot_finder_service=debug,portal_flow=debug".into());

    match log_format.as_str() {
        "json" => {
            // Structured JSON logging for unattended runs
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
        _ => {
            // Human-readable logging for a watched terminal
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}

fn env_flag(name: &str) -> bool {
    matches!(
        std::env::var(name).unwrap_or_default().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[tokio::main]
async fn main() {
    init_tracing();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.json".to_string());
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %config_path, error = %e, "could not load configuration");
            std::process::exit(1);
        }
    };
    // Persist the normalized document so hand edits keep the full shape.
    if let Err(e) = config.save(&config_path) {
        error!(path = %config_path, error = %e, "could not write configuration back");
    }

    let webdriver_url =
        std::env::var("WEBDRIVER_URL").unwrap_or_else(|_| "http://localhost:4444".to_string());
    let auto_book = env_flag("AUTO_BOOK");

    let artifacts = match ArtifactStore::new("screenshots", "error_screenshots") {
        Ok(artifacts) => artifacts,
        Err(e) => {
            error!(error = %e, "could not create snapshot directories");
            std::process::exit(1);
        }
    };

    let session_options = SessionOptions {
        headless: env_flag("HEADLESS"),
        ..SessionOptions::default()
    };

    #[cfg(feature = "webdriver")]
    let browser_engine: Arc<dyn BrowserEngine> =
        Arc::new(engine::WebDriverEngine::new(webdriver_url.clone()));
    #[cfg(not(feature = "webdriver"))]
    let browser_engine: Arc<dyn BrowserEngine> = {
        error!(%webdriver_url, "built without the webdriver feature; no browser engine available");
        std::process::exit(1);
    };

    info!(%webdriver_url, auto_book, "starting portal watch");
    let handle = match orchestrator::start(
        browser_engine,
        Arc::new(BellNotifier::new()),
        RunController::new(),
        orchestrator::RunOptions {
            profile: config.personal_info,
            artifacts,
            session_options,
            policy: PollPolicy::default(),
            auto_book,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "could not start the run");
            std::process::exit(1);
        }
    };

    let controller = handle.controller().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping both portals");
            controller.set(false);
        }
    });

    let exits = handle.join().await;
    info!(?exits, "run finished");
}
