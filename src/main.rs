//! Eligibility Bot
//!
//! Polls the queue sheet and runs one portal lookup per claimable row until
//! interrupted.

use anyhow::Context;
use eligibility_bot::browser::{BrowserPage, WebDriverPage};
use eligibility_bot::config::Config;
use eligibility_bot::evidence::{ArtifactStore, DriveStore, EvidenceRecorder};
use eligibility_bot::google::{TokenProvider, DRIVE_API_BASE_URL, SHEETS_API_BASE_URL};
use eligibility_bot::pipeline::{Orchestrator, PayerSelector, RecordProcessor};
use eligibility_bot::planner::{GeminiClient, PlanGenerator};
use eligibility_bot::queue::{QueueBackend, SheetsBackend, WorkQueue};
use eligibility_bot::session::{SessionManager, SessionStore, StdinOtpSource};
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    info!("Configuration loaded: {:?}", config);

    let http = reqwest::Client::new();
    let tokens = Arc::new(
        TokenProvider::from_config(http.clone(), &config.google)
            .context("Failed to set up Google credentials")?,
    );

    let sheets: Arc<dyn QueueBackend> = Arc::new(SheetsBackend::new(
        http.clone(),
        Arc::clone(&tokens),
        SHEETS_API_BASE_URL,
        &config.google,
    ));
    let drive: Arc<dyn ArtifactStore> = Arc::new(DriveStore::new(
        http.clone(),
        Arc::clone(&tokens),
        DRIVE_API_BASE_URL,
        &config.google.drive_folder_id,
    ));

    let gemini = GeminiClient::new(&config.gemini).context("Failed to build Gemini client")?;
    info!(model = %gemini.model(), "Plan generator ready");
    let planner = PlanGenerator::new(Arc::new(gemini));

    let browser = Arc::new(
        WebDriverPage::connect(&config.browser)
            .await
            .context("Failed to start browser")?,
    );
    let page: Arc<dyn BrowserPage> = browser.clone();

    let sessions = SessionManager::new(
        Arc::clone(&page),
        &config.portal,
        &config.timing,
        SessionStore::new(&config.paths.session_state_file),
        Arc::new(StdinOtpSource),
    );
    let evidence = EvidenceRecorder::new(
        Arc::clone(&page),
        drive,
        config.paths.screenshot_dir.clone(),
    );
    let selector = PayerSelector::new(
        Arc::clone(&page),
        planner.clone(),
        &config.portal,
        &config.timing,
    );
    let processor = RecordProcessor::new(Arc::clone(&page), planner, evidence, &config.timing);

    let mut orchestrator = Orchestrator::new(
        WorkQueue::new(sheets),
        sessions,
        selector,
        processor,
        &config.timing,
    );

    let outcome = match orchestrator.startup().await {
        Ok(_) => {
            info!("Starting main loop");
            orchestrator.run(shutdown_signal()).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = browser.close().await {
        warn!(error = %e, "Failed to close browser session");
    }

    match outcome {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Eligibility bot stopped");
            Err(e.into())
        }
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, finishing current record and shutting down...");
        },
        _ = terminate => {
            info!("Received SIGTERM, finishing current record and shutting down...");
        },
    }
}
