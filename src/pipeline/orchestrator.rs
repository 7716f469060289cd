//! Main loop
//!
//! One record at a time: scan, make sure the session is live, claim, select
//! the payer, run the lookup, write the result. A record that has been
//! claimed always gets a terminal result; loop-level failures only decide
//! how long to back off before the next pass.

use crate::config::TimingConfig;
use crate::error::LoopError;
use crate::pipeline::payer::PayerSelector;
use crate::pipeline::processor::RecordProcessor;
use crate::queue::records::PatientRecord;
use crate::queue::WorkQueue;
use crate::session::{Session, SessionManager};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// What one pass of the loop did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Nothing claimable
    Idle,
    /// A record reached a terminal status
    Processed {
        /// Sheet row
        row: usize,
        /// Status written
        status: String,
    },
}

/// Wires the queue, session, selector, and processor together
pub struct Orchestrator {
    queue: WorkQueue,
    sessions: SessionManager,
    selector: PayerSelector,
    processor: RecordProcessor,
    timing: TimingConfig,
}

impl Orchestrator {
    /// Assemble the loop
    pub fn new(
        queue: WorkQueue,
        sessions: SessionManager,
        selector: PayerSelector,
        processor: RecordProcessor,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            queue,
            sessions,
            selector,
            processor,
            timing: timing.clone(),
        }
    }

    /// Check the queue backend and establish the first session
    ///
    /// Either failure is fatal to the run.
    pub async fn startup(&mut self) -> Result<Session, LoopError> {
        let pending = self.queue.next_claimable().await?;
        info!(
            next_row = pending.as_ref().map(|r| r.row),
            "Queue backend reachable"
        );
        let session = self.sessions.ensure_ready().await?;
        info!(restored = session.restored(), "Portal session ready");
        Ok(session)
    }

    /// Process at most one record
    pub async fn run_once(&mut self) -> Result<Tick, LoopError> {
        let Some(record) = self.queue.next_claimable().await? else {
            return Ok(Tick::Idle);
        };

        let session = self.sessions.ensure_ready().await?;
        self.queue.claim(record.row).await?;

        let patient = PatientRecord::from(&record);
        let span = info_span!(
            "record",
            id = %Uuid::new_v4(),
            row = record.row,
            payer = %patient.payer_name,
        );

        let result = async {
            info!("Processing record");
            match self.selector.select(&session, &patient.payer_name).await {
                Ok(_) => self.processor.run(&session, &patient).await,
                Err(e) => self.processor.fail(&patient, e.into()).await,
            }
        }
        .instrument(span)
        .await;

        self.queue.write_result(record.row, &result).await?;
        Ok(Tick::Processed {
            row: record.row,
            status: result.status,
        })
    }

    /// Run until `shutdown` resolves or a fatal error occurs
    ///
    /// Shutdown is only observed between passes, so an in-flight record
    /// always finishes and gets its result written.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<(), LoopError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let pause = match self.run_once().await {
                Ok(Tick::Idle) => {
                    debug!(
                        poll_secs = self.timing.poll_interval.as_secs(),
                        "No pending records"
                    );
                    self.timing.poll_interval
                }
                Ok(Tick::Processed { row, status }) => {
                    info!(row, status = %status, "Record complete");
                    Duration::ZERO
                }
                Err(e) => match self.backoff_for(&e) {
                    Some(pause) => pause,
                    None => {
                        error!(error = %e, "Fatal error, stopping");
                        return Err(e);
                    }
                },
            };

            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Main loop stopped");
                    return Ok(());
                }
                _ = sleep(pause) => {}
            }
        }
    }

    /// Backoff for a failed pass, or `None` when the run must stop
    fn backoff_for(&mut self, error: &LoopError) -> Option<Duration> {
        match error {
            LoopError::Session(e) if e.is_fatal() => None,
            LoopError::Queue(e) => {
                warn!(
                    error = %e,
                    backoff_secs = self.timing.backend_backoff.as_secs(),
                    "Queue backend error, backing off"
                );
                Some(self.timing.backend_backoff)
            }
            LoopError::Session(e) => {
                warn!(
                    error = %e,
                    backoff_secs = self.timing.error_backoff.as_secs(),
                    "Session lost, backing off before re-validating"
                );
                self.sessions.invalidate();
                Some(self.timing.error_backoff)
            }
        }
    }
}
