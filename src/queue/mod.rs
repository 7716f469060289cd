//! Spreadsheet work queue
//!
//! Rows are scanned top to bottom and the first claimable one wins. Claiming
//! writes a marker into the status column before any automation touches the
//! record, so the next scan skips it. This is single-writer only; concurrent
//! external editors are not supported.

pub mod records;
pub mod sheets;

use crate::constants::CLAIM_MARKER;
use crate::error::QueueError;
use crate::pipeline::report::ReportResult;
use async_trait::async_trait;
use records::{col, QueueRecord};
use std::sync::Arc;
use tracing::{debug, info};

pub use sheets::SheetsBackend;

/// Cell-level access to the queue spreadsheet
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Every row of the sheet, header included
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, QueueError>;

    /// Overwrite one cell; `row` is 1-based, `column` is 0-based
    async fn update_cell(&self, row: usize, column: usize, value: &str) -> Result<(), QueueError>;
}

/// Claim-and-complete protocol over a [`QueueBackend`]
#[derive(Clone)]
pub struct WorkQueue {
    backend: Arc<dyn QueueBackend>,
}

impl WorkQueue {
    /// Wrap a backend
    pub fn new(backend: Arc<dyn QueueBackend>) -> Self {
        Self { backend }
    }

    /// First claimable record in ascending row order
    pub async fn next_claimable(&self) -> Result<Option<QueueRecord>, QueueError> {
        let rows = self.backend.fetch_rows().await?;
        let found = records::first_claimable(&rows);
        debug!(
            rows = rows.len(),
            claimable_row = found.as_ref().map(|r| r.row),
            "Queue scanned"
        );
        Ok(found)
    }

    /// Mark `row` as in progress
    pub async fn claim(&self, row: usize) -> Result<(), QueueError> {
        self.backend
            .update_cell(row, col::STATUS, CLAIM_MARKER)
            .await?;
        info!(row, "Record claimed");
        Ok(())
    }

    /// Write the four result columns
    ///
    /// Each cell is written independently; a failure part way leaves the
    /// earlier cells written, which is harmless because the row is already
    /// claimed and will not be selected again.
    pub async fn write_result(&self, row: usize, result: &ReportResult) -> Result<(), QueueError> {
        let cells = [
            (col::STATUS, result.status.as_str()),
            (col::POLICY_BEGIN, result.policy_begin.as_str()),
            (col::POLICY_END, result.policy_end.as_str()),
            (col::EVIDENCE, result.screenshot_link.as_str()),
        ];
        for (column, value) in cells {
            self.backend.update_cell(row, column, value).await?;
        }
        info!(row, status = %result.status, "Results written");
        Ok(())
    }
}
