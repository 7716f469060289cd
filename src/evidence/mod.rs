//! Evidence capture
//!
//! A screenshot is taken for every finished record and uploaded to the
//! artifact store. Nothing here can fail a record: any capture or upload
//! problem is logged and the evidence reference becomes
//! [`UPLOAD_FAILED`](crate::constants::UPLOAD_FAILED).

pub mod drive;

use crate::browser::BrowserPage;
use crate::constants::UPLOAD_FAILED;
use crate::error::UploadError;
use crate::queue::records::PatientRecord;
use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub use drive::DriveStore;

/// Destination for evidence files
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Upload the file at `path` as `name`; returns a shareable reference
    async fn upload(&self, path: &Path, name: &str) -> Result<String, UploadError>;
}

/// Which path produced the evidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A report was parsed
    Success,
    /// The record failed somewhere
    Error,
}

impl Outcome {
    fn prefix(self) -> &'static str {
        match self {
            Outcome::Success => "SUCCESS",
            Outcome::Error => "ERROR",
        }
    }
}

fn sanitize(part: &str) -> String {
    let cleaned: String = part
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

/// `<PREFIX>_<last>_<first>_<timestamp>.png`
pub fn evidence_file_name(outcome: Outcome, patient: &PatientRecord, timestamp: &str) -> String {
    format!(
        "{}_{}_{}_{}.png",
        outcome.prefix(),
        sanitize(&patient.last_name),
        sanitize(&patient.first_name),
        timestamp
    )
}

/// Screenshots the page and hands the file to an [`ArtifactStore`]
#[derive(Clone)]
pub struct EvidenceRecorder {
    page: Arc<dyn BrowserPage>,
    store: Arc<dyn ArtifactStore>,
    dir: PathBuf,
}

impl EvidenceRecorder {
    /// Recorder writing local copies under `dir`
    pub fn new(page: Arc<dyn BrowserPage>, store: Arc<dyn ArtifactStore>, dir: PathBuf) -> Self {
        Self { page, store, dir }
    }

    /// Capture `selector` (or the whole page) and upload it
    ///
    /// Returns the store's reference, or the failure sentinel.
    pub async fn capture(
        &self,
        outcome: Outcome,
        patient: &PatientRecord,
        selector: Option<&str>,
    ) -> String {
        match self.try_capture(outcome, patient, selector).await {
            Ok(link) => link,
            Err(e) => {
                warn!(error = %e, "Evidence capture failed");
                UPLOAD_FAILED.to_string()
            }
        }
    }

    async fn try_capture(
        &self,
        outcome: Outcome,
        patient: &PatientRecord,
        selector: Option<&str>,
    ) -> Result<String, UploadError> {
        let bytes = self
            .page
            .screenshot(selector)
            .await
            .map_err(|e| UploadError::Store(format!("screenshot failed: {}", e)))?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let name = evidence_file_name(outcome, patient, &timestamp);
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&name);
        tokio::fs::write(&path, &bytes).await?;
        info!(path = %path.display(), bytes = bytes.len(), "Screenshot saved");

        self.store.upload(&path, &name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient(first: &str, last: &str) -> PatientRecord {
        PatientRecord {
            dos: "01/01/2025".into(),
            first_name: first.into(),
            last_name: last.into(),
            dob: "01/01/1990".into(),
            payer_name: "UMR".into(),
            member_id: "M1".into(),
        }
    }

    #[test]
    fn test_file_name_prefix_and_order() {
        let name = evidence_file_name(Outcome::Success, &patient("Jane", "Doe"), "20250101_120000");
        assert_eq!(name, "SUCCESS_Doe_Jane_20250101_120000.png");
    }

    #[test]
    fn test_file_name_strips_path_characters() {
        let name = evidence_file_name(Outcome::Error, &patient("Mary Ann", "O'Neil/../x"), "t");
        assert_eq!(name, "ERROR_O_Neil____x_Mary_Ann_t.png");
        assert!(!name.contains('/'));
    }

    #[test]
    fn test_blank_name_component() {
        let name = evidence_file_name(Outcome::Error, &patient("  ", "Doe"), "t");
        assert_eq!(name, "ERROR_Doe_unknown_t.png");
    }
}
