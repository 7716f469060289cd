//! Per-record lookup on the eligibility form

use crate::browser::BrowserPage;
use crate::config::TimingConfig;
use crate::constants::{PAGE_BODY, REPORT_CONTAINER, SUBMIT_INQUIRY, VALIDATION_ERRORS};
use crate::error::RecordError;
use crate::evidence::{EvidenceRecorder, Outcome};
use crate::pipeline::report::ReportResult;
use crate::planner::PlanGenerator;
use crate::queue::records::PatientRecord;
use crate::session::Session;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Fills and submits the form for one patient and turns whatever happens
/// into a [`ReportResult`]
pub struct RecordProcessor {
    page: Arc<dyn BrowserPage>,
    planner: PlanGenerator,
    evidence: EvidenceRecorder,
    timing: TimingConfig,
}

impl RecordProcessor {
    /// Processor driving `page`
    pub fn new(
        page: Arc<dyn BrowserPage>,
        planner: PlanGenerator,
        evidence: EvidenceRecorder,
        timing: &TimingConfig,
    ) -> Self {
        Self {
            page,
            planner,
            evidence,
            timing: timing.clone(),
        }
    }

    /// Run the lookup for `patient` on the already selected payer
    ///
    /// Never fails: every error becomes an error result with evidence.
    pub async fn run(&self, _session: &Session, patient: &PatientRecord) -> ReportResult {
        let report_html = match self.submit(patient).await {
            Ok(html) => html,
            Err(e) => return self.fail(patient, e).await,
        };

        let parsed = self.planner.report_fields(&report_html).await;
        let link = self
            .evidence
            .capture(Outcome::Success, patient, Some(REPORT_CONTAINER))
            .await;

        match parsed {
            Ok(fields) => {
                info!(status = %fields.status, "Report parsed");
                ReportResult::from_fields(fields, link)
            }
            Err(e) => {
                warn!(error = %e, "Report could not be interpreted");
                ReportResult::ai_error(&e, link)
            }
        }
    }

    /// Error result for `patient`, with a whole-page screenshot
    pub async fn fail(&self, patient: &PatientRecord, error: RecordError) -> ReportResult {
        warn!(kind = error.kind(), error = %error, "Record failed");
        let link = self.evidence.capture(Outcome::Error, patient, None).await;
        ReportResult::from_error(&error, link)
    }

    /// Fill and submit the form; returns the report markup
    async fn submit(&self, patient: &PatientRecord) -> Result<String, RecordError> {
        let form_html = self.page.inner_html(PAGE_BODY).await?;
        let plan = self.planner.fill_plan(patient, &form_html).await?;

        // Resolve every target before the first keystroke.
        for step in &plan.steps {
            self.page.check_fillable(&step.selector).await?;
        }
        for step in &plan.steps {
            debug!(selector = %step.selector, "Filling field");
            self.page.fill(&step.selector, &step.value).await?;
        }

        self.page.click(SUBMIT_INQUIRY).await?;
        info!("Inquiry submitted, waiting for response");

        let first = self
            .page
            .wait_for_first(
                &[REPORT_CONTAINER, VALIDATION_ERRORS],
                self.timing.response_timeout,
            )
            .await?;

        if first == 1 || self.page.is_visible(VALIDATION_ERRORS).await? {
            let reason = self.page.inner_text(VALIDATION_ERRORS).await?;
            let reason = reason.trim();
            if !reason.is_empty() {
                return Err(RecordError::FormValidation(reason.to_string()));
            }
            // Empty panel: keep waiting for the report itself.
            self.page
                .wait_visible(REPORT_CONTAINER, self.timing.response_timeout)
                .await?;
        }

        Ok(self.page.inner_html(REPORT_CONTAINER).await?)
    }
}
