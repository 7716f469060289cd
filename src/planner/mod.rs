//! Plan generation
//!
//! The reasoning service decides which elements to click and fill. It is
//! non-deterministic and answers in free text, so this module is the single
//! place where that text is cleaned, parsed, and validated into typed plans.
//! No retries happen here; a failed plan fails the current record.

pub mod api_client;
pub mod gemini_types;
pub mod parse;
pub mod plan_types;
pub mod prompts;

use crate::error::PlanError;
use crate::queue::records::PatientRecord;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub use api_client::GeminiClient;
pub use plan_types::{FillPlan, FillStep, ReportFields, SelectionPlan};

/// A text-in, text-out reasoning service
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Answer `prompt`
    async fn complete(&self, prompt: &str) -> Result<String, PlanError>;
}

/// Turns UI context into validated plans
#[derive(Clone)]
pub struct PlanGenerator {
    model: Arc<dyn LanguageModel>,
}

impl PlanGenerator {
    /// Wrap a model
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Plan the category and payer clicks for `payer_name`
    pub async fn selection_plan(
        &self,
        payer_name: &str,
        list_html: &str,
    ) -> Result<SelectionPlan, PlanError> {
        let plan: SelectionPlan = self
            .generate("payer_selection", prompts::payer_selection(payer_name, list_html))
            .await?;
        plan.validate()?;
        info!(
            category = %plan.category_text,
            payer = %plan.payer_text,
            "Payer selection plan received"
        );
        Ok(plan)
    }

    /// Plan the form inputs for `patient`
    pub async fn fill_plan(
        &self,
        patient: &PatientRecord,
        form_html: &str,
    ) -> Result<FillPlan, PlanError> {
        let plan: FillPlan = self
            .generate("form_fill", prompts::form_fill(patient, form_html))
            .await?;
        plan.validate()?;
        info!(steps = plan.steps.len(), "Form-fill plan received");
        Ok(plan)
    }

    /// Extract status and policy dates from report markup
    pub async fn report_fields(&self, report_html: &str) -> Result<ReportFields, PlanError> {
        let fields: ReportFields = self
            .generate("report_parse", prompts::report_parse(report_html))
            .await?;
        fields.validate()?;
        Ok(fields)
    }

    async fn generate<T: DeserializeOwned>(
        &self,
        kind: &'static str,
        prompt: String,
    ) -> Result<T, PlanError> {
        let started = Instant::now();
        debug!(kind, prompt_len = prompt.len(), "Requesting plan");

        let raw = self.model.complete(&prompt).await?;
        let parsed = parse::parse_json::<T>(&raw);

        match &parsed {
            Ok(_) => debug!(
                kind,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Plan parsed"
            ),
            Err(e) => warn!(kind, error = %e, "Model returned an unusable plan"),
        }
        parsed
    }
}
