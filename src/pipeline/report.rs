//! Terminal outcome of one record

use crate::constants::AI_ERROR;
use crate::error::{PlanError, RecordError};
use crate::planner::ReportFields;

/// Values written to the four result columns
///
/// Every field is always present; sentinels stand in for missing data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportResult {
    /// Eligibility status or an `Error: ...` tag
    pub status: String,
    /// Policy begin date, or the error message on failure
    pub policy_begin: String,
    /// Policy end date; empty on failure
    pub policy_end: String,
    /// Evidence reference or the upload-failed sentinel
    pub screenshot_link: String,
}

impl ReportResult {
    /// Result for a parsed report
    pub fn from_fields(fields: ReportFields, screenshot_link: String) -> Self {
        Self {
            status: fields.status,
            policy_begin: fields.policy_begin,
            policy_end: fields.policy_end,
            screenshot_link,
        }
    }

    /// Result for a failed record
    pub fn from_error(error: &RecordError, screenshot_link: String) -> Self {
        Self {
            status: error.status(),
            policy_begin: error.to_string(),
            policy_end: String::new(),
            screenshot_link,
        }
    }

    /// Result when the report was reached but could not be interpreted
    pub fn ai_error(error: &PlanError, screenshot_link: String) -> Self {
        Self {
            status: AI_ERROR.to_string(),
            policy_begin: AI_ERROR.to_string(),
            policy_end: error.to_string(),
            screenshot_link,
        }
    }
}
