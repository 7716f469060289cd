//! Structured plans returned by the reasoning service
//!
//! Every plan is validated before any UI action is derived from it.

use crate::constants::NOT_FOUND;
use crate::error::PlanError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Two-level payer selection: category link, then payer link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPlan {
    /// Exact visible text of the category element
    pub category_text: String,
    /// Exact visible text of the payer element within that category
    pub payer_text: String,
}

impl SelectionPlan {
    /// Reject blank texts
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.category_text.trim().is_empty() {
            return Err(PlanError::Invalid(
                "selection plan has an empty category_text".to_string(),
            ));
        }
        if self.payer_text.trim().is_empty() {
            return Err(PlanError::Invalid(
                "selection plan has an empty payer_text".to_string(),
            ));
        }
        Ok(())
    }
}

/// One form-fill action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillStep {
    /// CSS selector of a text input
    pub selector: String,
    /// Value to enter
    #[serde(deserialize_with = "scalar_string")]
    pub value: String,
}

/// Ordered form-fill actions; serialized as a bare JSON array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FillPlan {
    /// Steps in execution order
    pub steps: Vec<FillStep>,
}

impl FillPlan {
    /// Reject empty plans and blank selectors
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::Invalid(
                "AI did not return a valid form-filling plan (no steps)".to_string(),
            ));
        }
        if let Some(index) = self.steps.iter().position(|s| s.selector.trim().is_empty()) {
            return Err(PlanError::Invalid(format!(
                "form-filling step {} has an empty selector",
                index + 1
            )));
        }
        Ok(())
    }
}

/// Fields extracted from an eligibility report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportFields {
    /// Eligibility status
    #[serde(default = "not_found", deserialize_with = "scalar_string")]
    pub status: String,
    /// Primary policy begin date
    #[serde(default = "not_found", deserialize_with = "scalar_string")]
    pub policy_begin: String,
    /// Primary policy end date
    #[serde(default = "not_found", deserialize_with = "scalar_string")]
    pub policy_end: String,
}

impl ReportFields {
    /// Reject a report whose status is blank
    pub fn validate(&self) -> Result<(), PlanError> {
        if self.status.trim().is_empty() {
            return Err(PlanError::Invalid("report status is empty".to_string()));
        }
        Ok(())
    }
}

fn not_found() -> String {
    NOT_FOUND.to_string()
}

/// Accept strings, numbers, and booleans; `null` becomes "Not Found"
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(not_found()),
        other => Err(serde::de::Error::custom(format!(
            "expected a scalar, found {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::parse::parse_json;

    #[test]
    fn test_selection_plan_requires_both_keys() {
        let missing = parse_json::<SelectionPlan>(r#"{"category_text": "Commercial"}"#);
        assert!(matches!(missing, Err(PlanError::Malformed { .. })));

        let blank: SelectionPlan =
            parse_json(r#"{"category_text": "Commercial", "payer_text": " "}"#).unwrap();
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_fill_plan_parses_bare_array_and_numeric_values() {
        let plan: FillPlan = parse_json(
            r##"[{"selector": "#InsuranceNum", "value": 12345}, {"selector": "#Dob", "value": "01/01/1990"}]"##,
        )
        .unwrap();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.steps[0].value, "12345");
        assert_eq!(plan.steps[1].selector, "#Dob");
    }

    #[test]
    fn test_fill_plan_rejects_empty_and_incomplete_steps() {
        let empty: FillPlan = parse_json("[]").unwrap();
        assert!(matches!(empty.validate(), Err(PlanError::Invalid(_))));

        let missing_value = parse_json::<FillPlan>(r##"[{"selector": "#Dob"}]"##);
        assert!(missing_value.is_err());

        let blank: FillPlan = parse_json(r#"[{"selector": "", "value": "x"}]"#).unwrap();
        assert!(blank.validate().unwrap_err().to_string().contains("step 1"));
    }

    #[test]
    fn test_report_fields_default_to_not_found() {
        let fields: ReportFields =
            parse_json(r#"{"status": "Active Coverage", "policy_begin": null}"#).unwrap();
        assert_eq!(fields.status, "Active Coverage");
        assert_eq!(fields.policy_begin, NOT_FOUND);
        assert_eq!(fields.policy_end, NOT_FOUND);
    }
}
