//! Prompt templates
//!
//! Each prompt is a fixed instruction block followed by exactly one payload
//! (patient data or a markup fragment).

use crate::queue::records::PatientRecord;

/// Prompt asking for a [`SelectionPlan`](super::SelectionPlan)
pub fn payer_selection(payer_name: &str, list_html: &str) -> String {
    format!(
        r#"You are a web automation assistant. Below is the HTML of a payer list grouped into categories, and the name of a target payer.

Target payer: "{payer_name}"

1. Decide which category the target payer belongs to.
2. Within that category's list, pick the entry that best and most logically matches the target name. For example, "UMR" matches "UMR-Wausau"; "BCBS North Carolina" lives under the "Blue Cross Blue Shield" category.
3. Both values MUST be copied exactly, character for character, from the visible text of existing links in the HTML.

Return ONLY a JSON object with two keys:
{{"category_text": "<exact category link text>", "payer_text": "<exact payer link text>"}}

Payer list HTML:
```html
{list_html}
```"#,
        payer_name = payer_name,
        list_html = list_html
    )
}

/// Prompt asking for a [`FillPlan`](super::FillPlan)
pub fn form_fill(patient: &PatientRecord, form_html: &str) -> String {
    let patient_json =
        serde_json::to_string_pretty(patient).unwrap_or_else(|_| "{}".to_string());
    format!(
        r#"You are a meticulous web automation assistant. Below is the HTML of an eligibility inquiry form and a JSON object with patient data. Produce the steps needed to fill the form.

Rules:
1. Find the text inputs labelled Date of Service (and Date of Service End, if present), Subscriber ID or Member ID, Subscriber First Name, Subscriber Last Name, and Subscriber Date of Birth.
2. Map the patient data onto those inputs. If both "Date of Service" and "Date of Service End" exist, use `dos` for both.
3. Give each input a precise CSS selector that matches exactly one element. Prefer element IDs.
4. Only text <input> elements. Never produce steps for <select> dropdowns such as "Search By".
5. Return ONLY a JSON array of objects, each with a "selector" key and a "value" key.

Patient data:
```json
{patient_json}
```

Form HTML:
```html
{form_html}
```"#,
        patient_json = patient_json,
        form_html = form_html
    )
}

/// Prompt asking for [`ReportFields`](super::ReportFields)
pub fn report_parse(report_html: &str) -> String {
    format!(
        r#"You are a data extraction assistant. Below is the HTML of an insurance eligibility report.

Find the "Eligibility Status", the "Plan Begin Date", and the "Plan End Date".
The report may list several plan begin dates for sub-benefits such as Vision or Dental. Use the dates that belong to the main "Health Benefit Plan Coverage", i.e. the primary policy.
If a date is given as a range like "1/1/2025 - 12/31/2025", split it into begin and end.
Use "Not Found" for any value that is not present.

Return ONLY a JSON object with the keys "status", "policy_begin", and "policy_end".

Report HTML:
```html
{report_html}
```"#,
        report_html = report_html
    )
}
