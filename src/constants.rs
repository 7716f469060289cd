//! Portal selectors and result sentinels
//!
//! Centralized constants used throughout the pipeline.

/// Login form: user name input
pub const LOGIN_USERNAME: &str = "input[name=\"UserName\"]";

/// Login form: password input
pub const LOGIN_PASSWORD: &str = "input[type=\"password\"]";

/// Login form: submit button
pub const LOGIN_SUBMIT: &str = "input[type=\"submit\"]";

/// Passcode input
pub const OTP_INPUT: &str = "#AuthCode";

/// Passcode verify button
pub const OTP_VERIFY: &str = "#btnVerify";

/// Scope for matching the passcode contact-method text
pub const PAGE_BODY: &str = "body";

/// Element that only exists on authenticated pages
pub const POST_LOGIN_MARKER: &str = "#NavCtrl_navHome";

/// URL fragment identifying the landing page after login
pub const LANDING_URL_FRAGMENT: &str = "default.aspx";

/// Container listing payer categories
pub const PAYER_CATEGORY_LIST: &str = "#InsurerAccordion";

/// Eligibility form submit button
pub const SUBMIT_INQUIRY: &str = "#btnUploadButton";

/// Container holding a successful eligibility report
pub const REPORT_CONTAINER: &str = "#eligibilityRequestResponse";

/// Container holding form validation errors
pub const VALIDATION_ERRORS: &str = "#EligibilityValidationErrors";

/// Written to the status column when a record is claimed
pub const CLAIM_MARKER: &str = "Processing...";

/// Evidence reference when capture or upload fails
pub const UPLOAD_FAILED: &str = "Drive Upload Failed";

/// Report field value when the model could not locate it
pub const NOT_FOUND: &str = "Not Found";

/// Status and policy-begin value when the report could not be parsed
pub const AI_ERROR: &str = "AI Error";

/// Selector for the payer entries under one category
///
/// Categories are `<li>` elements whose id is the category's visible text.
pub fn payer_sublist(category_text: &str) -> String {
    format!(
        "li[id='{}'] ul.insurersDetail",
        crate::browser::query::css_string(category_text)
    )
}
