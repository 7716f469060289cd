//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. Built once at startup and handed to each component
//! by reference; nothing below this module reads the environment.

use crate::error::ConfigError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Values that mean "not filled in yet" in a copied `.env` template
const PLACEHOLDERS: &[&str] = &["", "changeme", "your-api-key", "YOUR_GEMINI_API_KEY_HERE"];

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Reasoning service configuration
    pub gemini: GeminiConfig,
    /// Remote portal configuration
    pub portal: PortalConfig,
    /// Spreadsheet and artifact store configuration
    pub google: GoogleConfig,
    /// WebDriver configuration
    pub browser: BrowserConfig,
    /// Local file locations
    pub paths: PathsConfig,
    /// Poll intervals, backoffs, and UI timeouts
    pub timing: TimingConfig,
}

/// Gemini API configuration
#[derive(Clone)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,
    /// Model name
    pub model: String,
    /// API base URL
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

/// Remote portal configuration
#[derive(Clone)]
pub struct PortalConfig {
    /// Scheme and host, without trailing slash
    pub base_url: String,
    /// Path of the login form
    pub login_path: String,
    /// Path of the authenticated landing page
    pub landing_path: String,
    /// Path of the eligibility lookup entry page
    pub eligibility_path: String,
    /// Login user name
    pub username: String,
    /// Login password
    pub password: String,
    /// Visible text of the registered passcode contact method
    pub otp_contact: String,
}

/// Google Sheets / Drive configuration
#[derive(Clone)]
pub struct GoogleConfig {
    /// Service-account key file
    pub service_account_file: PathBuf,
    /// Pre-issued access token; takes precedence over the key file
    pub access_token: Option<String>,
    /// Spreadsheet holding the work queue
    pub spreadsheet_id: String,
    /// Worksheet name
    pub sheet_name: String,
    /// Drive folder receiving screenshots
    pub drive_folder_id: String,
}

/// WebDriver configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver, selenium)
    pub webdriver_url: String,
    /// Run the browser without a window
    pub headless: bool,
}

/// Local file locations
#[derive(Debug, Clone)]
pub struct PathsConfig {
    /// Persisted session state
    pub session_state_file: PathBuf,
    /// Directory for evidence screenshots
    pub screenshot_dir: PathBuf,
}

/// Poll intervals, backoffs, and UI timeouts
#[derive(Debug, Clone)]
pub struct TimingConfig {
    /// Sleep when no claimable record exists
    pub poll_interval: Duration,
    /// Sleep after a queue-backend error
    pub backend_backoff: Duration,
    /// Sleep after any other main-loop error
    pub error_backoff: Duration,
    /// Page navigation bound
    pub navigation_timeout: Duration,
    /// Bound for the post-login marker when validating a restored session
    pub session_check_timeout: Duration,
    /// Bound for reaching the landing page after passcode submission
    pub otp_verify_timeout: Duration,
    /// Bound for the payer category list to become visible
    pub payer_list_timeout: Duration,
    /// Bound for the report or validation-error container after submission
    pub response_timeout: Duration,
    /// Pause after clicking a payer category
    pub category_settle: Duration,
    /// Pause after clicking a payer entry
    pub payer_settle: Duration,
    /// Delay between passcode keystrokes
    pub otp_key_delay: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            backend_backoff: Duration::from_secs(300),
            error_backoff: Duration::from_secs(60),
            navigation_timeout: Duration::from_secs(60),
            session_check_timeout: Duration::from_secs(15),
            otp_verify_timeout: Duration::from_secs(30),
            payer_list_timeout: Duration::from_secs(30),
            response_timeout: Duration::from_secs(45),
            category_settle: Duration::from_millis(1000),
            payer_settle: Duration::from_millis(2000),
            otp_key_delay: Duration::from_millis(100),
        }
    }
}

impl PortalConfig {
    /// Absolute URL of the login form
    pub fn login_url(&self) -> String {
        format!("{}{}", self.base_url, self.login_path)
    }

    /// Absolute URL of the landing page
    pub fn landing_url(&self) -> String {
        format!("{}{}", self.base_url, self.landing_path)
    }

    /// Absolute URL of the eligibility lookup page
    pub fn eligibility_url(&self) -> String {
        format!("{}{}", self.base_url, self.eligibility_path)
    }
}

// Credentials stay out of debug output.
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("otp_contact", &self.otp_contact)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("service_account_file", &self.service_account_file)
            .field("access_token", &self.access_token.as_ref().map(|_| "<set>"))
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("sheet_name", &self.sheet_name)
            .field("drive_folder_id", &self.drive_folder_id)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables with defaults
    ///
    /// Only malformed values fail here; missing credentials are reported by
    /// [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = TimingConfig::default();

        Ok(Self {
            gemini: GeminiConfig {
                api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
                model: var_or("GEMINI_MODEL", "gemini-2.0-flash-lite"),
                base_url: var_or(
                    "GEMINI_API_BASE_URL",
                    "https://generativelanguage.googleapis.com/v1beta",
                ),
                timeout: secs_or("GEMINI_TIMEOUT_SECS", Duration::from_secs(30))?,
            },
            portal: PortalConfig {
                base_url: var_or("PORTAL_BASE_URL", "https://mytools.gatewayedi.com")
                    .trim_end_matches('/')
                    .to_string(),
                login_path: "/LogOn".to_string(),
                landing_path: "/default.aspx".to_string(),
                eligibility_path: "/ManagePatients/RealTimeEligibility/Index".to_string(),
                username: env::var("PORTAL_USERNAME").unwrap_or_default(),
                password: env::var("PORTAL_PASSWORD").unwrap_or_default(),
                otp_contact: env::var("PORTAL_OTP_CONTACT").unwrap_or_default(),
            },
            google: GoogleConfig {
                service_account_file: PathBuf::from(var_or(
                    "GOOGLE_SERVICE_ACCOUNT_FILE",
                    "credentials.json",
                )),
                access_token: env::var("GOOGLE_ACCESS_TOKEN")
                    .ok()
                    .filter(|t| !t.trim().is_empty()),
                spreadsheet_id: env::var("SPREADSHEET_ID").unwrap_or_default(),
                sheet_name: var_or("SHEET_NAME", "Sheet1"),
                drive_folder_id: env::var("DRIVE_FOLDER_ID").unwrap_or_default(),
            },
            browser: BrowserConfig {
                webdriver_url: var_or("WEBDRIVER_URL", "http://localhost:4444"),
                headless: parse_or("BROWSER_HEADLESS", true)?,
            },
            paths: PathsConfig {
                session_state_file: PathBuf::from(var_or(
                    "SESSION_STATE_FILE",
                    "login_state.json",
                )),
                screenshot_dir: PathBuf::from(var_or("SCREENSHOT_DIR", "Screenshots")),
            },
            timing: TimingConfig {
                poll_interval: secs_or("CHECK_INTERVAL_SECS", defaults.poll_interval)?,
                backend_backoff: secs_or("BACKEND_BACKOFF_SECS", defaults.backend_backoff)?,
                error_backoff: secs_or("ERROR_BACKOFF_SECS", defaults.error_backoff)?,
                navigation_timeout: secs_or(
                    "NAVIGATION_TIMEOUT_SECS",
                    defaults.navigation_timeout,
                )?,
                session_check_timeout: secs_or(
                    "SESSION_CHECK_TIMEOUT_SECS",
                    defaults.session_check_timeout,
                )?,
                otp_verify_timeout: secs_or(
                    "OTP_VERIFY_TIMEOUT_SECS",
                    defaults.otp_verify_timeout,
                )?,
                payer_list_timeout: secs_or(
                    "PAYER_LIST_TIMEOUT_SECS",
                    defaults.payer_list_timeout,
                )?,
                response_timeout: secs_or("RESPONSE_TIMEOUT_SECS", defaults.response_timeout)?,
                category_settle: millis_or("CATEGORY_SETTLE_MS", defaults.category_settle)?,
                payer_settle: millis_or("PAYER_SETTLE_MS", defaults.payer_settle)?,
                otp_key_delay: millis_or("OTP_KEY_DELAY_MS", defaults.otp_key_delay)?,
            },
        })
    }

    /// Check that every credential the service needs has been supplied
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("GEMINI_API_KEY", &self.gemini.api_key),
            ("PORTAL_USERNAME", &self.portal.username),
            ("PORTAL_PASSWORD", &self.portal.password),
            ("PORTAL_OTP_CONTACT", &self.portal.otp_contact),
            ("SPREADSHEET_ID", &self.google.spreadsheet_id),
            ("DRIVE_FOLDER_ID", &self.google.drive_folder_id),
        ];
        for (name, value) in required {
            if PLACEHOLDERS.contains(&value.trim()) {
                return Err(ConfigError::Missing(name));
            }
        }
        Ok(())
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        _ => Ok(default),
    }
}

fn secs_or(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_or(name, default.as_secs()).map(Duration::from_secs)
}

fn millis_or(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_or(name, default.as_millis() as u64).map(Duration::from_millis)
}
