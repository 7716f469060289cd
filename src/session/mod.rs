//! Portal session lifecycle
//!
//! [`SessionManager`] owns the authenticated state of the shared browser tab.
//! It restores a saved session when one exists, validates it against the
//! landing page, and otherwise runs the credential + one-time passcode login
//! and saves the result for the next start.
//!
//! ```text
//! NoSession -> Validating -> Ready
//!                   |
//!                   +-> LoggingIn -> AwaitingOtp -> Verified -> Ready
//! ```

pub mod otp;
pub mod persistence;

use crate::browser::BrowserPage;
use crate::config::{PortalConfig, TimingConfig};
use crate::constants::{
    LANDING_URL_FRAGMENT, LOGIN_PASSWORD, LOGIN_SUBMIT, LOGIN_USERNAME, OTP_INPUT, OTP_VERIFY,
    PAGE_BODY, POST_LOGIN_MARKER,
};
use crate::error::{SessionError, UiError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

pub use otp::{OtpSource, StdinOtpSource};
pub use persistence::{SavedSession, SessionStore};

/// Delay between attempts to find the passcode contact option
const CONTACT_RETRY: Duration = Duration::from_millis(500);

/// Where the manager is in the login state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No authenticated state in the browser
    NoSession,
    /// Probing restored or existing state for the post-login marker
    Validating,
    /// Submitting credentials
    LoggingIn,
    /// Waiting for the operator's passcode
    AwaitingOtp,
    /// Passcode accepted, landing page reached
    Verified,
    /// Authenticated and validated
    Ready,
}

/// Proof that the browser holds a validated, authenticated session
///
/// Only [`SessionManager::ensure_ready`] can produce one, so components that
/// take `&Session` cannot be driven before login.
#[derive(Debug, Clone)]
pub struct Session {
    restored: bool,
    validated_at: DateTime<Utc>,
}

impl Session {
    fn new(restored: bool) -> Self {
        Self {
            restored,
            validated_at: Utc::now(),
        }
    }

    /// Whether the session came from saved state rather than a fresh login
    pub fn restored(&self) -> bool {
        self.restored
    }

    /// When the session was last confirmed valid
    pub fn validated_at(&self) -> DateTime<Utc> {
        self.validated_at
    }
}

/// Establishes and re-validates the portal session
pub struct SessionManager {
    page: Arc<dyn BrowserPage>,
    portal: PortalConfig,
    timing: TimingConfig,
    store: SessionStore,
    otp: Arc<dyn OtpSource>,
    phase: SessionPhase,
}

impl SessionManager {
    /// Create a manager for `page`
    pub fn new(
        page: Arc<dyn BrowserPage>,
        portal: &PortalConfig,
        timing: &TimingConfig,
        store: SessionStore,
        otp: Arc<dyn OtpSource>,
    ) -> Self {
        Self {
            page,
            portal: portal.clone(),
            timing: timing.clone(),
            store,
            otp,
            phase: SessionPhase::NoSession,
        }
    }

    /// Current state machine phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Return a validated session, logging in if necessary
    ///
    /// Safe to call before every record: a live session is re-checked, a saved
    /// one is restored and checked, and only when both fail does a fresh login
    /// (with its operator passcode prompt) run.
    ///
    /// # Errors
    /// * `SessionError::OtpUnavailable` - no passcode could be read (fatal)
    /// * any other `SessionError` - the login sequence failed
    pub async fn ensure_ready(&mut self) -> Result<Session, SessionError> {
        if self.phase == SessionPhase::Ready {
            self.transition(SessionPhase::Validating);
            match self.check_marker().await {
                Ok(()) => {
                    self.transition(SessionPhase::Ready);
                    return Ok(Session::new(false));
                }
                Err(e) => {
                    warn!(error = %e, "Active session is no longer valid");
                    self.discard().await;
                }
            }
        } else if let Some(saved) = self.store.load_or_discard() {
            info!(
                saved_at = %saved.saved_at,
                cookies = saved.state.cookies.len(),
                "Found saved session, attempting to reuse it"
            );
            self.transition(SessionPhase::Validating);
            let nav = self.timing.navigation_timeout;
            let restored = match self.page.import_state(&saved.origin, &saved.state, nav).await {
                Ok(()) => self.check_marker().await,
                Err(e) => Err(e),
            };
            match restored {
                Ok(()) => {
                    info!("Saved session is valid, login skipped");
                    self.transition(SessionPhase::Ready);
                    return Ok(Session::new(true));
                }
                Err(e) => {
                    warn!(error = %e, "Saved session invalid, a new login is required");
                    self.discard().await;
                }
            }
        }

        self.login().await
    }

    /// Mark the live session as suspect so the next call re-validates it
    pub fn invalidate(&mut self) {
        if self.phase == SessionPhase::Ready {
            debug!("Session marked for re-validation");
            self.transition(SessionPhase::NoSession);
        }
    }

    async fn check_marker(&self) -> Result<(), UiError> {
        self.page
            .goto(&self.portal.landing_url(), self.timing.navigation_timeout)
            .await?;
        self.page
            .wait_visible(POST_LOGIN_MARKER, self.timing.session_check_timeout)
            .await
    }

    async fn discard(&mut self) {
        self.store.discard();
        if let Err(e) = self.page.clear_state().await {
            warn!(error = %e, "Failed to clear browser state");
        }
        self.transition(SessionPhase::NoSession);
    }

    async fn login(&mut self) -> Result<Session, SessionError> {
        info!(username = %self.portal.username, "Performing new portal login");
        self.transition(SessionPhase::LoggingIn);

        let page = Arc::clone(&self.page);
        let nav = self.timing.navigation_timeout;

        page.goto(&self.portal.login_url(), nav)
            .await
            .map_err(|e| login_step("open login page", e))?;
        page.fill(LOGIN_USERNAME, &self.portal.username)
            .await
            .map_err(|e| login_step("enter username", e))?;
        page.fill(LOGIN_PASSWORD, &self.portal.password)
            .await
            .map_err(|e| login_step("enter password", e))?;
        page.click(LOGIN_SUBMIT)
            .await
            .map_err(|e| login_step("submit credentials", e))?;

        self.transition(SessionPhase::AwaitingOtp);
        self.select_contact(nav)
            .await
            .map_err(|e| login_step("select passcode contact", e))?;
        page.wait_visible(OTP_INPUT, nav)
            .await
            .map_err(|e| login_step("open passcode form", e))?;

        let code = self.otp.request_code(&self.portal.otp_contact).await?;
        info!(code_len = code.len(), "Passcode received, verifying");

        page.type_slowly(OTP_INPUT, &code, self.timing.otp_key_delay)
            .await
            .map_err(|e| login_step("enter passcode", e))?;
        page.click(OTP_VERIFY)
            .await
            .map_err(|e| login_step("verify passcode", e))?;
        page.wait_for_url(LANDING_URL_FRAGMENT, self.timing.otp_verify_timeout)
            .await
            .map_err(SessionError::VerificationFailed)?;
        self.transition(SessionPhase::Verified);

        let state = page
            .export_state()
            .await
            .map_err(|e| login_step("capture session state", e))?;
        self.store.save(&self.portal.base_url, &state)?;
        info!(
            path = %self.store.path().display(),
            cookies = state.cookies.len(),
            "Login successful, session saved"
        );

        self.transition(SessionPhase::Ready);
        Ok(Session::new(false))
    }

    /// Click the registered contact method once the challenge page renders
    async fn select_contact(&self, limit: Duration) -> Result<(), UiError> {
        let deadline = Instant::now() + limit;
        loop {
            match self
                .page
                .click_text(PAGE_BODY, &self.portal.otp_contact)
                .await
            {
                Ok(()) => return Ok(()),
                Err(UiError::NotFound(_)) if Instant::now() < deadline => {
                    sleep(CONTACT_RETRY).await;
                }
                Err(UiError::NotFound(_)) => {
                    return Err(UiError::Timeout {
                        what: format!("passcode contact '{}'", self.portal.otp_contact),
                        timeout: limit,
                    })
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!(from = ?self.phase, to = ?next, "Session phase change");
        self.phase = next;
    }
}

fn login_step(step: &'static str, source: UiError) -> SessionError {
    SessionError::Login { step, source }
}
