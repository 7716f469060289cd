//! Shared in-memory fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use eligibility_bot::browser::{BrowserPage, StorageState, StoredCookie};
use eligibility_bot::config::{PortalConfig, TimingConfig};
use eligibility_bot::constants::{
    OTP_INPUT, OTP_VERIFY, POST_LOGIN_MARKER, SUBMIT_INQUIRY,
};
use eligibility_bot::error::{PlanError, QueueError, SessionError, UiError, UploadError};
use eligibility_bot::evidence::ArtifactStore;
use eligibility_bot::planner::LanguageModel;
use eligibility_bot::queue::QueueBackend;
use eligibility_bot::session::OtpSource;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const PORTAL: &str = "https://portal.test";
pub const VALID_COOKIE: &str = "valid";

pub fn portal() -> PortalConfig {
    PortalConfig {
        base_url: PORTAL.to_string(),
        login_path: "/LogOn".to_string(),
        landing_path: "/default.aspx".to_string(),
        eligibility_path: "/ManagePatients/RealTimeEligibility/Index".to_string(),
        username: "operator".to_string(),
        password: "hunter2".to_string(),
        otp_contact: "Text to (XXX) XXX-1234".to_string(),
    }
}

pub fn fast_timing() -> TimingConfig {
    let tick = Duration::from_millis(5);
    TimingConfig {
        poll_interval: tick,
        backend_backoff: tick,
        error_backoff: tick,
        navigation_timeout: Duration::from_millis(50),
        session_check_timeout: Duration::from_millis(20),
        otp_verify_timeout: Duration::from_millis(20),
        payer_list_timeout: Duration::from_millis(20),
        response_timeout: Duration::from_millis(20),
        category_settle: Duration::ZERO,
        payer_settle: Duration::ZERO,
        otp_key_delay: Duration::ZERO,
    }
}

pub fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

pub fn header() -> Vec<String> {
    row(&[
        "DOS", "First", "Last", "DOB", "Payer", "Member ID", "Status", "Begin", "End", "Evidence",
    ])
}

pub fn jane_doe() -> Vec<String> {
    row(&["01/01/2025", "Jane", "Doe", "01/01/1990", "UMR", "M12345"])
}

#[derive(Default)]
struct PageState {
    logged_in: bool,
    cookies: Vec<StoredCookie>,
    visible: HashSet<String>,
    shown_after_submit: Vec<String>,
    html: HashMap<String, String>,
    text: HashMap<String, String>,
    fillable: HashSet<String>,
    clickable: HashMap<String, Vec<String>>,
    actions: Vec<String>,
    fail_screenshots: bool,
    hang_on_restore: bool,
    not_rendered: HashMap<String, usize>,
}

/// Scripted page; the post-login marker is visible only while logged in
#[derive(Default)]
pub struct FakePage {
    state: Mutex<PageState>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logged_in(self) -> Self {
        self.state.lock().unwrap().logged_in = true;
        self
    }

    pub fn show(self, selector: &str) -> Self {
        self.state.lock().unwrap().visible.insert(selector.to_string());
        self
    }

    pub fn show_after_submit(self, selector: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .shown_after_submit
            .push(selector.to_string());
        self
    }

    pub fn html(self, selector: &str, html: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .html
            .insert(selector.to_string(), html.to_string());
        self
    }

    pub fn text(self, selector: &str, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .text
            .insert(selector.to_string(), text.to_string());
        self
    }

    pub fn fillable(self, selector: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .fillable
            .insert(selector.to_string());
        self
    }

    /// Make `text` clickable inside `scope`; repeat to create duplicates
    pub fn clickable(self, scope: &str, text: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .clickable
            .entry(scope.to_string())
            .or_default()
            .push(text.to_string());
        self
    }

    /// Nothing inside `scope` is clickable for the first `attempts` clicks
    pub fn not_rendered_for(self, scope: &str, attempts: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .not_rendered
            .insert(scope.to_string(), attempts);
        self
    }

    /// Restoring saved state never finishes loading the origin
    pub fn hanging_restore(self) -> Self {
        self.state.lock().unwrap().hang_on_restore = true;
        self
    }

    pub fn failing_screenshots(self) -> Self {
        self.state.lock().unwrap().fail_screenshots = true;
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.state.lock().unwrap().logged_in
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.actions()
            .iter()
            .filter(|a| a.starts_with(prefix))
            .count()
    }

    fn record(&self, action: String) {
        self.state.lock().unwrap().actions.push(action);
    }

    fn visible_now(&self, selector: &str) -> bool {
        let state = self.state.lock().unwrap();
        if selector == POST_LOGIN_MARKER {
            state.logged_in
        } else {
            state.visible.contains(selector)
        }
    }
}

fn timeout(what: &str, timeout: Duration) -> UiError {
    UiError::Timeout {
        what: what.to_string(),
        timeout,
    }
}

#[async_trait]
impl BrowserPage for FakePage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), UiError> {
        self.record(format!("goto {}", url));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, UiError> {
        Ok(format!("{}/default.aspx", PORTAL))
    }

    async fn wait_visible(&self, selector: &str, limit: Duration) -> Result<(), UiError> {
        if self.visible_now(selector) {
            Ok(())
        } else {
            Err(timeout(selector, limit))
        }
    }

    async fn wait_for_first(&self, selectors: &[&str], limit: Duration) -> Result<usize, UiError> {
        selectors
            .iter()
            .position(|s| self.visible_now(s))
            .ok_or_else(|| timeout(&selectors.join(", "), limit))
    }

    async fn wait_for_url(&self, fragment: &str, limit: Duration) -> Result<(), UiError> {
        if self.is_logged_in() {
            Ok(())
        } else {
            Err(timeout(fragment, limit))
        }
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, UiError> {
        Ok(self.visible_now(selector))
    }

    async fn inner_html(&self, selector: &str) -> Result<String, UiError> {
        self.state
            .lock()
            .unwrap()
            .html
            .get(selector)
            .cloned()
            .ok_or_else(|| UiError::NotFound(selector.to_string()))
    }

    async fn inner_text(&self, selector: &str) -> Result<String, UiError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .text
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn check_fillable(&self, selector: &str) -> Result<(), UiError> {
        self.record(format!("check {}", selector));
        if self.state.lock().unwrap().fillable.contains(selector) {
            Ok(())
        } else {
            Err(UiError::NotFound(selector.to_string()))
        }
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), UiError> {
        self.record(format!("fill {}={}", selector, value));
        Ok(())
    }

    async fn type_slowly(&self, selector: &str, value: &str, _delay: Duration) -> Result<(), UiError> {
        self.record(format!("type {}={}", selector, value));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), UiError> {
        self.record(format!("click {}", selector));
        let mut state = self.state.lock().unwrap();
        if selector == SUBMIT_INQUIRY {
            let shown = state.shown_after_submit.clone();
            state.visible.extend(shown);
        } else if selector == OTP_VERIFY {
            state.logged_in = true;
        }
        Ok(())
    }

    async fn click_text(&self, scope: &str, text: &str) -> Result<(), UiError> {
        self.record(format!("click_text {} | {}", scope, text));
        let mut state = self.state.lock().unwrap();
        if let Some(remaining) = state.not_rendered.get_mut(scope) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(UiError::NotFound(format!("text '{}' in {}", text, scope)));
            }
        }
        let count = state
            .clickable
            .get(scope)
            .map(|texts| texts.iter().filter(|t| t.as_str() == text).count())
            .unwrap_or(0);
        match count {
            0 => Err(UiError::NotFound(format!("text '{}' in {}", text, scope))),
            1 => Ok(()),
            count => Err(UiError::Ambiguous {
                target: text.to_string(),
                count,
            }),
        }
    }

    async fn screenshot(&self, selector: Option<&str>) -> Result<Vec<u8>, UiError> {
        self.record(format!("screenshot {}", selector.unwrap_or("page")));
        if self.state.lock().unwrap().fail_screenshots {
            return Err(UiError::Driver("screenshot failed".to_string()));
        }
        Ok(b"\x89PNG".to_vec())
    }

    async fn export_state(&self) -> Result<StorageState, UiError> {
        Ok(StorageState {
            cookies: vec![StoredCookie {
                name: "ASP.NET_SessionId".to_string(),
                value: VALID_COOKIE.to_string(),
                domain: Some("portal.test".to_string()),
                path: Some("/".to_string()),
                secure: true,
                http_only: true,
            }],
            local_storage: Default::default(),
        })
    }

    async fn import_state(
        &self,
        origin: &str,
        state: &StorageState,
        limit: Duration,
    ) -> Result<(), UiError> {
        self.record(format!("import {}", origin));
        if self.state.lock().unwrap().hang_on_restore {
            return Err(timeout(&format!("navigation to {}", origin), limit));
        }
        let mut page = self.state.lock().unwrap();
        page.cookies = state.cookies.clone();
        page.logged_in = state.cookies.iter().any(|c| c.value == VALID_COOKIE);
        Ok(())
    }

    async fn clear_state(&self) -> Result<(), UiError> {
        self.record("clear".to_string());
        let mut page = self.state.lock().unwrap();
        page.cookies.clear();
        page.logged_in = false;
        Ok(())
    }
}

/// Answers prompts from a queue and keeps every prompt it saw
pub struct FakeModel {
    responses: Mutex<VecDeque<Result<String, PlanError>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new(responses: Vec<Result<String, PlanError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(answers: &[&str]) -> Self {
        Self::new(answers.iter().map(|a| Ok(a.to_string())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for FakeModel {
    async fn complete(&self, prompt: &str) -> Result<String, PlanError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PlanError::Model("no canned response left".to_string())))
    }
}

/// Sheet held in memory; every cell write is logged
#[derive(Default)]
pub struct MemoryQueue {
    rows: Mutex<Vec<Vec<String>>>,
    writes: Mutex<Vec<(usize, usize, String)>>,
    fail_reads: AtomicBool,
}

impl MemoryQueue {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<Vec<String>> {
        self.rows.lock().unwrap().clone()
    }

    pub fn cell(&self, row: usize, column: usize) -> String {
        self.rows()
            .get(row - 1)
            .and_then(|r| r.get(column))
            .cloned()
            .unwrap_or_default()
    }

    pub fn writes(&self) -> Vec<(usize, usize, String)> {
        self.writes.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueueBackend for MemoryQueue {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>, QueueError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(QueueError::RateLimited("quota exceeded".to_string()));
        }
        Ok(self.rows())
    }

    async fn update_cell(&self, row: usize, column: usize, value: &str) -> Result<(), QueueError> {
        let mut rows = self.rows.lock().unwrap();
        let cells = rows
            .get_mut(row - 1)
            .ok_or_else(|| QueueError::Transport(format!("row {} out of range", row)))?;
        if cells.len() <= column {
            cells.resize(column + 1, String::new());
        }
        cells[column] = value.to_string();
        self.writes
            .lock()
            .unwrap()
            .push((row, column, value.to_string()));
        Ok(())
    }
}

/// Artifact store that succeeds with a predictable link, or always fails
pub struct FakeStore {
    fail: bool,
    uploads: Mutex<Vec<String>>,
}

impl FakeStore {
    pub fn ok() -> Self {
        Self {
            fail: false,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactStore for FakeStore {
    async fn upload(&self, path: &Path, name: &str) -> Result<String, UploadError> {
        assert!(path.exists(), "screenshot should be written before upload");
        self.uploads.lock().unwrap().push(name.to_string());
        if self.fail {
            return Err(UploadError::Store("quota exceeded".to_string()));
        }
        Ok(format!("https://drive.test/{}", name))
    }
}

/// Passcode source with a fixed answer
pub struct FakeOtp {
    code: Option<String>,
    calls: AtomicUsize,
}

impl FakeOtp {
    pub fn code(code: &str) -> Self {
        Self {
            code: Some(code.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            code: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OtpSource for FakeOtp {
    async fn request_code(&self, _contact: &str) -> Result<String, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.code
            .clone()
            .ok_or_else(|| SessionError::OtpUnavailable("stdin closed".to_string()))
    }
}

/// Selectors a login needs to succeed
pub fn login_ready(page: FakePage) -> FakePage {
    let contact = portal().otp_contact;
    page.show(OTP_INPUT)
        .clickable("body", &contact)
}
