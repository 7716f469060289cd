//! Browser automation surface
//!
//! The pipeline drives the portal exclusively through [`BrowserPage`]: CSS
//! selectors and exact visible-text matches against live markup. Every wait
//! is bounded by an explicit timeout.

pub mod query;
pub mod webdriver;

use crate::error::UiError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

pub use webdriver::WebDriverPage;

/// Cookies and local storage captured from an authenticated page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageState {
    /// Cookies visible to the current origin
    pub cookies: Vec<StoredCookie>,
    /// `window.localStorage` entries of the current origin
    #[serde(default)]
    pub local_storage: BTreeMap<String, String>,
}

/// A cookie in a serializable form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    /// Cookie name
    pub name: String,
    /// Cookie value
    pub value: String,
    /// Domain attribute
    #[serde(default)]
    pub domain: Option<String>,
    /// Path attribute
    #[serde(default)]
    pub path: Option<String>,
    /// Secure flag
    #[serde(default)]
    pub secure: bool,
    /// HttpOnly flag
    #[serde(default)]
    pub http_only: bool,
}

/// One browser tab, owned by the orchestrator for the process lifetime
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the document to load
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), UiError>;

    /// URL currently displayed
    async fn current_url(&self) -> Result<String, UiError>;

    /// Wait until an element matching `selector` is visible
    async fn wait_visible(&self, selector: &str, timeout: Duration) -> Result<(), UiError>;

    /// Wait until any of `selectors` is visible and return its index
    async fn wait_for_first(&self, selectors: &[&str], timeout: Duration)
        -> Result<usize, UiError>;

    /// Wait until the current URL contains `fragment`
    async fn wait_for_url(&self, fragment: &str, timeout: Duration) -> Result<(), UiError>;

    /// Whether an element matching `selector` is currently visible
    async fn is_visible(&self, selector: &str) -> Result<bool, UiError>;

    /// Inner markup of the single element matching `selector`
    async fn inner_html(&self, selector: &str) -> Result<String, UiError>;

    /// Rendered text of the single element matching `selector`
    async fn inner_text(&self, selector: &str) -> Result<String, UiError>;

    /// Check that `selector` resolves to exactly one fillable text input
    async fn check_fillable(&self, selector: &str) -> Result<(), UiError>;

    /// Replace the value of the single text input matching `selector`
    async fn fill(&self, selector: &str, value: &str) -> Result<(), UiError>;

    /// Type into the single input matching `selector` one key at a time
    async fn type_slowly(&self, selector: &str, value: &str, delay: Duration)
        -> Result<(), UiError>;

    /// Click the first visible element matching `selector`
    async fn click(&self, selector: &str) -> Result<(), UiError>;

    /// Click the one visible element inside `scope` whose text is exactly `text`
    ///
    /// Zero matches is [`UiError::NotFound`]; more than one is
    /// [`UiError::Ambiguous`]. There is no fuzzy fallback.
    async fn click_text(&self, scope: &str, text: &str) -> Result<(), UiError>;

    /// PNG of the element matching `selector`, or of the viewport
    async fn screenshot(&self, selector: Option<&str>) -> Result<Vec<u8>, UiError>;

    /// Capture cookies and local storage for the current origin
    async fn export_state(&self) -> Result<StorageState, UiError>;

    /// Load `state` into the browser, navigating to `origin` first
    ///
    /// The navigation is bounded by `timeout` like [`BrowserPage::goto`].
    async fn import_state(
        &self,
        origin: &str,
        state: &StorageState,
        timeout: Duration,
    ) -> Result<(), UiError>;

    /// Drop all cookies and local storage
    async fn clear_state(&self) -> Result<(), UiError>;
}
