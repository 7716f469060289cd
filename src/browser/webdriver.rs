//! WebDriver implementation of [`BrowserPage`]
//!
//! Talks to chromedriver (or any W3C WebDriver endpoint) through
//! `fantoccini`. Waits are implemented as bounded polls so that visibility,
//! not mere presence, decides when an element is ready.

use super::{query, BrowserPage, StorageState, StoredCookie};
use crate::config::BrowserConfig;
use crate::error::UiError;
use async_trait::async_trait;
use fantoccini::cookies::Cookie;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::json;
use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};

/// Interval between visibility checks
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Input types that accept free text
const FILLABLE_TYPES: &[&str] = &[
    "text", "search", "tel", "email", "password", "number", "date", "",
];

const READ_LOCAL_STORAGE: &str =
    "return JSON.stringify(Object.assign({}, window.localStorage));";

const WRITE_LOCAL_STORAGE: &str =
    "for (const [k, v] of Object.entries(arguments[0])) { window.localStorage.setItem(k, v); }";

/// A single WebDriver session
pub struct WebDriverPage {
    client: Client,
}

impl WebDriverPage {
    /// Start a Chrome session on the configured WebDriver endpoint
    pub async fn connect(config: &BrowserConfig) -> Result<Self, UiError> {
        let mut args = vec!["--window-size=1920,1080", "--disable-gpu"];
        if config.headless {
            args.push("--headless=new");
        }

        let mut caps = serde_json::Map::new();
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));

        let client = ClientBuilder::native()
            .capabilities(caps)
            .connect(&config.webdriver_url)
            .await
            .map_err(|e| UiError::Driver(format!("Failed to start WebDriver session: {}", e)))?;

        info!(
            webdriver_url = %config.webdriver_url,
            headless = config.headless,
            "Browser session started"
        );
        Ok(Self { client })
    }

    /// End the WebDriver session and close the browser
    pub async fn close(&self) -> Result<(), UiError> {
        self.client.clone().close().await?;
        Ok(())
    }

    async fn single(&self, selector: &str) -> Result<Element, UiError> {
        let mut matches = self.client.find_all(Locator::Css(selector)).await?;
        match matches.len() {
            0 => Err(UiError::NotFound(selector.to_string())),
            1 => Ok(matches.remove(0)),
            count => Err(UiError::Ambiguous {
                target: selector.to_string(),
                count,
            }),
        }
    }

    async fn first_visible(&self, selector: &str) -> Result<Option<Element>, UiError> {
        let matches = self.client.find_all(Locator::Css(selector)).await?;
        for element in matches {
            if element.is_displayed().await.unwrap_or(false) {
                return Ok(Some(element));
            }
        }
        Ok(None)
    }

    async fn fillable(&self, selector: &str) -> Result<Element, UiError> {
        let element = self.single(selector).await?;
        let tag = element
            .prop("tagName")
            .await?
            .unwrap_or_default()
            .to_ascii_lowercase();
        let kind = element
            .attr("type")
            .await?
            .unwrap_or_default()
            .to_ascii_lowercase();

        if tag == "input" && FILLABLE_TYPES.contains(&kind.as_str()) {
            Ok(element)
        } else {
            Err(UiError::NotFillable {
                selector: selector.to_string(),
                tag: if kind.is_empty() {
                    tag
                } else {
                    format!("{} type={}", tag, kind)
                },
            })
        }
    }
}

/// Re-run `check` until it yields a value or `limit` elapses
async fn poll_until<T, F, Fut>(what: &str, limit: Duration, mut check: F) -> Result<T, UiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + limit;
    loop {
        if let Some(value) = check().await {
            return Ok(value);
        }
        if Instant::now() >= deadline {
            return Err(UiError::Timeout {
                what: what.to_string(),
                timeout: limit,
            });
        }
        sleep(POLL_INTERVAL).await;
    }
}

#[async_trait]
impl BrowserPage for WebDriverPage {
    async fn goto(&self, url: &str, limit: Duration) -> Result<(), UiError> {
        debug!(url = %url, "Navigating");
        match timeout(limit, self.client.goto(url)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(UiError::Timeout {
                what: format!("navigation to {}", url),
                timeout: limit,
            }),
        }
    }

    async fn current_url(&self) -> Result<String, UiError> {
        Ok(self.client.current_url().await?.to_string())
    }

    async fn wait_visible(&self, selector: &str, limit: Duration) -> Result<(), UiError> {
        poll_until(selector, limit, || async move {
            match self.first_visible(selector).await {
                Ok(Some(_)) => Some(()),
                Ok(None) => None,
                Err(e) => {
                    debug!(selector = %selector, error = %e, "Visibility check failed");
                    None
                }
            }
        })
        .await
    }

    async fn wait_for_first(&self, selectors: &[&str], limit: Duration) -> Result<usize, UiError> {
        let what = selectors.join(", ");
        poll_until(&what, limit, || async move {
            for (index, selector) in selectors.iter().enumerate() {
                if let Ok(Some(_)) = self.first_visible(selector).await {
                    return Some(index);
                }
            }
            None
        })
        .await
    }

    async fn wait_for_url(&self, fragment: &str, limit: Duration) -> Result<(), UiError> {
        let what = format!("URL containing '{}'", fragment);
        poll_until(&what, limit, || async move {
            match self.client.current_url().await {
                Ok(url) if url.as_str().contains(fragment) => Some(()),
                _ => None,
            }
        })
        .await
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, UiError> {
        Ok(self.first_visible(selector).await?.is_some())
    }

    async fn inner_html(&self, selector: &str) -> Result<String, UiError> {
        Ok(self.single(selector).await?.html(true).await?)
    }

    async fn inner_text(&self, selector: &str) -> Result<String, UiError> {
        Ok(self.single(selector).await?.text().await?)
    }

    async fn check_fillable(&self, selector: &str) -> Result<(), UiError> {
        self.fillable(selector).await.map(|_| ())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), UiError> {
        let element = self.fillable(selector).await?;
        element.clear().await?;
        element.send_keys(value).await?;
        Ok(())
    }

    async fn type_slowly(&self, selector: &str, value: &str, delay: Duration) -> Result<(), UiError> {
        let element = self.single(selector).await?;
        element.clear().await?;
        let mut buf = [0u8; 4];
        for c in value.chars() {
            element.send_keys(c.encode_utf8(&mut buf)).await?;
            sleep(delay).await;
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), UiError> {
        let element = self
            .first_visible(selector)
            .await?
            .ok_or_else(|| UiError::NotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn click_text(&self, scope: &str, text: &str) -> Result<(), UiError> {
        let container = self.single(scope).await?;
        let xpath = query::exact_text_xpath(text);
        let candidates = container.find_all(Locator::XPath(&xpath)).await?;

        let mut visible = Vec::new();
        for element in candidates {
            if element.is_displayed().await.unwrap_or(false) {
                visible.push(element);
            }
        }

        match visible.len() {
            0 => Err(UiError::NotFound(format!("text '{}' within {}", text, scope))),
            1 => {
                visible[0].click().await?;
                Ok(())
            }
            count => Err(UiError::Ambiguous {
                target: format!("text '{}' within {}", text, scope),
                count,
            }),
        }
    }

    async fn screenshot(&self, selector: Option<&str>) -> Result<Vec<u8>, UiError> {
        match selector {
            Some(selector) => Ok(self.single(selector).await?.screenshot().await?),
            None => Ok(self.client.screenshot().await?),
        }
    }

    async fn export_state(&self) -> Result<StorageState, UiError> {
        let cookies = self
            .client
            .get_all_cookies()
            .await?
            .iter()
            .map(|c| StoredCookie {
                name: c.name().to_string(),
                value: c.value().to_string(),
                domain: c.domain().map(str::to_string),
                path: c.path().map(str::to_string),
                secure: c.secure().unwrap_or(false),
                http_only: c.http_only().unwrap_or(false),
            })
            .collect();

        let raw = self.client.execute(READ_LOCAL_STORAGE, vec![]).await?;
        let local_storage = raw
            .as_str()
            .and_then(|s| serde_json::from_str::<BTreeMap<String, String>>(s).ok())
            .unwrap_or_default();

        Ok(StorageState {
            cookies,
            local_storage,
        })
    }

    async fn import_state(
        &self,
        origin: &str,
        state: &StorageState,
        limit: Duration,
    ) -> Result<(), UiError> {
        // Cookies can only be set for the document's own domain.
        self.goto(origin, limit).await?;
        self.client.delete_all_cookies().await?;

        for stored in &state.cookies {
            let mut cookie = Cookie::new(stored.name.clone(), stored.value.clone());
            if let Some(domain) = &stored.domain {
                cookie.set_domain(domain.clone());
            }
            if let Some(path) = &stored.path {
                cookie.set_path(path.clone());
            }
            cookie.set_secure(stored.secure);
            cookie.set_http_only(stored.http_only);
            self.client.add_cookie(cookie).await?;
        }

        if !state.local_storage.is_empty() {
            self.client
                .execute(WRITE_LOCAL_STORAGE, vec![json!(state.local_storage)])
                .await?;
        }

        debug!(
            cookies = state.cookies.len(),
            local_storage = state.local_storage.len(),
            "Restored browser state"
        );
        Ok(())
    }

    async fn clear_state(&self) -> Result<(), UiError> {
        self.client.delete_all_cookies().await?;
        if let Err(e) = self
            .client
            .execute("window.localStorage.clear();", vec![])
            .await
        {
            debug!(error = %e, "Local storage not accessible on current page");
        }
        Ok(())
    }
}
