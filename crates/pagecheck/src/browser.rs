//! Chromium sessions over the Chrome `DevTools` Protocol.
//!
//! One browser process serves a whole run. Every [`ChromiumSession`] lives in
//! its own incognito browser context, so cookies, storage and cache never
//! leak between cases. Element queries are evaluated as JavaScript generated
//! by [`Locator`].

#![allow(clippy::significant_drop_tightening, clippy::missing_errors_doc)]

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::locator::Locator;
use crate::result::{PagecheckError, PagecheckResult};
use crate::session::{PageSession, SessionFactory};

/// How long a click may go without starting a navigation before it counts as in-page
const CLICK_GRACE: Duration = Duration::from_millis(300);

const SETTLE_INTERVAL: Duration = Duration::from_millis(50);

/// Marks the current document and flags it once it starts unloading
const MARK_DOCUMENT_JS: &str = "(() => { \
    window.__pcStale = true; \
    window.__pcLeaving = false; \
    const leave = () => { window.__pcLeaving = true; }; \
    addEventListener('beforeunload', leave, { once: true }); \
    addEventListener('pagehide', leave, { once: true }); \
    return true; })()";

const DOCUMENT_STATE_JS: &str = "window.__pcStale !== true \
    ? 'new:' + document.readyState \
    : (window.__pcLeaving === true ? 'leaving' : 'same')";

/// What the tab shows while a click settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentState {
    /// The clicked document, not unloading
    Unchanged,
    /// The clicked document, unloading
    Leaving,
    /// A document loaded after the click
    Replaced { complete: bool },
    /// Evaluation failed, usually because the old context was torn down
    Unreadable,
}

impl DocumentState {
    fn parse(raw: &str) -> Self {
        match raw {
            "same" => Self::Unchanged,
            "leaving" => Self::Leaving,
            other => match other.strip_prefix("new:") {
                Some(ready) => Self::Replaced {
                    complete: ready == "complete",
                },
                None => Self::Unreadable,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settle {
    Done,
    Wait,
    TimedOut,
}

/// One step of the post-click wait.
///
/// A click that never started a navigation settles after `grace`; once a
/// navigation was seen, only a completely loaded new document settles it.
fn settle_step(
    state: DocumentState,
    navigating: bool,
    elapsed: Duration,
    grace: Duration,
    timeout: Duration,
) -> Settle {
    match state {
        DocumentState::Replaced { complete: true } => Settle::Done,
        DocumentState::Unchanged if !navigating && elapsed >= grace => Settle::Done,
        _ if elapsed >= timeout => Settle::TimedOut,
        _ => Settle::Wait,
    }
}

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct ChromiumConfig {
    /// Run without a window
    pub headless: bool,
    /// Viewport width in pixels
    pub viewport_width: u32,
    /// Viewport height in pixels
    pub viewport_height: u32,
    /// Path to the Chromium executable (auto-detected when `None`)
    pub chromium_path: Option<String>,
    /// Keep the Chromium sandbox enabled
    pub sandbox: bool,
    /// Budget for one navigation to reach `load`
    pub navigation_timeout: Duration,
}

impl Default for ChromiumConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 800,
            chromium_path: None,
            sandbox: true,
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl ChromiumConfig {
    /// Set viewport size
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set Chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (needed in most containers)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    fn to_cdp(&self) -> PagecheckResult<CdpConfig> {
        let mut builder = CdpConfig::builder()
            .window_size(self.viewport_width, self.viewport_height)
            .request_timeout(self.navigation_timeout);
        if !self.headless {
            builder = builder.with_head();
        }
        if !self.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = self.chromium_path {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(|message| {
            if message.contains("detect") {
                PagecheckError::BrowserNotFound
            } else {
                PagecheckError::BrowserLaunch { message }
            }
        })
    }
}

/// Launches Chromium once and opens one incognito session per case
#[derive(Debug)]
pub struct ChromiumFactory {
    config: ChromiumConfig,
    browser: Arc<Mutex<CdpBrowser>>,
    handler: tokio::task::JoinHandle<()>,
}

impl ChromiumFactory {
    /// Launch the browser
    pub async fn launch(config: ChromiumConfig) -> PagecheckResult<Self> {
        let cdp_config = config.to_cdp()?;
        let (browser, mut handler) = CdpBrowser::launch(cdp_config).await.map_err(|e| {
            PagecheckError::BrowserLaunch {
                message: e.to_string(),
            }
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "cdp handler stopped");
                    break;
                }
            }
        });
        tracing::info!(headless = config.headless, "chromium launched");

        Ok(Self {
            config,
            browser: Arc::new(Mutex::new(browser)),
            handler,
        })
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChromiumConfig {
        &self.config
    }

    /// Close the browser process
    pub async fn shutdown(self) -> PagecheckResult<()> {
        {
            let mut browser = self.browser.lock().await;
            browser
                .close()
                .await
                .map_err(|e| PagecheckError::session(e.to_string()))?;
            let _ = browser.wait().await;
        }
        self.handler.abort();
        Ok(())
    }
}

#[async_trait]
impl SessionFactory for ChromiumFactory {
    async fn open(&self) -> PagecheckResult<Box<dyn PageSession>> {
        let mut browser = self.browser.lock().await;
        let context = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(|e| PagecheckError::session(format!("create context: {e}")))?;
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context.clone())
            .build()
            .map_err(PagecheckError::session)?;
        let page = browser
            .new_page(target)
            .await
            .map_err(|e| PagecheckError::session(format!("new page: {e}")))?;
        drop(browser);

        tracing::debug!(context = ?context, "session opened");
        Ok(Box::new(ChromiumSession {
            page,
            context,
            browser: Arc::clone(&self.browser),
            navigation_timeout: self.config.navigation_timeout,
        }))
    }
}

/// One incognito tab
#[derive(Debug)]
pub struct ChromiumSession {
    page: CdpPage,
    context: BrowserContextId,
    browser: Arc<Mutex<CdpBrowser>>,
    navigation_timeout: Duration,
}

impl ChromiumSession {
    async fn eval<T: DeserializeOwned>(&self, js: String) -> PagecheckResult<T> {
        let params = EvaluateParams::builder()
            .expression(js)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(PagecheckError::session)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| PagecheckError::session(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| PagecheckError::session(e.to_string()))
    }

    /// Evaluate a locator query, mapping selector syntax errors
    async fn query<T: DeserializeOwned>(
        &self,
        locator: &Locator,
        js: String,
    ) -> PagecheckResult<T> {
        self.eval(js).await.map_err(|e| match e {
            PagecheckError::Session { message }
                if message.contains("not a valid") || message.contains("SyntaxError") =>
            {
                PagecheckError::InvalidSelector {
                    selector: locator.to_string(),
                    message,
                }
            }
            other => other,
        })
    }

    /// HTTP status of the current document, 0 when unknown
    async fn response_status(&self) -> PagecheckResult<u16> {
        self.eval(
            "(() => { const e = performance.getEntriesByType('navigation')[0]; \
             return e && e.responseStatus ? e.responseStatus : 0; })()"
                .to_string(),
        )
        .await
    }

    /// Wait until a click either navigated and loaded, or clearly did not navigate
    async fn settle_after_click(&self) -> PagecheckResult<()> {
        let start = Instant::now();
        let mut navigating = false;
        loop {
            let state = self
                .eval::<String>(DOCUMENT_STATE_JS.to_string())
                .await
                .map_or(DocumentState::Unreadable, |raw| DocumentState::parse(&raw));
            navigating |= state != DocumentState::Unchanged;
            let elapsed = start.elapsed();
            match settle_step(state, navigating, elapsed, CLICK_GRACE, self.navigation_timeout) {
                Settle::Done => {
                    tracing::debug!(navigating, elapsed = ?elapsed, "click settled");
                    return Ok(());
                }
                Settle::TimedOut => {
                    return Err(PagecheckError::timeout(
                        "navigation after click",
                        u64::try_from(self.navigation_timeout.as_millis()).unwrap_or(u64::MAX),
                    ));
                }
                Settle::Wait => tokio::time::sleep(SETTLE_INTERVAL).await,
            }
        }
    }
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&self, url: &str) -> PagecheckResult<()> {
        tracing::debug!(url, "navigate");
        tokio::time::timeout(self.navigation_timeout, self.page.goto(url))
            .await
            .map_err(|_| {
                PagecheckError::timeout(
                    format!("navigation to {url}"),
                    u64::try_from(self.navigation_timeout.as_millis()).unwrap_or(u64::MAX),
                )
            })?
            .map_err(|e| PagecheckError::navigation(url, e.to_string()))?;

        let status = self.response_status().await?;
        if status >= 400 {
            return Err(PagecheckError::navigation(url, format!("HTTP {status}")));
        }
        Ok(())
    }

    async fn current_url(&self) -> PagecheckResult<String> {
        self.page
            .url()
            .await
            .map_err(|e| PagecheckError::session(e.to_string()))
            .map(Option::unwrap_or_default)
    }

    async fn count(&self, locator: &Locator) -> PagecheckResult<usize> {
        self.query(locator, locator.js_count()).await
    }

    async fn texts(&self, locator: &Locator) -> PagecheckResult<Vec<String>> {
        self.query(locator, locator.js_texts()).await
    }

    async fn attributes(
        &self,
        locator: &Locator,
        name: &str,
    ) -> PagecheckResult<Vec<Option<String>>> {
        self.query(locator, locator.js_attributes(name)).await
    }

    async fn visibility(&self, locator: &Locator) -> PagecheckResult<Vec<bool>> {
        self.query(locator, locator.js_visibility()).await
    }

    async fn click(&self, locator: &Locator) -> PagecheckResult<()> {
        tracing::debug!(locator = %locator, "click");
        self.eval::<bool>(MARK_DOCUMENT_JS.to_string()).await?;
        let verdict: String = self.query(locator, locator.js_click()).await?;
        let reason = match verdict.as_str() {
            "ok" => return self.settle_after_click().await,
            "missing" => {
                return Err(PagecheckError::SelectorResolution {
                    locator: locator.to_string(),
                })
            }
            "hidden" => "element is not visible",
            "disabled" => "element is disabled",
            other => other,
        };
        Err(PagecheckError::ElementNotInteractable {
            locator: locator.to_string(),
            reason: reason.to_string(),
        })
    }

    async fn close(&self) -> PagecheckResult<()> {
        let closed = self.page.clone().close().await;
        let disposed = self
            .browser
            .lock()
            .await
            .dispose_browser_context(self.context.clone())
            .await;
        tracing::debug!(context = ?self.context, "session closed");
        closed.map_err(|e| PagecheckError::session(format!("close page: {e}")))?;
        disposed.map_err(|e| PagecheckError::session(format!("dispose context: {e}")))?;
        Ok(())
    }
}
