//! In-memory mock site for testing without a browser.
//!
//! A [`MockSite`] is a map of URL to [`MockPage`]; a page maps selector
//! strings to the elements they match. Selectors are keyed by their parsed,
//! canonical form, so `css=h1` and `h1` are the same key. Scoped locators walk
//! into [`MockElement`] children keyed the same way.
//!
//! Faults are injected by building broken pages: missing or hidden elements,
//! wrong text, HTTP error statuses, unreachable URLs, elements that only
//! appear after a number of queries, or slow navigation.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::locator::{Locator, Selector};
use crate::result::{PagecheckError, PagecheckResult};
use crate::session::{PageSession, SessionFactory};

fn key(selector: &str) -> String {
    Selector::parse(selector).map_or_else(|_| selector.to_string(), |s| s.to_string())
}

/// A mock DOM element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockElement {
    text: String,
    attrs: BTreeMap<String, String>,
    hidden: bool,
    disabled: bool,
    target: Option<String>,
    children: BTreeMap<String, Vec<MockElement>>,
}

impl MockElement {
    /// Element with the given text content
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Link whose click navigates to `url`
    #[must_use]
    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self::text(text).attr("href", url.clone()).navigates_to(url)
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Mark as hidden by CSS
    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Mark as disabled
    #[must_use]
    pub const fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Clicking navigates to `url`
    #[must_use]
    pub fn navigates_to(mut self, url: impl Into<String>) -> Self {
        self.target = Some(url.into());
        self
    }

    /// Add a descendant matched by `selector`
    #[must_use]
    pub fn child(mut self, selector: &str, element: Self) -> Self {
        self.children.entry(key(selector)).or_default().push(element);
        self
    }
}

/// A mock page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockPage {
    status: u16,
    elements: BTreeMap<String, Vec<MockElement>>,
    late: BTreeMap<String, usize>,
}

impl Default for MockPage {
    fn default() -> Self {
        Self {
            status: 200,
            elements: BTreeMap::new(),
            late: BTreeMap::new(),
        }
    }
}

impl MockPage {
    /// Empty page served with status 200
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the elements `selector` matches
    #[must_use]
    pub fn with(mut self, selector: &str, elements: Vec<MockElement>) -> Self {
        self.elements.entry(key(selector)).or_default().extend(elements);
        self
    }

    /// `selector` matches nothing for its first `queries` lookups
    #[must_use]
    pub fn appears_after(mut self, selector: &str, queries: usize) -> Self {
        self.late.insert(key(selector), queries);
        self
    }

    /// HTTP status served for this page
    #[must_use]
    pub const fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    fn resolve(&self, locator: &Locator) -> Vec<&MockElement> {
        let k = locator.selector().to_string();
        let found: Vec<&MockElement> = match locator.scope() {
            None => self.elements.get(&k).map(|v| v.iter().collect()).unwrap_or_default(),
            Some(scope) => self
                .resolve(scope)
                .into_iter()
                .flat_map(|e| e.children.get(&k).into_iter().flatten())
                .collect(),
        };
        match locator.index() {
            Some(i) => found.into_iter().nth(i).into_iter().collect(),
            None => found,
        }
    }
}

/// A set of mock pages keyed by URL
#[derive(Debug, Clone, Default)]
pub struct MockSite {
    pages: BTreeMap<String, MockPage>,
    unreachable: BTreeSet<String>,
    navigation_delay: Duration,
    close_delay: Duration,
}

impl MockSite {
    /// Empty site
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `page` at `url`
    #[must_use]
    pub fn page(mut self, url: impl Into<String>, page: MockPage) -> Self {
        self.pages.insert(url.into(), page);
        self
    }

    /// Navigation to `url` fails as if the host were down
    #[must_use]
    pub fn unreachable(mut self, url: impl Into<String>) -> Self {
        self.unreachable.insert(url.into());
        self
    }

    /// Every navigation sleeps for `delay` first
    #[must_use]
    pub const fn slow(mut self, delay: Duration) -> Self {
        self.navigation_delay = delay;
        self
    }

    /// Every `close` sleeps for `delay` before taking effect
    #[must_use]
    pub const fn slow_close(mut self, delay: Duration) -> Self {
        self.close_delay = delay;
        self
    }

    /// Page served at `url`
    #[must_use]
    pub fn get(&self, url: &str) -> Option<&MockPage> {
        self.pages.get(url)
    }
}

#[derive(Debug, Default)]
struct SessionState {
    url: String,
    queries: HashMap<String, usize>,
    history: Vec<String>,
    closed: usize,
}

/// Mock page session over a [`MockSite`]
#[derive(Debug)]
pub struct MockSession {
    site: Arc<MockSite>,
    state: Arc<Mutex<SessionState>>,
    closes: Option<Arc<AtomicUsize>>,
}

impl MockSession {
    /// Session starting at `url` without navigating
    #[must_use]
    pub fn new(site: MockSite, url: impl Into<String>) -> Self {
        Self::shared(Arc::new(site), url)
    }

    fn shared(site: Arc<MockSite>, url: impl Into<String>) -> Self {
        Self {
            site,
            state: Arc::new(Mutex::new(SessionState {
                url: url.into(),
                ..SessionState::default()
            })),
            closes: None,
        }
    }

    /// Second handle onto the same session state
    fn handle(&self) -> Self {
        Self {
            site: Arc::clone(&self.site),
            state: Arc::clone(&self.state),
            closes: self.closes.clone(),
        }
    }

    /// Recorded calls, e.g. `navigate:https://…` or `click:li.next a`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.state.lock().history.clone()
    }

    /// Whether any recorded call starts with `method`
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.state.lock().history.iter().any(|c| c.starts_with(method))
    }

    /// How many times `close` was called
    #[must_use]
    pub fn close_count(&self) -> usize {
        self.state.lock().closed
    }

    fn record(&self, call: String) {
        self.state.lock().history.push(call);
    }

    fn ensure_open(&self) -> PagecheckResult<()> {
        if self.state.lock().closed > 0 {
            return Err(PagecheckError::session("session already closed"));
        }
        Ok(())
    }

    /// Apply `f` to the elements `locator` matches on the current page
    fn with_matches<T>(
        &self,
        locator: &Locator,
        f: impl FnOnce(&[&MockElement]) -> T,
    ) -> PagecheckResult<T> {
        self.ensure_open()?;
        let mut state = self.state.lock();
        let Some(page) = self.site.get(&state.url) else {
            return Ok(f(&[]));
        };

        let root = root_key(locator);
        let seen = state.queries.entry(root.clone()).or_insert(0);
        *seen += 1;
        if page.late.get(&root).is_some_and(|after| *seen <= *after) {
            return Ok(f(&[]));
        }
        drop(state);

        Ok(f(&page.resolve(locator)))
    }
}

fn root_key(locator: &Locator) -> String {
    let mut cur = locator;
    while let Some(scope) = cur.scope() {
        cur = scope;
    }
    cur.selector().to_string()
}

#[async_trait]
impl PageSession for MockSession {
    async fn navigate(&self, url: &str) -> PagecheckResult<()> {
        self.ensure_open()?;
        self.record(format!("navigate:{url}"));
        if !self.site.navigation_delay.is_zero() {
            tokio::time::sleep(self.site.navigation_delay).await;
        }
        if self.site.unreachable.contains(url) {
            return Err(PagecheckError::navigation(url, "net::ERR_NAME_NOT_RESOLVED"));
        }
        let status = self.site.get(url).map_or(404, |p| p.status);
        if !(200..300).contains(&status) {
            return Err(PagecheckError::navigation(url, format!("HTTP {status}")));
        }
        let mut state = self.state.lock();
        state.url = url.to_string();
        state.queries.clear();
        Ok(())
    }

    async fn current_url(&self) -> PagecheckResult<String> {
        self.ensure_open()?;
        Ok(self.state.lock().url.clone())
    }

    async fn count(&self, locator: &Locator) -> PagecheckResult<usize> {
        self.with_matches(locator, |els| els.len())
    }

    async fn texts(&self, locator: &Locator) -> PagecheckResult<Vec<String>> {
        self.with_matches(locator, |els| {
            els.iter().map(|e| e.text.trim().to_string()).collect()
        })
    }

    async fn attributes(
        &self,
        locator: &Locator,
        name: &str,
    ) -> PagecheckResult<Vec<Option<String>>> {
        self.with_matches(locator, |els| {
            els.iter().map(|e| e.attrs.get(name).cloned()).collect()
        })
    }

    async fn visibility(&self, locator: &Locator) -> PagecheckResult<Vec<bool>> {
        self.with_matches(locator, |els| els.iter().map(|e| !e.hidden).collect())
    }

    async fn click(&self, locator: &Locator) -> PagecheckResult<()> {
        self.record(format!("click:{locator}"));
        let first = self.with_matches(locator, |els| els.first().map(|e| (*e).clone()))?;
        let Some(element) = first else {
            return Err(PagecheckError::SelectorResolution {
                locator: locator.to_string(),
            });
        };
        let reject = |reason: &str| PagecheckError::ElementNotInteractable {
            locator: locator.to_string(),
            reason: reason.to_string(),
        };
        if element.hidden {
            return Err(reject("element is not visible"));
        }
        if element.disabled {
            return Err(reject("element is disabled"));
        }
        match element.target {
            Some(url) => self.navigate(&url).await,
            None => Ok(()),
        }
    }

    async fn close(&self) -> PagecheckResult<()> {
        if !self.site.close_delay.is_zero() {
            tokio::time::sleep(self.site.close_delay).await;
        }
        let mut state = self.state.lock();
        state.closed += 1;
        state.history.push("close".to_string());
        drop(state);
        if let Some(counter) = &self.closes {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Opens [`MockSession`]s over a shared site and counts opens and closes
#[derive(Debug, Clone)]
pub struct MockFactory {
    site: Arc<MockSite>,
    start: String,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
    sessions: Arc<Mutex<Vec<MockSession>>>,
    fail_open: bool,
}

impl MockFactory {
    /// Factory whose sessions start on `about:blank`
    #[must_use]
    pub fn new(site: MockSite) -> Self {
        Self {
            site: Arc::new(site),
            start: "about:blank".to_string(),
            opened: Arc::new(AtomicUsize::new(0)),
            closed: Arc::new(AtomicUsize::new(0)),
            sessions: Arc::new(Mutex::new(Vec::new())),
            fail_open: false,
        }
    }

    /// Every `open` fails, as if the browser had died
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Sessions opened so far
    #[must_use]
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// `close` calls across all sessions so far
    #[must_use]
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    /// Handles onto every session opened so far, in open order
    #[must_use]
    pub fn sessions(&self) -> Vec<MockSession> {
        self.sessions.lock().iter().map(MockSession::handle).collect()
    }
}

#[async_trait]
impl SessionFactory for MockFactory {
    async fn open(&self) -> PagecheckResult<Box<dyn PageSession>> {
        if self.fail_open {
            return Err(PagecheckError::BrowserLaunch {
                message: "mock browser unavailable".to_string(),
            });
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        let mut session = MockSession::shared(Arc::clone(&self.site), self.start.clone());
        session.closes = Some(Arc::clone(&self.closed));
        self.sessions.lock().push(session.handle());
        Ok(Box::new(session))
    }
}
