//! PageSession: the seam between the harness and a browser.
//!
//! The harness never talks to a browser directly. Everything goes through
//! [`PageSession`], which lets the same test cases run against Chromium
//! (`browser` feature) or the in-memory [`MockSession`](crate::MockSession).

use async_trait::async_trait;

use crate::locator::Locator;
use crate::result::{PagecheckError, PagecheckResult};

/// One isolated browser tab/context used by exactly one test case.
///
/// Every query re-resolves its locator. Operations may suspend until the page
/// reaches a stable state; that is the only suspension point in the harness.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigate to URL and wait for the load to settle
    async fn navigate(&self, url: &str) -> PagecheckResult<()>;

    /// Current address bar value
    async fn current_url(&self) -> PagecheckResult<String>;

    /// Number of elements the locator currently matches
    async fn count(&self, locator: &Locator) -> PagecheckResult<usize>;

    /// Trimmed text content of every match, in document order
    async fn texts(&self, locator: &Locator) -> PagecheckResult<Vec<String>>;

    /// One attribute of every match, in document order
    async fn attributes(
        &self,
        locator: &Locator,
        name: &str,
    ) -> PagecheckResult<Vec<Option<String>>>;

    /// Visibility of every match, in document order
    async fn visibility(&self, locator: &Locator) -> PagecheckResult<Vec<bool>>;

    /// Click the first match and wait for any resulting navigation
    async fn click(&self, locator: &Locator) -> PagecheckResult<()>;

    /// Release the tab/context
    async fn close(&self) -> PagecheckResult<()>;

    /// Build a locator for `selector`
    fn find(&self, selector: &str) -> Locator {
        Locator::new(selector)
    }

    /// One indexed locator per current match of `selector`
    async fn find_all(&self, selector: &str) -> PagecheckResult<Vec<Locator>> {
        let locator = Locator::new(selector);
        let n = self.count(&locator).await?;
        Ok((0..n).map(|i| locator.nth(i)).collect())
    }

    /// Text of the first match
    async fn text(&self, locator: &Locator) -> PagecheckResult<String> {
        self.texts(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PagecheckError::SelectorResolution {
                locator: locator.to_string(),
            })
    }

    /// Attribute of the first match (`None` when the element lacks it)
    async fn attribute(&self, locator: &Locator, name: &str) -> PagecheckResult<Option<String>> {
        self.attributes(locator, name)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PagecheckError::SelectorResolution {
                locator: locator.to_string(),
            })
    }

    /// Whether the first match is visible (`false` when nothing matches)
    async fn is_visible(&self, locator: &Locator) -> PagecheckResult<bool> {
        Ok(self
            .visibility(locator)
            .await?
            .first()
            .copied()
            .unwrap_or(false))
    }
}

/// Opens fresh sessions; one per test case.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Open a new, isolated session
    async fn open(&self) -> PagecheckResult<Box<dyn PageSession>>;
}

/// A locator bound to a session for the duration of one step.
///
/// Borrows the session, so a resolved handle can never outlive it. Each call
/// queries the page again.
#[derive(Clone, Copy)]
pub struct Resolved<'s> {
    locator: &'s Locator,
    session: &'s dyn PageSession,
}

impl std::fmt::Debug for Resolved<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolved")
            .field("locator", &self.locator.to_string())
            .finish_non_exhaustive()
    }
}

impl<'s> Resolved<'s> {
    pub(crate) fn new(locator: &'s Locator, session: &'s dyn PageSession) -> Self {
        Self { locator, session }
    }

    /// The underlying locator
    #[must_use]
    pub const fn locator(&self) -> &Locator {
        self.locator
    }

    /// Current match count
    pub async fn count(&self) -> PagecheckResult<usize> {
        self.session.count(self.locator).await
    }

    /// Text of the first match
    pub async fn text(&self) -> PagecheckResult<String> {
        self.session.text(self.locator).await
    }

    /// Attribute of the first match
    pub async fn attribute(&self, name: &str) -> PagecheckResult<Option<String>> {
        self.session.attribute(self.locator, name).await
    }

    /// Visibility of the first match
    pub async fn is_visible(&self) -> PagecheckResult<bool> {
        self.session.is_visible(self.locator).await
    }

    /// Click the first match
    pub async fn click(&self) -> PagecheckResult<()> {
        self.session.click(self.locator).await
    }
}
