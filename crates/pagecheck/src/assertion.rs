//! Assertion engine.
//!
//! [`Expect`] evaluates expectations against the live page. Presence-style
//! checks (`visible`, `text_matches`, `url_matches`) auto-wait through
//! [`poll_until`]; cardinality checks (`count`, `each_*`) take one snapshot.
//!
//! When a waiting check runs out of time, the last observation decides the
//! error: a locator that never matched anything is a [`PagecheckError::Timeout`],
//! an element that matched but never satisfied the condition is an
//! [`AssertionFailure`].

use regex::Regex;
use std::fmt;

use crate::locator::Locator;
use crate::result::{AssertionFailure, PagecheckError, PagecheckResult};
use crate::session::PageSession;
use crate::wait::{poll_until, Check, PollConfig, PollOutcome};

/// Expected text or URL
#[derive(Debug, Clone)]
pub enum TextPattern {
    /// Whole trimmed value equals the string
    Exact(String),
    /// Value contains the string
    Contains(String),
    /// Regex finds a match anywhere in the value
    Regex(Regex),
}

impl TextPattern {
    /// Exact match pattern
    #[must_use]
    pub fn exact(s: impl Into<String>) -> Self {
        Self::Exact(s.into())
    }

    /// Substring pattern
    #[must_use]
    pub fn contains(s: impl Into<String>) -> Self {
        Self::Contains(s.into())
    }

    /// Regex pattern
    ///
    /// # Errors
    ///
    /// Returns error if the regex does not compile
    pub fn regex(pattern: &str) -> PagecheckResult<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| PagecheckError::InvalidSelector {
                selector: pattern.to_string(),
                message: e.to_string(),
            })
    }

    /// Whether `value` satisfies the pattern
    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::Exact(s) => value == s.trim(),
            Self::Contains(s) => value.contains(s.as_str()),
            Self::Regex(re) => re.is_match(value),
        }
    }
}

impl PartialEq for TextPattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Exact(a), Self::Exact(b)) | (Self::Contains(a), Self::Contains(b)) => a == b,
            (Self::Regex(a), Self::Regex(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) => write!(f, "{s:?}"),
            Self::Contains(s) => write!(f, "text containing {s:?}"),
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Expected cardinality
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountRule {
    /// Exactly `n` matches
    Exactly(usize),
    /// At least `n` matches
    AtLeast(usize),
    /// At most `n` matches
    AtMost(usize),
}

impl CountRule {
    /// Whether `n` satisfies the rule
    #[must_use]
    pub const fn matches(self, n: usize) -> bool {
        match self {
            Self::Exactly(want) => n == want,
            Self::AtLeast(min) => n >= min,
            Self::AtMost(max) => n <= max,
        }
    }
}

impl fmt::Display for CountRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exactly(n) => write!(f, "count == {n}"),
            Self::AtLeast(n) => write!(f, "count >= {n}"),
            Self::AtMost(n) => write!(f, "count <= {n}"),
        }
    }
}

/// How two captured values must relate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// Values are identical after trimming
    Equals,
    /// Left value contains the right value
    Contains,
}

/// Plain value assertions used for captured values
#[derive(Debug)]
pub struct Assertion;

impl Assertion {
    /// Assert two strings relate as required
    ///
    /// # Errors
    ///
    /// Returns [`AssertionFailure`] when the relation does not hold
    pub fn relate(
        subject: &str,
        left: &str,
        relation: Relation,
        right: &str,
    ) -> Result<(), AssertionFailure> {
        let (l, r) = (left.trim(), right.trim());
        let ok = match relation {
            Relation::Equals => l == r,
            Relation::Contains => l.contains(r),
        };
        if ok {
            return Ok(());
        }
        let expected = match relation {
            Relation::Equals => format!("{r:?}"),
            Relation::Contains => format!("value containing {r:?}"),
        };
        Err(AssertionFailure::new(subject, expected, format!("{l:?}")))
    }

    /// Assert a condition is true
    ///
    /// # Errors
    ///
    /// Returns [`AssertionFailure`] when `condition` is false
    pub fn is_true(
        subject: &str,
        condition: bool,
        expected: &str,
        actual: &str,
    ) -> Result<(), AssertionFailure> {
        if condition {
            Ok(())
        } else {
            Err(AssertionFailure::new(subject, expected, actual))
        }
    }
}

/// Last thing a waiting check saw
enum Seen {
    Missing,
    Hidden,
    Text(String),
}

/// Expectation evaluator bound to one session
pub struct Expect<'s> {
    session: &'s dyn PageSession,
    poll: PollConfig,
}

impl fmt::Debug for Expect<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expect")
            .field("poll", &self.poll)
            .finish_non_exhaustive()
    }
}

impl<'s> Expect<'s> {
    /// Create an evaluator over `session`
    #[must_use]
    pub fn new(session: &'s dyn PageSession, poll: PollConfig) -> Self {
        Self { session, poll }
    }

    /// Polling budget in use
    #[must_use]
    pub const fn poll_config(&self) -> PollConfig {
        self.poll
    }

    fn timed_out(&self, locator: &Locator) -> PagecheckError {
        PagecheckError::timeout(
            format!("waiting for {locator} to resolve"),
            self.poll.timeout_ms(),
        )
    }

    /// Wait until `locator` matches at least one element
    pub async fn attached(&self, locator: &Locator) -> PagecheckResult<usize> {
        let session = self.session;
        let outcome = poll_until(
            move || async move {
                let n = session.count(locator).await?;
                Ok(if n > 0 { Check::Pass(n) } else { Check::Retry(()) })
            },
            self.poll,
        )
        .await?;

        match outcome {
            PollOutcome::Satisfied { value, .. } => Ok(value),
            PollOutcome::TimedOut { .. } => Err(self.timed_out(locator)),
        }
    }

    /// Element exists, has a non-empty box and is not hidden by CSS
    pub async fn visible(&self, locator: &Locator) -> PagecheckResult<()> {
        let session = self.session;
        let outcome = poll_until(
            move || async move {
                let vis = session.visibility(locator).await?;
                Ok(match vis.first() {
                    None => Check::Retry(Seen::Missing),
                    Some(false) => Check::Retry(Seen::Hidden),
                    Some(true) => Check::Pass(()),
                })
            },
            self.poll,
        )
        .await?;

        match outcome {
            PollOutcome::Satisfied { .. } => Ok(()),
            PollOutcome::TimedOut {
                last: Seen::Missing,
                ..
            } => Err(self.timed_out(locator)),
            PollOutcome::TimedOut { .. } => {
                Err(AssertionFailure::new(locator.to_string(), "visible", "hidden").into())
            }
        }
    }

    /// First match's trimmed text satisfies `pattern`
    pub async fn text_matches(
        &self,
        locator: &Locator,
        pattern: &TextPattern,
    ) -> PagecheckResult<()> {
        let session = self.session;
        let outcome = poll_until(
            move || async move {
                let texts = session.texts(locator).await?;
                Ok(match texts.into_iter().next() {
                    None => Check::Retry(Seen::Missing),
                    Some(t) if pattern.matches(&t) => Check::Pass(()),
                    Some(t) => Check::Retry(Seen::Text(t)),
                })
            },
            self.poll,
        )
        .await?;

        match outcome {
            PollOutcome::Satisfied { .. } => Ok(()),
            PollOutcome::TimedOut {
                last: Seen::Text(actual),
                ..
            } => Err(AssertionFailure::new(
                locator.to_string(),
                pattern.to_string(),
                format!("{:?}", actual.trim()),
            )
            .into()),
            PollOutcome::TimedOut { .. } => Err(self.timed_out(locator)),
        }
    }

    /// Snapshot cardinality check; never waits
    pub async fn count(&self, locator: &Locator, rule: CountRule) -> PagecheckResult<()> {
        let n = self.session.count(locator).await?;
        if rule.matches(n) {
            Ok(())
        } else {
            let observed = format!("count == {n}");
            Err(AssertionFailure::new(locator.to_string(), rule.to_string(), observed).into())
        }
    }

    /// Current address satisfies `pattern`
    pub async fn url_matches(&self, pattern: &TextPattern) -> PagecheckResult<()> {
        let session = self.session;
        let outcome = poll_until(
            move || async move {
                let url = session.current_url().await?;
                Ok(if pattern.matches(&url) {
                    Check::Pass(())
                } else {
                    Check::Retry(url)
                })
            },
            self.poll,
        )
        .await?;

        match outcome {
            PollOutcome::Satisfied { .. } => Ok(()),
            PollOutcome::TimedOut { last, .. } => {
                Err(AssertionFailure::new("page url", pattern.to_string(), last).into())
            }
        }
    }

    /// Number of matches, failing with `SelectorResolution` when there are none
    async fn require_some(&self, locator: &Locator) -> PagecheckResult<usize> {
        let n = self.session.count(locator).await?;
        if n == 0 {
            return Err(PagecheckError::SelectorResolution {
                locator: locator.to_string(),
            });
        }
        Ok(n)
    }

    /// Every match of `locator` contains at least one `child`
    pub async fn each_has(&self, locator: &Locator, child: &str) -> PagecheckResult<()> {
        let n = self.require_some(locator).await?;
        let mut missing = Vec::new();
        for i in 0..n {
            let inner = locator.nth(i).locator(child);
            if self.session.count(&inner).await? == 0 {
                missing.push(i);
            }
        }
        if missing.is_empty() {
            return Ok(());
        }
        Err(AssertionFailure::new(
            locator.to_string(),
            format!("every match to contain {child}"),
            format!("{} of {n} missing it (indices {missing:?})", missing.len()),
        )
        .into())
    }

    /// Every match is visible
    pub async fn each_visible(&self, locator: &Locator) -> PagecheckResult<()> {
        self.require_some(locator).await?;
        let vis = self.session.visibility(locator).await?;
        let hidden: Vec<usize> = vis
            .iter()
            .enumerate()
            .filter_map(|(i, v)| (!v).then_some(i))
            .collect();
        Assertion::is_true(
            &locator.to_string(),
            hidden.is_empty(),
            "every match visible",
            &format!("hidden at indices {hidden:?}"),
        )
        .map_err(Into::into)
    }

    /// Every match's text satisfies `pattern`
    pub async fn each_text(&self, locator: &Locator, pattern: &TextPattern) -> PagecheckResult<()> {
        self.require_some(locator).await?;
        let texts = self.session.texts(locator).await?;
        match texts.iter().find(|t| !pattern.matches(t)) {
            None => Ok(()),
            Some(bad) => Err(AssertionFailure::new(
                locator.to_string(),
                format!("every text to match {pattern}"),
                format!("{:?}", bad.trim()),
            )
            .into()),
        }
    }

    /// Every match carries `attr` and its value satisfies `pattern`
    pub async fn each_attribute(
        &self,
        locator: &Locator,
        attr: &str,
        pattern: &TextPattern,
    ) -> PagecheckResult<()> {
        self.require_some(locator).await?;
        let values = self.session.attributes(locator, attr).await?;
        for (i, value) in values.iter().enumerate() {
            let ok = value.as_deref().is_some_and(|v| pattern.matches(v));
            if !ok {
                return Err(AssertionFailure::new(
                    locator.nth(i).to_string(),
                    format!("[{attr}] matching {pattern}"),
                    value
                        .as_deref()
                        .map_or_else(|| "no attribute".to_string(), |v| format!("{v:?}")),
                )
                .into());
            }
        }
        Ok(())
    }

    /// At least one match carries `attr` satisfying `pattern`
    pub async fn any_attribute(
        &self,
        locator: &Locator,
        attr: &str,
        pattern: &TextPattern,
    ) -> PagecheckResult<()> {
        self.require_some(locator).await?;
        let values = self.session.attributes(locator, attr).await?;
        let found = values.iter().flatten().any(|v| pattern.matches(v));
        Assertion::is_true(
            &locator.to_string(),
            found,
            &format!("some [{attr}] matching {pattern}"),
            &format!("none among {} matches", values.len()),
        )
        .map_err(Into::into)
    }
}
