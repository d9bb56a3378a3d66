//! Test suites, test cases and the steps they run.
//!
//! A [`TestCase`] is a name plus an ordered list of [`Action`]s. Cases are
//! built with a fluent API and registered on a [`TestSuite`] explicitly;
//! there is no global registry.

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::assertion::{Assertion, CountRule, Expect, Relation, TextPattern};
use crate::locator::Locator;
use crate::result::{PagecheckError, PagecheckResult};
use crate::session::PageSession;
use crate::wait::PollConfig;

/// One step of a test case
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Load a URL
    Navigate(String),
    /// Click the first match once it is attached
    Click(Locator),
    /// Capture the number of matches
    QueryAll {
        /// Elements to count
        locator: Locator,
        /// Variable to store into
        into: String,
    },
    /// Capture an attribute of the first match
    GetAttribute {
        /// Element to read
        locator: Locator,
        /// Attribute name
        name: String,
        /// Variable to store into
        into: String,
    },
    /// Capture the trimmed text of the first match
    GetText {
        /// Element to read
        locator: Locator,
        /// Variable to store into
        into: String,
    },
    /// First match is visible
    AssertVisible(Locator),
    /// First match's text satisfies the pattern
    AssertText(Locator, TextPattern),
    /// Number of matches satisfies the rule
    AssertCount(Locator, CountRule),
    /// Current URL satisfies the pattern
    AssertUrl(TextPattern),
    /// Every match contains a descendant matching `child`
    AssertEach {
        /// Parent elements
        locator: Locator,
        /// Required descendant selector
        child: String,
    },
    /// Every match's text satisfies the pattern
    AssertEachText(Locator, TextPattern),
    /// Every match has the attribute and it satisfies the pattern
    AssertEachAttribute {
        /// Elements to check
        locator: Locator,
        /// Attribute name
        name: String,
        /// Required value
        pattern: TextPattern,
    },
    /// Every match is visible
    AssertEachVisible(Locator),
    /// Some match has the attribute satisfying the pattern
    AssertAnyAttribute {
        /// Elements to check
        locator: Locator,
        /// Attribute name
        name: String,
        /// Required value
        pattern: TextPattern,
    },
    /// Two captured values relate as required
    AssertCaptured {
        /// Left variable
        left: String,
        /// Relation
        relation: Relation,
        /// Right variable
        right: String,
    },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Navigate(url) => write!(f, "navigate {url}"),
            Self::Click(l) => write!(f, "click {l}"),
            Self::QueryAll { locator, into } => write!(f, "{into} = count({locator})"),
            Self::GetAttribute {
                locator,
                name,
                into,
            } => write!(f, "{into} = {locator}[{name}]"),
            Self::GetText { locator, into } => write!(f, "{into} = text({locator})"),
            Self::AssertVisible(l) => write!(f, "expect {l} visible"),
            Self::AssertText(l, p) => write!(f, "expect {l} text {p}"),
            Self::AssertCount(l, r) => write!(f, "expect {l} {r}"),
            Self::AssertUrl(p) => write!(f, "expect url {p}"),
            Self::AssertEach { locator, child } => write!(f, "expect each {locator} has {child}"),
            Self::AssertEachText(l, p) => write!(f, "expect each {l} text {p}"),
            Self::AssertEachAttribute {
                locator,
                name,
                pattern,
            } => write!(f, "expect each {locator}[{name}] {pattern}"),
            Self::AssertEachVisible(l) => write!(f, "expect each {l} visible"),
            Self::AssertAnyAttribute {
                locator,
                name,
                pattern,
            } => write!(f, "expect some {locator}[{name}] {pattern}"),
            Self::AssertCaptured {
                left,
                relation,
                right,
            } => write!(f, "expect ${left} {relation:?} ${right}"),
        }
    }
}

/// Values captured by a running case. Dropped when the case ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Captures {
    values: BTreeMap<String, Option<String>>,
}

impl Captures {
    /// Store a value
    pub fn set(&mut self, name: impl Into<String>, value: Option<String>) {
        self.values.insert(name.into(), value);
    }

    /// Read a value; `Ok(None)` for a captured-but-absent attribute
    ///
    /// # Errors
    ///
    /// Returns [`PagecheckError::MissingCapture`] if `name` was never set
    pub fn get(&self, name: &str) -> PagecheckResult<Option<&str>> {
        self.values
            .get(name)
            .map(Option::as_deref)
            .ok_or_else(|| PagecheckError::MissingCapture {
                name: name.to_string(),
            })
    }

    /// Number of captured values
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been captured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A single test case
#[derive(Debug, Clone, PartialEq)]
pub struct TestCase {
    /// Unique case name, e.g. `US-002-AC01_MainCatalogGrid`
    pub name: String,
    /// Steps in execution order
    pub steps: Vec<Action>,
    /// Overrides the runner's case timeout
    pub timeout: Option<Duration>,
}

impl TestCase {
    /// Create an empty case
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            timeout: None,
        }
    }

    /// Set timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Append a raw action
    #[must_use]
    pub fn step(mut self, action: Action) -> Self {
        self.steps.push(action);
        self
    }

    /// Append `Navigate`
    #[must_use]
    pub fn navigate(self, url: impl Into<String>) -> Self {
        self.step(Action::Navigate(url.into()))
    }

    /// Append `Click`
    #[must_use]
    pub fn click(self, locator: impl Into<Locator>) -> Self {
        self.step(Action::Click(locator.into()))
    }

    /// Append `QueryAll`
    #[must_use]
    pub fn query_all(self, locator: impl Into<Locator>, into: &str) -> Self {
        self.step(Action::QueryAll {
            locator: locator.into(),
            into: into.to_string(),
        })
    }

    /// Append `GetText`
    #[must_use]
    pub fn get_text(self, locator: impl Into<Locator>, into: &str) -> Self {
        self.step(Action::GetText {
            locator: locator.into(),
            into: into.to_string(),
        })
    }

    /// Append `GetAttribute`
    #[must_use]
    pub fn get_attribute(self, locator: impl Into<Locator>, name: &str, into: &str) -> Self {
        self.step(Action::GetAttribute {
            locator: locator.into(),
            name: name.to_string(),
            into: into.to_string(),
        })
    }

    /// Append `AssertVisible`
    #[must_use]
    pub fn expect_visible(self, locator: impl Into<Locator>) -> Self {
        self.step(Action::AssertVisible(locator.into()))
    }

    /// Append `AssertText`
    #[must_use]
    pub fn expect_text(self, locator: impl Into<Locator>, pattern: TextPattern) -> Self {
        self.step(Action::AssertText(locator.into(), pattern))
    }

    /// Append `AssertCount`
    #[must_use]
    pub fn expect_count(self, locator: impl Into<Locator>, rule: CountRule) -> Self {
        self.step(Action::AssertCount(locator.into(), rule))
    }

    /// Append `AssertUrl`
    #[must_use]
    pub fn expect_url(self, pattern: TextPattern) -> Self {
        self.step(Action::AssertUrl(pattern))
    }

    /// Append `AssertEach`
    #[must_use]
    pub fn expect_each_has(self, locator: impl Into<Locator>, child: &str) -> Self {
        self.step(Action::AssertEach {
            locator: locator.into(),
            child: child.to_string(),
        })
    }

    /// Append `AssertEachText`
    #[must_use]
    pub fn expect_each_text(self, locator: impl Into<Locator>, pattern: TextPattern) -> Self {
        self.step(Action::AssertEachText(locator.into(), pattern))
    }

    /// Append `AssertEachAttribute`
    #[must_use]
    pub fn expect_each_attribute(
        self,
        locator: impl Into<Locator>,
        name: &str,
        pattern: TextPattern,
    ) -> Self {
        self.step(Action::AssertEachAttribute {
            locator: locator.into(),
            name: name.to_string(),
            pattern,
        })
    }

    /// Append `AssertEachVisible`
    #[must_use]
    pub fn expect_each_visible(self, locator: impl Into<Locator>) -> Self {
        self.step(Action::AssertEachVisible(locator.into()))
    }

    /// Append `AssertAnyAttribute`
    #[must_use]
    pub fn expect_any_attribute(
        self,
        locator: impl Into<Locator>,
        name: &str,
        pattern: TextPattern,
    ) -> Self {
        self.step(Action::AssertAnyAttribute {
            locator: locator.into(),
            name: name.to_string(),
            pattern,
        })
    }

    /// Append `AssertCaptured`
    #[must_use]
    pub fn expect_captured(self, left: &str, relation: Relation, right: &str) -> Self {
        self.step(Action::AssertCaptured {
            left: left.to_string(),
            relation,
            right: right.to_string(),
        })
    }

    /// Run every step in order against `session`, stopping at the first error
    ///
    /// # Errors
    ///
    /// Returns the first assertion failure or infrastructure error
    pub async fn execute(
        &self,
        session: &dyn PageSession,
        poll: PollConfig,
    ) -> PagecheckResult<()> {
        let expect = Expect::new(session, poll);
        let mut captures = Captures::default();
        for (i, action) in self.steps.iter().enumerate() {
            tracing::debug!(case = %self.name, step = i, action = %action, "step");
            run_action(action, session, &expect, &mut captures).await?;
        }
        Ok(())
    }
}

async fn run_action(
    action: &Action,
    session: &dyn PageSession,
    expect: &Expect<'_>,
    captures: &mut Captures,
) -> PagecheckResult<()> {
    match action {
        Action::Navigate(url) => session.navigate(url).await,
        Action::Click(locator) => {
            expect.attached(locator).await?;
            locator.resolve(session).click().await
        }
        Action::QueryAll { locator, into } => {
            let n = locator.resolve(session).count().await?;
            captures.set(into.clone(), Some(n.to_string()));
            Ok(())
        }
        Action::GetAttribute {
            locator,
            name,
            into,
        } => {
            expect.attached(locator).await?;
            let value = locator.resolve(session).attribute(name).await?;
            captures.set(into.clone(), value);
            Ok(())
        }
        Action::GetText { locator, into } => {
            expect.attached(locator).await?;
            let text = locator.resolve(session).text().await?;
            captures.set(into.clone(), Some(text));
            Ok(())
        }
        Action::AssertVisible(locator) => expect.visible(locator).await,
        Action::AssertText(locator, pattern) => expect.text_matches(locator, pattern).await,
        Action::AssertCount(locator, rule) => expect.count(locator, *rule).await,
        Action::AssertUrl(pattern) => expect.url_matches(pattern).await,
        Action::AssertEach { locator, child } => expect.each_has(locator, child).await,
        Action::AssertEachText(locator, pattern) => expect.each_text(locator, pattern).await,
        Action::AssertEachAttribute {
            locator,
            name,
            pattern,
        } => expect.each_attribute(locator, name, pattern).await,
        Action::AssertEachVisible(locator) => expect.each_visible(locator).await,
        Action::AssertAnyAttribute {
            locator,
            name,
            pattern,
        } => expect.any_attribute(locator, name, pattern).await,
        Action::AssertCaptured {
            left,
            relation,
            right,
        } => {
            let subject = format!("${left} vs ${right}");
            let l = captures.get(left)?.unwrap_or("null");
            let r = captures.get(right)?.unwrap_or("null");
            Assertion::relate(&subject, l, *relation, r).map_err(Into::into)
        }
    }
}

/// Selects cases by name.
///
/// The pattern is a regex; if it does not compile it is matched as a plain
/// substring instead.
#[derive(Debug, Clone)]
pub enum CaseFilter {
    /// Regex search
    Regex(Regex),
    /// Substring search
    Substring(String),
}

impl CaseFilter {
    /// Build a filter from user input
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        Regex::new(pattern).map_or_else(|_| Self::Substring(pattern.to_string()), Self::Regex)
    }

    /// Whether `name` is selected
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        match self {
            Self::Regex(re) => re.is_match(name),
            Self::Substring(s) => name.contains(s.as_str()),
        }
    }
}

/// A test suite: an ordered, explicit list of cases
#[derive(Debug, Clone, Default)]
pub struct TestSuite {
    /// Suite name
    pub name: String,
    /// Cases in declaration order
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    /// Create an empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Register a case
    pub fn add_case(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    /// Get the number of cases
    #[must_use]
    pub fn case_count(&self) -> usize {
        self.cases.len()
    }

    /// Case names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cases.iter().map(|c| c.name.as_str())
    }

    /// Cases selected by `filter`, in declaration order
    #[must_use]
    pub fn select(&self, filter: Option<&CaseFilter>) -> Vec<&TestCase> {
        self.cases
            .iter()
            .filter(|c| filter.map_or(true, |f| f.matches(&c.name)))
            .collect()
    }

    /// Names that occur more than once
    #[must_use]
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = std::collections::BTreeSet::new();
        let mut dups = Vec::new();
        for name in self.names() {
            if !seen.insert(name) && !dups.contains(&name) {
                dups.push(name);
            }
        }
        dups
    }
}
