//! Pagecheck: a thin browser-test harness.
//!
//! Test cases are declarative step lists (navigate, click, capture, assert)
//! run by a [`Runner`] against fresh, isolated [`PageSession`]s. Assertions
//! auto-wait with bounded polling and tell behavioral failures apart from
//! infrastructure faults.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐  one per case   ┌─────────────┐   JS over CDP   ┌──────────┐
//! │  Runner  │────────────────►│ PageSession │────────────────►│ Chromium │
//! │ (tokio)  │                 │  (trait)    │                 └──────────┘
//! └────┬─────┘                 └──────▲──────┘
//!      │ steps                        │ re-resolve every use
//! ┌────▼─────┐   poll_until    ┌──────┴──────┐
//! │ TestCase │────────────────►│   Expect    │◄── Locator (value)
//! └──────────┘                 └─────────────┘
//! ```
//!
//! ```no_run
//! use std::sync::Arc;
//! use pagecheck::{catalog_suite, MockFactory, MockSite, Runner, RunnerConfig};
//!
//! # async fn demo() -> pagecheck::PagecheckResult<()> {
//! let suite = catalog_suite(pagecheck::DEFAULT_BASE_URL)?;
//! let runner = Runner::new(RunnerConfig::new(), Arc::new(MockFactory::new(MockSite::new())));
//! let report = runner.run(&suite).await;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod assertion;
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc)]
mod browser;
mod catalog;
mod harness;
mod locator;
#[allow(clippy::missing_errors_doc)]
mod mock;
mod report;
mod result;
mod runner;
mod session;

/// Bounded polling
pub mod wait;

pub use assertion::{Assertion, CountRule, Expect, Relation, TextPattern};
#[cfg(feature = "browser")]
pub use browser::{ChromiumConfig, ChromiumFactory, ChromiumSession};
pub use catalog::{catalog_suite, DEFAULT_BASE_URL, SUITE_NAME};
pub use harness::{Action, Captures, CaseFilter, TestCase, TestSuite};
pub use locator::{Locator, Selector, SelectorKind};
pub use mock::{MockElement, MockFactory, MockPage, MockSession, MockSite};
pub use report::{Outcome, OutcomeStatus, Report};
pub use result::{AssertionFailure, ErrorClass, PagecheckError, PagecheckResult};
pub use runner::{
    CaseState, RunObserver, Runner, RunnerConfig, SilentObserver, DEFAULT_CASE_TIMEOUT_MS,
    DEFAULT_CLOSE_TIMEOUT_MS, DEFAULT_WORKERS,
};
pub use session::{PageSession, Resolved, SessionFactory};
pub use wait::{poll_until, Check, PollConfig, PollOutcome};
