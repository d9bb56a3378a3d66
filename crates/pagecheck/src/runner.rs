//! Test runner: executes a suite with one fresh session per case.
//!
//! Cases run as tokio tasks, at most `workers` at a time. Each case moves
//! through [`CaseState`]: `Pending -> Running -> {Passed, Failed, Errored}`.
//! The session a case opens is closed exactly once on every path out of
//! `Running`, including timeout, panic and cancellation of the whole run. A
//! case task that dies anyway is still reported, as `Errored`.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::Instrument;

use crate::harness::{CaseFilter, TestCase, TestSuite};
use crate::report::{Outcome, OutcomeStatus, Report};
use crate::result::PagecheckError;
use crate::session::{PageSession, SessionFactory};
use crate::wait::PollConfig;

/// Default concurrent cases
pub const DEFAULT_WORKERS: usize = 4;

/// Default per-case budget (30 seconds)
pub const DEFAULT_CASE_TIMEOUT_MS: u64 = 30_000;

/// Default limit for closing one session (5 seconds)
pub const DEFAULT_CLOSE_TIMEOUT_MS: u64 = 5_000;

/// Lifecycle of one case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseState {
    /// Not started
    Pending,
    /// Session open, steps executing
    Running,
    /// Terminal: every step succeeded
    Passed,
    /// Terminal: assertion failure
    Failed,
    /// Terminal: infrastructure fault or timeout
    Errored,
}

impl CaseState {
    /// Whether no further transition is possible
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Passed | Self::Failed | Self::Errored)
    }

    /// Whether `self -> next` is a legal transition
    #[must_use]
    pub const fn can_advance(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Passed | Self::Failed | Self::Errored)
        )
    }
}

impl From<OutcomeStatus> for CaseState {
    fn from(status: OutcomeStatus) -> Self {
        match status {
            OutcomeStatus::Passed => Self::Passed,
            OutcomeStatus::Failed => Self::Failed,
            OutcomeStatus::Errored => Self::Errored,
        }
    }
}

/// Receives progress events while a suite runs
pub trait RunObserver: Send + Sync {
    /// A case acquired its session slot
    fn case_started(&self, _name: &str) {}

    /// A case reached a terminal state
    fn case_finished(&self, _outcome: &Outcome) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentObserver;

impl RunObserver for SilentObserver {}

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Maximum concurrently open sessions
    pub workers: usize,
    /// Budget for one whole case, unless the case overrides it
    pub case_timeout: Duration,
    /// Limit for closing a session, outside the case budget
    pub close_timeout: Duration,
    /// Budget for auto-waiting assertions
    pub poll: PollConfig,
    /// Only run matching cases
    pub filter: Option<CaseFilter>,
    /// Do not start new cases after the first non-passing one
    pub fail_fast: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            case_timeout: Duration::from_millis(DEFAULT_CASE_TIMEOUT_MS),
            close_timeout: Duration::from_millis(DEFAULT_CLOSE_TIMEOUT_MS),
            poll: PollConfig::default(),
            filter: None,
            fail_fast: false,
        }
    }
}

impl RunnerConfig {
    /// Create default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set worker count (minimum 1)
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set case timeout
    #[must_use]
    pub const fn with_case_timeout(mut self, timeout: Duration) -> Self {
        self.case_timeout = timeout;
        self
    }

    /// Set session close limit
    #[must_use]
    pub const fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Set assertion polling
    #[must_use]
    pub const fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set name filter
    #[must_use]
    pub fn with_filter(mut self, pattern: &str) -> Self {
        self.filter = Some(CaseFilter::new(pattern));
        self
    }

    /// Enable fail-fast
    #[must_use]
    pub const fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Runs suites against sessions from a [`SessionFactory`]
pub struct Runner {
    config: RunnerConfig,
    factory: Arc<dyn SessionFactory>,
    observer: Arc<dyn RunObserver>,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Runner {
    /// Create a runner
    #[must_use]
    pub fn new(config: RunnerConfig, factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            config,
            factory,
            observer: Arc::new(SilentObserver),
        }
    }

    /// Attach a progress observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run every selected case and collect outcomes in suite order.
    ///
    /// Never fails as a whole: every problem is recorded on the case that
    /// hit it. Dropping the returned future aborts the cases in flight; their
    /// sessions are still closed.
    pub async fn run(&self, suite: &TestSuite) -> Report {
        let start = Instant::now();
        let selected: Vec<TestCase> = suite
            .select(self.config.filter.as_ref())
            .into_iter()
            .cloned()
            .collect();
        tracing::info!(
            suite = %suite.name,
            cases = selected.len(),
            workers = self.config.workers,
            "starting run"
        );

        let slots = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let stop = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<task::Id, (usize, String, Instant)> = HashMap::new();
        let mut outcomes: Vec<Option<Outcome>> = vec![None; selected.len()];

        for (idx, case) in selected.into_iter().enumerate() {
            let Ok(permit) = Arc::clone(&slots).acquire_owned().await else {
                break;
            };
            if self.config.fail_fast && stop.load(Ordering::SeqCst) {
                tracing::info!("fail-fast: not starting remaining cases");
                break;
            }

            let factory = Arc::clone(&self.factory);
            let observer = Arc::clone(&self.observer);
            let stop = Arc::clone(&stop);
            let limits = CaseLimits {
                poll: self.config.poll,
                budget: case.timeout.unwrap_or(self.config.case_timeout),
                close_timeout: self.config.close_timeout,
            };
            let name = case.name.clone();
            let span = tracing::info_span!("case", name = %case.name);

            let handle = tasks.spawn(
                async move {
                    observer.case_started(&case.name);
                    let (outcome, _) = run_case(case, factory.as_ref(), limits).await;
                    if !outcome.status.is_passed() {
                        stop.store(true, Ordering::SeqCst);
                    }
                    observer.case_finished(&outcome);
                    drop(permit);
                    (idx, outcome)
                }
                .instrument(span),
            );
            pending.insert(handle.id(), (idx, name, Instant::now()));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, outcome)) => outcomes[idx] = Some(outcome),
                Err(e) => {
                    let Some((idx, name, began)) = pending.remove(&e.id()) else {
                        tracing::error!(error = %e, "unknown case task failed");
                        continue;
                    };
                    tracing::error!(case = %name, error = %e, "case task failed");
                    let err = PagecheckError::session(format!("case task failed: {e}"));
                    outcomes[idx] = Some(Outcome::from_error(name, began.elapsed(), &err));
                }
            }
        }

        let report = Report::new(
            suite.name.clone(),
            outcomes.into_iter().flatten().collect(),
            start.elapsed(),
        );
        tracing::info!(summary = %report.summary(), "run finished");
        report
    }
}

/// Time limits for one case
#[derive(Debug, Clone, Copy)]
struct CaseLimits {
    poll: PollConfig,
    budget: Duration,
    close_timeout: Duration,
}

/// Closes its session exactly once.
///
/// Normally closed with [`SessionGuard::close`]; if the case future is dropped
/// first, `Drop` hands the close to the runtime.
struct SessionGuard {
    session: Option<Arc<dyn PageSession>>,
    close_timeout: Duration,
}

impl SessionGuard {
    fn new(session: Arc<dyn PageSession>, close_timeout: Duration) -> Self {
        Self {
            session: Some(session),
            close_timeout,
        }
    }

    async fn close(&mut self) {
        if let Some(session) = self.session.take() {
            close_within(session.as_ref(), self.close_timeout).await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let limit = self.close_timeout;
                runtime.spawn(
                    async move { close_within(session.as_ref(), limit).await }.in_current_span(),
                );
            }
            Err(_) => tracing::warn!("no runtime left; session dropped without close"),
        }
    }
}

async fn close_within(session: &dyn PageSession, limit: Duration) {
    match tokio::time::timeout(limit, session.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "session close failed"),
        Err(_) => tracing::warn!(ms = millis(limit), "session close timed out"),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

/// Drive one case from `Pending` to a terminal state.
///
/// Opening the session and running the steps share the case budget; closing
/// has its own limit.
async fn run_case(
    case: TestCase,
    factory: &dyn SessionFactory,
    limits: CaseLimits,
) -> (Outcome, CaseState) {
    let start = Instant::now();
    let mut state = CaseState::Pending;
    advance(&mut state, CaseState::Running);

    let result = match tokio::time::timeout(limits.budget, factory.open()).await {
        Ok(Ok(session)) => {
            let session: Arc<dyn PageSession> = Arc::from(session);
            let mut guard = SessionGuard::new(Arc::clone(&session), limits.close_timeout);
            let remaining = limits.budget.saturating_sub(start.elapsed());
            let steps = AssertUnwindSafe(case.execute(session.as_ref(), limits.poll));
            let result = match tokio::time::timeout(remaining, steps.catch_unwind()).await {
                Ok(Ok(result)) => result,
                Ok(Err(panic)) => Err(PagecheckError::session(format!(
                    "case panicked: {}",
                    panic_message(panic.as_ref())
                ))),
                Err(_) => Err(PagecheckError::timeout("whole case", millis(limits.budget))),
            };
            guard.close().await;
            result
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "could not open session");
            Err(e)
        }
        Err(_) => Err(PagecheckError::timeout("opening session", millis(limits.budget))),
    };

    let outcome = match result {
        Ok(()) => Outcome::passed(&case.name, start.elapsed()),
        Err(e) => Outcome::from_error(&case.name, start.elapsed(), &e),
    };
    advance(&mut state, outcome.status.into());
    match outcome.status {
        OutcomeStatus::Passed => tracing::info!(ms = outcome.duration_ms, "passed"),
        _ => tracing::warn!(
            status = ?outcome.status,
            message = outcome.message.as_deref().unwrap_or_default(),
            "did not pass"
        ),
    }
    (outcome, state)
}

fn advance(state: &mut CaseState, next: CaseState) {
    debug_assert!(state.can_advance(next), "{state:?} -> {next:?}");
    tracing::debug!(from = ?*state, to = ?next, "case state");
    *state = next;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::assertion::{CountRule, TextPattern};
    use crate::locator::Locator;
    use crate::mock::{MockElement, MockFactory, MockPage, MockSite};
    use crate::result::PagecheckResult;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    const HOME: &str = "https://shop.test/";

    fn site() -> MockSite {
        MockSite::new().page(
            HOME,
            MockPage::new()
                .with("h1", vec![MockElement::text("All products")])
                .with(".product_pod", vec![MockElement::text("A"); 20]),
        )
    }

    fn config() -> RunnerConfig {
        let poll = PollConfig::new(Duration::from_millis(40))
            .with_interval(Duration::from_millis(10));
        RunnerConfig::new().with_workers(3).with_poll(poll)
    }

    fn limits(budget: Duration) -> CaseLimits {
        CaseLimits {
            poll: config().poll,
            budget,
            close_timeout: Duration::from_millis(100),
        }
    }

    /// `open` never completes in any reasonable time
    struct HangingFactory;

    #[async_trait]
    impl SessionFactory for HangingFactory {
        async fn open(&self) -> PagecheckResult<Box<dyn PageSession>> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(PagecheckError::session("unreachable"))
        }
    }

    /// Delegates to a mock session but panics on `click`
    struct PanicOnClick(Box<dyn PageSession>);

    #[async_trait]
    impl PageSession for PanicOnClick {
        async fn navigate(&self, url: &str) -> PagecheckResult<()> {
            self.0.navigate(url).await
        }

        async fn current_url(&self) -> PagecheckResult<String> {
            self.0.current_url().await
        }

        async fn count(&self, locator: &Locator) -> PagecheckResult<usize> {
            self.0.count(locator).await
        }

        async fn texts(&self, locator: &Locator) -> PagecheckResult<Vec<String>> {
            self.0.texts(locator).await
        }

        async fn attributes(
            &self,
            locator: &Locator,
            name: &str,
        ) -> PagecheckResult<Vec<Option<String>>> {
            self.0.attributes(locator, name).await
        }

        async fn visibility(&self, locator: &Locator) -> PagecheckResult<Vec<bool>> {
            self.0.visibility(locator).await
        }

        async fn click(&self, locator: &Locator) -> PagecheckResult<()> {
            panic!("driver bug clicking {locator}");
        }

        async fn close(&self) -> PagecheckResult<()> {
            self.0.close().await
        }
    }

    struct PanickyFactory(MockFactory);

    #[async_trait]
    impl SessionFactory for PanickyFactory {
        async fn open(&self) -> PagecheckResult<Box<dyn PageSession>> {
            Ok(Box::new(PanicOnClick(self.0.open().await?)))
        }
    }

    fn suite() -> TestSuite {
        let mut s = TestSuite::new("mock");
        s.add_case(
            TestCase::new("grid")
                .navigate(HOME)
                .expect_count(".product_pod", CountRule::Exactly(20)),
        );
        s.add_case(
            TestCase::new("wrong-heading")
                .navigate(HOME)
                .expect_text("h1", TextPattern::exact("Travel")),
        );
        s.add_case(TestCase::new("never-resolves").navigate(HOME).expect_visible(".nope"));
        s.add_case(TestCase::new("bad-url").navigate("https://shop.test/404"));
        s
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_transitions() {
            assert!(CaseState::Pending.can_advance(CaseState::Running));
            assert!(CaseState::Running.can_advance(CaseState::Failed));
            assert!(!CaseState::Pending.can_advance(CaseState::Passed));
            assert!(!CaseState::Passed.can_advance(CaseState::Running));
            assert!(CaseState::Errored.is_terminal());
            assert!(!CaseState::Running.is_terminal());
        }

        #[tokio::test]
        async fn test_open_failure_reaches_errored() {
            let factory = MockFactory::new(site()).failing();
            let case = TestCase::new("no-browser").navigate(HOME);
            let (outcome, state) = run_case(case, &factory, limits(Duration::from_secs(1))).await;
            assert_eq!(state, CaseState::Errored);
            assert_eq!(outcome.status, OutcomeStatus::Errored);
        }

        #[tokio::test]
        async fn test_terminal_state_matches_outcome() {
            let factory = MockFactory::new(site());
            let pass = TestCase::new("ok").navigate(HOME).expect_visible("h1");
            let (_, state) = run_case(pass, &factory, limits(Duration::from_secs(1))).await;
            assert_eq!(state, CaseState::Passed);

            let fail = TestCase::new("no")
                .navigate(HOME)
                .expect_text("h1", TextPattern::exact("x"));
            let (_, state) = run_case(fail, &factory, limits(Duration::from_secs(1))).await;
            assert_eq!(state, CaseState::Failed);
        }

        #[test]
        fn test_config_builder() {
            let c = RunnerConfig::new().with_workers(0).with_fail_fast(true).with_filter("US-");
            assert_eq!(c.workers, 1);
            assert!(c.fail_fast);
            assert!(c.filter.is_some());
            assert_eq!(RunnerConfig::default().case_timeout, Duration::from_secs(30));
            assert_eq!(RunnerConfig::default().close_timeout, Duration::from_secs(5));
        }
    }

    mod run_tests {
        use super::*;

        #[tokio::test]
        async fn test_outcomes_in_suite_order() {
            let factory = Arc::new(MockFactory::new(site()));
            let report = Runner::new(config(), factory.clone()).run(&suite()).await;
            assert_eq!(
                report.statuses(),
                vec![
                    OutcomeStatus::Passed,
                    OutcomeStatus::Failed,
                    OutcomeStatus::Errored,
                    OutcomeStatus::Errored
                ]
            );
            assert_eq!(report.exit_code(), 1);
            assert!(report.outcomes[2].message.as_deref().unwrap().contains("Timed out"));
        }

        #[tokio::test]
        async fn test_every_session_closed_once() {
            let factory = Arc::new(MockFactory::new(site()));
            Runner::new(config(), factory.clone()).run(&suite()).await;
            let sessions = factory.sessions();
            assert_eq!(sessions.len(), 4);
            for session in &sessions {
                assert_eq!(session.close_count(), 1, "{:?}", session.history());
            }
        }

        #[tokio::test]
        async fn test_hanging_open_counts_against_case_timeout() {
            let config = config().with_case_timeout(Duration::from_millis(50));
            let mut s = TestSuite::new("hang");
            s.add_case(TestCase::new("never-opens").navigate(HOME));
            let runner = Runner::new(config, Arc::new(HangingFactory));
            let run = runner.run(&s);
            let report = tokio::time::timeout(Duration::from_secs(2), run).await.unwrap();
            assert_eq!(report.statuses(), vec![OutcomeStatus::Errored]);
            let message = report.outcomes[0].message.as_deref().unwrap();
            assert!(message.contains("opening session"), "{message}");
        }

        #[tokio::test]
        async fn test_hanging_close_is_bounded() {
            let factory = Arc::new(MockFactory::new(site().slow_close(Duration::from_secs(3600))));
            let config = config().with_close_timeout(Duration::from_millis(50));
            let mut s = TestSuite::new("stuck-close");
            s.add_case(TestCase::new("grid").navigate(HOME));
            let runner = Runner::new(config, factory);
            let run = runner.run(&s);
            let report = tokio::time::timeout(Duration::from_secs(2), run).await.unwrap();
            assert!(report.all_passed());
        }

        #[tokio::test]
        async fn test_cancelled_run_still_closes_sessions() {
            let factory = Arc::new(MockFactory::new(site().slow(Duration::from_secs(5))));
            let mut s = TestSuite::new("cancelled");
            for i in 0..3 {
                s.add_case(TestCase::new(format!("slow-{i}")).navigate(HOME));
            }
            let runner = Runner::new(config(), factory.clone());
            let cut = tokio::time::timeout(Duration::from_millis(100), runner.run(&s)).await;
            assert!(cut.is_err());

            tokio::time::sleep(Duration::from_millis(300)).await;
            assert_eq!(factory.opened(), 3);
            assert_eq!(factory.closed(), 3);
            assert!(factory.sessions().iter().all(|s| s.close_count() == 1));
        }

        #[tokio::test]
        async fn test_step_panic_is_errored_and_closes() {
            let mock = MockFactory::new(site());
            let factory = Arc::new(PanickyFactory(mock.clone()));
            let mut s = TestSuite::new("panics");
            s.add_case(TestCase::new("clicks").navigate(HOME).click("h1"));
            s.add_case(TestCase::new("grid").navigate(HOME));
            let report = Runner::new(config(), factory).run(&s).await;
            assert_eq!(
                report.statuses(),
                vec![OutcomeStatus::Errored, OutcomeStatus::Passed]
            );
            let message = report.outcomes[0].message.as_deref().unwrap();
            assert!(message.contains("driver bug"), "{message}");
            assert!(mock.sessions().iter().all(|s| s.close_count() == 1));
        }

        #[tokio::test]
        async fn test_case_timeout_still_closes() {
            let slow = site().slow(Duration::from_secs(5));
            let factory = Arc::new(MockFactory::new(slow));
            let mut s = TestSuite::new("slow");
            s.add_case(
                TestCase::new("slow-nav")
                    .navigate(HOME)
                    .with_timeout(Duration::from_millis(50)),
            );
            let report = Runner::new(config(), factory.clone()).run(&s).await;
            assert_eq!(report.statuses(), vec![OutcomeStatus::Errored]);
            assert!(report.outcomes[0].message.as_deref().unwrap().contains("whole case"));
            assert_eq!(factory.closed(), 1);
        }

        #[tokio::test]
        async fn test_open_failure_is_errored() {
            let factory = Arc::new(MockFactory::new(site()).failing());
            let report = Runner::new(config(), factory.clone()).run(&suite()).await;
            assert!(report.statuses().iter().all(|s| *s == OutcomeStatus::Errored));
            assert_eq!(factory.closed(), 0);
        }

        #[tokio::test]
        async fn test_filter() {
            let factory = Arc::new(MockFactory::new(site()));
            let report = Runner::new(config().with_filter("^grid$"), factory)
                .run(&suite())
                .await;
            assert_eq!(report.total_count(), 1);
            assert!(report.all_passed());
            assert_eq!(report.exit_code(), 0);
        }

        #[tokio::test]
        async fn test_fail_fast_skips_unstarted() {
            let factory = Arc::new(MockFactory::new(site()));
            let mut s = TestSuite::new("ff");
            s.add_case(TestCase::new("a").navigate("https://shop.test/404"));
            for i in 0..5 {
                s.add_case(TestCase::new(format!("b{i}")).navigate(HOME));
            }
            let report = Runner::new(config().with_workers(1).with_fail_fast(true), factory.clone())
                .run(&s)
                .await;
            assert_eq!(report.total_count(), 1);
            assert_eq!(factory.opened(), 1);
        }

        #[tokio::test]
        async fn test_rerun_is_idempotent() {
            let factory = Arc::new(MockFactory::new(site()));
            let runner = Runner::new(config(), factory);
            let first = runner.run(&suite()).await;
            let second = runner.run(&suite()).await;
            assert_eq!(first.statuses(), second.statuses());
        }

        #[derive(Default)]
        struct Recorder(Mutex<Vec<String>>);

        impl RunObserver for Recorder {
            fn case_started(&self, name: &str) {
                self.0.lock().push(format!("start:{name}"));
            }
            fn case_finished(&self, outcome: &Outcome) {
                self.0.lock().push(format!("end:{}", outcome.name));
            }
        }

        /// Blows up when told about a case that did not pass
        struct PanicsOnFailure;

        impl RunObserver for PanicsOnFailure {
            fn case_finished(&self, outcome: &Outcome) {
                if !outcome.status.is_passed() {
                    panic!("observer rejects {}", outcome.name);
                }
            }
        }

        #[tokio::test]
        async fn test_panicking_observer_keeps_case_in_report() {
            let factory = Arc::new(MockFactory::new(site()));
            let mut s = TestSuite::new("observer");
            s.add_case(TestCase::new("grid").navigate(HOME));
            s.add_case(TestCase::new("bad-url").navigate("https://shop.test/404"));
            let report = Runner::new(config(), factory)
                .with_observer(Arc::new(PanicsOnFailure))
                .run(&s)
                .await;
            assert_eq!(report.total_count(), 2);
            assert_eq!(
                report.statuses(),
                vec![OutcomeStatus::Passed, OutcomeStatus::Errored]
            );
            assert_eq!(report.outcomes[1].name, "bad-url");
            assert!(report.outcomes[1].message.as_deref().unwrap().contains("case task failed"));
            assert_eq!(report.exit_code(), 1);
        }

        #[tokio::test]
        async fn test_observer_sees_every_case() {
            let recorder = Arc::new(Recorder::default());
            let factory = Arc::new(MockFactory::new(site()));
            Runner::new(config().with_workers(1), factory)
                .with_observer(recorder.clone())
                .run(&suite())
                .await;
            let events = recorder.0.lock().clone();
            assert_eq!(events.len(), 8);
            assert_eq!(events[0], "start:grid");
            assert_eq!(events[1], "end:grid");
        }
    }
}
