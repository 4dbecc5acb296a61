use crate::diagnostics::{DiagnosticSink, Outcome, StdoutSink};
use crate::reporter::{ProcessExit, Reporter, Terminator};
use std::fmt::Display;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info, warn};

// Unique within one session
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TestId(u64);

impl TestId {
    #[must_use]
    pub fn index(self) -> u64 {
        self.0
    }
}

impl Display for TestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl Tally {
    pub fn new(passed: u64, failed: u64, skipped: u64) -> Self {
        Self {
            passed,
            failed,
            skipped,
        }
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.passed + self.failed + self.skipped
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    // Expected failures are passes, unexpected passes are failures
    pub fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Pass | Outcome::ExpectedFail => self.passed += 1,
            Outcome::Fail | Outcome::UnexpectedPass => self.failed += 1,
            Outcome::Skip => self.skipped += 1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Completion {
    Pending(usize), // Remaining pending tests; 0 if nothing was ever pending
    Finished(Tally),
    AlreadyFinished,
}

#[derive(Debug, Default)]
struct SessionState {
    suite_name: String,
    reported_start: bool,
    tally: Tally,
    next_id: u64,
    // Ordered, no duplicates.
    pending_tests: Vec<TestId>,
    ever_pending: bool,
    finished: bool,
}

impl SessionState {
    fn is_pending(&self, id: TestId) -> bool {
        self.pending_tests.contains(&id)
    }

    fn remove_pending(&mut self, id: TestId) -> bool {
        match self.pending_tests.iter().position(|pending| *pending == id) {
            Some(index) => {
                self.pending_tests.remove(index);
                true
            }
            None => false,
        }
    }

    fn add_pending(&mut self, id: TestId) -> bool {
        if self.is_pending(id) {
            return false;
        }
        self.pending_tests.push(id);
        self.ever_pending = true;
        true
    }
}

/// Shared aggregate of a test session.
///
/// All state lives behind one mutex, so a session can be shared between any
/// number of test-case contexts. Collaborators (the diagnostic sink, the
/// reporter and the terminator) are always called with the lock released.
pub struct Session {
    state: Mutex<SessionState>,
    sink: Box<dyn DiagnosticSink>,
    terminator: Box<dyn Terminator>,
}

impl Session {
    pub fn new(
        sink: impl DiagnosticSink + 'static,
        terminator: impl Terminator + 'static,
    ) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            sink: Box::new(sink),
            terminator: Box::new(terminator),
        }
    }

    /// Process-wide session, created on first use and never torn down. It
    /// prints to standard output and exits the process once finished.
    pub fn global() -> &'static Session {
        static SESSION: OnceLock<Session> = OnceLock::new();
        SESSION.get_or_init(|| {
            debug!("initializing process-wide test session");
            Session::new(StdoutSink::default(), ProcessExit)
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // The first non-empty name becomes the suite name
    pub fn register_test(&self, name: Option<&str>) -> TestId {
        let mut state = self.lock();
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            if state.suite_name.is_empty() {
                state.suite_name = name.to_owned();
            }
        }

        let id = TestId(state.next_id);
        state.next_id += 1;
        state.add_pending(id);

        debug!(test_id = id.0, suite = %state.suite_name, "registered test");
        id
    }

    pub fn mark_optional(&self, id: TestId) {
        if self.lock().remove_pending(id) {
            debug!(test_id = id.0, "test marked optional");
        }
    }

    pub fn mark_mandatory(&self, id: TestId) {
        if self.lock().add_pending(id) {
            debug!(test_id = id.0, "test marked mandatory");
        }
    }

    pub fn record(&self, outcome: Outcome, testcase: &str, expect_msg: &str, msg: &str) {
        self.sink.line(&outcome.format_line(testcase, expect_msg, msg));
        self.lock().tally.add(outcome);
    }

    pub fn record_fail(&self, testcase: &str, msg: &str) {
        self.record(Outcome::Fail, testcase, "", msg);
    }

    pub fn record_expected_fail(&self, testcase: &str, expect_msg: &str, msg: &str) {
        self.record(Outcome::ExpectedFail, testcase, expect_msg, msg);
    }

    pub fn record_unexpected_pass(&self, testcase: &str) {
        self.record(Outcome::UnexpectedPass, testcase, "", "");
    }

    pub fn record_skip(&self, testcase: &str, msg: &str) {
        self.record(Outcome::Skip, testcase, "", msg);
    }

    pub fn record_pass(&self, testcase: &str) {
        self.record(Outcome::Pass, testcase, "", "");
    }

    pub fn log_message(&self, msg: &str) {
        self.sink.line(msg);
    }

    // Only the first call returns true
    pub fn start_session(&self) -> bool {
        let mut state = self.lock();
        if state.reported_start {
            return false;
        }
        state.reported_start = true;
        debug!("test session started");
        true
    }

    /// Completes `id`; if that drains the pending set, reports and stops.
    ///
    /// Removing the id and deciding whether the session just finished happen
    /// under one lock, so across any number of concurrent callers exactly one
    /// observes the transition and reports. Once finished, the session never
    /// reports again.
    pub fn complete_test(&self, id: TestId, reporter: &dyn Reporter) -> Completion {
        let tally = {
            let mut state = self.lock();
            state.remove_pending(id);

            if state.finished {
                warn!(test_id = id.0, "completion after the session already finished");
                return Completion::AlreadyFinished;
            }
            if !state.pending_tests.is_empty() || !state.ever_pending {
                debug!(
                    test_id = id.0,
                    remaining = state.pending_tests.len(),
                    "test completed"
                );
                return Completion::Pending(state.pending_tests.len());
            }

            state.finished = true;
            state.tally
        };

        info!(
            passed = tally.passed,
            failed = tally.failed,
            skipped = tally.skipped,
            "test session finished"
        );
        reporter.report(tally.passed, tally.failed, tally.skipped);
        self.terminator.stop(tally);
        Completion::Finished(tally)
    }

    /// `"<name>::<funcname>()"`, falling back to the suite name, or just
    /// `"<funcname>()"` when no name is known.
    #[must_use]
    pub fn prefixed_name(&self, name: Option<&str>, funcname: &str) -> String {
        match name.filter(|name| !name.is_empty()) {
            Some(name) => format!("{name}::{funcname}()"),
            None => {
                let state = self.lock();
                if state.suite_name.is_empty() {
                    format!("{funcname}()")
                } else {
                    format!("{}::{funcname}()", state.suite_name)
                }
            }
        }
    }

    #[must_use]
    pub fn suite_name(&self) -> String {
        self.lock().suite_name.clone()
    }

    #[must_use]
    pub fn tally(&self) -> Tally {
        self.lock().tally
    }

    #[must_use]
    pub fn pending(&self) -> Vec<TestId> {
        self.lock().pending_tests.clone()
    }

    #[must_use]
    pub fn is_pending(&self, id: TestId) -> bool {
        self.lock().is_pending(id)
    }

    #[must_use]
    pub fn has_started(&self) -> bool {
        self.lock().reported_start
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.lock().finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::MemorySink;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Reports(Mutex<Vec<Tally>>);

    impl Reporter for Reports {
        fn report(&self, passed: u64, failed: u64, skipped: u64) {
            self.0.lock().unwrap().push(Tally::new(passed, failed, skipped));
        }
    }

    impl Reports {
        fn all(&self) -> Vec<Tally> {
            self.0.lock().unwrap().clone()
        }
    }

    fn session() -> (Session, MemorySink, Arc<AtomicUsize>) {
        let sink = MemorySink::new();
        let stops = Arc::new(AtomicUsize::new(0));
        let counter = stops.clone();
        let session = Session::new(sink.clone(), move |_: Tally| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (session, sink, stops)
    }

    #[test]
    fn ids_are_strictly_increasing() {
        let (session, _, _) = session();
        let ids: Vec<_> = (0..10).map(|_| session.register_test(None)).collect();
        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(ids[0].index(), 0);
        assert_eq!(ids[9].index(), 9);
        assert_eq!(session.pending(), ids);
    }

    #[test]
    fn first_non_empty_name_wins() {
        let (session, _, _) = session();
        session.register_test(None);
        session.register_test(Some(""));
        assert_eq!(session.suite_name(), "");
        session.register_test(Some("First"));
        session.register_test(Some("Second"));
        assert_eq!(session.suite_name(), "First");
    }

    #[test]
    fn optional_then_mandatory_restores_pending() {
        let (session, _, _) = session();
        let id = session.register_test(Some("Suite"));
        session.mark_optional(id);
        assert!(!session.is_pending(id));
        session.mark_optional(id);
        session.mark_mandatory(id);
        assert!(session.is_pending(id));
        session.mark_mandatory(id);
        assert_eq!(session.pending(), vec![id]);
    }

    #[test]
    fn start_is_reported_once() {
        let (session, _, _) = session();
        assert!(!session.has_started());
        assert!(session.start_session());
        assert!(!session.start_session());
        assert!(session.has_started());
    }

    #[test]
    fn single_pass_reports_and_stops() {
        let (session, sink, stops) = session();
        let reports = Reports::default();

        let id = session.register_test(Some("Suite"));
        assert_eq!(id.index(), 0);
        session.record_pass("t1");
        assert_eq!(session.tally().passed, 1);

        let completion = session.complete_test(id, &reports);
        assert_eq!(completion, Completion::Finished(Tally::new(1, 0, 0)));
        assert_eq!(reports.all(), vec![Tally::new(1, 0, 0)]);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert_eq!(sink.lines(), vec!["PASS   : t1"]);
    }

    #[test]
    fn suite_name_fallback_in_labels() {
        let (session, _, _) = session();
        assert_eq!(session.register_test(None).index(), 0);
        assert_eq!(session.suite_name(), "");
        assert_eq!(session.prefixed_name(None, "foo"), "foo()");
        assert_eq!(session.register_test(Some("Suite2")).index(), 1);
        assert_eq!(session.suite_name(), "Suite2");
        assert_eq!(session.prefixed_name(None, "foo"), "Suite2::foo()");
        assert_eq!(session.prefixed_name(Some(""), "foo"), "Suite2::foo()");
        assert_eq!(session.prefixed_name(Some("Other"), "foo"), "Other::foo()");
    }

    #[test]
    fn optional_test_does_not_gate_completion() {
        let (session, _, stops) = session();
        let reports = Reports::default();

        let first = session.register_test(None);
        let second = session.register_test(None);
        session.mark_optional(second);
        session.record_fail("a", "");

        assert_eq!(
            session.complete_test(first, &reports),
            Completion::Finished(Tally::new(0, 1, 0))
        );
        assert_eq!(reports.all(), vec![Tally::new(0, 1, 0)]);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reporter_may_call_back_into_the_session() {
        let (session, _, stops) = session();
        let id = session.register_test(Some("Suite"));
        let nested = std::cell::Cell::new(None);
        let reporter = |_: u64, _: u64, _: u64| {
            let ignore = |_: u64, _: u64, _: u64| {};
            nested.set(Some(session.complete_test(id, &ignore)));
        };

        assert!(matches!(
            session.complete_test(id, &reporter),
            Completion::Finished(_)
        ));
        assert_eq!(nested.get(), Some(Completion::AlreadyFinished));
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn finished_session_does_not_report_again() {
        let (session, _, stops) = session();
        let reports = Reports::default();

        let id = session.register_test(Some("Suite"));
        session.record_skip("t", "not today");
        assert!(matches!(
            session.complete_test(id, &reports),
            Completion::Finished(_)
        ));
        assert_eq!(
            session.complete_test(id, &reports),
            Completion::AlreadyFinished
        );
        let late = session.register_test(None);
        assert_eq!(
            session.complete_test(late, &reports),
            Completion::AlreadyFinished
        );

        assert_eq!(reports.all(), vec![Tally::new(0, 0, 1)]);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
        assert!(session.is_finished());
    }

    #[test]
    fn completing_before_anything_is_pending_does_not_finish() {
        let (session, _, stops) = session();
        let reports = Reports::default();
        assert_eq!(
            session.complete_test(TestId(3), &reports),
            Completion::Pending(0)
        );
        assert!(reports.all().is_empty());
        assert_eq!(stops.load(Ordering::SeqCst), 0);
        assert!(!session.is_finished());
    }

    #[test]
    fn reported_counts_are_cumulative() {
        let (session, sink, _) = session();
        let reports = Reports::default();

        let a = session.register_test(Some("Suite"));
        let b = session.register_test(None);
        session.record_pass("a");
        session.record_expected_fail("b", "known", "broken");
        session.record_unexpected_pass("c");
        session.record_fail("d", "bad");
        session.record_skip("e", "");
        session.log_message("hello");

        assert_eq!(session.complete_test(b, &reports), Completion::Pending(1));
        assert_eq!(
            session.complete_test(a, &reports),
            Completion::Finished(Tally::new(2, 2, 1))
        );
        assert_eq!(
            sink.lines(),
            vec![
                "PASS   : a",
                "XFAIL  : b known broken",
                "XPASS  : c",
                "FAIL!  : d bad",
                "SKIP   : e ",
                "hello",
            ]
        );
    }

    #[test]
    fn global_session_is_shared() {
        assert!(std::ptr::eq(Session::global(), Session::global()));
    }
}
