// Context of one test case inside a shared session

use crate::diagnostics::Outcome;
use crate::reporter::Reporter;
use crate::session::{Completion, Session, TestId};
use std::sync::Arc;

/// A test case bound to its session. Registered on construction, it gates
/// session completion until completed or made optional.
pub struct TestCase {
    session: Arc<Session>,
    id: TestId,
    name: Option<String>,
}

impl TestCase {
    pub fn new(session: Arc<Session>, name: Option<&str>) -> Self {
        let id = session.register_test(name);
        Self {
            session,
            id,
            name: name.filter(|name| !name.is_empty()).map(str::to_owned),
        }
    }

    #[must_use]
    pub fn id(&self) -> TestId {
        self.id
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    // e.g. Math::test_add()
    #[must_use]
    pub fn label(&self, funcname: &str) -> String {
        self.session.prefixed_name(self.name.as_deref(), funcname)
    }

    pub fn set_optional(&self, optional: bool) {
        if optional {
            self.session.mark_optional(self.id);
        } else {
            self.session.mark_mandatory(self.id);
        }
    }

    pub fn record(&self, outcome: Outcome, funcname: &str, expect_msg: &str, msg: &str) {
        self.session.record(outcome, &self.label(funcname), expect_msg, msg);
    }

    pub fn complete(&self, reporter: &dyn Reporter) -> Completion {
        self.session.complete_test(self.id, reporter)
    }
}
