use crate::reporter::{Reporter, StopWaiter};
use crate::script::CaseConfig;
use crate::session::{Session, Tally};
use crate::test_case::TestCase;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct RunOutput {
    pub tally: Tally, // Live counters if the session never finished
    pub finished: bool,
    pub not_run: usize, // Skipped because stop was signaled first
    pub time: Duration,
}

/// Replays `cases` through `session`.
///
/// Every case is registered before any of them runs, so the session cannot
/// finish while later cases are still unregistered. Cases then run one after
/// another in script order; once the session signals stop, the rest are left
/// unrun.
pub async fn run_cases(
    cases: &[CaseConfig],
    session: Arc<Session>,
    reporter: &dyn Reporter,
    waiter: &StopWaiter,
) -> RunOutput {
    let start = Instant::now();

    let contexts: Vec<_> = cases
        .iter()
        .map(|config| {
            let case = TestCase::new(session.clone(), config.suite.as_deref());
            if config.optional {
                case.set_optional(true);
            }
            case
        })
        .collect();

    let mut not_run = 0;
    for (config, case) in cases.iter().zip(&contexts) {
        if waiter.try_stopped().is_some() {
            not_run += 1;
            continue;
        }

        session.start_session();
        for message in &config.messages {
            session.log_message(message);
        }
        case.record(
            config.outcome,
            &config.function,
            &config.expect_message,
            &config.message,
        );
        let completion = case.complete(reporter);
        debug!(test_id = %case.id(), ?completion, "ran case");

        tokio::task::yield_now().await;
    }

    if not_run > 0 {
        warn!(not_run, "session stopped before all cases ran");
    }

    let stopped = waiter.try_stopped();
    RunOutput {
        tally: stopped.unwrap_or_else(|| session.tally()),
        finished: stopped.is_some(),
        not_run,
        time: start.elapsed(),
    }
}
