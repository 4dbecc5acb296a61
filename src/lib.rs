// Result aggregation for a test execution session: registered and pending
// tests, outcome counters, and an exactly-once report when the last pending
// test completes.

pub mod diagnostics;
pub mod error;
pub mod log_parser;
pub mod logging;
pub mod reporter;
pub mod runner;
pub mod script;
pub mod session;
pub mod snapshot_testing;
pub mod test_case;

pub use diagnostics::{DiagnosticSink, MemorySink, Outcome, StdoutSink};
pub use error::{DriverError, Result};
pub use reporter::{
    stop_signal, ConsoleReporter, ProcessExit, Reporter, StopSignal, StopWaiter, Terminator,
};
pub use session::{Completion, Session, Tally, TestId};
pub use test_case::TestCase;
