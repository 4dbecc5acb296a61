use crate::session::Tally;
use colored::Colorize;
use tokio::sync::watch;

pub trait Reporter {
    fn report(&self, passed: u64, failed: u64, skipped: u64);
}

impl<F: Fn(u64, u64, u64)> Reporter for F {
    fn report(&self, passed: u64, failed: u64, skipped: u64) {
        self(passed, failed, skipped)
    }
}

// Called right after the session has reported
pub trait Terminator: Send + Sync {
    fn stop(&self, tally: Tally);
}

impl<F: Fn(Tally) + Send + Sync> Terminator for F {
    fn stop(&self, tally: Tally) {
        self(tally)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    #[must_use]
    pub fn summary(tally: Tally) -> (String, String) {
        let totals = format!(
            "Totals: {} passed, {} failed, {} skipped",
            tally.passed, tally.failed, tally.skipped
        );
        let result = format!(
            "[{}/{}] tests pass",
            tally.passed,
            tally.passed + tally.failed
        );
        (totals, result)
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, passed: u64, failed: u64, skipped: u64) {
        let tally = Tally::new(passed, failed, skipped);
        let (totals, result) = Self::summary(tally);
        println!("{totals}");
        if tally.all_passed() {
            println!("{}", result.green().bold());
        } else {
            println!("{}", result.red().bold());
        }
    }
}

// Exit code 0 without failures, 1 otherwise
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExit;

impl Terminator for ProcessExit {
    fn stop(&self, tally: Tally) {
        std::process::exit(if tally.all_passed() { 0 } else { 1 });
    }
}

#[derive(Debug)]
pub struct StopSignal {
    sender: watch::Sender<Option<Tally>>,
}

#[derive(Debug, Clone)]
pub struct StopWaiter {
    receiver: watch::Receiver<Option<Tally>>,
}

pub fn stop_signal() -> (StopSignal, StopWaiter) {
    let (sender, receiver) = watch::channel(None);
    (StopSignal { sender }, StopWaiter { receiver })
}

impl Terminator for StopSignal {
    fn stop(&self, tally: Tally) {
        self.sender.send_replace(Some(tally));
    }
}

impl StopWaiter {
    #[must_use]
    pub fn try_stopped(&self) -> Option<Tally> {
        *self.receiver.borrow()
    }

    /// Waits until stop is signaled. Returns `None` if the signal was dropped
    /// without ever firing.
    pub async fn stopped(&mut self) -> Option<Tally> {
        self.receiver
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|tally| *tally)
    }
}
