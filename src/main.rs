mod global_configuration;

use colored::Colorize;
use std::io::{stdout, Write};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use test_session::log_parser::summarize_log_file;
use test_session::logging::init_logging;
use test_session::runner::run_cases;
use test_session::script::load_script;
use test_session::snapshot_testing::log_matches_snapshot;
use test_session::{
    stop_signal, ConsoleReporter, DriverError, MemorySink, Reporter, Result, Session, StdoutSink,
};
use tracing::info;

use crate::global_configuration::{global_config, DriverCommand, DriverConfig};

fn yes_or_no_input(prompt: &str) -> std::io::Result<bool> {
    let stdin = std::io::stdin();

    loop {
        print!("{prompt}");
        stdout().flush()?;
        let mut buffer = String::new();
        if stdin.read_line(&mut buffer)? == 0 {
            return Ok(false);
        }

        match buffer.trim_end() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => {}
        }
    }
}

async fn tally_saved_log(path: &Path) -> Result<ExitCode> {
    let summary = summarize_log_file(path).await?;
    let tally = summary.tally;
    ConsoleReporter.report(tally.passed, tally.failed, tally.skipped);
    Ok(if summary.passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn replay_script(config: &DriverConfig, script_path: &Path) -> Result<ExitCode> {
    let script = load_script(script_path).await?;
    info!(cases = script.cases.len(), script = %script_path.display(), "loaded session script");

    let capture = MemorySink::new();
    let (signal, waiter) = stop_signal();
    let session = Arc::new(Session::new(
        (StdoutSink::new(config.quiet), capture.clone()),
        signal,
    ));

    let output = run_cases(&script.cases, session, &ConsoleReporter, &waiter).await;
    if !output.finished {
        println!(
            "{}",
            "Session did not finish: no mandatory test cases".yellow().bold()
        );
        ConsoleReporter.report(output.tally.passed, output.tally.failed, output.tally.skipped);
    }
    println!(
        "{} tests executed in: {:.4}s",
        output.tally.total(),
        output.time.as_secs_f32()
    );

    let mut log_matches = true;
    if script.snapshot_log {
        if let Err(mismatch) =
            log_matches_snapshot(Arc::from(capture.contents()), script_path).await
        {
            println!("{}:", "Failed".red().bold());
            println!("{mismatch}");

            if config.interactive && yes_or_no_input("overwrite approved file [yes/no]? ")? {
                mismatch.approve().await.map_err(|source| DriverError::Io {
                    path: mismatch.approved_path.clone(),
                    source,
                })?;
            } else {
                log_matches = false;
            }
        }
    }

    Ok(if output.tally.all_passed() && log_matches {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn drive(config: &DriverConfig) -> Result<ExitCode> {
    match &config.command {
        DriverCommand::Run { script } => replay_script(config, script).await,
        DriverCommand::Tally { log } => tally_saved_log(log).await,
    }
}

fn main() -> ExitCode {
    let config = global_config();
    init_logging(&config.log_level);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("{}: failed to start runtime: {error}", "error".red().bold());
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(drive(config)) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{}: {error}", "error".red().bold());
            ExitCode::FAILURE
        }
    }
}
