use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub struct DriverConfig {
    pub command: DriverCommand,
    pub quiet: bool,
    pub interactive: bool,
    pub log_level: String,
}

pub fn global_config() -> &'static DriverConfig {
    static CONFIG: OnceLock<DriverConfig> = OnceLock::new();
    CONFIG.get_or_init(|| {
        let args = Args::parse();

        DriverConfig {
            command: args.command,
            quiet: args.quiet,
            interactive: args.interactive,
            log_level: args.log_level,
        }
    })
}

#[derive(Subcommand, Debug)]
pub enum DriverCommand {
    /// Replay a TOML session script
    Run { script: PathBuf },

    /// Summarize a saved diagnostic log
    Tally { log: PathBuf },
}

#[derive(Parser, Debug)]
#[command(about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: DriverCommand,

    /// Suppress any output except for test failures.
    #[arg(short, long, global = true, default_value_t = false)]
    quiet: bool,

    /// Offer to overwrite the approved log when it does not match
    #[arg(short, long, global = true, default_value_t = false)]
    interactive: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
}
