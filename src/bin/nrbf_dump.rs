//! Worked usage example: reads an NRBF-encoded file and prints its
//! projected value tree as pretty JSON. External glue, not part of the
//! library's public contract (see `nrbf_decoder`'s crate docs).

use std::fs;
use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"), version, about = env!("CARGO_PKG_DESCRIPTION"))]
struct Args {
    /// Path to a raw NRBF byte stream (no base64 framing).
    path: std::path::PathBuf,

    /// Minimum log level to print to stderr.
    #[arg(long, value_enum, default_value = "warn")]
    log_level: LogLevel,
}

#[derive(Copy, Clone, clap::ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    pretty_env_logger::formatted_builder()
        .filter_level(args.log_level.into())
        .init();

    let bytes = match fs::read(&args.path) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("failed to read {}: {}", args.path.display(), err);
            return ExitCode::FAILURE;
        }
    };

    match nrbf_decoder::deserialize(&bytes) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).expect("Value is always serializable"));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
