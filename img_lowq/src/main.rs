use chrono::Local;
use img_lowq::{resolve_args, run, ArgsError, USAGE};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::{print_summary_json, print_summary_report, RunSummary};
use std::time::Instant;
use tracing::{debug, Level};

fn main() -> anyhow::Result<()> {
    let resolved = match resolve_args(std::env::args()) {
        Ok(resolved) => resolved,
        Err(ArgsError::Clap(e)) if !e.use_stderr() => e.exit(),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };
    let config = resolved.config;

    let mut log_config = LogConfig::default().with_level(if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    });
    if let Some(dir) = &config.log_dir {
        log_config = log_config.with_log_dir(dir);
    }
    let _ = init_logging("img_lowq", log_config);

    for token in &resolved.ignored {
        debug!(token = %token, "Ignoring unrecognised argument");
    }

    let started_at = Local::now();
    let start = Instant::now();
    let result = run(&config);

    let summary = RunSummary::from_batch("img_lowq", started_at, start.elapsed(), &result);
    if config.json {
        print_summary_json(&summary)?;
    } else {
        print_summary_report(&summary);
    }

    Ok(())
}
