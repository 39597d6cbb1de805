//! `snbackup` command-line entry point.
//!
//! # Responsibility
//! - Parse flags, bootstrap logging and wire config, client and cache into
//!   `snbackup_core::BackupService`.
//! - Own all terminal output: progress bar, summary and the fatal error line.
//!
//! # Invariants
//! - A fatal error is logged once and printed once; the exit status is non-zero.
//! - Logging failures never abort the backup.

use clap::Parser;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::{error, info, warn};
use snbackup_core::config::{default_cache_path, default_data_dir};
use snbackup_core::{
    default_log_level, init_logging, load_config, BackupError, BackupProgress, BackupReport,
    BackupService, CacheStore, FetchOptions, LogSettings, SimplenoteClient,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "snbackup")]
#[command(about = "Incremental local backup of a Simplenote account")]
#[command(version)]
struct Cli {
    /// Config file with account credentials
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Export file (JSON array of live notes)
    #[arg(short, long, default_value = "simplenotebak.json.txt")]
    output: PathBuf,

    /// Suppress progress and summary output
    #[arg(short, long)]
    quiet: bool,

    /// Cache file; overrides the config and the data directory default
    #[arg(long)]
    cache_file: Option<PathBuf>,

    /// Directory for the cache and logs
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Notes fetched between cache checkpoints
    #[arg(long)]
    checkpoint_every: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

struct RunSummary {
    report: BackupReport,
    api_calls: u64,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let data_dir = absolute(cli.data_dir.clone().unwrap_or_else(default_data_dir));

    let settings = LogSettings {
        level: cli
            .log_level
            .clone()
            .unwrap_or_else(|| default_log_level().to_string()),
        log_dir: data_dir.join("logs"),
        echo_to_stderr: !cli.quiet,
    };
    if let Err(err) = init_logging(&settings) {
        eprintln!("WARNING: logging disabled: {err}");
    }

    match run(&cli, &data_dir) {
        Ok(summary) => {
            if !cli.quiet {
                println!(
                    "Backup complete: {} notes exported to {} ({} fetched, {} removed)",
                    summary.report.exported,
                    cli.output.display(),
                    summary.report.fetched,
                    summary.report.evicted
                );
                println!("API calls: {}", summary.api_calls);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(
                "event=backup_run module=cli status=error error_code={} error={}",
                err.code(),
                err
            );
            eprintln!("ERROR: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli, data_dir: &Path) -> Result<RunSummary, BackupError> {
    let config = load_config(&cli.config)?;
    info!(
        "event=config_load module=cli status=ok source={}",
        config.source.display()
    );

    let cache_path = cli
        .cache_file
        .clone()
        .or_else(|| config.cache_file.clone())
        .unwrap_or_else(|| default_cache_path(data_dir));
    let options = match cli.checkpoint_every.or(config.checkpoint_every) {
        Some(checkpoint_every) => FetchOptions { checkpoint_every },
        None => FetchOptions::default(),
    };

    let mut client = SimplenoteClient::new(config.credentials, config.endpoints)?;
    client.login()?;
    let mut cache = CacheStore::load(cache_path)?;

    let progress = Progress::new(cli.quiet);
    let report = BackupService::new(&client, options).run(&mut cache, &cli.output, |event| {
        progress.observe(event)
    });
    progress.finish();

    Ok(RunSummary {
        report: report?,
        api_calls: client.api_calls(),
    })
}

/// Terminal rendering of `BackupProgress` events.
struct Progress {
    quiet: bool,
    bar: ProgressBar,
}

impl Progress {
    fn new(quiet: bool) -> Self {
        Self {
            quiet,
            bar: ProgressBar::hidden(),
        }
    }

    fn observe(&self, event: BackupProgress) {
        match event {
            BackupProgress::IndexFetched { notes, complete } => {
                if self.quiet {
                    return;
                }
                println!("{notes} notes in account");
                if !complete {
                    warn!("event=backup_run module=cli status=partial_index notes={notes}");
                    println!("Index listing was cut short; cached notes are kept");
                }
            }
            BackupProgress::ChangeSetReady { to_fetch, .. } => {
                if self.quiet || to_fetch == 0 {
                    return;
                }
                self.bar.set_length(to_fetch as u64);
                self.bar.set_draw_target(ProgressDrawTarget::stderr());
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} notes")
                {
                    self.bar.set_style(style);
                }
            }
            BackupProgress::NoteFetched { done, .. } => self.bar.set_position(done as u64),
        }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        return path;
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(&path))
        .unwrap_or(path)
}
