//! Command-line entry point: download every file named in a work list.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use clap::error::ErrorKind;

use commons_dl::logging::{DEFAULT_FILTER, init_logging};
use commons_dl::{Config, Downloader, Mode, run_with_shutdown};

/// Bulk-download files listed one per line from a media repository
#[derive(Debug, Parser)]
#[command(name = "commons-dl", version, about)]
struct Cli {
    /// Work list: one entry per line, identifier before the last delimiter
    #[arg(long, value_name = "PATH")]
    file: PathBuf,

    /// Character encoding of the work list
    #[arg(long, value_name = "NAME", default_value = "UTF-8")]
    charset: String,

    /// Directory the files are written to
    #[arg(long, value_name = "DIR", default_value = ".")]
    destination: PathBuf,

    /// What to do with files that already exist: resume (skip) or restart (overwrite)
    #[arg(long, value_name = "MODE", default_value = "resume")]
    mode: Mode,

    /// Separator between identifier and trailing metadata
    #[arg(long, value_name = "CHAR", default_value_t = ',')]
    delimiter: char,

    /// Base URL of the file endpoint
    #[arg(long, value_name = "URL")]
    endpoint: Option<String>,

    /// Maximum requests in flight
    #[arg(long, value_name = "N", default_value_t = 8)]
    concurrency: usize,

    /// Deadline for a whole request, body included, in seconds (default: none)
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Append one JSON object per outcome to this file
    #[arg(long, value_name = "PATH")]
    events: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::default();
        config.input.file = self.file;
        config.input.charset = self.charset;
        config.input.delimiter = self.delimiter;
        config.download.destination = self.destination;
        config.download.mode = self.mode;
        config.download.max_concurrent_downloads = self.concurrency;
        config.http.request_timeout = self.timeout.map(Duration::from_secs);
        if let Some(endpoint) = self.endpoint {
            config.endpoint.base_url = endpoint;
        }
        config.events_file = self.events;
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                print!("{}", e.render());
                return ExitCode::SUCCESS;
            }
            _ => {
                // Usage problems go to stdout with status 2
                print!("{}", e.render());
                return ExitCode::from(2);
            }
        },
    };

    init_logging(DEFAULT_FILTER);

    match run(cli.into_config()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Aborted");
            eprintln!("commons-dl: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(config: Config) -> commons_dl::Result<()> {
    let downloader = Downloader::new(config).await?;
    let summary = run_with_shutdown(&downloader).await?;
    tracing::info!(%summary, "Batch finished");
    Ok(())
}
