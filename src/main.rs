//! Catalogue the files at a location and print them as JSON lines, one page
//! per line.

use clap::Parser;
use derive_more::{Display, Error};
use exn::ResultExt;
use figment::providers::Serialized;
use filecat_catalog::{BackendCache, Credentials};
use filecat_config::Config;
use futures::TryStreamExt;
use serde::Serialize;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::pin::pin;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit status for failures a retry might fix (`EX_TEMPFAIL`).
const EXIT_RETRYABLE: u8 = 75;

#[derive(Parser, Debug)]
#[command(name = "filecat", version, about = "Catalogue files as paged metadata records")]
struct Cli {
    /// Config file (TOML, YAML or JSON).
    #[arg(short, long, env = "FILECAT_CONFIG")]
    config: Option<PathBuf>,
    /// Location to catalogue: a directory, `s3://bucket/prefix` or
    /// `gitfs://[repo:][ref@]path`.
    location: Option<String>,
    /// Glob pattern relative to the location.
    #[arg(short, long)]
    glob: Option<String>,
    /// Files per page.
    #[arg(short = 'n', long)]
    page_size: Option<i64>,
    /// Include file contents in the records.
    #[arg(long)]
    extract_content: bool,
    /// Repository for `gitfs://` locations.
    #[arg(long)]
    repo: Option<PathBuf>,
    /// Branch, tag or commit for `gitfs://` locations.
    #[arg(long = "ref")]
    reference: Option<String>,
}

/// Command-line values that take precedence over every config layer.
#[derive(Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    credentials: Option<Credentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_glob: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    files_per_page: Option<i64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    extract_content: bool,
}

impl From<Cli> for Overrides {
    fn from(cli: Cli) -> Self {
        let credentials = (cli.repo.is_some() || cli.reference.is_some()).then(|| Credentials::Git {
            repo_path: cli.repo,
            reference: cli.reference,
        });
        Self {
            bucket_url: cli.location,
            credentials,
            file_glob: cli.glob,
            files_per_page: cli.page_size,
            extract_content: cli.extract_content,
        }
    }
}

#[derive(Debug, Display, Error)]
enum CliError {
    #[display("invalid configuration")]
    Config,
    #[display("cataloguing failed")]
    Catalog,
    #[display("cataloguing failed, retrying may help")]
    Retryable,
    #[display("failed to write output")]
    Output,
}

fn catalog_error(err: filecat_catalog::error::Error) -> exn::Exn<CliError> {
    let kind = if err.is_retryable() { CliError::Retryable } else { CliError::Catalog };
    err.raise(kind)
}

async fn run(cli: Cli) -> Result<usize, exn::Exn<CliError>> {
    let figment = Config::figment(cli.config.as_deref()).or_raise(|| CliError::Config)?;
    let figment = figment.merge(Serialized::globals(Overrides::from(cli)));
    let config = Config::from_figment(&figment).or_raise(|| CliError::Config)?;
    let options = config.run_options().or_raise(|| CliError::Config)?;
    let cache = config.cache_capacity().map(BackendCache::new);
    tracing::debug!(?config, "Loaded configuration");

    let pages = filecat_catalog::run(config.source(), &options, cache.as_ref()).await.map_err(catalog_error)?;
    let mut pages = pin!(pages);
    let mut out = BufWriter::new(io::stdout().lock());
    let mut count = 0;
    while let Some(page) = pages.try_next().await.map_err(catalog_error)? {
        serde_json::to_writer(&mut out, &page).or_raise(|| CliError::Output)?;
        out.write_all(b"\n").or_raise(|| CliError::Output)?;
        out.flush().or_raise(|| CliError::Output)?;
        count += 1;
    }
    Ok(count)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(pages) => {
            tracing::debug!(pages, "Done");
            ExitCode::SUCCESS
        },
        Err(err) => {
            tracing::error!("{err:?}");
            match &*err {
                CliError::Retryable => ExitCode::from(EXIT_RETRYABLE),
                _ => ExitCode::FAILURE,
            }
        },
    }
}
