// Process startup and shutdown shared by the binaries: logging, config,
// store connection, and the Ctrl-C / error exit policy.

use std::future::Future;
use std::io;
use std::process::ExitCode;

use anyhow::Context;
use hoopcards_core::config::{load_config, Config};
use hoopcards_es::EsStore;
use tracing::info;

use crate::args::CommonArgs;

/// Printed to stdout when the run is interrupted.
pub const INTERRUPT_MESSAGE: &str = "\n\nReceived Ctrl-C or other break signal. Exiting.";

/// How a run ended.
#[derive(Debug)]
pub enum Outcome {
    Completed,
    Interrupted,
    Failed(anyhow::Error),
}

impl Outcome {
    /// Report the outcome to the terminal and convert it to an exit status.
    pub fn report(self) -> ExitCode {
        match self {
            Outcome::Completed => ExitCode::SUCCESS,
            Outcome::Interrupted => {
                println!("{INTERRUPT_MESSAGE}");
                ExitCode::SUCCESS
            }
            Outcome::Failed(e) => {
                eprintln!("Error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}

/// Initialize tracing to stderr. `RUST_LOG` overrides the default filter.
pub fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("hoopcards_core=info,hoopcards_es=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

/// Load configuration relative to `--config` or the working directory.
pub fn load(common: &CommonArgs) -> anyhow::Result<Config> {
    let config = load_config(common.base_dir()).context("failed to load configuration")?;
    info!(
        "Config loaded: store={}, index={}",
        config.store.url, config.index.name
    );
    Ok(config)
}

/// Elasticsearch client for the configured store.
pub fn connect(config: &Config) -> anyhow::Result<EsStore> {
    EsStore::from_config(&config.store, &config.credentials)
        .with_context(|| format!("failed to set up client for {}", config.store.url))
}

/// Drive `run` to completion unless `interrupt` resolves first. An interrupt
/// drops `run` where it stands; nothing it already wrote is rolled back.
///
/// A signal listener that fails to install also stops the run, as a failure.
pub async fn run_until<R, I>(run: R, interrupt: I) -> Outcome
where
    R: Future<Output = anyhow::Result<()>>,
    I: Future<Output = io::Result<()>>,
{
    tokio::select! {
        result = run => match result {
            Ok(()) => Outcome::Completed,
            Err(e) => Outcome::Failed(e),
        },
        signal = interrupt => match signal {
            Ok(()) => Outcome::Interrupted,
            Err(e) => Outcome::Failed(
                anyhow::Error::new(e).context("failed to listen for Ctrl-C"),
            ),
        },
    }
}

/// [`run_until`] with Ctrl-C as the interrupt, reported to the terminal.
pub async fn run_until_interrupted<R>(run: R) -> ExitCode
where
    R: Future<Output = anyhow::Result<()>>,
{
    run_until(run, tokio::signal::ctrl_c()).await.report()
}
