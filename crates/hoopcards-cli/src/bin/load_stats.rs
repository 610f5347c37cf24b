// load-stats: replace the season stats index with the configured CSV.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use hoopcards_cli::args::LoadStatsArgs;
use hoopcards_cli::startup::{connect, init_tracing, load, run_until_interrupted};
use hoopcards_core::loader::load_season_stats_files;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = LoadStatsArgs::parse();
    run_until_interrupted(run(args)).await
}

async fn run(args: LoadStatsArgs) -> anyhow::Result<()> {
    init_tracing()?;
    let config = load(&args.common)?;
    let store = connect(&config)?;

    let stats_csv = config.resolve(&config.loader.stats_csv);
    let mapping = config.resolve(&config.loader.mapping);
    info!(
        "Loading {} into index {}",
        stats_csv.display(),
        config.index.name
    );

    let summary = load_season_stats_files(
        &store,
        &config.index.name,
        &stats_csv,
        &mapping,
        config.loader.chunk_size,
    )
    .await
    .context("failed to load season stats")?;

    info!(
        "Loaded {} documents in {} chunk(s)",
        summary.written, summary.chunks
    );
    Ok(())
}
