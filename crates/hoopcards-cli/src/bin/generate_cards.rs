// generate-cards: rate every player on a draft list and write their cards.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use hoopcards_cli::args::GenerateCardsArgs;
use hoopcards_cli::startup::{connect, init_tracing, load, run_until_interrupted};
use hoopcards_core::cards::CardGenerator;
use hoopcards_core::draft::{read_draft, write_cards};
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = GenerateCardsArgs::parse();
    run_until_interrupted(run(args)).await
}

async fn run(args: GenerateCardsArgs) -> anyhow::Result<()> {
    init_tracing()?;
    let config = load(&args.common)?;

    // The draft list is validated before the store is contacted.
    let draft = read_draft(&args.draft_csv).context("failed to read draft list")?;
    info!("Draft list has {} entries", draft.len());

    let store = connect(&config)?;
    let generator = CardGenerator::new(&store, config.index.name.as_str())
        .await
        .context("failed to compute percentile thresholds")?;

    let cards = generator
        .generate_all(&draft)
        .await
        .context("failed to generate cards")?;

    write_cards(&args.cards_csv, &cards).context("failed to write cards")?;
    info!(
        "Wrote {} card(s) to {}",
        cards.len(),
        args.cards_csv.display()
    );
    Ok(())
}
