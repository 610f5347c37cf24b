// Command line arguments for the two binaries.

use std::path::{Path, PathBuf};

use clap::{Args, Parser};

/// Options shared by every binary.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Directory holding config/ and defaults/ (defaults to the working directory)
    #[arg(long, value_name = "DIR")]
    pub config: Option<PathBuf>,
}

impl CommonArgs {
    pub fn base_dir(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

/// Load the season stats CSV into a freshly created index.
#[derive(Debug, Parser)]
#[command(name = "load-stats")]
#[command(about = "Load basketball season statistics into Elasticsearch")]
pub struct LoadStatsArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Rate drafted players against league percentiles and write their cards.
#[derive(Debug, Parser)]
#[command(name = "generate-cards")]
#[command(about = "Generate player skill cards for a draft list")]
pub struct GenerateCardsArgs {
    /// Draft list CSV with `name` and optional `year` columns
    pub draft_csv: PathBuf,

    /// Output CSV for the generated cards
    pub cards_csv: PathBuf,

    #[command(flatten)]
    pub common: CommonArgs,
}
