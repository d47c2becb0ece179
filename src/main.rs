use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wikilite::config::Settings;
use wikilite::Wiki;

#[derive(Parser)]
#[command(name = "wikilite", about = "Wikipedia dump ingestion and local search")]
struct Cli {
    /// Load the compressed index file into the database.
    #[arg(long)]
    load_index: bool,

    /// Process articles from the dump file into the database.
    #[arg(long)]
    process_articles: bool,

    /// Limit the number of entries to process (<= 0 means unlimited).
    #[arg(long, default_value_t = -1)]
    limit: i64,
}

fn init_tracing() {
    let filter = std::env::var("WIKILITE_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let settings = Settings::from_env().context("failed to load configuration")?;
    let wiki = Wiki::from_settings(&settings);

    if cli.load_index {
        info!("loading index...");
        let stats = wiki
            .load_index(cli.limit, None)
            .context("failed to load index")?;
        info!(
            entries = stats.entries(),
            malformed = stats.malformed(),
            "index loaded"
        );
    }

    if cli.process_articles {
        info!("processing articles...");
        let stats = wiki
            .process_articles(cli.limit, None)
            .context("failed to process articles")?;
        info!(
            kept = stats.pages_kept(),
            seen = stats.pages_seen(),
            "articles processed"
        );
    }

    if !cli.load_index && !cli.process_articles {
        // No preprocessing requested: report what the store holds. The
        // HTTP layer lives outside this crate and drives the same handle.
        wiki.open().context("failed to open database")?;
        let status = wiki.status()?;
        info!(
            articles = status.articles,
            index_entries = status.index_entries,
            fts = status.fts.as_str(),
            "store ready"
        );
    }

    wiki.close()?;
    Ok(())
}
