//! Offline entry point: rebuild the index or ask a single question.

use anyhow::Context;
use clap::Parser;

use anime_recommender::core::config::Settings;
use anime_recommender::core::logging;
use anime_recommender::recommender::RagMode;
use anime_recommender::state::AppState;

const DEFAULT_QUESTION: &str =
    "Recommend anime similar to Attack on Titan with deep psychological and emotional themes.";

#[derive(Debug, Parser)]
#[command(name = "pipeline", about = "Anime Recommender System Pipeline")]
struct Cli {
    /// Build the vector store and exit.
    #[arg(long)]
    build: bool,

    /// RAG mode; defaults to the configured RAG_MODE.
    #[arg(long, value_parser = ["AGENT", "CHAIN"])]
    mode: Option<String>,

    /// Question to query the recommender with.
    #[arg(long, default_value = DEFAULT_QUESTION)]
    question: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load settings")?;
    logging::init(&settings);

    let state = AppState::initialize(settings)?;

    if cli.build {
        tracing::info!("[MODE] BUILD MODE");
        let report = state
            .vectors
            .build_vector_store()
            .await
            .context("Vector store build failed")?;
        tracing::info!("Vector store build completed in {:.2}s!", report.seconds);
        return Ok(());
    }

    let mode = RagMode::parse(cli.mode.as_deref().unwrap_or(&state.settings.rag_mode));
    tracing::info!("[MODE] QUERY MODE ({})", mode);

    let recommender = state
        .recommender
        .get_recommender(mode.as_str())
        .await
        .context("Failed to initialize recommender")?;
    let answer = recommender
        .recommend(&cli.question)
        .await
        .context("Error during recommendation")?;
    tracing::info!("Recommendation completed successfully.");

    println!("\n[RECOMMENDER OUTPUT]\n");
    println!("{}", answer);
    Ok(())
}
