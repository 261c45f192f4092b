mod bedrock;
mod config;
mod corpus;
mod fetch;
mod pipeline;
mod prompt;
mod search;

pub const USER_AGENT: &str = concat!("polyglot/", env!("CARGO_PKG_VERSION"));

use std::process::ExitCode;
use std::time::Duration;

use bedrock::BedrockClient;
use clap::Parser;
use config::Config;
use pipeline::{Pipeline, PipelineError, Stage};
use reqwest::Client;
use search::SearchScraper;
use tracing::{error, info};

/// TCP connection establishment timeout.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Answer a question in its own language, using same-language text from a
/// search results page as context for the model.
#[derive(Parser, Debug)]
#[command(
    version,
    about,
    after_help = "Authentication uses a Bedrock API key from AWS_BEARER_TOKEN_BEDROCK; \
AWS access keys and profiles (SigV4) are not read."
)]
struct Cli {
    /// Question to answer; words are joined with spaces
    query: Vec<String>,

    /// Bedrock model id (overrides CLAUDE_MODEL_ID)
    #[arg(long)]
    model: Option<String>,

    /// AWS region of the Bedrock runtime (overrides AWS_REGION)
    #[arg(long)]
    region: Option<String>,

    /// Maximum output tokens (overrides POLYGLOT_MAX_TOKENS)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    max_tokens: Option<u32>,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.inference.model_id = Some(model.clone());
        }
        if let Some(region) = &self.region {
            config.inference.region = Some(region.clone());
        }
        if let Some(max_tokens) = self.max_tokens {
            config.inference.max_tokens = max_tokens;
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("polyglot=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let query = cli.query.join(" ");

    let mut config = Config::from_env();
    cli.apply(&mut config);

    let http = Client::builder().connect_timeout(CONNECT_TIMEOUT).build()?;
    let pipeline = Pipeline::new(
        SearchScraper::new(http.clone(), &config.search),
        BedrockClient::new(http, &config.inference),
        config.corpus,
    );

    match pipeline.run(&query).await {
        Ok(outcome) => {
            info!(language = %outcome.language, origin = ?outcome.corpus_origin, "done");
            println!("\nResponse:\n{}", outcome.answer);
            Ok(ExitCode::SUCCESS)
        }
        Err(PipelineError::EmptyQuery) => {
            eprintln!("Please provide input text.\n\nUsage: polyglot <QUERY>...");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => {
            error!(stage = %Stage::Failed, from = %e.failed_at(), "{e}");
            Ok(ExitCode::FAILURE)
        }
    }
}
