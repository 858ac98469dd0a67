//! services/api/src/bin/analyze.rs
//!
//! Analyzes whiteboard images from the command line:
//!
//! ```text
//! analyze <image>... [--language L] [--mode M] [--refine TEXT]
//! ```
//!
//! The result is committed to the same history store the server uses and
//! printed to stdout as JSON. Logs go to stderr.

use api_lib::{
    adapters::{read_image_files, GeminiAdapter, SqliteKvAdapter},
    config::Config,
    error::ApiError,
};
use boardvision_core::{
    domain::{OutputMode, ProgrammingLanguage},
    gateway::AiGateway,
    session::SessionStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage: analyze <image>... [--language L] [--mode M] [--refine TEXT]";

#[derive(Debug, PartialEq)]
struct CliArgs {
    images: Vec<PathBuf>,
    language: ProgrammingLanguage,
    mode: OutputMode,
    refinement: Option<String>,
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<CliArgs, String> {
    let mut parsed = CliArgs {
        images: Vec::new(),
        language: ProgrammingLanguage::default(),
        mode: OutputMode::default(),
        refinement: None,
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--language" | "-l" => {
                let value = args.next().ok_or("--language needs a value")?;
                parsed.language = value.parse()?;
            }
            "--mode" | "-m" => {
                let value = args.next().ok_or("--mode needs a value")?;
                parsed.mode = value.parse()?;
            }
            "--refine" | "-r" => {
                parsed.refinement = Some(args.next().ok_or("--refine needs a value")?);
            }
            "--help" | "-h" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            _ => parsed.images.push(PathBuf::from(arg)),
        }
    }

    if parsed.images.is_empty() {
        return Err(USAGE.to_string());
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}", msg);
            std::process::exit(2);
        }
    };

    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let kv_adapter = Arc::new(SqliteKvAdapter::connect(&config.database_url).await?);
    kv_adapter.run_migrations().await?;
    let mut session = SessionStore::load(kv_adapter).await;

    let gemini_adapter = Arc::new(GeminiAdapter::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.gemini_base_url.clone(),
        config.gemini_timeout,
    )?);
    let gateway = AiGateway::with_limits(gemini_adapter, config.contract_limits());

    let assets = read_image_files(args.images.as_slice()).await?;
    info!("Read {} image(s)", assets.len());
    session.set_selection(args.language, args.mode);
    session.add_uploads(assets);

    let ticket = session.begin_analysis(args.refinement)?;
    let result = match gateway
        .analyze(
            &ticket.images,
            ticket.language,
            ticket.mode,
            ticket.refinement.as_deref(),
        )
        .await
    {
        Ok(result) => result,
        Err(e) => {
            session.abort_analysis();
            return Err(e.into());
        }
    };
    let item = session.complete_analysis(&ticket, result).await?;
    info!(history_id = %item.id, title = %item.result.title, "Saved to history");

    let json = serde_json::to_string_pretty(&item.result)
        .map_err(|e| ApiError::Internal(format!("failed to render result: {}", e)))?;
    println!("{}", json);
    Ok(())
}
