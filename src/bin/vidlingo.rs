// vidlingo - translate a video into another language from the command line

use clap::{Parser, Subcommand};
use futures_util::StreamExt;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vidlingo::ClientConfig;
use vidlingo::config::DEFAULT_LOG_FILTER;
use vidlingo::translation::{
    AttemptState, HttpTransport, LanguageCatalog, Orchestrator, TranslationOutcome, TranslationRequest, VideoFile,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Translation service base URL (overrides config and VIDLINGO_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a video file
    Translate {
        /// Video to translate (mp4, mov, avi, mkv, webm)
        file: Option<PathBuf>,

        /// Target language code (default from config)
        #[arg(short, long)]
        to: Option<String>,

        /// Video URL instead of a local file
        #[arg(long, conflicts_with = "file")]
        url: Option<String>,

        /// Where to save the translated video
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the languages videos can be translated into
    Languages,

    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }

    if let Command::Init { force } = cli.command {
        let path = cli
            .config
            .or_else(ClientConfig::default_path)
            .ok_or_else(|| anyhow::anyhow!("No config directory available, pass --config"))?;
        config.init_file(&path, force)?;
        println!("✓ Wrote configuration to {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let orchestrator = Orchestrator::new(HttpTransport::new(&config)?);
    let catalog = orchestrator.languages().await;

    match cli.command {
        Command::Languages => {
            print_languages(&catalog);
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { .. } => Ok(ExitCode::SUCCESS),
        Command::Translate { file, to, url, output } => {
            let target = to.unwrap_or_else(|| config.default_target_language.clone());
            if !catalog.contains(&target) {
                eprintln!("Error: unknown target language '{}'", target);
                eprintln!();
                print_languages(&catalog);
                return Ok(ExitCode::from(2));
            }

            let mut request = TranslationRequest::new(target.as_str());
            if let Some(path) = file {
                match VideoFile::open(&path).await {
                    Ok(video) => request = request.with_file(video),
                    Err(e) => {
                        eprintln!("❌ {}", e);
                        return Ok(ExitCode::from(2));
                    }
                }
            }
            if let Some(url) = url {
                request = request.with_url(url);
            }

            println!("🎬 Video Translator");
            println!("================================\n");
            println!("📡 Service: {}", config.base_url());
            println!("🎯 Translate to: {}\n", catalog.label(&target));

            translate(&orchestrator, &catalog, request, output).await
        }
    }
}

async fn translate(
    orchestrator: &Orchestrator<HttpTransport>,
    catalog: &LanguageCatalog,
    request: TranslationRequest,
    output: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let mut attempt = match orchestrator.submit(request) {
        Ok(attempt) => attempt,
        Err(e) => {
            eprintln!("❌ {}", e.message());
            return Ok(ExitCode::from(2));
        }
    };

    while let Some(state) = attempt.next().await {
        render(&state, catalog);
    }

    match attempt.outcome().await {
        Some(TranslationOutcome::Success(success)) => {
            let path = output.unwrap_or_else(|| PathBuf::from(&success.video.file_name));
            success.video.write_to(&path).await?;
            println!("\n📦 Saved {} bytes to {}", success.video.len(), path.display());
            Ok(ExitCode::SUCCESS)
        }
        Some(TranslationOutcome::Failure { .. }) | None => Ok(ExitCode::FAILURE),
    }
}

fn render(state: &AttemptState, catalog: &LanguageCatalog) {
    match state {
        AttemptState::Idle => {}
        AttemptState::Error(error) => {
            eprintln!("\n❌ Error: {}", error.message());
        }
        AttemptState::RenderingPreview(metadata) => {
            if let Some(code) = &metadata.detected_language {
                println!("🌐 From: {}", catalog.badge(code));
            }
            if metadata.low_confidence {
                println!("⚠️  Mixed Language Detected");
                println!("   This video may contain multiple languages. Translation accuracy might be affected.");
            }
            println!("[{:>3}%] {}", state.progress(), state.status_line());
        }
        AttemptState::Complete(_) => {
            println!("[{:>3}%] ✓ {}", state.progress(), state.status_line());
        }
        AttemptState::Uploading | AttemptState::Translating => {
            println!("[{:>3}%] {}", state.progress(), state.status_line());
        }
    }
}

fn print_languages(catalog: &LanguageCatalog) {
    if catalog.is_fallback() {
        println!("(service unreachable, showing built-in languages)\n");
    }

    println!("Available languages:");
    for entry in catalog.entries() {
        println!("  {} {:<8} {} ({})", entry.flag, entry.code, entry.name, entry.native_name);
    }
}
