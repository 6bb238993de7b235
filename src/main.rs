use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use vibe_gateway::{
    ServerConfig,
    client::StreamClient,
    core::playback::{PcmWriterFactory, PlaybackConsumer, PlaybackOutcome, WavFileFactory},
    core::relay::StreamRequest,
    core::voice::VoiceCatalog,
    routes,
    state::AppState,
};

/// Vibe Gateway - streaming voice replies for developer prompts
#[derive(Parser, Debug)]
#[command(name = "vibe-gateway")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Subcommand to run (defaults to `serve`)
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the gateway server
    Serve,

    /// Stream a reply from a running gateway into a WAV file or stdout
    Play {
        /// Prompt to answer
        text: String,

        /// Gateway URL
        #[arg(short = 'g', long = "gateway", default_value = "http://127.0.0.1:3001")]
        gateway: String,

        /// Target locale, e.g. en-US
        #[arg(short = 'l', long = "language")]
        language: Option<String>,

        /// Voice style, e.g. Conversational
        #[arg(short = 's', long = "style")]
        style: Option<String>,

        /// Explicit voice id, bypassing resolution
        #[arg(long = "voice")]
        voice: Option<String>,

        /// Context files sent along with the prompt
        #[arg(short = 'f', long = "file")]
        files: Vec<String>,

        /// Output WAV file; raw PCM goes to stdout when omitted
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },

    /// Print the loaded voice catalog
    Voices,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before config loading)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    // Initialize crypto provider for TLS connections
    // This must be done before any TLS connections are attempted
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(cli.config).await,
        Commands::Play {
            text,
            gateway,
            language,
            style,
            voice,
            files,
            output,
        } => {
            let request = StreamRequest {
                text,
                locale: language,
                style,
                voice_id: voice,
                format: None,
                files,
            };
            play(&gateway, request, output).await
        }
        Commands::Voices => {
            let config = load_config(cli.config)?;
            let catalog = VoiceCatalog::load(
                config.voice_catalog_inline.as_deref(),
                &config.voice_catalog_path,
            )?;
            for (bucket, voice) in catalog.all_voices() {
                let styles = voice.styles.join(", ");
                println!("{bucket:<14} {:<28} {:<20} {styles}", voice.id, voice.display_name());
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(config_path) => {
            info!("Loading configuration from {}", config_path.display());
            ServerConfig::from_file(&config_path).map_err(|e| anyhow!(e.to_string()))
        }
        None => ServerConfig::from_env().map_err(|e| anyhow!(e.to_string())),
    }
}

async fn serve(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let address = config.address();

    if config.murf_api_key.is_none() {
        tracing::warn!("MURF_API_KEY is not set; synthesis requests will fail");
    }
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; text generation will fail");
    }

    let app_state = AppState::new(config).await?;
    let app = routes::create_app(app_state);

    let socket_addr: SocketAddr = address
        .parse()
        .map_err(|e| anyhow!("Invalid server address '{}': {}", address, e))?;

    info!("Server listening on http://{}", socket_addr);

    let listener = TcpListener::bind(&socket_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

async fn play(
    gateway: &str,
    request: StreamRequest,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let client = StreamClient::new(gateway)?;
    let frames = client.stream(&request).await?;

    let outcome = match output {
        Some(path) => {
            let mut consumer = PlaybackConsumer::new(WavFileFactory::new(&path));
            let outcome = consumer.consume(frames).await?;
            if matches!(outcome, PlaybackOutcome::Completed { .. }) {
                eprintln!("Audio written to {}", path.display());
            }
            outcome
        }
        None => {
            let mut consumer = PlaybackConsumer::new(PcmWriterFactory::new(|| Ok(std::io::stdout())));
            consumer.consume(frames).await?
        }
    };

    match outcome {
        PlaybackOutcome::Completed {
            transcript,
            audio_frames,
            bytes_written,
        } => {
            eprintln!("{transcript}");
            info!(audio_frames, bytes_written, "Playback completed");
            Ok(())
        }
        PlaybackOutcome::Cached {
            transcript,
            audio_available,
        } => {
            eprintln!("{transcript}");
            info!(audio_available, "Gateway answered from its cache");
            Ok(())
        }
        PlaybackOutcome::Failed { message } => Err(anyhow!("Gateway reported an error: {message}")),
    }
}
