use anyhow::Result;
use clap::Parser;
use livescribe::Config;

/// Stream microphone audio to a transcription backend and print the
/// incremental transcript.
#[derive(Debug, Parser)]
#[command(name = "livescribe")]
struct Args {
    /// Config file (TOML) with socket/audio/vad sections
    #[arg(long)]
    config: Option<String>,

    /// Backend WebSocket URL (overrides config)
    #[arg(long)]
    url: Option<String>,

    /// Session identifier (default: a fresh meeting id)
    #[arg(long)]
    session_id: Option<String>,

    /// Recognition language hint, e.g. zh-CN
    #[arg(long)]
    language: Option<String>,

    /// ASR model name
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(url) = &args.url {
        cfg.socket.url = url.clone();
    }

    run(cfg, args).await
}

#[cfg(not(feature = "cpal-audio"))]
async fn run(_cfg: Config, _args: Args) -> Result<()> {
    anyhow::bail!("this binary was built without the cpal-audio feature; microphone capture is unavailable")
}

#[cfg(feature = "cpal-audio")]
async fn run(cfg: Config, args: Args) -> Result<()> {
    use livescribe::{
        audio::MicrophoneInput, CaptureConfig, ReconnectPolicy, ServerMessage, SessionConfig,
        StreamTransport, TranscriptionSession, WsConnector,
    };
    use std::io::Write;
    use std::sync::Arc;
    use tracing::{error, info};

    info!("livescribe v{}", env!("CARGO_PKG_VERSION"));
    info!("Backend: {}", cfg.socket.url);

    let transport = Arc::new(StreamTransport::new(
        Box::new(WsConnector),
        &cfg.socket.url,
        ReconnectPolicy::new(cfg.socket.reconnect_max_attempts),
    ));

    let microphone = MicrophoneInput::new(CaptureConfig {
        sample_rate: cfg.audio.sample_rate,
        channels: cfg.audio.channels,
        buffer_size: cfg.audio.buffer_size,
    });

    let session = TranscriptionSession::new(transport, Box::new(microphone), cfg.vad);

    session.on_state(|state| info!("Session state: {:?}", state));
    session.on_error(|err| error!("Session error: {}", err));
    session.on_message(|msg| match msg {
        ServerMessage::TranscriptEventUpsert { data } => {
            if data.event.is_final {
                println!("\n{}", data.event.content);
            } else {
                print!("\r{}", data.event.content);
                std::io::stdout().flush().ok();
            }
        }
        ServerMessage::Transcript { data } => {
            if let Some(content) = &data.content {
                println!("{}", content);
            }
        }
        _ => {}
    });

    let config = SessionConfig {
        session_id: args
            .session_id
            .unwrap_or_else(|| format!("meeting-{}", uuid::Uuid::new_v4())),
        language: args.language,
        model: args.model,
        ..SessionConfig::default()
    };

    info!("Recording session {} (Ctrl-C to stop)", config.session_id);
    session.start(config).await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    session.dispose().await;

    Ok(())
}
