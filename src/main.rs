use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures::TryStreamExt;
use tracing_subscriber::EnvFilter;

use voice_tutor::voice::synthesize_chunks;
use voice_tutor::{
    ApiServerBuilder, Config, NotesStore, SpeechSynthesizer, TextToSpeech, TutorAgent,
};

/// Tutor - voice conversation gateway for an AI English tutor
#[derive(Parser)]
#[command(name = "tutor", version, about)]
struct Cli {
    /// Port to listen on (overrides config)
    #[arg(long, env = "TUTOR_PORT")]
    port: Option<u16>,

    /// Directory with the browser client (overrides config)
    #[arg(long, env = "TUTOR_STATIC_DIR")]
    static_dir: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP gateway (default)
    Serve,
    /// Send one message to the tutor and print the reply
    Ask {
        /// What to say
        text: String,
    },
    /// Synthesize text to an MP3 file
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
        /// Output file
        #[arg(short, long, default_value = "speech.mp3")]
        output: PathBuf,
        /// Voice identifier (defaults to the configured voice)
        #[arg(long)]
        voice: Option<String>,
    },
    /// Show or edit the notes kept about the student
    Notes {
        #[command(subcommand)]
        action: Option<NotesAction>,
    },
}

#[derive(Subcommand)]
enum NotesAction {
    /// Print all notes
    Show,
    /// Append a note
    Add {
        /// The fact to remember
        note: String,
    },
    /// Delete all notes
    Clear,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voice_tutor=info",
        1 => "info,voice_tutor=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.api_server.port = port;
    }
    if cli.static_dir.is_some() {
        config.api_server.static_dir = cli.static_dir;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Ask { text } => ask(config, &text).await,
        Command::Say { text, output, voice } => say(&config, &text, &output, voice).await,
        Command::Notes { action } => notes(&config, action.unwrap_or(NotesAction::Show)).await,
    }
}

/// Run the gateway until interrupted
async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        port = config.api_server.port,
        agent = %config.agent.binary,
        model = %config.agent.model,
        notes = %config.notes_path.display(),
        "starting voice tutor gateway"
    );

    if which::which(&config.agent.binary).is_err() {
        tracing::warn!(
            binary = %config.agent.binary,
            "agent binary not found on PATH, chat will fail"
        );
    }

    let notes = NotesStore::new(&config.notes_path);
    let agent = Arc::new(TutorAgent::new(config.agent.clone(), notes));

    let mut builder = ApiServerBuilder::new(agent, config.api_server.port)
        .api_key(config.api_server.api_key.clone())
        .static_dir(config.api_server.static_dir.clone())
        .voice_config(&config.voice)
        .rate_limit(config.api_server.rate_limit_per_minute);

    if let Some(tts) = TextToSpeech::from_config(&config.voice)? {
        builder = builder.tts(Arc::new(tts));
    }

    builder.build().run().await?;
    Ok(())
}

/// One conversation turn from the terminal
async fn ask(config: Config, text: &str) -> anyhow::Result<()> {
    let notes = NotesStore::new(&config.notes_path);
    let agent = TutorAgent::new(config.agent, notes);

    let reply = agent.reply(text).await?;
    println!("{reply}");
    Ok(())
}

/// Synthesize text chunk by chunk into one MP3 file
async fn say(
    config: &Config,
    text: &str,
    output: &Path,
    voice: Option<String>,
) -> anyhow::Result<()> {
    let tts = TextToSpeech::from_config(&config.voice)?
        .ok_or_else(|| {
            anyhow::anyhow!(
                "no TTS backend configured \
                 (set OPENAI_API_KEY, ELEVENLABS_API_KEY, or TUTOR_TTS_BASE_URL)"
            )
        })?;
    let tts: Arc<dyn SpeechSynthesizer> = Arc::new(tts);

    let chunks = voice_tutor::split_chunks(text, config.voice.chunk_chars);
    println!("Synthesizing {} chunk(s)...", chunks.len());

    let parts: Vec<Vec<u8>> = synthesize_chunks(tts, chunks, voice, config.voice.concurrency)
        .try_collect()
        .await?;
    let audio = parts.concat();

    tokio::fs::write(output, &audio).await?;
    println!("Wrote {} bytes to {}", audio.len(), output.display());
    Ok(())
}

/// Show or edit the notes file
async fn notes(config: &Config, action: NotesAction) -> anyhow::Result<()> {
    let store = NotesStore::new(&config.notes_path);

    match action {
        NotesAction::Show => {
            let lines = store.lines().await;
            if lines.is_empty() {
                println!("No notes yet ({})", store.path().display());
            }
            for line in lines {
                println!("{line}");
            }
        }
        NotesAction::Add { note } => {
            store.append(&note).await?;
            println!("Noted.");
        }
        NotesAction::Clear => {
            store.clear().await?;
            println!("Notes cleared");
        }
    }

    Ok(())
}
