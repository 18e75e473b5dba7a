//! Configuration management for the voice tutor gateway

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::Result;
use file::TutorConfigFile;

/// Default tutor persona name
pub const DEFAULT_PERSONA: &str = "Emma";

/// Default model alias passed to the tutor CLI
pub const DEFAULT_AGENT_MODEL: &str = "haiku";

/// Default time budget for one agent turn
pub const DEFAULT_AGENT_TIMEOUT_SECS: u64 = 60;

/// Tools the agent may use unless configured otherwise
pub const DEFAULT_AGENT_TOOLS: &[&str] = &["WebFetch", "WebSearch", "Read", "Edit"];

/// Environment variables scrubbed from the agent's environment by default.
/// The CLI refuses to start nested inside another session when these are set.
pub const DEFAULT_UNSET_ENV: &[&str] = &["CLAUDECODE"];

/// Voice tutor configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (notes file lives here by default)
    pub data_dir: PathBuf,

    /// Plain-text notes about the student
    pub notes_path: PathBuf,

    /// Tutor CLI configuration
    pub agent: AgentConfig,

    /// Text-to-speech configuration
    pub voice: VoiceConfig,

    /// HTTP API server configuration
    pub api_server: ApiServerConfig,
}

/// Tutor CLI configuration
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Program to run
    pub binary: String,

    /// Model alias (`--model`)
    pub model: String,

    /// Allowed tools (`--tools`, `--allowedTools`)
    pub tools: Vec<String>,

    /// Time budget per turn
    pub timeout: Duration,

    /// Working directory for the child process
    pub work_dir: PathBuf,

    /// Environment variables removed from the child environment
    pub unset_env: Vec<String>,

    /// Persona name used in the system prompt
    pub persona: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            model: DEFAULT_AGENT_MODEL.to_string(),
            tools: DEFAULT_AGENT_TOOLS.iter().map(ToString::to_string).collect(),
            timeout: Duration::from_secs(DEFAULT_AGENT_TIMEOUT_SECS),
            work_dir: std::env::temp_dir(),
            unset_env: DEFAULT_UNSET_ENV.iter().map(ToString::to_string).collect(),
            persona: DEFAULT_PERSONA.to_string(),
        }
    }
}

/// TTS backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TtsBackend {
    /// `OpenAI` or any server speaking the same `/v1/audio/speech` API
    #[default]
    OpenAi,
    /// `ElevenLabs`
    ElevenLabs,
}

impl TtsBackend {
    /// Parse a provider name, case-insensitively
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "elevenlabs" | "eleven_labs" => Some(Self::ElevenLabs),
            _ => None,
        }
    }
}

/// Text-to-speech configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Which backend to call
    pub backend: TtsBackend,

    /// Base URL override for an OpenAI-compatible server
    pub base_url: Option<String>,

    /// `OpenAI` API key
    pub openai_api_key: Option<SecretString>,

    /// `ElevenLabs` API key
    pub elevenlabs_api_key: Option<SecretString>,

    /// TTS model
    pub model: String,

    /// Default voice when a request names none
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: f32,

    /// Character threshold for chunking replies
    pub chunk_chars: usize,

    /// Chunks synthesized at once when streaming
    pub concurrency: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            backend: TtsBackend::OpenAi,
            base_url: None,
            openai_api_key: None,
            elevenlabs_api_key: None,
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            chunk_chars: crate::speech::DEFAULT_CHUNK_CHARS,
            concurrency: 4,
        }
    }
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Port to listen on
    pub port: u16,

    /// Bearer key required on `/api/*` (from `TUTOR_API_KEY`)
    pub api_key: Option<SecretString>,

    /// Path to static files directory (web client)
    pub static_dir: Option<PathBuf>,

    /// Global request budget per minute, unlimited when unset
    pub rate_limit_per_minute: Option<u32>,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            api_key: None,
            static_dir: None,
            rate_limit_per_minute: None,
        }
    }
}

/// Default data directory: `~/.local/share/voice-tutor` on Linux
fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from("data"),
        |d| d.data_dir().join("voice-tutor"),
    )
}

/// Split a comma-separated list, dropping blanks
fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
        .collect()
}

impl Config {
    /// Load configuration from the environment and the TOML config file
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn load() -> Result<Self> {
        let fc = file::load_config_file();
        Self::from_sources(fc, |key| std::env::var(key).ok())
    }

    /// Resolve configuration with precedence env > toml > default
    ///
    /// `env` looks up a variable by name so callers can supply something
    /// other than the process environment.
    ///
    /// # Errors
    ///
    /// Returns error if a configured value is invalid
    pub fn from_sources(fc: TutorConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let data_dir = env("TUTOR_DATA_DIR")
            .or(fc.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        let notes_path = env("TUTOR_NOTES_FILE")
            .or(fc.notes_file)
            .map_or_else(|| data_dir.join("memory.txt"), PathBuf::from);

        let agent_defaults = AgentConfig::default();
        let agent = AgentConfig {
            binary: env("TUTOR_AGENT_BIN")
                .or(fc.agent.binary)
                .unwrap_or(agent_defaults.binary),
            model: env("TUTOR_AGENT_MODEL")
                .or(fc.agent.model)
                .unwrap_or(agent_defaults.model),
            tools: env("TUTOR_AGENT_TOOLS")
                .map(|s| split_list(&s))
                .or(fc.agent.tools)
                .unwrap_or(agent_defaults.tools),
            timeout: env("TUTOR_AGENT_TIMEOUT")
                .and_then(|s| s.parse().ok())
                .or(fc.agent.timeout_secs)
                .filter(|secs| *secs > 0)
                .map_or(agent_defaults.timeout, Duration::from_secs),
            work_dir: env("TUTOR_AGENT_WORKDIR")
                .or(fc.agent.work_dir)
                .map_or(agent_defaults.work_dir, PathBuf::from),
            unset_env: fc.agent.unset_env.unwrap_or(agent_defaults.unset_env),
            persona: env("TUTOR_PERSONA")
                .or(fc.agent.persona)
                .unwrap_or(agent_defaults.persona),
        };

        if agent.tools.is_empty() {
            return Err(crate::Error::Config("agent tool list is empty".to_string()));
        }

        let openai_api_key = env("OPENAI_API_KEY")
            .or(fc.api_keys.openai)
            .filter(|k| !k.is_empty())
            .map(SecretString::from);
        let elevenlabs_api_key = env("ELEVENLABS_API_KEY")
            .or(fc.api_keys.elevenlabs)
            .filter(|k| !k.is_empty())
            .map(SecretString::from);

        // Explicit provider wins; otherwise ElevenLabs only when it is the sole key
        let provider = env("TUTOR_TTS_PROVIDER").or(fc.voice.provider);
        let backend = match provider {
            Some(name) => TtsBackend::parse(&name)
                .ok_or_else(|| crate::Error::Config(format!("unknown TTS provider: {name}")))?,
            None if openai_api_key.is_none() && elevenlabs_api_key.is_some() => {
                TtsBackend::ElevenLabs
            }
            None => TtsBackend::OpenAi,
        };

        let (default_model, default_voice) = match backend {
            TtsBackend::OpenAi => ("tts-1", "alloy"),
            TtsBackend::ElevenLabs => ("eleven_monolingual_v1", "21m00Tcm4TlvDq8ikWAM"),
        };

        let voice_defaults = VoiceConfig::default();
        let voice = VoiceConfig {
            backend,
            base_url: env("TUTOR_TTS_BASE_URL").or(fc.voice.base_url),
            openai_api_key,
            elevenlabs_api_key,
            model: env("TUTOR_TTS_MODEL")
                .or(fc.voice.model)
                .unwrap_or_else(|| default_model.to_string()),
            voice: env("TUTOR_TTS_VOICE")
                .or(fc.voice.voice)
                .unwrap_or_else(|| default_voice.to_string()),
            speed: env("TUTOR_TTS_SPEED")
                .and_then(|s| s.parse().ok())
                .or(fc.voice.speed)
                .unwrap_or(voice_defaults.speed)
                .clamp(0.25, 4.0),
            chunk_chars: env("TUTOR_TTS_CHUNK_CHARS")
                .and_then(|s| s.parse().ok())
                .or(fc.voice.chunk_chars)
                .filter(|n| *n > 0)
                .unwrap_or(voice_defaults.chunk_chars),
            concurrency: env("TUTOR_TTS_CONCURRENCY")
                .and_then(|s| s.parse().ok())
                .or(fc.voice.concurrency)
                .filter(|n| *n > 0)
                .unwrap_or(voice_defaults.concurrency),
        };

        let server_defaults = ApiServerConfig::default();
        let api_server = ApiServerConfig {
            port: env("TUTOR_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(server_defaults.port),
            api_key: env("TUTOR_API_KEY")
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            static_dir: env("TUTOR_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
            rate_limit_per_minute: env("TUTOR_RATE_LIMIT")
                .and_then(|s| s.parse().ok())
                .or(fc.server.rate_limit_per_minute)
                .filter(|n| *n > 0),
        };

        Ok(Self {
            data_dir,
            notes_path,
            agent,
            voice,
            api_server,
        })
    }
}
