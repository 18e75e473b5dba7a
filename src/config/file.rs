//! TOML configuration file loading
//!
//! Supports `~/.config/voice-tutor/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct TutorConfigFile {
    /// Directory for the notes file and other state
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Explicit notes file path (overrides `data_dir/memory.txt`)
    #[serde(default)]
    pub notes_file: Option<String>,

    /// Tutor CLI configuration
    #[serde(default)]
    pub agent: AgentFileConfig,

    /// Text-to-speech configuration
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,
}

/// Tutor CLI configuration
#[derive(Debug, Default, Deserialize)]
pub struct AgentFileConfig {
    /// Program to run (path or name on `PATH`)
    pub binary: Option<String>,

    /// Model alias passed with `--model` (e.g. "haiku")
    pub model: Option<String>,

    /// Tools the agent may use
    pub tools: Option<Vec<String>>,

    /// Seconds before a turn is killed
    pub timeout_secs: Option<u64>,

    /// Working directory for the child process
    pub work_dir: Option<String>,

    /// Tutor persona name used in the system prompt
    pub persona: Option<String>,

    /// Environment variables removed from the child environment
    pub unset_env: Option<Vec<String>>,
}

/// Text-to-speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// "openai" or "elevenlabs"
    pub provider: Option<String>,

    /// Base URL of an OpenAI-compatible speech server
    pub base_url: Option<String>,

    /// TTS model (e.g. "tts-1")
    pub model: Option<String>,

    /// Default voice identifier
    pub voice: Option<String>,

    /// Speed multiplier
    pub speed: Option<f32>,

    /// Character threshold for splitting replies into audio chunks
    pub chunk_chars: Option<usize>,

    /// Chunks synthesized at once when streaming
    pub concurrency: Option<usize>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub openai: Option<String>,
    pub elevenlabs: Option<String>,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Directory with the browser client
    pub static_dir: Option<String>,

    /// Global request budget per minute
    pub rate_limit_per_minute: Option<u32>,
}

/// Load the TOML config file from `TUTOR_CONFIG` or the standard path
///
/// Returns `TutorConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> TutorConfigFile {
    let path = std::env::var("TUTOR_CONFIG")
        .ok()
        .map(PathBuf::from)
        .or_else(config_file_path);

    let Some(path) = path else {
        return TutorConfigFile::default();
    };

    load_config_file_from(&path)
}

/// Load a TOML config file from an explicit path
///
/// Missing or malformed files fall back to defaults.
pub fn load_config_file_from(path: &Path) -> TutorConfigFile {
    if !path.exists() {
        return TutorConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                TutorConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            TutorConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voice-tutor/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voice-tutor").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let fc = load_config_file_from(&dir.path().join("nope.toml"));
        assert!(fc.agent.binary.is_none());
        assert!(fc.server.port.is_none());
    }

    #[test]
    fn test_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
notes_file = "/srv/tutor/notes.txt"

[agent]
model = "sonnet"
timeout_secs = 90

[voice]
voice = "en-US-AriaNeural"
"#,
        )
        .unwrap();

        let fc = load_config_file_from(&path);
        assert_eq!(fc.notes_file.as_deref(), Some("/srv/tutor/notes.txt"));
        assert_eq!(fc.agent.model.as_deref(), Some("sonnet"));
        assert_eq!(fc.agent.timeout_secs, Some(90));
        assert_eq!(fc.voice.voice.as_deref(), Some("en-US-AriaNeural"));
        assert!(fc.server.port.is_none());
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[agent\nmodel = ").unwrap();

        let fc = load_config_file_from(&path);
        assert!(fc.agent.model.is_none());
    }
}
