//! Text-to-speech (TTS) over HTTP

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{TtsBackend, VoiceConfig};
use crate::{Error, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ELEVENLABS_BASE_URL: &str = "https://api.elevenlabs.io";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can turn text into MP3 audio
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text`, using `voice` or the default voice when `None`
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>>;

    /// Voice used when a request names none
    fn default_voice(&self) -> &str;
}

/// Synthesizes speech through a hosted TTS API
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    voice: String,
    speed: f32,
    model: String,
    backend: TtsBackend,
}

impl TextToSpeech {
    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new_openai(
        api_key: SecretString,
        voice: String,
        speed: f32,
        model: String,
    ) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }
        Self::build(TtsBackend::OpenAi, Some(api_key), OPENAI_BASE_URL, voice, speed, model)
    }

    /// Create a TTS instance for an OpenAI-compatible server
    ///
    /// Local speech servers usually need no key.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new_compatible(
        base_url: &str,
        api_key: Option<SecretString>,
        voice: String,
        speed: f32,
        model: String,
    ) -> Result<Self> {
        Self::build(TtsBackend::OpenAi, api_key, base_url, voice, speed, model)
    }

    /// Create a new TTS instance using `ElevenLabs`
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new_elevenlabs(api_key: SecretString, voice_id: String, model: String) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("ElevenLabs API key required for TTS".to_string()));
        }
        // ElevenLabs doesn't use speed in the same way
        Self::build(
            TtsBackend::ElevenLabs,
            Some(api_key),
            ELEVENLABS_BASE_URL,
            voice_id,
            1.0,
            model,
        )
    }

    /// Build the configured backend, or `None` when TTS has no credentials
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: &VoiceConfig) -> Result<Option<Self>> {
        let tts = match config.backend {
            TtsBackend::OpenAi => match (&config.base_url, &config.openai_api_key) {
                (Some(base), key) => Some(Self::new_compatible(
                    base,
                    key.clone(),
                    config.voice.clone(),
                    config.speed,
                    config.model.clone(),
                )?),
                (None, Some(key)) => Some(Self::new_openai(
                    key.clone(),
                    config.voice.clone(),
                    config.speed,
                    config.model.clone(),
                )?),
                (None, None) => None,
            },
            TtsBackend::ElevenLabs => match &config.elevenlabs_api_key {
                Some(key) => {
                    let mut tts = Self::new_elevenlabs(
                        key.clone(),
                        config.voice.clone(),
                        config.model.clone(),
                    )?;
                    if let Some(base) = &config.base_url {
                        tts.base_url = base.trim_end_matches('/').to_string();
                    }
                    Some(tts)
                }
                None => None,
            },
        };

        if tts.is_none() {
            tracing::warn!(
                backend = ?config.backend,
                "no TTS credentials configured, speech disabled"
            );
        }
        Ok(tts)
    }

    fn build(
        backend: TtsBackend,
        api_key: Option<SecretString>,
        base_url: &str,
        voice: String,
        speed: f32,
        model: String,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            voice,
            speed,
            model,
            backend,
        })
    }

    /// Synthesize using the `OpenAI` speech endpoint
    async fn synthesize_openai(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice,
            speed: self.speed,
            response_format: "mp3",
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/audio/speech", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    /// Synthesize using `ElevenLabs` TTS
    async fn synthesize_elevenlabs(&self, text: &str, voice: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.base_url,
            urlencoding::encode(voice)
        );

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let mut builder = self
            .client
            .post(&url)
            .header("Accept", "audio/mpeg")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("xi-api-key", key.expose_secret());
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>> {
        let voice = voice.filter(|v| !v.is_empty()).unwrap_or(&self.voice);
        tracing::debug!(
            backend = ?self.backend,
            voice,
            chars = text.chars().count(),
            "synthesizing speech"
        );

        match self.backend {
            TtsBackend::OpenAi => self.synthesize_openai(text, voice).await,
            TtsBackend::ElevenLabs => self.synthesize_elevenlabs(text, voice).await,
        }
    }

    fn default_voice(&self) -> &str {
        &self.voice
    }
}
