//! Voice Tutor - voice conversation gateway for an AI English tutor
//!
//! The browser does speech recognition and plays audio; this crate provides
//! everything behind it:
//! - Conversation turns through an external tutor CLI with a resumable session
//! - Reply cleanup so text reads naturally when spoken
//! - Text-to-speech with ordered, chunked streaming
//! - Persistent notes about the student
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          Browser (speech capture, playback)          │
//! └────────────────────┬────────────────────────────────┘
//!                      │  /api/chat   /api/tts   /api/notes
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Voice Tutor Gateway                  │
//! │   Agent  │  Prompt  │  Speech cleanup  │  Notes     │
//! └──────────┬─────────────────────────┬────────────────┘
//!            │ subprocess              │ HTTP
//! ┌──────────▼──────────┐   ┌──────────▼────────────────┐
//! │    Tutor CLI        │   │   TTS provider            │
//! └─────────────────────┘   └───────────────────────────┘
//! ```

pub mod agent;
pub mod api;
pub mod config;
pub mod error;
pub mod notes;
pub mod prompt;
pub mod speech;
pub mod voice;

pub use agent::{SessionInfo, TutorAgent};
pub use api::{ApiServer, ApiServerBuilder, ApiState};
pub use config::Config;
pub use error::{Error, Result};
pub use notes::NotesStore;
pub use speech::{sanitize_for_speech, split_chunks};
pub use voice::{SpeechSynthesizer, TextToSpeech};
