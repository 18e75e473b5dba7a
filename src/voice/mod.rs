//! Voice output
//!
//! Speech recognition happens in the browser; the gateway only turns reply
//! text into audio.

mod stream;
mod tts;

pub use stream::synthesize_chunks;
pub use tts::{SpeechSynthesizer, TextToSpeech};
