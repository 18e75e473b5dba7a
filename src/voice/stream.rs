//! Ordered, concurrent synthesis of text chunks
//!
//! Chunks are synthesized ahead of time but yielded strictly in order, so a
//! listener hears chunk `i` before chunk `i + 1` while later chunks are
//! already being prepared. Dropping the stream cancels whatever is still in
//! flight.

use std::sync::Arc;

use futures::{Stream, StreamExt};

use super::SpeechSynthesizer;
use crate::Result;

/// Synthesize `chunks` with at most `concurrency` requests in flight
///
/// Items come out in chunk order regardless of which request finishes first.
pub fn synthesize_chunks(
    synth: Arc<dyn SpeechSynthesizer>,
    chunks: Vec<String>,
    voice: Option<String>,
    concurrency: usize,
) -> impl Stream<Item = Result<Vec<u8>>> + Send + 'static {
    let total = chunks.len();

    futures::stream::iter(chunks.into_iter().enumerate())
        .map(move |(index, chunk)| {
            let synth = Arc::clone(&synth);
            let voice = voice.clone();
            async move {
                let audio = synth.synthesize(&chunk, voice.as_deref()).await;
                match &audio {
                    Ok(bytes) => {
                        tracing::trace!(index, total, bytes = bytes.len(), "chunk synthesized");
                    }
                    Err(e) => tracing::warn!(index, total, error = %e, "chunk synthesis failed"),
                }
                audio
            }
        })
        .buffered(concurrency.max(1))
}
