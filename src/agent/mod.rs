//! Tutor agent backed by an external conversational CLI
//!
//! Each turn spawns the CLI once. The first turn of a session carries the
//! system prompt; later turns resume the session id the CLI reported.

mod output;
mod runner;

pub use output::{AgentOutput, parse_output};
pub use runner::{SessionMode, build_args, run_turn};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::config::AgentConfig;
use crate::notes::NotesStore;
use crate::prompt::{PromptContext, build_system_prompt};
use crate::{Error, Result};

/// Snapshot of the conversation session
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionInfo {
    /// CLI session id, absent before the first successful turn
    pub id: Option<String>,
    /// When the current session was started
    pub started_at: Option<DateTime<Utc>>,
    /// Successful turns in the current session
    pub turns: u32,
}

/// Session state guarded for short reads and writes only
#[derive(Debug, Default)]
struct SessionState {
    info: SessionInfo,
    /// Bumped on every reset so a turn that was running at the time cannot
    /// bring the old session back
    generation: u64,
}

/// Conversational tutor with a single resumable session
pub struct TutorAgent {
    config: AgentConfig,
    notes: NotesStore,
    session: Mutex<SessionState>,
    /// Held for a whole turn; only one CLI process runs at a time
    turn: Mutex<()>,
}

impl TutorAgent {
    /// Create an agent with no session yet
    #[must_use]
    pub fn new(config: AgentConfig, notes: NotesStore) -> Self {
        Self {
            config,
            notes,
            session: Mutex::new(SessionState::default()),
            turn: Mutex::new(()),
        }
    }

    /// Agent configuration
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Notes store used for the system prompt
    #[must_use]
    pub const fn notes(&self) -> &NotesStore {
        &self.notes
    }

    /// Run one conversational turn and return the speakable reply
    ///
    /// Turns are serialized: a second caller waits until the first turn has
    /// finished so resumed sessions see messages in order. The session itself
    /// is only locked around the CLI run, so [`session`](Self::session) and
    /// [`reset`](Self::reset) answer immediately. A reset during a turn wins:
    /// the turn's reply is still returned but its session id is discarded.
    ///
    /// # Errors
    ///
    /// Returns error if the CLI fails; a failed resumed turn also drops the
    /// session so the next turn starts fresh
    pub async fn reply(&self, prompt: &str) -> Result<String> {
        let _turn = self.turn.lock().await;

        let (current_id, generation) = {
            let state = self.session.lock().await;
            (state.info.id.clone(), state.generation)
        };

        let mode = match &current_id {
            Some(id) => SessionMode::Resume {
                session_id: id.clone(),
            },
            None => SessionMode::Fresh {
                system_prompt: self.system_prompt().await,
            },
        };
        let resuming = matches!(mode, SessionMode::Resume { .. });

        tracing::info!(
            resuming,
            session_id = ?current_id,
            prompt_chars = prompt.chars().count(),
            "running agent turn"
        );

        let args = build_args(&self.config, prompt, &mode);
        let result = run_turn(&self.config, args).await;

        let mut state = self.session.lock().await;
        if state.generation != generation {
            tracing::info!("session was reset during the turn, not keeping its session id");
            return result.map(|output| output.text);
        }

        match result {
            Ok(output) => {
                let session = &mut state.info;
                if let Some(new_id) = output.session_id {
                    if session.id.as_deref() != Some(new_id.as_str()) {
                        if !resuming {
                            session.started_at = Some(Utc::now());
                            session.turns = 0;
                        }
                        tracing::debug!(session_id = %new_id, "agent session updated");
                        session.id = Some(new_id);
                    }
                }
                session.turns += 1;
                Ok(output.text)
            }
            Err(e) => {
                if resuming && !matches!(e, Error::AgentTimeout(_)) {
                    tracing::warn!(
                        error = %e,
                        session_id = ?state.info.id,
                        "resumed turn failed, dropping session"
                    );
                    state.info = SessionInfo::default();
                } else {
                    tracing::error!(error = %e, "agent turn failed");
                }
                Err(e)
            }
        }
    }

    /// Forget the current session
    ///
    /// Does not wait for a running turn.
    pub async fn reset(&self) {
        let mut state = self.session.lock().await;
        if let Some(id) = &state.info.id {
            tracing::info!(session_id = %id, "agent session reset");
        }
        state.info = SessionInfo::default();
        state.generation += 1;
    }

    /// Current session snapshot
    pub async fn session(&self) -> SessionInfo {
        self.session.lock().await.info.clone()
    }

    /// Build the system prompt from the persona and current notes
    async fn system_prompt(&self) -> String {
        let notes = self.notes.read().await;
        let notes_path = std::path::absolute(self.notes.path())
            .unwrap_or_else(|_| self.notes.path().to_path_buf());

        build_system_prompt(&PromptContext {
            persona: &self.config.persona,
            notes: &notes,
            notes_path: &notes_path,
        })
    }
}
