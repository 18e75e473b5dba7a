//! Student notes kept across conversations
//!
//! A plain-text file with one fact per line. The tutor CLI appends to it with
//! its own edit tool; the gateway reads it when building a fresh system
//! prompt and exposes it over the API.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::{Error, Result};

/// Append-only notes file
#[derive(Debug, Clone)]
pub struct NotesStore {
    path: PathBuf,
}

impl NotesStore {
    /// Create a store backed by `path`; the file need not exist yet
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the notes file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole file, trimmed
    ///
    /// A missing or unreadable file reads as empty.
    pub async fn read(&self) -> String {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content.trim().to_string(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to read notes");
                String::new()
            }
        }
    }

    /// Non-empty lines of the file
    pub async fn lines(&self) -> Vec<String> {
        self.read()
            .await
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(ToString::to_string)
            .collect()
    }

    /// Append one note as a new line
    ///
    /// Line breaks inside the note are folded into spaces so each note stays
    /// on its own line.
    ///
    /// # Errors
    ///
    /// Returns error if the note is blank or the file cannot be written
    pub async fn append(&self, note: &str) -> Result<()> {
        let note = note.split_whitespace().collect::<Vec<_>>().join(" ");
        if note.is_empty() {
            return Err(Error::Notes("note is empty".to_string()));
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Start on a fresh line if the agent left the file without a trailing newline
        let needs_newline = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes.last().is_some_and(|b| *b != b'\n'),
            Err(_) => false,
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;

        let line = if needs_newline {
            format!("\n{note}\n")
        } else {
            format!("{note}\n")
        };
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        tracing::debug!(path = %self.path.display(), "appended note");
        Ok(())
    }

    /// Remove all notes
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be truncated
    pub async fn clear(&self) -> Result<()> {
        match tokio::fs::write(&self.path, b"").await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
