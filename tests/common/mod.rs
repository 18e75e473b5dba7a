//! Shared test utilities

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use voice_tutor::config::AgentConfig;
use voice_tutor::{Error, NotesStore, Result, SpeechSynthesizer, TutorAgent};

/// Write an executable shell script standing in for the tutor CLI
#[cfg(unix)]
pub fn fake_agent(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-agent.sh");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("failed to write fake agent");
    let mut perms = std::fs::metadata(&path).expect("fake agent metadata").permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).expect("failed to chmod fake agent");
    path
}

/// Agent config pointing at `binary`, running inside `dir`
pub fn agent_config(binary: &Path, dir: &Path) -> AgentConfig {
    AgentConfig {
        binary: binary.display().to_string(),
        work_dir: dir.to_path_buf(),
        timeout: Duration::from_secs(10),
        ..AgentConfig::default()
    }
}

/// Agent with its notes file inside `dir`
pub fn agent(config: AgentConfig, dir: &Path) -> Arc<TutorAgent> {
    Arc::new(TutorAgent::new(config, NotesStore::new(dir.join("memory.txt"))))
}

/// Synthesizer that returns `[voice:text]` as the audio bytes
pub struct FakeTts {
    pub fail: bool,
}

#[async_trait]
impl SpeechSynthesizer for FakeTts {
    async fn synthesize(&self, text: &str, voice: Option<&str>) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::Tts("upstream returned 500".to_string()));
        }
        let voice = voice.unwrap_or(self.default_voice());
        Ok(format!("[{voice}:{text}]").into_bytes())
    }

    fn default_voice(&self) -> &str {
        "en-US-AriaNeural"
    }
}
