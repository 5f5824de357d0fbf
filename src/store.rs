use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::SkiSession;

/// Read-only view of the recorded sessions. The aggregator never reaches for
/// a global store; callers hand it whatever a `SessionSource` yields.
pub trait SessionSource {
    fn sessions(&self) -> &[SkiSession];

    /// Most recently started session.
    fn latest(&self) -> Option<&SkiSession> {
        self.sessions().iter().max_by_key(|s| s.start_at)
    }
}

/// Sessions exported by the recording app as a JSON array, sorted oldest first.
#[derive(Debug, Clone, Default)]
pub struct SessionFile {
    path: PathBuf,
    sessions: Vec<SkiSession>,
}

impl SessionFile {
    pub fn load(path: &Path) -> Result<Self> {
        let mut bytes = fs::read(path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;

        let mut sessions: Vec<SkiSession> = if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            Vec::new()
        } else {
            simd_json::serde::from_slice(&mut bytes)
                .with_context(|| format!("Failed to parse session file {}", path.display()))?
        };

        sessions.sort_by_key(|s| s.start_at);

        Ok(Self {
            path: path.to_path_buf(),
            sessions,
        })
    }

    /// Like [`SessionFile::load`], but a missing file is an empty store.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                sessions: Vec::new(),
            });
        }
        Self::load(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionSource for SessionFile {
    fn sessions(&self) -> &[SkiSession] {
        &self.sessions
    }
}
