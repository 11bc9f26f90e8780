//! Single-slot store for the provider API key.
//!
//! The key lives in memory for the lifetime of the server and is mirrored to a
//! one-line file (`GROQ_API_KEY=<key>`). Writes go to a sibling temp file that
//! is renamed over the original, so a reader never sees half a line. The write
//! lock is held across the file swap, so saves are serialised.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::sync::RwLock;

pub const KEY_VAR: &str = "GROQ_API_KEY";
const KEY_LINE_PREFIX: &str = "GROQ_API_KEY=";

/// Where the active key came from at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    File,
    Environment,
    None,
}

pub struct CredentialStore {
    path: PathBuf,
    current: RwLock<String>,
}

impl CredentialStore {
    /// Open the store at `path`, falling back to the `GROQ_API_KEY` env var.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_fallback(path, std::env::var(KEY_VAR).ok())
    }

    /// Open the store at `path` with an explicit fallback for when the file
    /// has no key line. A key line with an empty value still wins over the
    /// fallback.
    pub fn with_fallback(path: impl Into<PathBuf>, fallback: Option<String>) -> Self {
        let path = path.into();
        let (key, source) = match read_key_file(&path) {
            Some(key) => (key, KeySource::File),
            None => match fallback.filter(|k| !k.is_empty()) {
                Some(key) => (key, KeySource::Environment),
                None => (String::new(), KeySource::None),
            },
        };

        match source {
            KeySource::File if !key.is_empty() => {
                tracing::info!(path = %path.display(), "API key loaded from key file")
            }
            KeySource::Environment => tracing::info!("API key loaded from {KEY_VAR}"),
            _ => tracing::warn!("No API key found, waiting for one to be entered"),
        }

        Self {
            path,
            current: RwLock::new(key),
        }
    }

    /// The active key, empty when none is configured.
    pub async fn load(&self) -> String {
        self.current.read().await.clone()
    }

    pub async fn has_key(&self) -> bool {
        !self.current.read().await.is_empty()
    }

    /// Replace the stored key, on disk first and then in memory.
    pub async fn save(&self, key: &str) -> anyhow::Result<()> {
        let mut current = self.current.write().await;

        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, format!("{KEY_VAR}={key}\n"))
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e).with_context(|| format!("replacing {}", self.path.display()));
        }

        *current = key.to_string();
        tracing::info!(path = %self.path.display(), "API key saved");
        Ok(())
    }
}

/// Value of the first `GROQ_API_KEY=` line, taken verbatim apart from
/// surrounding whitespace. `None` when the file or the line is absent.
fn read_key_file(path: &Path) -> Option<String> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!(path = %path.display(), "Skipping unreadable key file: {e}");
            return None;
        }
    };
    parse_key_line(&contents)
}

fn parse_key_line(contents: &str) -> Option<String> {
    contents
        .lines()
        .find(|line| line.starts_with(KEY_LINE_PREFIX))
        .and_then(|line| line.split_once('='))
        .map(|(_, value)| value.trim().to_string())
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| ".env".to_string());
    path.with_file_name(format!("{name}.{}.tmp", std::process::id()))
}
