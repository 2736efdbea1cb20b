//! Persistence of the last applied lighting frame.
//!
//! A status read must replay this frame byte for byte, so it survives
//! across processes in a small JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::profiles::APP_NAME;
use crate::error::{AsetekError, Result};
use crate::protocol::LightingFrame;

const LIGHTING_FILE: &str = "lighting.json";

/// Storage for the last applied lighting frame.
pub trait LightingStore {
    /// The stored frame, or the "off" frame when nothing was stored yet.
    fn load(&self) -> Result<LightingFrame>;

    /// Replace the stored frame.
    fn save(&mut self, frame: &LightingFrame) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredLightingState {
    frame: LightingFrame,
}

// =============================================================================
// File store
// =============================================================================

/// JSON file backed store.
///
/// Nothing is created until the first [`save`](LightingStore::save).
#[derive(Debug, Clone)]
pub struct FileLightingStore {
    path: PathBuf,
}

impl FileLightingStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store in the per-user data directory.
    /// - Linux: ~/.local/share/asetek-rust/lighting.json
    /// - Windows: %APPDATA%\asetek-rust\lighting.json
    pub fn in_data_dir() -> Result<Self> {
        dirs::data_dir()
            .map(|p| Self::new(p.join(APP_NAME).join(LIGHTING_FILE)))
            .ok_or_else(|| AsetekError::Storage("Could not find data directory".into()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LightingStore for FileLightingStore {
    fn load(&self) -> Result<LightingFrame> {
        if !self.path.exists() {
            debug!("no lighting state at {:?}, assuming off", self.path);
            return Ok(LightingFrame::off());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AsetekError::Storage(format!("Failed to read lighting state: {}", e)))?;

        match serde_json::from_str::<StoredLightingState>(&content) {
            Ok(state) => Ok(state.frame),
            Err(e) => {
                warn!(
                    "ignoring corrupt lighting state at {:?} ({}), assuming off",
                    self.path, e
                );
                Ok(LightingFrame::off())
            }
        }
    }

    fn save(&mut self, frame: &LightingFrame) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AsetekError::Storage(format!("Failed to create data dir: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(&StoredLightingState { frame: *frame })
            .map_err(|e| {
                AsetekError::Storage(format!("Failed to serialize lighting state: {}", e))
            })?;

        std::fs::write(&self.path, content)
            .map_err(|e| AsetekError::Storage(format!("Failed to write lighting state: {}", e)))?;

        Ok(())
    }
}

// =============================================================================
// Memory store
// =============================================================================

/// In-process store, for tests and one-shot tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryLightingStore {
    frame: Option<LightingFrame>,
    saves: usize,
}

impl MemoryLightingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(frame: LightingFrame) -> Self {
        Self {
            frame: Some(frame),
            saves: 0,
        }
    }

    /// Number of successful saves.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl LightingStore for MemoryLightingStore {
    fn load(&self) -> Result<LightingFrame> {
        Ok(self.frame.unwrap_or_default())
    }

    fn save(&mut self, frame: &LightingFrame) -> Result<()> {
        self.frame = Some(*frame);
        self.saves += 1;
        Ok(())
    }
}
