//! File-based task store: the whole book as one JSON file.
//! Only reads on startup and writes on task changes, not on every tick.

use std::path::{Path, PathBuf};

use chrono::Utc;
use duebot_core::error::{DueBotError, Result};

use crate::book::TaskBook;

pub struct TaskStore {
    file: PathBuf,
}

impl TaskStore {
    /// Store backed by `file`. Parent directories are created on first save.
    pub fn new(file: &Path) -> Self {
        Self {
            file: file.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Write the book to disk via a temp file + rename, so a crash mid-write
    /// leaves the previous file intact.
    pub fn save(&self, book: &TaskBook) -> Result<()> {
        if let Some(parent) = self.file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(book)?;
        let tmp = self.file.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| DueBotError::Store(format!("write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &self.file)
            .map_err(|e| DueBotError::Store(format!("rename to {}: {e}", self.file.display())))?;
        tracing::debug!(
            "Saved {} tasks to {}",
            book.task_count(),
            self.file.display()
        );
        Ok(())
    }

    /// Load the book. A missing or unreadable file is an empty book. A corrupt
    /// one is moved aside first so the next save cannot overwrite it.
    pub fn load(&self) -> TaskBook {
        if !self.file.exists() {
            return TaskBook::new();
        }
        match std::fs::read_to_string(&self.file) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                match self.quarantine() {
                    Ok(side) => tracing::warn!(
                        "Failed to parse {}: {e}; moved it to {}",
                        self.file.display(),
                        side.display()
                    ),
                    Err(moved) => tracing::warn!(
                        "Failed to parse {}: {e}; could not move it aside: {moved}",
                        self.file.display()
                    ),
                }
                TaskBook::new()
            }),
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}", self.file.display());
                TaskBook::new()
            }
        }
    }

    /// Rename the current file to `<name>.corrupt-<unix ts>` next to it.
    fn quarantine(&self) -> Result<PathBuf> {
        let name = self
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tasks.json".into());
        let side = self
            .file
            .with_file_name(format!("{name}.corrupt-{}", Utc::now().timestamp()));
        std::fs::rename(&self.file, &side)
            .map_err(|e| DueBotError::Store(format!("rename to {}: {e}", side.display())))?;
        Ok(side)
    }
}
