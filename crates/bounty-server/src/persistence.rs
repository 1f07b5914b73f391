use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use bounty_audit::AuditEntry;
use bounty_board::BoardState;

/// Snapshot of the board and its audit trail, as read back from disk.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PersistedState {
    pub board: BoardState,
    #[serde(default)]
    pub audit: Vec<AuditEntry>,
}

/// Borrowed form written on every commit, so saving never clones the board.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    board: &'a BoardState,
    audit: &'a [AuditEntry],
}

/// `state.json` under the state directory, replaced atomically on save.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(state_dir: &Path) -> Self {
        Self {
            path: state_dir.join("state.json"),
        }
    }

    /// The last saved snapshot, or `None` before the first commit.
    pub fn load(&self) -> Result<Option<PersistedState>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", self.path.display()));
            }
        };
        let state = serde_json::from_str(&content)
            .with_context(|| format!("Snapshot {} is corrupt", self.path.display()))?;
        Ok(Some(state))
    }

    /// Write the board and the full audit trail. The previous snapshot stays
    /// in place until the new one is completely written.
    pub fn save(&self, board: &BoardState, audit: &[AuditEntry]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create state directory")?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(&SnapshotRef { board, audit })
            .context("Failed to serialize snapshot")?;
        std::fs::write(&tmp_path, content).context("Failed to write temp snapshot")?;
        std::fs::rename(&tmp_path, &self.path).context("Failed to replace snapshot")?;
        tracing::debug!(
            "Saved {} tasks and {} audit entries to {}",
            board.tasks.task_count(),
            audit.len(),
            self.path.display()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
