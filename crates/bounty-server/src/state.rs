use anyhow::Context;
use std::sync::Arc;
use tokio::sync::Mutex;

use bounty_audit::{AuditLog, InMemoryAuditLog};
use bounty_board::BountyBoard;
use bounty_types::{BoardRules, BountyEvent};

use crate::config::BountyConfig;
use crate::error::ApiError;
use crate::persistence::FileStore;

/// Shared server state. The board mutex is the single writer: a request holds
/// it from validation through audit and snapshot.
#[derive(Clone)]
pub struct AppState {
    pub board: Arc<Mutex<BountyBoard>>,
    pub audit: Arc<dyn AuditLog>,
    pub store: Option<Arc<FileStore>>,
}

impl AppState {
    /// Fresh in-memory state with no persistence.
    pub fn new(rules: BoardRules) -> Self {
        Self {
            board: Arc::new(Mutex::new(BountyBoard::new(rules))),
            audit: Arc::new(InMemoryAuditLog::new()),
            store: None,
        }
    }

    /// Build state from config: restore the snapshot when persisting and one
    /// exists, otherwise start empty and credit the genesis balances.
    pub async fn bootstrap(config: &BountyConfig) -> anyhow::Result<Self> {
        let store = config
            .persist
            .then(|| Arc::new(FileStore::new(&config.state_dir)));

        let snapshot = match &store {
            Some(file) => file.load()?.map(|snapshot| (file, snapshot)),
            None => None,
        };
        if let Some((file, snapshot)) = snapshot {
            let audit = InMemoryAuditLog::from_entries(snapshot.audit);
            if !audit.verify_integrity().await? {
                anyhow::bail!(
                    "Audit chain in {} failed verification",
                    file.path().display()
                );
            }
            tracing::info!(
                "Restored {} tasks from {}",
                snapshot.board.tasks.task_count(),
                file.path().display()
            );
            return Ok(Self {
                board: Arc::new(Mutex::new(BountyBoard::from_state(
                    snapshot.board,
                    config.rules.clone(),
                ))),
                audit: Arc::new(audit),
                store: store.clone(),
            });
        }

        let state = Self {
            store,
            ..Self::new(config.rules.clone())
        };
        let mut board = state.board.lock().await;
        let mut events = Vec::with_capacity(config.genesis.len());
        for alloc in &config.genesis {
            let event = board
                .deposit(&alloc.account, alloc.amount)
                .with_context(|| format!("Genesis allocation for {} failed", alloc.account))?;
            events.push(event);
        }
        if !events.is_empty() {
            tracing::info!("Credited {} genesis allocations", events.len());
            state.commit(&board, &events).await?;
        }
        drop(board);
        Ok(state)
    }

    /// Write a snapshot including `events`, then chain them onto the audit log.
    /// Call with the board lock held. A failed save leaves the log untouched.
    pub async fn commit(&self, board: &BountyBoard, events: &[BountyEvent]) -> Result<(), ApiError> {
        let entries = self.audit.prepare(events).await?;
        if let Some(store) = &self.store {
            let mut audit = self.audit.all_entries().await?;
            audit.extend(entries.iter().cloned());
            store.save(board.state(), &audit)?;
        }
        for entry in entries {
            self.audit.append(entry).await?;
        }
        Ok(())
    }

    /// Run `op` against the board and commit the events it returns. On any
    /// failure the board is put back as it was before `op`.
    pub async fn transact<T, F>(&self, board: &mut BountyBoard, op: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut BountyBoard) -> Result<(T, Vec<BountyEvent>), ApiError>,
    {
        let before = board.state().clone();
        let result = match op(board) {
            Ok((value, events)) => self.commit(board, &events).await.map(|()| value),
            Err(err) => Err(err),
        };
        if let Err(err) = &result {
            if err.status().is_server_error() {
                tracing::warn!("Rolling back board after failed commit: {err}");
            }
            board.restore(before);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisAllocation;
    use bounty_types::Principal;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> BountyConfig {
        BountyConfig {
            state_dir: dir.to_path_buf(),
            persist: true,
            genesis: vec![GenesisAllocation {
                account: Principal::from("deployer"),
                amount: 10_000,
            }],
            ..BountyConfig::default()
        }
    }

    #[tokio::test]
    async fn test_genesis_is_applied_once() {
        let dir = tempdir().unwrap();
        let state = AppState::bootstrap(&config(dir.path())).await.unwrap();
        {
            let mut board = state.board.lock().await;
            let receipt = board
                .create_task(&Principal::from("deployer"), 400, "persist me")
                .unwrap();
            state.commit(&board, &receipt.events).await.unwrap();
        }

        let restored = AppState::bootstrap(&config(dir.path())).await.unwrap();
        let board = restored.board.lock().await;
        assert_eq!(board.balance(&Principal::from("deployer")), 9_600);
        assert_eq!(board.task_count(), 1);
        assert_eq!(restored.audit.all_entries().await.unwrap().len(), 3);
        assert!(restored.audit.verify_integrity().await.unwrap());
    }

    #[tokio::test]
    async fn test_in_memory_state_never_touches_disk() {
        let dir = tempdir().unwrap();
        let cfg = BountyConfig {
            persist: false,
            ..config(dir.path())
        };
        let state = AppState::bootstrap(&cfg).await.unwrap();
        assert!(state.store.is_none());
        assert!(FileStore::new(dir.path()).load().unwrap().is_none());
        assert_eq!(state.audit.query_by_kind("deposited").await.unwrap().len(), 1);
    }
}
