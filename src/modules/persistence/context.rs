use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::models::GameIdentifier;

const CONTEXT_FORMAT_VERSION: u32 = 1;

// One lock per context file, shared by every `BotContext` pointing at it.
static FILE_LOCKS: Lazy<DashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>> = Lazy::new(DashMap::new);

fn file_lock(path: &Path) -> Arc<tokio::sync::Mutex<()>> {
    FILE_LOCKS.entry(path.to_path_buf()).or_default().clone()
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ContextSnapshot {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    redeemed: BTreeSet<GameIdentifier>,
    #[serde(default)]
    invalid: BTreeMap<GameIdentifier, u32>,
}

#[derive(Debug, Default)]
struct ContextState {
    redeemed: HashSet<GameIdentifier>,
    invalid: HashMap<GameIdentifier, u32>,
}

/// `<sanitized name>-<hash>.json`. The hash covers the raw name so names that
/// sanitize alike still get distinct files.
pub fn context_file_name(bot_name: &str) -> String {
    let sanitized: String = bot_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let hash = format!("{:x}", Sha256::digest(bot_name.as_bytes()));
    format!("{}-{}.json", sanitized, &hash[..8])
}

/// Durable per-account redemption state.
///
/// Mutators take the context's own lock; `generation` moves on every change so
/// a save only clears the dirty state it actually wrote.
#[derive(Debug)]
pub struct BotContext {
    bot_name: String,
    path: PathBuf,
    state: Mutex<ContextState>,
    generation: AtomicU64,
    saved_generation: AtomicU64,
    run_started: Mutex<Instant>,
    run_elapsed_ms: AtomicI64,
    io_lock: Arc<tokio::sync::Mutex<()>>,
}

impl BotContext {
    pub fn new(bot_name: impl Into<String>, contexts_dir: &Path) -> Self {
        let bot_name = bot_name.into();
        let path = contexts_dir.join(context_file_name(&bot_name));
        let io_lock = file_lock(&path);
        Self {
            bot_name,
            path,
            state: Mutex::new(ContextState::default()),
            generation: AtomicU64::new(0),
            saved_generation: AtomicU64::new(0),
            run_started: Mutex::new(Instant::now()),
            run_elapsed_ms: AtomicI64::new(0),
            io_lock,
        }
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn touch(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn has_app(&self, gid: &GameIdentifier) -> bool {
        self.state.lock().redeemed.contains(gid)
    }

    pub fn register_app(&self, gid: GameIdentifier) {
        if self.state.lock().redeemed.insert(gid) {
            self.touch();
        }
    }

    /// Returns true only when `gid` was not known as invalid before.
    pub fn register_invalid_app(&self, gid: GameIdentifier) -> bool {
        let inserted = {
            let mut state = self.state.lock();
            if state.invalid.contains_key(&gid) {
                false
            } else {
                state.invalid.insert(gid, 0);
                true
            }
        };
        if inserted {
            self.touch();
        }
        inserted
    }

    pub fn app_tick_count(&self, gid: &GameIdentifier, increment: bool) -> Option<u32> {
        let mut state = self.state.lock();
        let count = state.invalid.get_mut(gid)?;
        if increment {
            *count = count.saturating_add(1);
            drop(state);
            self.touch();
            return self.invalid_attempts(gid);
        }
        Some(*count)
    }

    pub fn invalid_attempts(&self, gid: &GameIdentifier) -> Option<u32> {
        self.state.lock().invalid.get(gid).copied()
    }

    pub fn should_hide_error_log_for_app(&self, gid: &GameIdentifier) -> bool {
        self.invalid_attempts(gid).is_some_and(|count| count > 0)
    }

    pub fn redeemed_apps(&self) -> Vec<GameIdentifier> {
        let mut apps: Vec<_> = self.state.lock().redeemed.iter().copied().collect();
        apps.sort();
        apps
    }

    pub fn is_dirty(&self) -> bool {
        self.generation.load(Ordering::SeqCst) != self.saved_generation.load(Ordering::SeqCst)
    }

    pub fn start_run(&self) {
        *self.run_started.lock() = Instant::now();
    }

    /// Records how long the pass since `start_run` took.
    pub fn new_run(&self) {
        let mut started = self.run_started.lock();
        let elapsed = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.run_elapsed_ms.store(elapsed, Ordering::SeqCst);
        *started = Instant::now();
    }

    pub fn run_elapsed_ms(&self) -> i64 {
        self.run_elapsed_ms.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub(crate) fn set_run_elapsed_ms(&self, value: i64) {
        self.run_elapsed_ms.store(value, Ordering::SeqCst);
    }

    /// Merges the stored snapshot into memory. Missing or unreadable files leave
    /// the context as it is; only cancellation is reported as an error.
    pub async fn load_from_file_system(&self, cancel: &CancellationToken) -> AppResult<bool> {
        let _io = self.io_lock.lock().await;
        let read = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            read = tokio::fs::read(&self.path) => read,
        };

        let bytes = match read {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                tracing::warn!(bot = %self.bot_name, "[Context] Failed to read {:?}: {}", self.path, e);
                return Ok(false);
            }
        };

        let snapshot: ContextSnapshot = match serde_json::from_slice(&bytes) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    bot = %self.bot_name,
                    "[Context] Ignoring corrupt context file {:?}: {}",
                    self.path,
                    e
                );
                return Ok(false);
            }
        };

        {
            let mut state = self.state.lock();
            state.redeemed.extend(snapshot.redeemed);
            for (gid, count) in snapshot.invalid {
                let entry = state.invalid.entry(gid).or_insert(0);
                *entry = (*entry).max(count);
            }
        }
        tracing::debug!(
            bot = %self.bot_name,
            "[Context] Loaded context from {:?}",
            self.path
        );
        Ok(true)
    }

    /// Writes the whole context atomically: temp file, fsync, rename.
    pub async fn save_to_file_system(&self, cancel: &CancellationToken) -> AppResult<()> {
        let _io = self.io_lock.lock().await;
        let generation = self.generation.load(Ordering::SeqCst);
        let content = {
            let state = self.state.lock();
            let snapshot = ContextSnapshot {
                version: CONTEXT_FORMAT_VERSION,
                redeemed: state.redeemed.iter().copied().collect(),
                invalid: state.invalid.iter().map(|(k, v)| (*k, *v)).collect(),
            };
            serde_json::to_vec_pretty(&snapshot)?
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AppError::Cancelled),
            written = self.write_atomically(&content) => written?,
        }

        self.saved_generation.store(generation, Ordering::SeqCst);
        Ok(())
    }

    async fn write_atomically(&self, content: &[u8]) -> AppResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let temp_path = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| AppError::Persistence(format!("failed_to_replace_context_file: {}", e)))
    }
}
