use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crate::bot::BotRuntime;
use crate::models::RedditGameEntry;
use crate::reddit::GameSource;

fn global_env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

pub(crate) fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    global_env_lock()
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub(crate) struct ScopedEnvVar {
    key: &'static str,
    original: Option<String>,
}

impl ScopedEnvVar {
    pub(crate) fn set(key: &'static str, value: &str) -> Self {
        let original = std::env::var(key).ok();
        std::env::set_var(key, value);
        Self { key, original }
    }

    pub(crate) fn unset(key: &'static str) -> Self {
        let original = std::env::var(key).ok();
        std::env::remove_var(key);
        Self { key, original }
    }
}

impl Drop for ScopedEnvVar {
    fn drop(&mut self) {
        if let Some(value) = self.original.as_deref() {
            std::env::set_var(self.key, value);
        } else {
            std::env::remove_var(self.key);
        }
    }
}

/// Scripted account runtime. Replies are consumed in order, then `fallback`
/// repeats. Every issued command is recorded.
pub(crate) struct FakeBot {
    name: String,
    connected: AtomicBool,
    pending: AtomicUsize,
    script: parking_lot::Mutex<VecDeque<Option<String>>>,
    fallback: Option<String>,
    delay: Duration,
    commands: parking_lot::Mutex<Vec<String>>,
}

impl FakeBot {
    pub(crate) fn always(name: &str, reply: &str) -> Arc<Self> {
        Self::scripted(name, Vec::new(), Some(reply))
    }

    pub(crate) fn scripted(
        name: &str,
        replies: Vec<Option<&str>>,
        fallback: Option<&str>,
    ) -> Arc<Self> {
        Arc::new(Self::build(name, replies, fallback, Duration::ZERO))
    }

    pub(crate) fn slow(name: &str, reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self::build(name, Vec::new(), Some(reply), delay))
    }

    fn build(
        name: &str,
        replies: Vec<Option<&str>>,
        fallback: Option<&str>,
        delay: Duration,
    ) -> Self {
        Self {
            name: name.to_string(),
            connected: AtomicBool::new(true),
            pending: AtomicUsize::new(0),
            script: parking_lot::Mutex::new(
                replies
                    .into_iter()
                    .map(|reply| reply.map(str::to_string))
                    .collect(),
            ),
            fallback: fallback.map(str::to_string),
            delay,
            commands: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub(crate) fn set_pending(&self, pending: usize) {
        self.pending.store(pending, Ordering::SeqCst);
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }
}

#[async_trait]
impl BotRuntime for FakeBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_connected_and_logged_on(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn pending_background_redemptions(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    async fn execute_command(&self, command: &str) -> Option<String> {
        self.commands.lock().push(command.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let scripted = self.script.lock().pop_front();
        match scripted {
            Some(reply) => reply,
            None => self.fallback.clone(),
        }
    }
}

/// Game source returning a fixed list, optionally after a delay.
pub(crate) struct StaticSource {
    games: parking_lot::Mutex<Vec<RedditGameEntry>>,
    delay: Duration,
    calls: AtomicUsize,
}

impl StaticSource {
    pub(crate) fn new(games: Vec<RedditGameEntry>) -> Arc<Self> {
        Self::with_delay(games, Duration::ZERO)
    }

    pub(crate) fn with_delay(games: Vec<RedditGameEntry>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            games: parking_lot::Mutex::new(games),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn set_games(&self, games: Vec<RedditGameEntry>) {
        *self.games.lock() = games;
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GameSource for StaticSource {
    async fn list_games(&self) -> Vec<RedditGameEntry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.games.lock().clone()
    }
}
