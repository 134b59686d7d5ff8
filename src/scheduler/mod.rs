pub mod collect;
pub mod gate;
pub mod outcome;
pub mod registry;
pub mod timer;


use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::bot::BotRuntime;
use crate::constants::{OPTIONS_SAVE_TIMEOUT, TIMER_INITIAL_DELAY};
use crate::error::{AppError, AppResult};
use crate::models::{FreeGamesOptions, GameIdentifier};
use crate::modules::persistence::BotContext;
use crate::modules::system::{config, log_filter::LoggerFilter, validation};
use crate::reddit::GameSource;

pub use gate::{CycleGate, CyclePermit};
pub use outcome::{classifier, IneligibleReason, OutcomeClassifier, RedeemResult};
pub use registry::AccountRegistry;
pub use timer::CollectTimer;

const CONTEXTS_DIR: &str = "contexts";

type TickFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectRequest {
    RequestedByUser,
    Scheduled,
}

impl CollectRequest {
    pub fn is_user(self) -> bool {
        matches!(self, CollectRequest::RequestedByUser)
    }
}

/// Owns the accounts, their contexts, the recurring timer and the cycle gate.
///
/// Hosts drive it through the `on_*` callbacks; cycles run either from the
/// timer or from [`FreeGamesService::collect_games_requested_by_user`].
pub struct FreeGamesService {
    options: RwLock<FreeGamesOptions>,
    data_dir: PathBuf,
    contexts_dir: PathBuf,
    source: Arc<dyn GameSource>,
    accounts: Mutex<AccountRegistry>,
    gate: CycleGate,
    timer: CollectTimer,
    previously_seen: Mutex<HashSet<GameIdentifier>>,
    log_filter: Arc<LoggerFilter>,
    cancel: CancellationToken,
}

impl FreeGamesService {
    pub fn new(
        options: FreeGamesOptions,
        source: Arc<dyn GameSource>,
        data_dir: impl Into<PathBuf>,
    ) -> Arc<Self> {
        Self::with_log_filter(options, source, data_dir, LoggerFilter::shared())
    }

    pub fn with_log_filter(
        options: FreeGamesOptions,
        source: Arc<dyn GameSource>,
        data_dir: impl Into<PathBuf>,
        log_filter: Arc<LoggerFilter>,
    ) -> Arc<Self> {
        let data_dir = data_dir.into();
        Arc::new(Self {
            options: RwLock::new(options),
            contexts_dir: data_dir.join(CONTEXTS_DIR),
            data_dir,
            source,
            accounts: Mutex::new(AccountRegistry::new()),
            gate: CycleGate::new(),
            timer: CollectTimer::new(),
            previously_seen: Mutex::new(HashSet::new()),
            log_filter,
            cancel: CancellationToken::new(),
        })
    }

    pub fn options(&self) -> FreeGamesOptions {
        self.options.read().clone()
    }

    pub fn update_options(&self, update: impl FnOnce(&mut FreeGamesOptions)) {
        update(&mut self.options.write());
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn log_filter(&self) -> &LoggerFilter {
        &self.log_filter
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_running()
    }

    pub fn bot_count(&self) -> usize {
        self.accounts.lock().bot_count()
    }

    pub fn context(&self, bot_name: &str) -> Option<Arc<BotContext>> {
        self.accounts.lock().context(bot_name)
    }

    /// Loads options from storage, folds in the legacy verbosity flag and env
    /// overrides, then writes them back in the current format.
    pub async fn on_init(&self) -> AppResult<()> {
        let mut options = config::load_options_from(&self.data_dir)?;
        if config::migrate_legacy_verbose(&self.data_dir, &mut options) {
            tracing::info!("[FreeGames] Migrated legacy verbosity flag");
        }
        config::apply_env_overrides(&mut options);
        warn_invalid_options(&options);
        *self.options.write() = options;

        self.persist_options().await
    }

    pub async fn on_update_finished(&self) -> AppResult<()> {
        self.persist_options().await
    }

    pub async fn on_account_connected(self: &Arc<Self>, bot: Arc<dyn BotRuntime>) {
        let name = bot.name().to_string();
        let context = {
            let mut accounts = self.accounts.lock();
            accounts.add_bot(bot);
            accounts.get_or_create_context(&name, &self.contexts_dir)
        };
        self.start_timer_if_needed();

        if let Err(e) = context.load_from_file_system(&self.cancel).await {
            tracing::warn!(bot = %name, "[FreeGames] Failed to load context: {}", e);
        }
        tracing::debug!(bot = %name, "[FreeGames] Account registered");
    }

    pub async fn on_account_disconnected(&self, bot_name: &str) {
        let (context, remaining) = {
            let mut accounts = self.accounts.lock();
            accounts.remove_bot(bot_name);
            (accounts.remove_context(bot_name), accounts.bot_count())
        };

        if let Some(context) = context {
            // The plugin token may already be cancelled during teardown.
            if let Err(e) = context
                .save_to_file_system(&CancellationToken::new())
                .await
            {
                tracing::warn!(bot = %bot_name, "[FreeGames] Failed to save context: {}", e);
            }
        }

        if remaining == 0 {
            self.timer.stop();
        }
        self.log_filter.remove_filters(bot_name);
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.timer.stop();
    }

    /// Re-reads options from storage. Restarts a running timer when the
    /// recheck interval changed.
    pub async fn reload_options(self: &Arc<Self>) -> AppResult<()> {
        let data_dir = self.data_dir.clone();
        let mut options = tokio::task::spawn_blocking(move || config::load_options_from(&data_dir))
            .await
            .map_err(|e| AppError::Unknown(format!("options_reload_task_failed: {}", e)))??;
        config::apply_env_overrides(&mut options);
        warn_invalid_options(&options);

        let interval_changed = {
            let mut current = self.options.write();
            let changed = current.recheck_interval_ms != options.recheck_interval_ms;
            *current = options;
            changed
        };
        if interval_changed && self.timer.is_running() {
            let tick = self.tick_fn();
            self.timer
                .replace(TIMER_INITIAL_DELAY, self.recheck_interval(), tick);
            tracing::info!("[FreeGames] Recheck interval changed, timer restarted");
        }
        Ok(())
    }

    /// Saves the current options, giving up after a short timeout or when the
    /// plugin is torn down.
    pub async fn persist_options(&self) -> AppResult<()> {
        let options = self.options();
        let data_dir = self.data_dir.clone();
        let save = tokio::task::spawn_blocking(move || config::save_options_to(&data_dir, &options));

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(AppError::Cancelled),
            saved = tokio::time::timeout(OPTIONS_SAVE_TIMEOUT, save) => match saved {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(AppError::Unknown(format!("options_save_task_failed: {}", e))),
                Err(_) => Err(AppError::Persistence("options_save_timed_out".to_string())),
            },
        }
    }

    fn recheck_interval(&self) -> Duration {
        let ms = self.options.read().recheck_interval_ms;
        Duration::from_millis(u64::try_from(ms).unwrap_or(0))
    }

    fn tick_fn(self: &Arc<Self>) -> impl Fn() -> TickFuture + Send + 'static {
        let weak: Weak<Self> = Arc::downgrade(self);
        move || -> TickFuture {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(service) = weak.upgrade() {
                    service.collect_games_on_clock().await;
                }
            })
        }
    }

    fn start_timer_if_needed(self: &Arc<Self>) {
        let tick = self.tick_fn();
        self.timer
            .start_if_needed(TIMER_INITIAL_DELAY, self.recheck_interval(), tick);
    }
}

fn warn_invalid_options(options: &FreeGamesOptions) {
    if let Err(errors) = validation::validate_options(options) {
        for error in errors {
            tracing::warn!("[FreeGames] {}", error);
        }
    }
}

impl Drop for FreeGamesService {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
