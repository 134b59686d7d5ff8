use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::{classifier, CollectRequest, FreeGamesService};
use crate::bot::{add_license_command, BotRuntime};
use crate::constants::{COLLECT_GAMES_TIMEOUT, CYCLE_GATE_WAIT, DAY_IN_SECONDS};
use crate::models::{FreeGamesOptions, GameIdentifier, RedditGameEntry};
use crate::modules::persistence::BotContext;

impl FreeGamesService {
    /// Cycle triggered by a command. Shares the plugin-scoped cancellation token.
    pub async fn collect_games_requested_by_user(&self) -> usize {
        let cancel = self.cancel.clone();
        self.collect_games(CollectRequest::RequestedByUser, &cancel)
            .await
    }

    /// Timer cycle with a cooperative deadline.
    pub async fn collect_games_on_clock(&self) -> usize {
        let cancel = self.cancel.child_token();
        let watchdog = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(COLLECT_GAMES_TIMEOUT).await;
                cancel.cancel();
            })
        };

        let collected = self.collect_games(CollectRequest::Scheduled, &cancel).await;
        watchdog.abort();
        collected
    }

    /// Runs one fetch/redeem pass over every account. Returns the number of
    /// games collected, or 0 when another cycle is in flight.
    pub async fn collect_games(&self, request: CollectRequest, cancel: &CancellationToken) -> usize {
        if cancel.is_cancelled() {
            return 0;
        }
        let Some(_permit) = self.gate.try_enter(CYCLE_GATE_WAIT, cancel).await else {
            tracing::debug!("[FreeGames] Another collection cycle is running, skipping");
            return 0;
        };

        let options = self.options();
        let games = self.source.list_games().await;
        self.log_new_game_count(&games, request, options.verbose());

        let bots = self.accounts.lock().ordered_by_last_run();
        let mut collected = 0;
        for bot in bots {
            if cancel.is_cancelled() {
                tracing::debug!("[FreeGames] Collection cancelled");
                break;
            }
            if !bot.is_connected_and_logged_on() || bot.pending_background_redemptions() > 0 {
                continue;
            }
            if options.is_bot_blacklisted(bot.name()) {
                continue;
            }
            let Some(context) = self.accounts.lock().context(bot.name()) else {
                continue;
            };

            collected += self
                .collect_for_bot(bot.as_ref(), &context, &games, &options, request, cancel)
                .await;
        }
        collected
    }

    async fn collect_for_bot(
        &self,
        bot: &dyn BotRuntime,
        context: &Arc<BotContext>,
        games: &[RedditGameEntry],
        options: &FreeGamesOptions,
        request: CollectRequest,
        cancel: &CancellationToken,
    ) -> usize {
        let verbose = options.verbose();
        let user = request.is_user();
        let now = chrono::Utc::now().timestamp();
        let mut collected = 0;

        context.start_run();
        for entry in games {
            if entry.is_free_to_play() && options.skips_free_to_play() {
                continue;
            }
            if entry.is_dlc() && options.skips_dlc() {
                continue;
            }
            let Some(gid) = entry.game_identifier() else {
                continue;
            };
            if context.has_app(&gid) || options.is_game_blacklisted(&gid) {
                continue;
            }

            let command = add_license_command(bot.name(), &gid);
            if verbose {
                tracing::debug!(bot = %bot.name(), "Trying to perform command \"{}\"", command);
            }

            let hide = !verbose && !user && context.should_hide_error_log_for_app(&gid);
            let response = {
                let _mute = self.log_filter.disable_add_license_errors(bot.name(), hide);
                bot.execute_command(&command).await
            };
            let response = response.filter(|text| !text.trim().is_empty());
            let result = classifier().classify(response.as_deref());

            if let Some(text) = response.as_deref() {
                if result.success || !hide {
                    tracing::info!(bot = %bot.name(), "[FreeGames] {}", text);
                }
            }

            if result.success {
                context.register_app(gid);
                collected += 1;
                continue;
            }

            if !user && result.rate_limited {
                if verbose {
                    tracing::warn!(
                        bot = %bot.name(),
                        "[FreeGames] Rate limited, skipping the remaining games for this account"
                    );
                }
                break;
            }

            if now.saturating_sub(entry.date) > DAY_IN_SECONDS {
                context.app_tick_count(&gid, true);
            }
            if let Some(reason) = result.ineligible {
                if context.register_invalid_app(gid) {
                    tracing::debug!(bot = %bot.name(), "[FreeGames] {} marked as {}", gid, reason);
                }
            }
        }

        if context.is_dirty() {
            if let Err(e) = context.save_to_file_system(cancel).await {
                tracing::warn!(bot = %bot.name(), "[FreeGames] Failed to save context: {}", e);
            }
        }
        context.new_run();
        collected
    }

    fn log_new_game_count(&self, games: &[RedditGameEntry], request: CollectRequest, verbose: bool) {
        if let Some(summary) = self.new_game_summary(games, request, verbose) {
            tracing::info!("[FreeGames] {}", summary);
        }
    }

    pub(crate) fn new_game_summary(
        &self,
        games: &[RedditGameEntry],
        request: CollectRequest,
        verbose: bool,
    ) -> Option<String> {
        let ids: HashSet<GameIdentifier> = games
            .iter()
            .filter_map(RedditGameEntry::game_identifier)
            .collect();

        let (first_fetch, fresh) = {
            let mut seen = self.previously_seen.lock();
            let first_fetch = seen.is_empty();
            let fresh = ids.iter().filter(|gid| !seen.contains(*gid)).count();
            seen.extend(ids.iter().copied());
            (first_fetch, fresh)
        };

        if first_fetch && !ids.is_empty() {
            Some(format!("found potentially {} free games", games.len()))
        } else if fresh > 0 {
            Some(format!("found {} fresh free game(s)", fresh))
        } else if request.is_user() || verbose {
            Some(format!("found 0 new game out of {}", games.len()))
        } else {
            None
        }
    }
}
