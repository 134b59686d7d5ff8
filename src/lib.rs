pub mod bot;
pub mod commands;
pub mod constants;
pub mod error;
pub mod models;
pub mod modules;
pub mod reddit;
pub mod scheduler;
#[cfg(test)]
mod test_utils;
pub mod utils;

pub use bot::BotRuntime;
pub use models::{EntryKind, FreeGamesOptions, GameIdentifier, GameKind, RedditGameEntry};
pub use reddit::{GameSource, RedditClient};
pub use scheduler::{CollectRequest, FreeGamesService};

use modules::system::{config, logger, validation};
use tracing::{error, info, warn};

/// Loads options and applies env overrides. Validation problems are logged as
/// warnings and never abort startup.
fn load_checked_options() -> Result<FreeGamesOptions, String> {
    let mut options =
        config::load_options().map_err(|e| format!("failed_to_load_options: {}", e))?;
    config::apply_env_overrides(&mut options);
    if let Err(errors) = validation::validate_options(&options) {
        for error in &errors {
            warn!("{}", error);
        }
    }
    Ok(options)
}

async fn check_feed() {
    let entries = RedditClient::new().list_games().await;
    if entries.is_empty() {
        logger::log_warn("[Reddit] Feed returned no redeemable entries");
        return;
    }
    info!("[Reddit] Feed lists {} redeemable entries", entries.len());
    for entry in &entries {
        info!(
            "[Reddit] {} (f2p: {}, dlc: {}, seen at {})",
            entry.identifier,
            entry.is_free_to_play(),
            entry.is_dlc(),
            entry.date
        );
    }
}

/// Headless entry point: checks the configuration and fetches the feed once.
/// Redemption needs a host that provides [`BotRuntime`] accounts.
pub fn run() {
    logger::init_logger();
    logger::log_info(&format!(
        "{} {} starting",
        constants::PLUGIN_NAME,
        constants::PLUGIN_VERSION
    ));

    let options = match load_checked_options() {
        Ok(options) => options,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Options loaded (verbose: {}, skip f2p: {}, skip dlc: {}, recheck every {}ms)",
        options.verbose(),
        options.skips_free_to_play(),
        options.skips_dlc(),
        options.recheck_interval_ms
    );

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            logger::log_error(&format!("Failed to create Tokio runtime: {}", e));
            std::process::exit(1);
        }
    };
    runtime.block_on(check_feed());
}
