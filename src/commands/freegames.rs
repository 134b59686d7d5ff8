use serde_json::Value;
use std::sync::Arc;

use crate::constants::{IP_ECHO_URL, PLUGIN_NAME};
use crate::models::FreeGamesOptions;
use crate::scheduler::FreeGamesService;
use crate::utils::http;

const SET_USAGE: &str =
    "Usage: FREEGAMES SET <VERBOSE|NOVERBOSE|F2P|NOF2P|DLC|NODLC>";

/// Prefixes `<bot>` when the command was addressed to an account.
pub fn format_response(bot_name: Option<&str>, text: &str) -> String {
    match bot_name {
        Some(name) => format!("<{}> {}", name, text),
        None => text.to_string(),
    }
}

/// Handles `FREEGAMES ...` and `GETIP`. Returns `None` for anything else.
pub async fn handle_command(
    service: &Arc<FreeGamesService>,
    bot_name: Option<&str>,
    args: &[&str],
) -> Option<String> {
    let keyword = args.first()?.to_ascii_uppercase();
    match keyword.as_str() {
        "GETIP" => get_ip(bot_name).await,
        "FREEGAMES" => Some(freegames(service, bot_name, &args[1..]).await),
        _ => None,
    }
}

async fn freegames(service: &Arc<FreeGamesService>, bot_name: Option<&str>, args: &[&str]) -> String {
    match args.first().map(|arg| arg.to_ascii_uppercase()).as_deref() {
        Some("SET") => {
            let Some(variable) = args.get(1) else {
                return format_response(bot_name, SET_USAGE);
            };
            return set_variable(service, bot_name, variable).await;
        }
        Some("RELOAD") => {
            if let Err(e) = service.reload_options().await {
                tracing::warn!("[FreeGames] Failed to reload options: {}", e);
            }
        }
        _ => {}
    }

    let collected = service.collect_games_requested_by_user().await;
    format_response(
        bot_name,
        &format!("Collected a total of {} free game(s)", collected),
    )
}

type OptionSetter = fn(&mut FreeGamesOptions);

fn setter_for(variable: &str) -> Option<(OptionSetter, String)> {
    let setter: (OptionSetter, String) = match variable.to_ascii_uppercase().as_str() {
        "VERBOSE" => (|o: &mut FreeGamesOptions| o.verbose_log = Some(true), "Verbosity on".to_string()),
        "NOVERBOSE" => (|o: &mut FreeGamesOptions| o.verbose_log = Some(false), "Verbosity off".to_string()),
        "F2P" | "FREETOPLAY" | "NOSKIPFREETOPLAY" => (
            |o: &mut FreeGamesOptions| o.skip_free_to_play = Some(false),
            format!("{} is going to collect f2p games", PLUGIN_NAME),
        ),
        "NOF2P" | "NOFREETOPLAY" | "SKIPFREETOPLAY" => (
            |o: &mut FreeGamesOptions| o.skip_free_to_play = Some(true),
            format!("{} is now skipping f2p games", PLUGIN_NAME),
        ),
        "DLC" | "NOSKIPDLC" => (
            |o: &mut FreeGamesOptions| o.skip_dlc = Some(false),
            format!("{} is going to collect dlc", PLUGIN_NAME),
        ),
        "NODLC" | "SKIPDLC" => (
            |o: &mut FreeGamesOptions| o.skip_dlc = Some(true),
            format!("{} is now skipping dlc", PLUGIN_NAME),
        ),
        _ => return None,
    };
    Some(setter)
}

async fn set_variable(service: &FreeGamesService, bot_name: Option<&str>, variable: &str) -> String {
    let Some((apply, reply)) = setter_for(variable) else {
        return format_response(
            bot_name,
            &format!("Unknown \"{}\" variable to set", variable),
        );
    };

    service.update_options(apply);
    if let Err(e) = service.persist_options().await {
        tracing::warn!("[FreeGames] Failed to save options: {}", e);
    }
    format_response(bot_name, &reply)
}

fn origin_of(payload: &Value) -> Option<&str> {
    payload
        .get("origin")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
}

async fn get_ip(bot_name: Option<&str>) -> Option<String> {
    let Some(client) = http::get_client() else {
        return Some(format_response(bot_name, "http client is invalid!"));
    };
    match http::get_json(&client, IP_ECHO_URL).await {
        Ok(payload) => origin_of(&payload).map(|origin| format_response(bot_name, origin)),
        Err(e) => Some(format_response(bot_name, &format!("{} is invalid!", e))),
    }
}
