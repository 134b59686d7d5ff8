use crate::models::GameIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const OPTIONS_VERSION: u32 = 1;
const BOT_BLACKLIST_PREFIX: &str = "bot/";

fn default_recheck_interval_ms() -> i64 {
    30 * 60 * 1000
}

fn default_version() -> u32 {
    OPTIONS_VERSION
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeGamesOptions {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub verbose_log: Option<bool>,
    #[serde(default)]
    pub skip_free_to_play: Option<bool>,
    #[serde(default)]
    pub skip_dlc: Option<bool>,
    #[serde(default = "default_recheck_interval_ms")]
    pub recheck_interval_ms: i64,
    #[serde(default)]
    pub blacklist: BTreeSet<String>,
}

impl FreeGamesOptions {
    pub fn new() -> Self {
        Self {
            version: OPTIONS_VERSION,
            verbose_log: None,
            skip_free_to_play: None,
            skip_dlc: None,
            recheck_interval_ms: default_recheck_interval_ms(),
            blacklist: BTreeSet::new(),
        }
    }

    // Debug builds are chatty unless told otherwise.
    pub fn verbose(&self) -> bool {
        self.verbose_log.unwrap_or(cfg!(debug_assertions))
    }

    pub fn skips_free_to_play(&self) -> bool {
        self.skip_free_to_play == Some(true)
    }

    pub fn skips_dlc(&self) -> bool {
        self.skip_dlc == Some(true)
    }

    pub fn is_bot_blacklisted(&self, bot_name: &str) -> bool {
        self.blacklist.iter().any(|entry| {
            entry
                .get(..BOT_BLACKLIST_PREFIX.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BOT_BLACKLIST_PREFIX))
                && entry[BOT_BLACKLIST_PREFIX.len()..] == *bot_name
        })
    }

    pub fn is_game_blacklisted(&self, gid: &GameIdentifier) -> bool {
        self.blacklist
            .iter()
            .filter_map(|entry| GameIdentifier::try_parse(entry))
            .any(|entry| entry == *gid)
    }

    pub fn blacklist_bot(&mut self, bot_name: &str) {
        self.blacklist
            .insert(format!("{}{}", BOT_BLACKLIST_PREFIX, bot_name));
    }

    pub fn blacklist_game(&mut self, gid: GameIdentifier) {
        self.blacklist.insert(gid.to_string());
    }
}

impl Default for FreeGamesOptions {
    fn default() -> Self {
        Self::new()
    }
}
