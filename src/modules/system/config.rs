use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::{FreeGamesOptions, OPTIONS_VERSION};

const DATA_DIR: &str = ".freegames";
const OPTIONS_FILE: &str = "freegames.json";
const LEGACY_VERBOSE_FILE: &str = "FreeGames.Verbose.json";

// Field names written by pre-versioned option files.
const LEGACY_FIELD_NAMES: [(&str, &str); 5] = [
    ("VerboseLog", "verbose_log"),
    ("SkipFreeToPlay", "skip_free_to_play"),
    ("SkipDLC", "skip_dlc"),
    ("RecheckIntervalMs", "recheck_interval_ms"),
    ("Blacklist", "blacklist"),
];

pub fn get_data_dir() -> Result<PathBuf, String> {
    fn ensure_dir(path: &PathBuf) -> Result<(), String> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(|e| format!("failed_to_create_data_dir: {}", e))?;
        }
        Ok(())
    }
    if let Ok(env_path) = std::env::var("FREEGAMES_DATA_DIR") {
        if !env_path.trim().is_empty() {
            let data_dir = PathBuf::from(env_path);
            ensure_dir(&data_dir)?;
            return Ok(data_dir);
        }
    }
    if cfg!(test) {
        let data_dir =
            std::env::temp_dir().join(format!(".freegames-test-{}", std::process::id()));
        ensure_dir(&data_dir)?;
        return Ok(data_dir);
    }

    if let Some(home) = dirs::home_dir() {
        let data_dir = home.join(DATA_DIR);
        if ensure_dir(&data_dir).is_ok() {
            return Ok(data_dir);
        }
    }
    let fallback_dir = std::env::temp_dir().join(DATA_DIR);
    ensure_dir(&fallback_dir)?;
    Ok(fallback_dir)
}

fn data_dir() -> AppResult<PathBuf> {
    get_data_dir().map_err(AppError::Config)
}

pub fn load_options() -> AppResult<FreeGamesOptions> {
    load_options_from(&data_dir()?)
}

pub fn load_options_from(dir: &Path) -> AppResult<FreeGamesOptions> {
    let options_path = dir.join(OPTIONS_FILE);

    if !options_path.exists() {
        let options = FreeGamesOptions::new();
        let _ = save_options_to(dir, &options);
        return Ok(options);
    }

    let content = fs::read_to_string(&options_path)
        .map_err(|e| AppError::Config(format!("failed_to_read_options_file: {}", e)))?;
    let mut v: Value = serde_json::from_str(&content)
        .map_err(|e| AppError::Config(format!("failed_to_parse_options_file: {}", e)))?;

    let modified = migrate_options_value(&mut v);
    let options: FreeGamesOptions = serde_json::from_value(v).map_err(|e| {
        AppError::Config(format!("failed_to_convert_options_after_migration: {}", e))
    })?;
    if modified {
        tracing::info!(
            "[Config] Migrated options file to version {}",
            options.version
        );
        let _ = save_options_to(dir, &options);
    }

    Ok(options)
}

/// Rewrites a pre-versioned options object in place. Returns whether anything changed.
fn migrate_options_value(v: &mut Value) -> bool {
    let Some(object) = v.as_object_mut() else {
        return false;
    };
    let version = object.get("version").and_then(Value::as_u64).unwrap_or(0);
    if version >= u64::from(OPTIONS_VERSION) {
        return false;
    }

    for (legacy, current) in LEGACY_FIELD_NAMES {
        if let Some(value) = object.remove(legacy) {
            object.entry(current.to_string()).or_insert(value);
        }
    }
    object.insert("version".to_string(), Value::from(OPTIONS_VERSION));
    true
}

pub fn save_options_to(dir: &Path, options: &FreeGamesOptions) -> AppResult<()> {
    let options_path = dir.join(OPTIONS_FILE);
    let temp_path = dir.join(format!("{}.tmp", OPTIONS_FILE));

    let content = serde_json::to_string_pretty(options)
        .map_err(|e| AppError::Config(format!("failed_to_serialize_options: {}", e)))?;
    fs::create_dir_all(dir)
        .map_err(|e| AppError::Config(format!("failed_to_create_data_dir: {}", e)))?;
    fs::write(&temp_path, content)
        .map_err(|e| AppError::Config(format!("failed_to_write_temp_options_file: {}", e)))?;
    fs::rename(temp_path, options_path)
        .map_err(|e| AppError::Config(format!("failed_to_replace_options_file: {}", e)))
}

/// Pulls the old standalone verbosity flag into `options` when it is unset.
pub fn migrate_legacy_verbose(dir: &Path, options: &mut FreeGamesOptions) -> bool {
    if options.verbose_log.is_some() {
        return false;
    }
    let Ok(content) = fs::read_to_string(dir.join(LEGACY_VERBOSE_FILE)) else {
        return false;
    };
    match serde_json::from_str::<Option<bool>>(&content) {
        Ok(Some(verbose)) => {
            options.verbose_log = Some(verbose);
            true
        }
        Ok(None) => false,
        Err(e) => {
            tracing::debug!("[Config] Ignoring unreadable legacy verbosity flag: {}", e);
            false
        }
    }
}

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn apply_env_overrides(options: &mut FreeGamesOptions) {
    let bool_overrides: [(&str, &mut Option<bool>); 3] = [
        ("FREEGAMES_VERBOSE", &mut options.verbose_log),
        ("FREEGAMES_SKIP_F2P", &mut options.skip_free_to_play),
        ("FREEGAMES_SKIP_DLC", &mut options.skip_dlc),
    ];
    for (key, slot) in bool_overrides {
        if let Ok(raw) = std::env::var(key) {
            match parse_env_bool(&raw) {
                Some(parsed) => {
                    tracing::info!("Using {} from environment: {}", key, parsed);
                    *slot = Some(parsed);
                }
                None => tracing::warn!("Ignoring invalid {} value: {}", key, raw),
            }
        }
    }

    if let Ok(raw) = std::env::var("FREEGAMES_RECHECK_INTERVAL_MS") {
        match raw.trim().parse::<i64>() {
            Ok(parsed) => {
                tracing::info!("Using recheck interval from environment: {}ms", parsed);
                options.recheck_interval_ms = parsed;
            }
            Err(_) => tracing::warn!("Ignoring invalid recheck interval value: {}", raw),
        }
    }
}
