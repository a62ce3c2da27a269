use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use tracing::warn;

const CACHE_DIR: &str = "matchday";
pub const DEFAULT_SEASON: i32 = 2025;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub default_season: i32,
    /// Fixed simulation seed; fresh entropy per request when unset.
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: None,
            db_path: None,
            default_season: DEFAULT_SEASON,
            seed: None,
        }
    }
}

/// Loads `.env.local` then `.env`; variables already set in the process win.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

impl Settings {
    /// Reads `.env.local`, `.env`, then the process environment.
    pub fn from_env() -> Self {
        load_dotenv();

        Self {
            model_path: env_path("MATCHDAY_MODEL_PATH"),
            db_path: env_path("MATCHDAY_DB_PATH"),
            default_season: env_parse("MATCHDAY_DEFAULT_SEASON").unwrap_or(DEFAULT_SEASON),
            seed: env_parse("MATCHDAY_SEED"),
        }
    }

    /// Applies `--model`, `--db`, `--season` and `--seed` flags over the env values.
    /// A flag whose value does not parse is an error, never a silent fallback.
    pub fn apply_args(mut self, args: &[String]) -> Result<Self> {
        if let Some(path) = flag_value(args, "--model") {
            self.model_path = Some(PathBuf::from(path));
        }
        if let Some(path) = flag_value(args, "--db") {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(season) = parse_flag(args, "--season")? {
            self.default_season = season;
        }
        if let Some(seed) = parse_flag(args, "--seed")? {
            self.seed = Some(seed);
        }
        Ok(self)
    }
}

fn parse_flag<T: FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    match flag_value(args, flag) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow!("invalid value for {flag}: {raw:?}")),
        None => Ok(None),
    }
}

/// Supports both `--flag=value` and `--flag value`.
pub fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
            && !next.starts_with("--")
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = env::var("XDG_CACHE_HOME")
        && !base.trim().is_empty()
    {
        return Some(PathBuf::from(base).join(CACHE_DIR));
    }
    let home = env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<T>() {
        Ok(val) => Some(val),
        Err(_) => {
            warn!(key, value = trimmed, "ignoring unparseable environment value");
            None
        }
    }
}
