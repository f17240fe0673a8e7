//! Client configuration: embedded defaults merged with an optional user
//! file at `<config dir>/antescofo/config.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_SEND_PORT: u16 = 5678;
const DEFAULT_ASCOGRAPH_PORT: u16 = 6789;

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    network: NetworkConfig,
    #[serde(default)]
    paths: PathsConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

#[derive(Deserialize, Default)]
struct NetworkConfig {
    host: Option<String>,
    send_port: Option<u16>,
    receive_port: Option<u16>,
    ascograph_port: Option<u16>,
}

#[derive(Deserialize, Default)]
struct PathsConfig {
    score_dir: Option<String>,
}

#[derive(Deserialize, Default)]
struct LoggingConfig {
    level: Option<String>,
}

/// Resolved configuration, passed explicitly to
/// [`crate::AntescofoClient::connect`]. There is no process-wide cache.
pub struct Config {
    network: NetworkConfig,
    paths: PathsConfig,
    logging: LoggingConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_network(&mut base.network, user.network);
                            merge_paths(&mut base.paths, user.paths);
                            merge_logging(&mut base.logging, user.logging);
                        }
                        Err(e) => {
                            log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e)
                        }
                    },
                    Err(e) => {
                        log::warn!(target: "config", "could not read config {}: {}", path.display(), e)
                    }
                }
            }
        }

        Config {
            network: base.network,
            paths: base.paths,
            logging: base.logging,
        }
    }

    pub fn host(&self) -> &str {
        self.network.host.as_deref().unwrap_or(DEFAULT_HOST)
    }

    pub fn send_port(&self) -> u16 {
        self.network.send_port.unwrap_or(DEFAULT_SEND_PORT)
    }

    /// Port this side listens on for engine messages. `None` disables
    /// receiving entirely.
    pub fn receive_port(&self) -> Option<u16> {
        self.network.receive_port
    }

    pub fn ascograph_port(&self) -> u16 {
        self.network.ascograph_port.unwrap_or(DEFAULT_ASCOGRAPH_PORT)
    }

    /// Directory searched when a relative score path is loaded.
    pub fn score_dir(&self) -> PathBuf {
        if let Some(dir) = &self.paths.score_dir {
            return PathBuf::from(dir);
        }
        dirs::home_dir()
            .map(|home| home.join("Music").join("antescofo_scores"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn log_level(&self) -> log::LevelFilter {
        self.logging
            .level
            .as_deref()
            .and_then(parse_level)
            .unwrap_or(log::LevelFilter::Info)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("antescofo").join("config.toml"))
}

fn merge_network(base: &mut NetworkConfig, user: NetworkConfig) {
    if user.host.is_some() {
        base.host = user.host;
    }
    if user.send_port.is_some() {
        base.send_port = user.send_port;
    }
    if user.receive_port.is_some() {
        base.receive_port = user.receive_port;
    }
    if user.ascograph_port.is_some() {
        base.ascograph_port = user.ascograph_port;
    }
}

fn merge_paths(base: &mut PathsConfig, user: PathsConfig) {
    if user.score_dir.is_some() {
        base.score_dir = user.score_dir;
    }
}

fn merge_logging(base: &mut LoggingConfig, user: LoggingConfig) {
    if user.level.is_some() {
        base.level = user.level;
    }
}

fn parse_level(s: &str) -> Option<log::LevelFilter> {
    match s.to_lowercase().as_str() {
        "off" => Some(log::LevelFilter::Off),
        "error" => Some(log::LevelFilter::Error),
        "warn" => Some(log::LevelFilter::Warn),
        "info" => Some(log::LevelFilter::Info),
        "debug" => Some(log::LevelFilter::Debug),
        "trace" => Some(log::LevelFilter::Trace),
        _ => None,
    }
}

/// Resolve a score path: absolute paths pass through, relative paths try
/// the current directory, then `score_dir`, else stay as given.
pub fn resolve_score_path(score_dir: &Path, score: &Path) -> PathBuf {
    if score.is_absolute() {
        return score.to_path_buf();
    }
    if score.exists() {
        return score.to_path_buf();
    }
    let candidate = score_dir.join(score);
    if candidate.exists() {
        return candidate;
    }
    score.to_path_buf()
}
