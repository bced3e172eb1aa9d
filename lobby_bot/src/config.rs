use lobby_client::ClientConfig;

use std::collections::HashMap;
use std::{fs::File, io::BufReader, path::Path, path::PathBuf};
use tracing::level_filters::LevelFilter;

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuiltinLogTarget {
    Stdout,
    Stderr,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum LogTarget {
    File { filename: PathBuf },
    Builtin(BuiltinLogTarget),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

#[derive(Clone, Debug, serde::Deserialize)]
pub struct LogEntry {
    pub target: LogTarget,
    #[serde(default)]
    pub modules: Vec<String>,
    pub level: Option<LogLevel>,
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LoggingConfig {
    /// Directory for file targets
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    pub default_level: Option<LogLevel>,
    #[serde(default)]
    pub module_levels: HashMap<String, LogLevel>,
    pub targets: Vec<LogEntry>,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("log")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            default_level: None,
            module_levels: HashMap::new(),
            targets: vec![LogEntry {
                target: LogTarget::Builtin(BuiltinLogTarget::Stdout),
                modules: Vec::new(),
                level: Some(LogLevel::Info),
            }],
        }
    }
}

#[derive(Clone, Debug, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub client: ClientConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Extra triggers, such as `!`, that address a public message to the bot
    #[serde(default)]
    pub command_prefixes: Vec<String>,
}

impl From<LogLevel> for LevelFilter {
    fn from(arg: LogLevel) -> LevelFilter {
        match arg {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

pub fn load_bot_config(filename: impl AsRef<Path>) -> anyhow::Result<BotConfig> {
    let file = File::open(filename)?;
    let reader = BufReader::new(file);
    let config: BotConfig = serde_json::from_reader(reader)?;
    config.client.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_bot_config() {
        let json = r#"{
            "client": {
                "server": { "host": "lobby.springrts.com" },
                "login": { "username": "bot", "password": "pw" },
                "channels": ["main"]
            },
            "logging": {
                "default-level": "debug",
                "module-levels": { "lobby_client::framing": "info" },
                "targets": [
                    { "target": "stderr", "level": "warn" },
                    { "target": { "filename": "bot.log" }, "modules": ["lobby_client"] }
                ]
            },
            "command-prefixes": ["!"]
        }"#;

        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.client.server.port, 8200);
        assert_eq!(config.client.channels, vec!["main".to_string()]);
        assert_eq!(config.command_prefixes, vec!["!".to_string()]);

        let logging = config.logging;
        assert_eq!(logging.dir, PathBuf::from("log"));
        assert_eq!(logging.default_level, Some(LogLevel::Debug));
        assert_eq!(
            logging.module_levels.get("lobby_client::framing"),
            Some(&LogLevel::Info)
        );
        assert!(matches!(
            logging.targets[0].target,
            LogTarget::Builtin(BuiltinLogTarget::Stderr)
        ));
        assert!(matches!(logging.targets[1].target, LogTarget::File { .. }));
        assert_eq!(logging.targets[1].modules, vec!["lobby_client".to_string()]);
    }

    #[test]
    fn logging_defaults_to_stdout() {
        let json = r#"{ "client": { "server": { "host": "localhost", "port": 8201 } } }"#;
        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.logging.targets.len(), 1);
        assert_eq!(config.logging.targets[0].level, Some(LogLevel::Info));
        assert!(config.command_prefixes.is_empty());
    }

    #[test]
    fn example_config_is_valid() {
        let config: BotConfig =
            serde_json::from_str(include_str!("../bot.example.json")).unwrap();
        config.client.validate().unwrap();
        assert_eq!(config.client.timing.pacing_interval_ms, 1500);
        assert_eq!(config.client.timing.ping_timeout_ms, 90_000);
        assert_eq!(config.client.reconnect.max_elapsed_ms, None);
    }

    #[test]
    fn levels_map_to_filters() {
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
        assert_eq!(LevelFilter::from(LogLevel::Off), LevelFilter::OFF);
    }
}
