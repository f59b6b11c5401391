use std::{
    fs::{create_dir_all, OpenOptions},
    io::LineWriter,
    path::Path,
    str::FromStr,
};

use env_logger::{Builder, Target};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::{
    config::{Options, LOG_LEVEL, LOG_PATH},
    config_error,
    core::error::ModuleResult,
};

fn default_level() -> String {
    "info".to_string()
}

/// Logger settings, usually read from the `log` options
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// Append records to this file instead of stderr
    #[serde(default)]
    pub path: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            path: None,
        }
    }
}

impl LogConfig {
    pub fn from_options(options: &Options) -> Self {
        Self {
            level: options.get_str(LOG_LEVEL, "info"),
            path: options
                .get(LOG_PATH)
                .and_then(|path| path.as_str().map(str::to_string)),
        }
    }

    pub fn level_filter(&self) -> ModuleResult<LevelFilter> {
        LevelFilter::from_str(&self.level)
            .map_err(|_| config_error!("Invalid log level: {}", self.level))
    }
}

pub struct Logger {
    config: LogConfig,
}

impl Logger {
    pub fn new(config: LogConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Configure an env_logger builder. `RUST_LOG` still applies on top of
    /// the configured level.
    pub fn builder(&self) -> ModuleResult<Builder> {
        let mut builder = Builder::from_env(env_logger::Env::default());
        builder.filter(None, self.config.level_filter()?);

        if let Some(path) = &self.config.path {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    create_dir_all(parent).map_err(|e| {
                        config_error!("Failed to create log directory {}: {}", parent.display(), e)
                    })?;
                }
            }
            let file = OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .map_err(|e| config_error!("Failed to open log file {}: {}", path, e))?;
            builder.target(Target::Pipe(Box::new(LineWriter::new(file))));
        }

        Ok(builder)
    }

    /// Install the logger. Fails if a logger is already installed.
    pub fn init_env_logger(&self) -> ModuleResult<()> {
        self.builder()?
            .try_init()
            .map_err(|e| config_error!("Failed to install logger: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, io::Write};

    use serde_json::json;

    use super::*;

    #[test]
    fn test_config_from_options() {
        let options = Options::new();
        assert_eq!(LogConfig::from_options(&options), LogConfig::default());

        options.set_option(LOG_LEVEL, json!("debug"));
        options.set_option(LOG_PATH, json!("/var/log/app.log"));
        let config = LogConfig::from_options(&options);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);
        assert_eq!(config.path.as_deref(), Some("/var/log/app.log"));
    }

    #[test]
    fn test_config_from_yaml() {
        let config: LogConfig = serde_yaml::from_str("level: warn").unwrap();
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Warn);
        assert!(config.path.is_none());
    }

    #[test]
    fn test_invalid_level() {
        let logger = Logger::new(LogConfig {
            level: "loud".to_string(),
            path: None,
        });
        assert!(logger.builder().is_err());
    }

    #[test]
    fn test_file_target() {
        let dir = std::env::temp_dir().join(format!("ajax-module-log-{}", uuid::Uuid::new_v4()));
        let path = dir.join("app.log");
        let logger = Logger::new(LogConfig {
            level: "info".to_string(),
            path: Some(path.display().to_string()),
        });

        // The builder creates the directory and the file
        logger.builder().unwrap();
        assert!(path.exists());

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "first").unwrap();
        logger.builder().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\n");
    }
}
