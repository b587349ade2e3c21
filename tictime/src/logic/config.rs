use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Server tuning knobs for the broadcast loop and sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Ticker period in milliseconds (default: 500)
    pub tick_ms: u64,
    /// strftime pattern used to render each tick (default: `%X`)
    pub time_format: String,
    /// Login session lifetime in hours (default: 24)
    pub session_hours: i64,
    /// Ticks buffered per group member before it starts skipping (default: 16)
    pub channel_capacity: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            tick_ms: 500,
            time_format: "%X".to_string(),
            session_hours: 24,
            channel_capacity: 16,
        }
    }
}

/// Per-field overrides coming from the command line
#[derive(Debug, Default, Clone)]
pub struct ServeOverrides {
    pub tick_ms: Option<u64>,
    pub time_format: Option<String>,
    pub session_hours: Option<i64>,
}

impl ServeConfig {
    /// Load a TOML file; missing keys fall back to defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let expanded = shellexpand::tilde(&path.as_ref().to_string_lossy()).into_owned();
        let text = std::fs::read_to_string(&expanded)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {}", expanded, e))?;
        let config: ServeConfig = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Layer environment variables and then CLI flags on top of `self`
    pub fn with_env_and_args(mut self, args: ServeOverrides) -> anyhow::Result<Self> {
        if let Ok(val) = std::env::var("TICTIME_TICK_MS") {
            if let Ok(parsed) = val.parse() {
                self.tick_ms = parsed;
            }
        }
        if let Ok(val) = std::env::var("TICTIME_TIME_FORMAT") {
            self.time_format = val;
        }
        if let Ok(val) = std::env::var("TICTIME_SESSION_HOURS") {
            if let Ok(parsed) = val.parse() {
                self.session_hours = parsed;
            }
        }

        // Command line arguments have the highest priority
        if let Some(val) = args.tick_ms {
            self.tick_ms = val;
        }
        if let Some(val) = args.time_format {
            self.time_format = val;
        }
        if let Some(val) = args.session_hours {
            self.session_hours = val;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_ms == 0 {
            anyhow::bail!("tick_ms must be greater than zero");
        }
        if self.session_hours <= 0 {
            anyhow::bail!("session_hours must be greater than zero");
        }
        if self.channel_capacity == 0 {
            anyhow::bail!("channel_capacity must be greater than zero");
        }
        if self.time_format.trim().is_empty() {
            anyhow::bail!("time_format must not be empty");
        }
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            anyhow::bail!("time_format {:?} is not a valid strftime pattern", self.time_format);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ServeConfig = toml::from_str("tick_ms = 1000").unwrap();
        assert_eq!(config.tick_ms, 1000);
        assert_eq!(config.time_format, "%X");
        assert_eq!(config.session_hours, 24);
    }

    #[test]
    fn flags_override_file_values() {
        let base = ServeConfig {
            tick_ms: 2000,
            ..ServeConfig::default()
        };
        let config = base
            .with_env_and_args(ServeOverrides {
                tick_ms: Some(250),
                time_format: Some("%H:%M".into()),
                session_hours: None,
            })
            .unwrap();
        assert_eq!(config.tick_ms, 250);
        assert_eq!(config.time_format, "%H:%M");
    }

    #[test]
    fn zero_tick_is_rejected() {
        let config = ServeConfig {
            tick_ms: 0,
            ..ServeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_strftime_specifier_is_rejected() {
        let err = ServeConfig::default()
            .with_env_and_args(ServeOverrides {
                time_format: Some("%Q".into()),
                ..ServeOverrides::default()
            })
            .unwrap_err();
        assert!(err.to_string().contains("strftime"));

        let ok = ServeConfig {
            time_format: "%Y-%m-%d %H:%M:%S".into(),
            ..ServeConfig::default()
        };
        assert!(ok.validate().is_ok());
    }
}
