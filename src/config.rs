use anyhow::{Context, Result};
use chrono::Weekday;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub calendar: CalendarConfig,
    pub data: DataConfig,
    pub formatting: FormattingConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CalendarConfig {
    /// IANA time zone name. Empty means the system zone.
    pub time_zone: String,
    pub week_start: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DataConfig {
    /// Exported session file. Empty means `~/.snowstats/sessions.json`.
    pub sessions_path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FormattingConfig {
    pub number_comma: bool,
    pub locale: String,
    pub decimal_places: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            calendar: CalendarConfig {
                time_zone: "".to_string(),
                week_start: "mon".to_string(),
            },
            data: DataConfig {
                sessions_path: "".to_string(),
            },
            formatting: FormattingConfig {
                number_comma: false,
                locale: "en".to_string(),
                decimal_places: 1,
            },
        }
    }
}

thread_local! {
    static TEST_CONFIG_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

#[cfg(test)]
pub fn set_test_config_path(path: PathBuf) {
    TEST_CONFIG_PATH.with(|p| *p.borrow_mut() = Some(path));
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(test)]
        {
            if let Some(path) = TEST_CONFIG_PATH.with(|p| p.borrow().clone()) {
                return Ok(path);
            }
        }

        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".snowstats.toml"))
    }

    pub fn load() -> Result<Option<Config>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(Some(config))
    }

    pub fn save(&self, silent: bool) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        if !silent {
            println!("✅ Configuration saved to: {}", config_path.display());
        }

        Ok(())
    }

    /// Resolved session file path: the configured one, or the default under
    /// the home directory.
    pub fn sessions_path(&self) -> Result<PathBuf> {
        if !self.data.sessions_path.trim().is_empty() {
            return Ok(PathBuf::from(self.data.sessions_path.trim()));
        }

        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".snowstats")
            .join("sessions.json"))
    }

    pub fn set_time_zone(&mut self, name: &str) -> Result<()> {
        if !name.is_empty() {
            name.parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Invalid time zone '{name}': {e}"))?;
        }
        self.calendar.time_zone = name.to_string();
        Ok(())
    }

    pub fn set_week_start(&mut self, day: &str) -> Result<()> {
        let weekday = day
            .parse::<Weekday>()
            .map_err(|_| anyhow::anyhow!("Invalid week start '{day}'. Use e.g. 'mon' or 'sun'"))?;
        self.calendar.week_start = weekday.to_string().to_lowercase();
        Ok(())
    }
}

// CLI helper functions
pub fn create_default_config(overwrite: bool) -> Result<()> {
    let config = Config::default();
    if !std::fs::exists(Config::config_path()?)? || overwrite {
        config.save(true)?;

        println!("📝 Created default configuration file.");
        println!("📍 Point it at your exported sessions with:");
        println!("   snowstats config set sessions-path ...");
        println!("or edit");
        println!("   {}", Config::config_path()?.display());
    } else {
        println!("Configuration already exists.  Pass `--overwrite` to overwrite.");
    }

    Ok(())
}

pub fn show_config() -> Result<()> {
    match Config::load()? {
        Some(config) => {
            println!("🔧 Current configuration:");
            println!(
                "   Time Zone: {}",
                if config.calendar.time_zone.is_empty() {
                    "System"
                } else {
                    &config.calendar.time_zone
                }
            );
            println!("   Week Start: {}", config.calendar.week_start);
            println!("   Sessions Path: {}", config.sessions_path()?.display());
            println!("   Number Comma: {}", config.formatting.number_comma);
            println!("   Locale: {}", config.formatting.locale);
            println!("   Decimal Places: {}", config.formatting.decimal_places);
        }
        None => {
            println!("❌ No configuration file found.");
            println!("   Run 'snowstats config init' to create one.");
        }
    }
    Ok(())
}

pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?.unwrap_or_default();

    match key {
        "time-zone" => config.set_time_zone(value)?,
        "week-start" => config.set_week_start(value)?,
        "sessions-path" => {
            config.data.sessions_path = value.to_string();
        }
        "number-comma" => {
            let enabled = value
                .parse::<bool>()
                .context("Invalid boolean value. Use 'true' or 'false'")?;
            config.formatting.number_comma = enabled;
        }
        "locale" => {
            config.formatting.locale = value.to_string();
        }
        "decimal-places" => {
            let places = value.parse::<usize>().context("Invalid number value")?;
            config.formatting.decimal_places = places;
        }
        _ => anyhow::bail!("Unknown config key: {}", key),
    }

    config.save(false)?;
    Ok(())
}
