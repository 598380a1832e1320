//! Instrument universe file.
//!
//! ```toml
//! data_dir = "data/daily"
//! symbols = ["US500", "NAS100", "GER40", "XAUUSD"]
//! start = "2019-01-01"
//! end = "2024-12-31"
//! ```

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UniverseConfig {
    pub symbols: Vec<String>,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Inclusive first date, `YYYY-MM-DD`.
    pub start: Option<String>,
    /// Inclusive last date, `YYYY-MM-DD`.
    pub end: Option<String>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

impl UniverseConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read universe file {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid universe file {:?}", path))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: UniverseConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.symbols.is_empty() {
            bail!("symbols must not be empty");
        }
        let mut seen = HashSet::new();
        for symbol in &self.symbols {
            if !seen.insert(symbol.as_str()) {
                bail!("duplicate symbol {}", symbol);
            }
        }
        let (start, end) = (self.start_datetime()?, self.end_datetime()?);
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                bail!("start {} is after end {}", start, end);
            }
        }
        Ok(())
    }

    pub fn start_datetime(&self) -> Result<Option<DateTime<Utc>>> {
        parse_day(self.start.as_deref(), false)
    }

    /// End of the `end` day, so bars stamped on that date are included.
    pub fn end_datetime(&self) -> Result<Option<DateTime<Utc>>> {
        parse_day(self.end.as_deref(), true)
    }
}

fn parse_day(raw: Option<&str>, end_of_day: bool) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", raw))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    Ok(time.map(|t| t.and_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_file() {
        let config = UniverseConfig::from_toml_str(
            r#"
            data_dir = "prices"
            symbols = ["US500", "GER40"]
            start = "2020-01-01"
            end = "2020-12-31"
            "#,
        )
        .unwrap();

        assert_eq!(config.data_dir, PathBuf::from("prices"));
        assert_eq!(config.symbols, vec!["US500", "GER40"]);
        let start = config.start_datetime().unwrap().unwrap();
        let end = config.end_datetime().unwrap().unwrap();
        assert_eq!(start.timestamp(), 1_577_836_800);
        assert_eq!(end.timestamp() - 1_609_372_800, 86_399);
    }

    #[test]
    fn test_defaults_and_validation() {
        let config = UniverseConfig::from_toml_str(r#"symbols = ["X"]"#).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert!(config.start_datetime().unwrap().is_none());

        assert!(UniverseConfig::from_toml_str("symbols = []").is_err());
        assert!(UniverseConfig::from_toml_str(r#"symbols = ["X", "X"]"#).is_err());
        assert!(
            UniverseConfig::from_toml_str(
                r#"symbols = ["X"]
                start = "2021-01-01"
                end = "2020-01-01""#
            )
            .is_err()
        );
        assert!(
            UniverseConfig::from_toml_str(
                r#"symbols = ["X"]
                start = "01/02/2020""#
            )
            .is_err()
        );
    }
}
