//! Runtime settings read from the environment.

use crate::models::{Geography, TournamentError};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_ADMIN_TOKEN: &str = "change-me";

#[derive(Clone, Debug)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    /// Shared secret expected in the `X-Admin-Token` header.
    pub admin_token: String,
    /// Optional `community_id,county_id,region_id` CSV loaded at startup.
    pub geography_csv: Option<PathBuf>,
    /// Fixed seed for bracket draws (reproducible brackets).
    pub bracket_seed: Option<u64>,
    /// Period of the automatic progression sweep.
    pub automation_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            admin_token: DEFAULT_ADMIN_TOKEN.to_string(),
            geography_csv: None,
            bracket_seed: None,
            automation_interval: Duration::from_secs(60),
        }
    }
}

impl Settings {
    /// Env: HOST, PORT, ADMIN_TOKEN, GEOGRAPHY_CSV, BRACKET_SEED, AUTOMATION_INTERVAL_SECS.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let admin_token = lookup("ADMIN_TOKEN").filter(|t| !t.is_empty()).unwrap_or_else(|| {
            log::warn!("ADMIN_TOKEN not set, using the default token");
            defaults.admin_token.clone()
        });
        // the sweep timer needs a non-zero period
        let automation_interval = match lookup("AUTOMATION_INTERVAL_SECS").map(|s| s.parse::<u64>()) {
            Some(Ok(secs)) if secs > 0 => Duration::from_secs(secs),
            Some(_) => {
                log::warn!(
                    "AUTOMATION_INTERVAL_SECS must be a positive number of seconds, using {}s",
                    defaults.automation_interval.as_secs()
                );
                defaults.automation_interval
            }
            None => defaults.automation_interval,
        };
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(defaults.port),
            admin_token,
            geography_csv: lookup("GEOGRAPHY_CSV").map(PathBuf::from),
            bracket_seed: lookup("BRACKET_SEED").and_then(|s| s.parse().ok()),
            automation_interval,
        }
    }

    /// Geography from `geography_csv`, or an empty one.
    pub fn load_geography(&self) -> Result<Geography, TournamentError> {
        match &self.geography_csv {
            Some(path) => {
                let file = std::fs::File::open(path).map_err(|e| {
                    TournamentError::Validation(format!("Cannot open {}: {}", path.display(), e))
                })?;
                Geography::from_csv_reader(file)
            }
            None => Ok(Geography::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn reads_values_and_falls_back_to_defaults() {
        let env: HashMap<&str, &str> = [("PORT", "9090"), ("BRACKET_SEED", "17"), ("ADMIN_TOKEN", "s3cret"), ("AUTOMATION_INTERVAL_SECS", "bad")]
            .into_iter()
            .collect();
        let settings = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(settings.port, 9090);
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.bracket_seed, Some(17));
        assert_eq!(settings.admin_token, "s3cret");
        assert_eq!(settings.automation_interval, Duration::from_secs(60));
        assert!(settings.geography_csv.is_none());
    }

    #[test]
    fn zero_automation_interval_falls_back_to_default() {
        let settings = Settings::from_lookup(|k| (k == "AUTOMATION_INTERVAL_SECS").then(|| "0".to_string()));
        assert_eq!(settings.automation_interval, Duration::from_secs(60));
        let settings = Settings::from_lookup(|k| (k == "AUTOMATION_INTERVAL_SECS").then(|| "15".to_string()));
        assert_eq!(settings.automation_interval, Duration::from_secs(15));
    }
}
