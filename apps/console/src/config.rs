use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use session_core::SessionConfig;
use tracing::warn;

pub const DEFAULT_ENGINE_URL: &str = "https://prolog-api-server-1.onrender.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub engine_url: String,
    pub pulse_interval_ms: u64,
    /// Zero or absent leaves engine calls unbounded.
    pub request_timeout_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine_url: DEFAULT_ENGINE_URL.into(),
            pulse_interval_ms: 500,
            request_timeout_ms: None,
        }
    }
}

impl Settings {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            pulse_interval: Duration::from_millis(self.pulse_interval_ms.max(1)),
            request_timeout: self
                .request_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            ..SessionConfig::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    engine_url: Option<String>,
    pulse_interval_ms: Option<u64>,
    request_timeout_ms: Option<u64>,
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(path) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<FileSettings>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(error = %err, "ignoring unreadable console settings file");
            return;
        }
    };
    if let Some(v) = file_cfg.engine_url {
        settings.engine_url = v;
    }
    if let Some(v) = file_cfg.pulse_interval_ms {
        settings.pulse_interval_ms = v;
    }
    if let Some(v) = file_cfg.request_timeout_ms {
        settings.request_timeout_ms = Some(v);
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("ENGINE_URL") {
        settings.engine_url = v;
    }
    if let Some(v) = lookup("APP__ENGINE_URL") {
        settings.engine_url = v;
    }

    if let Some(v) = lookup("APP__PULSE_INTERVAL_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.pulse_interval_ms = parsed;
        }
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_MS") {
        if let Ok(parsed) = v.parse::<u64>() {
            settings.request_timeout_ms = Some(parsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_leave_requests_unbounded() {
        let settings = Settings::default();
        let config = settings.session_config();
        assert_eq!(settings.engine_url, DEFAULT_ENGINE_URL);
        assert_eq!(config.pulse_interval, Duration::from_millis(500));
        assert_eq!(config.request_timeout, None);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut settings = Settings::default();
        apply_file(
            &mut settings,
            "engine_url = \"http://127.0.0.1:9000\"\nrequest_timeout_ms = 15000\n",
        );
        assert_eq!(settings.engine_url, "http://127.0.0.1:9000");
        assert_eq!(settings.pulse_interval_ms, 500);
        assert_eq!(
            settings.session_config().request_timeout,
            Some(Duration::from_secs(15))
        );
    }

    #[test]
    fn unreadable_file_is_ignored() {
        let mut settings = Settings::default();
        apply_file(&mut settings, "engine_url = [");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn prefixed_env_wins_over_plain_env() {
        let mut settings = Settings::default();
        apply_env(
            &mut settings,
            env(&[
                ("ENGINE_URL", "http://plain"),
                ("APP__ENGINE_URL", "http://prefixed"),
                ("APP__PULSE_INTERVAL_MS", "250"),
            ]),
        );
        assert_eq!(settings.engine_url, "http://prefixed");
        assert_eq!(settings.pulse_interval_ms, 250);
    }

    #[test]
    fn invalid_numbers_and_zero_timeout_are_ignored() {
        let mut settings = Settings::default();
        apply_env(
            &mut settings,
            env(&[
                ("APP__PULSE_INTERVAL_MS", "fast"),
                ("APP__REQUEST_TIMEOUT_MS", "0"),
            ]),
        );
        assert_eq!(settings.pulse_interval_ms, 500);
        assert_eq!(settings.request_timeout_ms, Some(0));
        assert_eq!(settings.session_config().request_timeout, None);
    }
}
