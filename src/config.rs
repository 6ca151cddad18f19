//! Runtime settings.
//!
//! Layered lowest to highest: built-in defaults, a TOML file, `HOTSPOT_*`
//! environment variables, then command-line flags.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;
use url::Url;

use crate::filters::{MAX_PAGE_SIZE, MIN_PAGE_SIZE};

const DEFAULT_CONFIG_FILE: &str = "hotspot.toml";

/// Terminal client for the hot-articles service.
#[derive(Parser, Debug, Default)]
#[command(version, about)]
pub struct Cli {
    /// Base URL of the REST API, including the `/api` prefix.
    #[arg(long)]
    pub api_base: Option<String>,
    /// Articles per page.
    #[arg(long)]
    pub page_size: Option<u32>,
    /// TOML settings file (defaults to ./hotspot.toml when present).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Where to write the log; the terminal itself is taken by the UI.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base: String,
    pub page_size: u32,
    pub debounce_ms: u64,
    pub request_timeout_secs: Option<u64>,
    pub log_file: PathBuf,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:5173/api".into(),
            page_size: 20,
            debounce_ms: 300,
            request_timeout_secs: None,
            log_file: std::env::temp_dir().join("hotspot-tui.log"),
            log_filter: "info".into(),
        }
    }
}

impl Settings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

pub fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => read_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => read_file(Path::new(DEFAULT_CONFIG_FILE))?,
        None => Settings::default(),
    };

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    apply_cli(&mut settings, cli);
    validate(settings)
}

fn read_file(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("invalid config file '{}'", path.display()))
}

fn apply_env(
    settings: &mut Settings,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = var("HOTSPOT_API_BASE") {
        settings.api_base = v;
    }
    if let Some(v) = var("HOTSPOT_PAGE_SIZE") {
        settings.page_size = v
            .trim()
            .parse()
            .with_context(|| format!("HOTSPOT_PAGE_SIZE is not a number: '{v}'"))?;
    }
    if let Some(v) = var("HOTSPOT_DEBOUNCE_MS") {
        settings.debounce_ms = v
            .trim()
            .parse()
            .with_context(|| format!("HOTSPOT_DEBOUNCE_MS is not a number: '{v}'"))?;
    }
    if let Some(v) = var("HOTSPOT_REQUEST_TIMEOUT_SECS") {
        let secs = v
            .trim()
            .parse()
            .with_context(|| format!("HOTSPOT_REQUEST_TIMEOUT_SECS is not a number: '{v}'"))?;
        settings.request_timeout_secs = Some(secs);
    }
    if let Some(v) = var("HOTSPOT_LOG_FILE") {
        settings.log_file = PathBuf::from(v);
    }
    if let Some(v) = var("HOTSPOT_LOG") {
        settings.log_filter = v;
    }
    Ok(())
}

fn apply_cli(settings: &mut Settings, cli: &Cli) {
    if let Some(v) = &cli.api_base {
        settings.api_base = v.clone();
    }
    if let Some(v) = cli.page_size {
        settings.page_size = v;
    }
    if let Some(v) = &cli.log_file {
        settings.log_file = v.clone();
    }
}

fn validate(mut settings: Settings) -> anyhow::Result<Settings> {
    let api_base = settings.api_base.trim();
    let url = Url::parse(api_base).with_context(|| format!("invalid api_base '{api_base}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("api_base must be an http(s) URL, got '{api_base}'");
    }
    settings.api_base = api_base.trim_end_matches('/').to_string();
    settings.page_size = settings.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn toml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_are_valid() {
        let settings = validate(Settings::default()).unwrap();
        assert_eq!(settings.api_base, "http://127.0.0.1:5173/api");
        assert_eq!(settings.page_size, 20);
        assert_eq!(settings.debounce(), Duration::from_millis(300));
        assert_eq!(settings.request_timeout(), None);
    }

    #[test]
    fn file_fills_missing_fields_with_defaults() {
        let file = toml_file("api_base = \"https://news.example/api\"\npage_size = 50\n");
        let settings = read_file(file.path()).unwrap();
        assert_eq!(settings.api_base, "https://news.example/api");
        assert_eq!(settings.page_size, 50);
        assert_eq!(settings.debounce_ms, 300);
        assert_eq!(settings.log_filter, "info");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here/hotspot.toml")),
            ..Cli::default()
        };
        let err = load_settings(&cli).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn env_overrides_file_and_cli_overrides_env() {
        let file = toml_file("api_base = \"http://file/api\"\npage_size = 30\n");
        let mut settings = read_file(file.path()).unwrap();

        apply_env(
            &mut settings,
            env(&[
                ("HOTSPOT_API_BASE", "http://env/api"),
                ("HOTSPOT_PAGE_SIZE", "40"),
                ("HOTSPOT_REQUEST_TIMEOUT_SECS", "15"),
                ("HOTSPOT_LOG", "hotspot_tui=debug"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.api_base, "http://env/api");
        assert_eq!(settings.page_size, 40);
        assert_eq!(settings.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(settings.log_filter, "hotspot_tui=debug");

        let cli = Cli {
            api_base: Some("http://cli/api/".into()),
            ..Cli::default()
        };
        apply_cli(&mut settings, &cli);
        let settings = validate(settings).unwrap();
        assert_eq!(settings.api_base, "http://cli/api");
        assert_eq!(settings.page_size, 40);
    }

    #[test]
    fn bad_env_number_is_reported() {
        let mut settings = Settings::default();
        let err = apply_env(&mut settings, env(&[("HOTSPOT_PAGE_SIZE", "lots")])).unwrap_err();
        assert!(err.to_string().contains("HOTSPOT_PAGE_SIZE"));
    }

    #[test]
    fn api_base_must_be_http() {
        for bad in ["not a url", "ftp://host/api", "/api"] {
            let settings = Settings {
                api_base: bad.into(),
                ..Settings::default()
            };
            assert!(validate(settings).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn page_size_is_clamped() {
        let settings = Settings {
            page_size: 1000,
            ..Settings::default()
        };
        assert_eq!(validate(settings).unwrap().page_size, MAX_PAGE_SIZE);
    }
}
