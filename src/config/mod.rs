#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::TodogenError;

/// Fallback when the configured key variable is unset.
pub const FALLBACK_API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub ai: AiConfig,
    pub ui: UiConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AiConfig {
    pub model: String,
    pub base_url: String,
    pub api_key_env: String,
    pub temperature: f64,
    /// 0 keeps the HTTP client's own default.
    pub request_timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_owned(),
            base_url: "https://generativelanguage.googleapis.com".to_owned(),
            api_key_env: "API_KEY".to_owned(),
            temperature: 0.7,
            request_timeout_secs: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UiConfig {
    pub icons: bool,
    pub highlight_overdue: bool,
    pub show_hints: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            icons: true,
            highlight_overdue: true,
            show_hints: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub file: String,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: "~/.local/state/todogen/todogen.log".to_owned(),
            level: "info".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_file: PathBuf,
}

pub fn default_paths() -> anyhow::Result<ConfigPaths> {
    let unix = home_config_path_unix();
    if !cfg!(windows) {
        return Ok(ConfigPaths { config_file: unix });
    }

    if unix.exists() {
        return Ok(ConfigPaths { config_file: unix });
    }

    let proj = ProjectDirs::from("com", "todogen", "todogen")
        .context("failed to determine platform config directory")?;
    Ok(ConfigPaths {
        config_file: proj.config_dir().join("config.toml"),
    })
}

fn home_config_path_unix() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("~"));
    home.join(".config").join("todogen").join("config.toml")
}

fn home_dir() -> Option<PathBuf> {
    if let Some(v) = std::env::var_os("HOME") {
        return Some(PathBuf::from(v));
    }
    if let Some(v) = std::env::var_os("USERPROFILE") {
        return Some(PathBuf::from(v));
    }
    let drive = std::env::var_os("HOMEDRIVE");
    let path = std::env::var_os("HOMEPATH");
    match (drive, path) {
        (Some(d), Some(p)) => Some(PathBuf::from(d).join(PathBuf::from(p))),
        _ => None,
    }
}

#[must_use]
pub fn expand_tilde(input: &str) -> String {
    if let Some(rest) = input.strip_prefix("~/")
        && let Some(home) = home_dir()
    {
        return home.join(rest).to_string_lossy().to_string();
    }
    input.to_owned()
}

pub fn expand_path(input: &str) -> anyhow::Result<PathBuf> {
    let expanded = expand_env_vars(&expand_tilde(input));
    let p = PathBuf::from(expanded);
    if p.is_absolute() {
        return Ok(p);
    }
    let cwd = std::env::current_dir().context("failed to get current directory")?;
    Ok(cwd.join(p))
}

fn expand_env_vars(input: &str) -> String {
    // $VAR and ${VAR}; unknown vars stay as written.
    let Ok(re) = regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?") else {
        return input.to_owned();
    };
    re.replace_all(input, |caps: &regex::Captures<'_>| {
        let key = &caps[1];
        std::env::var(key).unwrap_or_else(|_| caps[0].to_owned())
    })
    .to_string()
}

pub fn load() -> anyhow::Result<(Config, ConfigPaths)> {
    let paths = default_paths()?;
    let (_doc, cfg) = load_from_file(&paths.config_file)?;
    cfg.validate()?;
    Ok((cfg, paths))
}

pub fn list_resolved_toml() -> anyhow::Result<String> {
    let (cfg, _paths) = load()?;
    Ok(toml::to_string_pretty(&cfg)?)
}

pub fn get_value_string(key: &str) -> anyhow::Result<Option<String>> {
    let paths = default_paths()?;
    get_value_string_at_path(&paths.config_file, key)
}

pub fn set_value_string(key: &str, value: &str) -> anyhow::Result<()> {
    let paths = default_paths()?;
    set_value_string_at_path(&paths.config_file, key, value)
}

fn load_from_file(path: &Path) -> anyhow::Result<(toml_edit::DocumentMut, Config)> {
    if !path.exists() {
        return Ok((toml_edit::DocumentMut::new(), Config::default()));
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let doc = raw
        .parse::<toml_edit::DocumentMut>()
        .with_context(|| format!("failed to parse TOML in {}", path.display()))?;

    let cfg: Config = toml::from_str(&raw)
        .with_context(|| format!("failed to deserialize TOML in {}", path.display()))?;
    Ok((doc, cfg))
}

pub fn get_value_string_at_path(path: &Path, key: &str) -> anyhow::Result<Option<String>> {
    let (_doc, cfg) = load_from_file(path)?;
    cfg.validate()?;

    let norm = normalize_key(key);
    let value = lookup_value(&cfg, &norm);
    Ok(value.map(format_value_for_stdout))
}

pub fn set_value_string_at_path(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let (mut doc, cfg) = load_from_file(path)?;
    cfg.validate()?;

    let norm_key = normalize_key(key);
    let key_type = key_type(&norm_key).ok_or_else(|| TodogenError::InvalidConfigKey(key.to_owned()))?;
    let item = parse_value(key, value, key_type)?;
    apply_set(&mut doc, &norm_key, item)?;

    // Re-parse so a bad value never reaches disk.
    let new_raw = doc.to_string();
    let new_cfg: Config = toml::from_str(&new_raw)
        .with_context(|| format!("config update produced invalid TOML for {}", path.display()))?;
    new_cfg.validate()?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, new_raw.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    Ok(())
}

impl Config {
    pub fn validate(&self) -> Result<(), TodogenError> {
        if self.ai.model.trim().is_empty() {
            return Err(TodogenError::Config("ai.model must not be empty".to_owned()));
        }
        if !(self.ai.base_url.starts_with("http://") || self.ai.base_url.starts_with("https://")) {
            return Err(TodogenError::Config(
                "ai.base_url must start with http:// or https://".to_owned(),
            ));
        }
        if self.ai.api_key_env.trim().is_empty() {
            return Err(TodogenError::Config(
                "ai.api_key_env must not be empty".to_owned(),
            ));
        }
        if !(0.0..=2.0).contains(&self.ai.temperature) {
            return Err(TodogenError::Config(
                "ai.temperature must be between 0.0 and 2.0".to_owned(),
            ));
        }
        if self.log.file.trim().is_empty() {
            return Err(TodogenError::Config("log.file must not be empty".to_owned()));
        }
        if tracing_subscriber::EnvFilter::try_new(&self.log.level).is_err() {
            return Err(TodogenError::Config(format!(
                "log.level '{}' is not a valid filter",
                self.log.level
            )));
        }
        Ok(())
    }

    /// Reads the API key named by `ai.api_key_env`, then the fallback
    /// variable. A missing key means the session can't start.
    pub fn resolve_api_key(&self) -> Result<String, TodogenError> {
        self.resolve_api_key_with(|name| std::env::var(name).ok())
    }

    fn resolve_api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, TodogenError> {
        [self.ai.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
            .into_iter()
            .filter_map(lookup)
            .map(|v| v.trim().to_owned())
            .find(|v| !v.is_empty())
            .ok_or_else(|| TodogenError::MissingApiKey {
                var: self.ai.api_key_env.clone(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyType {
    Bool,
    Int,
    Float,
    String,
}

fn normalize_key(key: &str) -> String {
    match key {
        "model" => "ai.model",
        "api_key_env" | "ai.key_env" => "ai.api_key_env",
        "temperature" => "ai.temperature",
        "log_level" => "log.level",
        _ => key,
    }
    .to_owned()
}

fn key_type(key: &str) -> Option<KeyType> {
    Some(match key {
        "ai.model" | "ai.base_url" | "ai.api_key_env" | "log.file" | "log.level" => {
            KeyType::String
        }
        "ui.icons" | "ui.highlight_overdue" | "ui.show_hints" => KeyType::Bool,
        "ai.request_timeout_secs" => KeyType::Int,
        "ai.temperature" => KeyType::Float,
        _ => return None,
    })
}

fn parse_value(key: &str, value: &str, key_type: KeyType) -> Result<toml_edit::Item, TodogenError> {
    let invalid = |msg: String| TodogenError::InvalidConfigValue {
        key: key.to_owned(),
        msg,
    };
    Ok(match key_type {
        KeyType::Bool => toml_edit::value(parse_bool(value).map_err(invalid)?),
        KeyType::Int => toml_edit::value(parse_int(value).map_err(invalid)?),
        KeyType::Float => toml_edit::value(parse_float(value).map_err(invalid)?),
        KeyType::String => toml_edit::value(value),
    })
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected true|false, got '{other}'")),
    }
}

fn parse_int(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|e| format!("expected integer, got '{s}': {e}"))
}

fn parse_float(s: &str) -> Result<f64, String> {
    s.trim()
        .parse::<f64>()
        .map_err(|e| format!("expected number, got '{s}': {e}"))
}

fn apply_set(
    doc: &mut toml_edit::DocumentMut,
    key: &str,
    value: toml_edit::Item,
) -> anyhow::Result<()> {
    let parts: Vec<&str> = key.split('.').filter(|p| !p.is_empty()).collect();
    let Some((leaf, tables)) = parts.split_last() else {
        return Err(TodogenError::InvalidConfigKey(key.to_owned()).into());
    };

    let mut cur = doc.as_table_mut();
    for seg in tables {
        if !cur.contains_key(seg) {
            let mut t = toml_edit::Table::new();
            t.set_implicit(true);
            cur.insert(seg, toml_edit::Item::Table(t));
        }
        cur = cur[*seg].as_table_mut().ok_or_else(|| {
            TodogenError::Config(format!("cannot set {key}: '{seg}' is not a table"))
        })?;
    }

    cur.insert(leaf, value);
    Ok(())
}

fn lookup_value(cfg: &Config, key: &str) -> Option<serde_json::Value> {
    let mut v = serde_json::to_value(cfg).ok()?;
    for seg in key.split('.').filter(|s| !s.is_empty()) {
        match v {
            serde_json::Value::Object(mut map) => {
                v = map.remove(seg)?;
            }
            _ => return None,
        }
    }
    Some(v)
}

fn format_value_for_stdout(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::Null => "null".to_owned(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn config_validation_catches_invalid_values() {
        let mut cfg = Config::default();
        cfg.ai.temperature = 3.5;
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.ai.base_url = "generativelanguage.googleapis.com".to_owned();
        assert!(cfg.validate().is_err());

        let mut cfg = Config::default();
        cfg.ai.model = "  ".to_owned();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let cfg: Config = toml::from_str("[ai]\nmodel = \"gemini-2.0-flash\"\n").unwrap();
        assert_eq!(cfg.ai.model, "gemini-2.0-flash");
        assert_eq!(cfg.ai.api_key_env, "API_KEY");
        assert!(cfg.ui.icons);
    }

    #[test]
    fn api_key_prefers_configured_variable() {
        let cfg = Config::default();
        let key = cfg
            .resolve_api_key_with(|name| match name {
                "API_KEY" => Some("primary".to_owned()),
                "GEMINI_API_KEY" => Some("fallback".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(key, "primary");
    }

    #[test]
    fn api_key_falls_back_and_blank_counts_as_missing() {
        let cfg = Config::default();
        let key = cfg
            .resolve_api_key_with(|name| match name {
                "API_KEY" => Some("   ".to_owned()),
                "GEMINI_API_KEY" => Some("fallback".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(key, "fallback");

        let err = cfg.resolve_api_key_with(|_| None).unwrap_err();
        assert!(matches!(err, TodogenError::MissingApiKey { ref var } if var == "API_KEY"));
    }

    #[test]
    fn config_set_and_get_dot_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        set_value_string_at_path(&path, "ui.icons", "false").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "ui.icons")
                .unwrap()
                .as_deref(),
            Some("false")
        );

        set_value_string_at_path(&path, "model", "gemini-2.0-flash").unwrap();
        assert_eq!(
            get_value_string_at_path(&path, "ai.model")
                .unwrap()
                .as_deref(),
            Some("gemini-2.0-flash")
        );

        set_value_string_at_path(&path, "ai.temperature", "0.2").unwrap();
        set_value_string_at_path(&path, "ai.request_timeout_secs", "30").unwrap();

        let (_doc, cfg) = load_from_file(&path).unwrap();
        cfg.validate().unwrap();
        assert!(!cfg.ui.icons);
        assert_eq!(cfg.ai.model, "gemini-2.0-flash");
        assert!((cfg.ai.temperature - 0.2).abs() < f64::EPSILON);
        assert_eq!(cfg.ai.request_timeout_secs, 30);
    }

    #[test]
    fn config_set_rejects_unknown_keys_and_bad_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");

        assert!(set_value_string_at_path(&path, "ai.nope", "x").is_err());
        assert!(set_value_string_at_path(&path, "ui.icons", "yes").is_err());
        assert!(set_value_string_at_path(&path, "ai.temperature", "9").is_err());
        assert!(!path.exists());
    }

    #[test]
    fn expand_tilde_leaves_other_paths_alone() {
        assert_eq!(expand_tilde("/var/log/x.log"), "/var/log/x.log");
        assert_eq!(expand_tilde("relative/x.log"), "relative/x.log");
    }
}
