use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub ai: AiConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct DataConfig {
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub asset_path: String,
}

/// Per-provider generation settings. One instance per backend, immutable for
/// the process lifetime once loaded.
#[derive(Clone, Debug)]
pub struct ProviderSettings {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl ProviderSettings {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .map(|key| !key.expose_secret().trim().is_empty())
            .unwrap_or(false)
    }
}

#[derive(Clone, Debug)]
pub struct AiConfig {
    pub groq: ProviderSettings,
    pub openai: ProviderSettings,
    pub anthropic: ProviderSettings,
    // Present in the configuration surface but not consulted by any request
    // path; kept for compatibility with existing deployments.
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                cors_origins: vec!["*".to_string()],
            },
            data: DataConfig {
                data_dir: PathBuf::from("data"),
                static_dir: PathBuf::from("static"),
                asset_path: "assets".to_string(),
            },
            ai: AiConfig {
                groq: ProviderSettings {
                    api_key: None,
                    model: "llama-3.1-8b-instant".to_string(),
                    temperature: 0.7,
                    max_tokens: 1024,
                    timeout_secs: 30,
                },
                openai: ProviderSettings {
                    api_key: None,
                    model: "gpt-3.5-turbo".to_string(),
                    temperature: 0.7,
                    max_tokens: 1024,
                    timeout_secs: 30,
                },
                anthropic: ProviderSettings {
                    api_key: None,
                    model: "claude-3-sonnet-20240229".to_string(),
                    temperature: 0.7,
                    max_tokens: 1024,
                    timeout_secs: 30,
                },
                cache_enabled: false,
                cache_ttl_secs: 300,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("folio.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(cors_origins) = server.cors_origins {
                self.server.cors_origins = cors_origins;
            }
        }

        if let Some(data) = patch.data {
            if let Some(data_dir) = data.data_dir {
                self.data.data_dir = PathBuf::from(data_dir);
            }
            if let Some(static_dir) = data.static_dir {
                self.data.static_dir = PathBuf::from(static_dir);
            }
            if let Some(asset_path) = data.asset_path {
                self.data.asset_path = asset_path;
            }
        }

        if let Some(ai) = patch.ai {
            if let Some(groq) = ai.groq {
                apply_provider_patch(&mut self.ai.groq, groq);
            }
            if let Some(openai) = ai.openai {
                apply_provider_patch(&mut self.ai.openai, openai);
            }
            if let Some(anthropic) = ai.anthropic {
                apply_provider_patch(&mut self.ai.anthropic, anthropic);
            }
            if let Some(cache_enabled) = ai.cache_enabled {
                self.ai.cache_enabled = cache_enabled;
            }
            if let Some(cache_ttl_secs) = ai.cache_ttl_secs {
                self.ai.cache_ttl_secs = cache_ttl_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("FOLIO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("FOLIO_SERVER_PORT") {
            self.server.port = parse_u16("FOLIO_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("FOLIO_SERVER_CORS_ORIGINS") {
            self.server.cors_origins =
                value.split(',').map(|origin| origin.trim().to_string()).collect();
        }

        if let Some(value) = read_env("FOLIO_DATA_DIR") {
            self.data.data_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("FOLIO_STATIC_DIR") {
            self.data.static_dir = PathBuf::from(value);
        }
        if let Some(value) = read_env("FOLIO_ASSET_PATH") {
            self.data.asset_path = value;
        }

        if let Some(value) = read_env("FOLIO_GROQ_API_KEY") {
            self.ai.groq.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FOLIO_GROQ_MODEL") {
            self.ai.groq.model = value;
        }
        if let Some(value) = read_env("FOLIO_OPENAI_API_KEY") {
            self.ai.openai.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FOLIO_OPENAI_MODEL") {
            self.ai.openai.model = value;
        }
        if let Some(value) = read_env("FOLIO_ANTHROPIC_API_KEY") {
            self.ai.anthropic.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("FOLIO_ANTHROPIC_MODEL") {
            self.ai.anthropic.model = value;
        }
        if let Some(value) = read_env("FOLIO_AI_CACHE_ENABLED") {
            self.ai.cache_enabled = parse_bool("FOLIO_AI_CACHE_ENABLED", &value)?;
        }
        if let Some(value) = read_env("FOLIO_AI_CACHE_TTL_SECS") {
            self.ai.cache_ttl_secs = parse_u64("FOLIO_AI_CACHE_TTL_SECS", &value)?;
        }

        let log_level = read_env("FOLIO_LOGGING_LEVEL").or_else(|| read_env("FOLIO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("FOLIO_LOGGING_FORMAT").or_else(|| read_env("FOLIO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(data_dir) = overrides.data_dir {
            self.data.data_dir = data_dir;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(groq_api_key) = overrides.groq_api_key {
            self.ai.groq.api_key = Some(secret_value(groq_api_key));
        }
        if let Some(openai_api_key) = overrides.openai_api_key {
            self.ai.openai.api_key = Some(secret_value(openai_api_key));
        }
        if let Some(anthropic_api_key) = overrides.anthropic_api_key {
            self.ai.anthropic.api_key = Some(secret_value(anthropic_api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_provider("ai.groq", &self.ai.groq)?;
        validate_provider("ai.openai", &self.ai.openai)?;
        validate_provider("ai.anthropic", &self.ai.anthropic)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_provider_patch(settings: &mut ProviderSettings, patch: ProviderPatch) {
    if let Some(api_key) = patch.api_key {
        settings.api_key = Some(secret_value(api_key));
    }
    if let Some(model) = patch.model {
        settings.model = model;
    }
    if let Some(temperature) = patch.temperature {
        settings.temperature = temperature;
    }
    if let Some(max_tokens) = patch.max_tokens {
        settings.max_tokens = max_tokens;
    }
    if let Some(timeout_secs) = patch.timeout_secs {
        settings.timeout_secs = timeout_secs;
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("folio.toml"), PathBuf::from("config/folio.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    Ok(())
}

fn validate_provider(section: &str, settings: &ProviderSettings) -> Result<(), ConfigError> {
    if settings.model.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{section}.model must not be empty")));
    }

    if !(0.0..=2.0).contains(&settings.temperature) {
        return Err(ConfigError::Validation(format!(
            "{section}.temperature must be in range 0.0..=2.0"
        )));
    }

    if settings.max_tokens == 0 {
        return Err(ConfigError::Validation(format!(
            "{section}.max_tokens must be greater than zero"
        )));
    }

    if settings.timeout_secs == 0 || settings.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "{section}.timeout_secs must be in range 1..=300"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    data: Option<DataPatch>,
    ai: Option<AiPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    cors_origins: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct DataPatch {
    data_dir: Option<String>,
    static_dir: Option<String>,
    asset_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AiPatch {
    groq: Option<ProviderPatch>,
    openai: Option<ProviderPatch>,
    anthropic: Option<ProviderPatch>,
    cache_enabled: Option<bool>,
    cache_ttl_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderPatch {
    api_key: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_validate_without_any_keys() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.ai.groq.has_api_key(), "groq key should default to absent")?;
        ensure(!config.ai.openai.has_api_key(), "openai key should default to absent")?;
        ensure(config.server.port == 8000, "default port should be 8000")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_FOLIO_GROQ_KEY", "gsk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("folio.toml");
            fs::write(
                &path,
                r#"
[ai.groq]
api_key = "${TEST_FOLIO_GROQ_KEY}"
model = "llama-3.1-70b-versatile"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let api_key = config
                .ai
                .groq
                .api_key
                .as_ref()
                .ok_or_else(|| "groq api key should be set".to_string())?;
            ensure(
                api_key.expose_secret() == "gsk-from-env",
                "api key should be loaded from environment",
            )?;
            ensure(
                config.ai.groq.model == "llama-3.1-70b-versatile",
                "model should be loaded from file",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_FOLIO_GROQ_KEY"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FOLIO_OPENAI_MODEL", "gpt-4o-mini");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("folio.toml");
            fs::write(
                &path,
                r#"
[data]
data_dir = "from-file"

[ai.openai]
model = "gpt-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    data_dir: Some("from-override".into()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.data.data_dir == std::path::PathBuf::from("from-override"),
                "override data dir should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.ai.openai.model == "gpt-4o-mini",
                "env model should win over file and defaults",
            )?;
            Ok(())
        })();

        clear_vars(&["FOLIO_OPENAI_MODEL"]);
        result
    }

    #[test]
    fn validation_rejects_out_of_range_temperature() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let mut config = AppConfig::default();
        config.ai.anthropic.temperature = 2.5;

        match config.validate() {
            Ok(_) => Err("expected validation failure for temperature 2.5".to_string()),
            Err(ConfigError::Validation(message)) => {
                ensure(message.contains("ai.anthropic"), "error should name the section")
            }
            Err(other) => Err(format!("unexpected error variant: {other}")),
        }
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("FOLIO_GROQ_API_KEY", "gsk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("gsk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["FOLIO_GROQ_API_KEY"]);
        result
    }

    #[test]
    fn cache_fields_load_but_default_off() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.ai.cache_enabled, "cache should default to disabled")?;
        ensure(config.ai.cache_ttl_secs == 300, "cache ttl default should be 300")
    }
}
