//! Configuration loader using figment.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: `herald.toml`
//! - `yaml-config`: `herald.yaml` / `herald.yml`
//!
//! With both enabled, both formats are searched and merged (YAML last).
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Programmatic merges ([`ConfigLoader::merge`])
//! 3. Profile-specific config file (`herald.{profile}.toml`)
//! 4. Main config file (`herald.toml`)
//! 5. Environment variables (`HERALD_*`)
//!
//! # Environment Variable Mapping
//!
//! `HERALD_` prefix, `__` separates nested keys:
//!
//! - `HERALD_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//! - `HERALD_DISTRIBUTED__AUTO_DISCOVER=true` → `distributed.auto_discover = true`
//!
//! # Example
//!
//! ```rust,ignore
//! use herald_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./config/herald.toml")
//!     .without_env()
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(any(feature = "yaml-config", feature = "toml-config"))]
use figment::providers::Format;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Serialized};
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::HeraldConfig;
use super::validation::validate_config;

/// Configuration profile for environment-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name; `prod` and `dev` are accepted as short forms.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `HERALD_PROFILE`, defaulting to development.
    pub fn from_env() -> Self {
        std::env::var("HERALD_PROFILE")
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    figment: Figment,
    profile: Profile,
    search_paths: Vec<PathBuf>,
    load_env: bool,
    /// Overrides the search when set.
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader searching the current directory and the user config
    /// directory, with environment variables enabled.
    pub fn new() -> Self {
        Self {
            figment: Figment::new(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Profile::parse(&profile.into());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds the current directory to the search paths.
    pub fn with_current_dir(self) -> Self {
        match std::env::current_dir() {
            Ok(cwd) => self.search_path(cwd),
            Err(_) => self,
        }
    }

    /// Adds `<user config dir>/herald` to the search paths.
    pub fn with_user_config_dir(self) -> Self {
        match dirs::config_dir() {
            Some(config_dir) => self.search_path(config_dir.join("herald")),
            None => self,
        }
    }

    /// Loads exactly this file instead of searching.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Merges configuration programmatically, above the built-in defaults.
    pub fn merge(mut self, config: HeraldConfig) -> Self {
        self.figment = self.figment.merge(Serialized::defaults(config));
        self
    }

    /// Loads, validates and returns the configuration.
    pub fn load(self) -> ConfigResult<HeraldConfig> {
        let profile = self.profile.clone();
        let figment = self.build_figment()?;

        let config: HeraldConfig = figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        validate_config(&config)?;

        debug!(
            profile = %profile,
            logging_level = %config.logging.level,
            handlers = config.distributed.handlers.len(),
            auto_discover = config.distributed.auto_discover,
            "Configuration loaded"
        );

        Ok(config)
    }

    fn build_figment(mut self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(HeraldConfig::default()));
        figment = figment.merge(std::mem::take(&mut self.figment));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = Self::merge_config_file(figment, path)?;
        } else {
            let files = self.discover_files();
            if files.is_empty() {
                debug!("No configuration file found, using defaults");
            }
            for path in &files {
                info!(path = %path.display(), "Loading configuration file");
                figment = Self::merge_config_file(figment, path)?;
            }
        }

        if self.load_env {
            trace!("Loading environment variables with HERALD_ prefix");
            figment = figment.merge(Env::prefixed("HERALD_").ignore(&["PROFILE"]).split("__"));
        }

        Ok(figment)
    }

    /// Extensions of the enabled file formats, in merge order.
    const EXTENSIONS: &'static [&'static str] = &[
        #[cfg(feature = "toml-config")]
        "toml",
        #[cfg(feature = "yaml-config")]
        "yaml",
        #[cfg(feature = "yaml-config")]
        "yml",
    ];

    /// Only extensions enabled via feature flags are accepted.
    fn merge_config_file(figment: Figment, path: &Path) -> ConfigResult<Figment> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match ext {
            #[cfg(feature = "toml-config")]
            "toml" => Ok(figment.merge(Toml::file(path))),
            #[cfg(feature = "yaml-config")]
            "yaml" | "yml" => Ok(figment.merge(Yaml::file(path))),
            _ => Err(ConfigError::ParseError(format!(
                "Unsupported or disabled configuration file format: .{ext}"
            ))),
        }
    }

    /// For each extension, the first search path holding `herald.{ext}`
    /// contributes `herald.{profile}.{ext}` (if present) and then the base
    /// file. Lowest precedence first.
    fn discover_files(&self) -> Vec<PathBuf> {
        let search_paths = self.resolve_search_paths();
        let mut files = Vec::new();

        for ext in Self::EXTENSIONS {
            let base_name = format!("herald.{ext}");
            let Some(dir) = search_paths.iter().find(|dir| dir.join(&base_name).is_file()) else {
                continue;
            };
            let profile_file = dir.join(format!("herald.{}.{ext}", self.profile));
            if profile_file.is_file() {
                files.push(profile_file);
            }
            files.push(dir.join(base_name));
        }

        files
    }

    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }
        std::env::current_dir()
            .ok()
            .into_iter()
            .chain(dirs::config_dir().map(|dir| dir.join("herald")))
            .collect()
    }
}

/// Loads configuration from the default locations.
pub fn load_config() -> ConfigResult<HeraldConfig> {
    ConfigLoader::new().load()
}

/// Loads configuration from `path`, with environment overrides.
pub fn load_config_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<HeraldConfig> {
    ConfigLoader::new().file(path).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{LogFormat, LogLevel};
    use figment::Jail;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|_jail| {
            let config = ConfigLoader::new().without_env().load().unwrap();
            assert_eq!(config.logging.level, LogLevel::Info);
            assert!(config.distributed.handlers.is_empty());
            assert!(!config.distributed.auto_discover);
            Ok(())
        });
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!(Profile::parse("prod"), Profile::Production);
        assert_eq!(Profile::parse("Development"), Profile::Development);
        assert_eq!(Profile::parse("staging").as_str(), "staging");
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new()
            .file("/definitely/not/here/herald.toml")
            .load();
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "herald.toml",
                r#"
                [logging]
                level = "debug"
                format = "pretty"

                [logging.filters]
                herald_core = "trace"
                "#,
            )?;
            jail.set_env("HERALD_LOGGING__LEVEL", "warn");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .load()
                .unwrap();
            assert_eq!(config.logging.level, LogLevel::Warn);
            assert_eq!(config.logging.format, LogFormat::Pretty);
            assert_eq!(
                config.logging.filters.get("herald_core"),
                Some(&LogLevel::Trace)
            );
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_profile_file_loaded_under_base() {
        Jail::expect_with(|jail| {
            jail.create_file("herald.toml", "[logging]\nformat = \"full\"\n")?;
            jail.create_file(
                "herald.production.toml",
                "[logging]\nlevel = \"error\"\nformat = \"json\"\n",
            )?;

            let config = ConfigLoader::new()
                .profile("prod")
                .search_path(jail.directory())
                .without_env()
                .load()
                .unwrap();
            assert_eq!(config.logging.level, LogLevel::Error);
            assert_eq!(config.logging.format, LogFormat::Full);
            Ok(())
        });
    }

    #[cfg(all(feature = "toml-config", target_os = "linux"))]
    #[test]
    fn test_user_config_dir_searched_after_cwd() {
        Jail::expect_with(|jail| {
            jail.create_dir("user")?;
            jail.create_dir("user/herald")?;
            jail.create_dir("cwd")?;
            jail.create_file("user/herald/herald.toml", "[logging]\nlevel = \"trace\"\n")?;
            jail.set_env("XDG_CONFIG_HOME", jail.directory().join("user").display());

            let config = ConfigLoader::new()
                .search_path(jail.directory().join("cwd"))
                .with_user_config_dir()
                .without_env()
                .load()
                .unwrap();
            assert_eq!(config.logging.level, LogLevel::Trace);

            jail.create_file("cwd/herald.toml", "[logging]\nlevel = \"warn\"\n")?;
            let config = ConfigLoader::new()
                .search_path(jail.directory().join("cwd"))
                .with_user_config_dir()
                .without_env()
                .load()
                .unwrap();
            assert_eq!(config.logging.level, LogLevel::Warn);
            Ok(())
        });
    }

    #[cfg(feature = "toml-config")]
    #[test]
    fn test_unknown_handler_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("herald.toml", "[distributed]\nhandlers = [\"ghost\"]\n")?;

            let result = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load();
            assert!(matches!(result, Err(ConfigError::UnknownHandler(name)) if name == "ghost"));
            Ok(())
        });
    }
}
