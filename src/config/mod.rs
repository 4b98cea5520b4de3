//! Configuration management.
//!
//! Settings come from an optional TOML file, then environment variables
//! override individual keys. The CLI layer applies its own flags last.

use chrono::NaiveDate;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default ledger location, relative to the working directory.
pub const DEFAULT_LEDGER_PATH: &str = "uploaded_files.json";

/// First day of the 4K Bing archive.
pub const DEFAULT_BING_EPOCH: (i32, u32, u32) = (2021, 8, 28);

/// Main configuration for frameart.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Path to the upload ledger.
    pub ledger_path: PathBuf,
    /// Output width in pixels.
    pub target_width: u32,
    /// Output height in pixels.
    pub target_height: u32,
    /// JPEG quality for normalized output (1-100).
    pub jpeg_quality: u8,
    /// HTTP client settings.
    pub http: HttpConfig,
    /// Unsplash settings.
    pub unsplash: UnsplashConfig,
    /// Bing archive settings.
    pub bing: BingConfig,
    /// Google Arts & Culture settings.
    pub art: ArtConfig,
    /// Directory for `--debugimage` dumps.
    pub debug_image_dir: PathBuf,
}

/// HTTP client settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            connect_timeout_ms: 5_000,
        }
    }
}

/// Unsplash API settings.
#[derive(Debug, Clone)]
pub struct UnsplashConfig {
    /// Access key (`Client-ID`).
    pub access_key: Option<SecretString>,
    /// API endpoint.
    pub endpoint: String,
}

impl Default for UnsplashConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            endpoint: "https://api.unsplash.com".to_string(),
        }
    }
}

/// Bing wallpaper archive settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BingConfig {
    /// Base URL; images live at `<base>/YYYY-MM-DD.jpg`.
    pub base_url: String,
    /// Earliest date to draw from.
    pub epoch: NaiveDate,
}

impl Default for BingConfig {
    fn default() -> Self {
        let (y, m, d) = DEFAULT_BING_EPOCH;
        Self {
            base_url: "https://bing.npanuhin.me/US/en".to_string(),
            epoch: NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN),
        }
    }
}

/// Google Arts & Culture settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtConfig {
    /// Site root.
    pub base_url: String,
    /// Maximum random-asset attempts.
    pub random_attempts: usize,
}

impl Default for ArtConfig {
    fn default() -> Self {
        Self {
            base_url: "https://artsandculture.google.com".to_string(),
            random_attempts: 5,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Ledger path.
    pub ledger_path: Option<String>,
    /// Output width.
    pub target_width: Option<u32>,
    /// Output height.
    pub target_height: Option<u32>,
    /// JPEG quality.
    pub jpeg_quality: Option<u8>,
    /// Debug dump directory.
    pub debug_image_dir: Option<String>,
    /// HTTP section.
    pub http: Option<ConfigFileHttp>,
    /// Unsplash section.
    pub unsplash: Option<ConfigFileUnsplash>,
    /// Bing section.
    pub bing: Option<ConfigFileBing>,
    /// Arts & Culture section.
    pub art: Option<ConfigFileArt>,
}

/// HTTP section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileHttp {
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

/// Unsplash section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileUnsplash {
    /// Access key.
    pub access_key: Option<String>,
    /// Endpoint override.
    pub endpoint: Option<String>,
}

/// Bing section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileBing {
    /// Base URL override.
    pub base_url: Option<String>,
    /// Earliest date, `YYYY-MM-DD`.
    pub epoch: Option<String>,
}

/// Arts & Culture section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileArt {
    /// Site root override.
    pub base_url: Option<String>,
    /// Random attempts (capped at 5).
    pub random_attempts: Option<usize>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from(DEFAULT_LEDGER_PATH),
            target_width: 3840,
            target_height: 2160,
            jpeg_quality: 90,
            http: HttpConfig::default(),
            unsplash: UnsplashConfig::default(),
            bing: BingConfig::default(),
            art: ArtConfig::default(),
            debug_image_dir: PathBuf::from("."),
        }
    }
}

impl FrameConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::Configuration(format!(
                "cannot read config file {}: {e}",
                path.display()
            )))?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or holds invalid values.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile = toml::from_str(contents)
            .map_err(|e| crate::Error::Configuration(format!("invalid config file: {e}")))?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/frameart/` on macOS)
    /// 2. XDG config dir (`~/.config/frameart/`)
    ///
    /// Returns default configuration if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("frameart").join("config.toml");
        if platform_config.exists() {
            match Self::load_from_file(&platform_config) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %platform_config.display(), "Ignoring config: {e}"),
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("frameart")
            .join("config.toml");
        if xdg_config.exists() {
            match Self::load_from_file(&xdg_config) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(path = %xdg_config.display(), "Ignoring config: {e}"),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `FrameConfig`.
    fn from_config_file(file: ConfigFile) -> crate::Result<Self> {
        let mut config = Self::default();

        if let Some(path) = file.ledger_path {
            config.ledger_path = PathBuf::from(path);
        }
        if let Some(width) = file.target_width {
            config.target_width = width;
        }
        if let Some(height) = file.target_height {
            config.target_height = height;
        }
        if let Some(quality) = file.jpeg_quality {
            config.jpeg_quality = quality.clamp(1, 100);
        }
        if let Some(dir) = file.debug_image_dir {
            config.debug_image_dir = PathBuf::from(dir);
        }
        if let Some(http) = file.http {
            if let Some(v) = http.timeout_ms {
                config.http.timeout_ms = v;
            }
            if let Some(v) = http.connect_timeout_ms {
                config.http.connect_timeout_ms = v;
            }
        }
        if let Some(unsplash) = file.unsplash {
            config.unsplash.access_key = unsplash
                .access_key
                .filter(|k| !k.trim().is_empty())
                .map(SecretString::from);
            if let Some(endpoint) = unsplash.endpoint {
                config.unsplash.endpoint = endpoint;
            }
        }
        if let Some(bing) = file.bing {
            if let Some(base_url) = bing.base_url {
                config.bing.base_url = base_url;
            }
            if let Some(epoch) = bing.epoch {
                config.bing.epoch = NaiveDate::parse_from_str(&epoch, "%Y-%m-%d").map_err(|e| {
                    crate::Error::Configuration(format!("invalid bing.epoch '{epoch}': {e}"))
                })?;
            }
        }
        if let Some(art) = file.art {
            if let Some(base_url) = art.base_url {
                config.art.base_url = base_url;
            }
            if let Some(attempts) = art.random_attempts {
                config.art.random_attempts = attempts.clamp(1, 5);
            }
        }

        if config.target_width == 0 || config.target_height == 0 {
            return Err(crate::Error::Configuration(format!(
                "target resolution must be non-zero, got {}x{}",
                config.target_width, config.target_height
            )));
        }

        Ok(config)
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var("UNSPLASH_ACCESS_KEY") {
            if !key.trim().is_empty() {
                self.unsplash.access_key = Some(SecretString::from(key));
            }
        }
        if let Ok(v) = std::env::var("FRAMEART_HTTP_TIMEOUT_MS") {
            if let Ok(timeout_ms) = v.parse::<u64>() {
                self.http.timeout_ms = timeout_ms;
            }
        }
        if let Ok(path) = std::env::var("FRAMEART_LEDGER_PATH") {
            if !path.trim().is_empty() {
                self.ledger_path = PathBuf::from(path);
            }
        }
        self
    }

    /// Sets the ledger path.
    #[must_use]
    pub fn with_ledger_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ledger_path = path.into();
        self
    }

    /// Sets the Unsplash access key.
    #[must_use]
    pub fn with_unsplash_key(mut self, key: impl Into<String>) -> Self {
        self.unsplash.access_key = Some(SecretString::from(key.into()));
        self
    }
}
