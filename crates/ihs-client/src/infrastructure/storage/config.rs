//! TOML-based configuration persistence for the client application.
//!
//! Reads and writes [`ClientConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\IHSClient\config.toml`
//! - Linux:    `~/.config/ihsclient/config.toml`
//! - macOS:    `~/Library/Application Support/IHSClient/config.toml`
//!
//! Example:
//!
//! ```toml
//! [device]
//! name = "living-room-pc"
//! id = 1234567890123456789
//! secret_key = "5a5a…"          # 32 bytes, hex
//! device_token = "0102030405060708"
//!
//! [network]
//! bind_address = "0.0.0.0:0"
//! host_port = 27036
//! retry_interval_ms = 1000
//!
//! [logging]
//! level = "info"
//! ```
//!
//! # The device identity (for beginners)
//!
//! A host remembers an authorized device by its id and secret key, so both
//! must stay the same across runs.  On first run the `[device]` section has
//! no id, key or token; [`DeviceConfig::provision`] generates random ones
//! and the caller saves the config so later runs reuse them.
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent from the TOML file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ihs_core::domain::{DeviceIdentity, DEVICE_TOKEN_LEN, SECRET_KEY_LEN};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The `[device]` section lacks a field needed to build the identity.
    #[error("device.{0} is not set; run provisioning first")]
    MissingDeviceField(&'static str),

    /// A hex-encoded device field is malformed.
    #[error("device.{field} is invalid: {reason}")]
    InvalidDeviceField { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The persisted device identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Name shown on the host; cut to 63 bytes when sent.
    #[serde(default = "default_device_name")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// 32-byte device secret, hex-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    /// 8-byte device token, hex-encoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_token: Option<String>,
}

/// Socket and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Local address the UDP socket binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Port hosts listen on when the `--host` argument omits one.
    #[serde(default = "default_host_port")]
    pub host_port: u16,
    /// Delay between two authorization requests.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_device_name() -> String {
    "ihs-client".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0:0".to_string()
}
fn default_host_port() -> u16 {
    27036
}
fn default_retry_interval_ms() -> u64 {
    1000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            id: None,
            secret_key: None,
            device_token: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            host_port: default_host_port(),
            retry_interval_ms: default_retry_interval_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl NetworkConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

// ── Device identity ───────────────────────────────────────────────────────────

impl DeviceConfig {
    /// Fills in any missing id, secret key or token with random values.
    ///
    /// Returns `true` if anything changed and the config should be saved.
    pub fn provision(&mut self) -> bool {
        if self.id.is_some() && self.secret_key.is_some() && self.device_token.is_some() {
            return false;
        }
        let fresh = DeviceIdentity::generate(&self.name);
        self.id.get_or_insert(fresh.device_id());
        self.secret_key
            .get_or_insert_with(|| hex::encode(fresh.secret_key()));
        self.device_token
            .get_or_insert_with(|| hex::encode(fresh.device_token()));
        true
    }

    /// Builds the identity the client presents to hosts.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDeviceField`] if a field is unset and
    /// [`ConfigError::InvalidDeviceField`] if a hex field is malformed.
    pub fn to_identity(&self) -> Result<DeviceIdentity, ConfigError> {
        let id = self.id.ok_or(ConfigError::MissingDeviceField("id"))?;
        let secret_key: [u8; SECRET_KEY_LEN] = decode_hex_field("secret_key", &self.secret_key)?;
        let device_token: [u8; DEVICE_TOKEN_LEN] =
            decode_hex_field("device_token", &self.device_token)?;
        Ok(DeviceIdentity::new(id, secret_key, device_token, &self.name))
    }
}

fn decode_hex_field<const N: usize>(
    field: &'static str,
    value: &Option<String>,
) -> Result<[u8; N], ConfigError> {
    let text = value.as_deref().ok_or(ConfigError::MissingDeviceField(field))?;
    let mut out = [0u8; N];
    hex::decode_to_slice(text, &mut out).map_err(|e| ConfigError::InvalidDeviceField {
        field,
        reason: e.to_string(),
    })?;
    Ok(out)
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the default config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `ClientConfig` from `path`, returning `ClientConfig::default()` if
/// the file does not yet exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ClientConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// The file holds the device secret, so on Unix it is written owner-only
/// (`0600`).  The content goes to a sibling temp file first and is renamed
/// into place, which also replaces any looser mode on an existing file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(config: &ClientConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    let tmp_path = path.with_extension("toml.tmp");
    write_private(&tmp_path, content.as_bytes()).map_err(|source| ConfigError::Io {
        path: tmp_path.clone(),
        source,
    })?;
    std::fs::rename(&tmp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp_path);
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    })
}

/// Writes `content` to a file readable only by its owner.
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    // `mode` only applies when the file is created; a stale temp file keeps
    // its old bits.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    }
    file.write_all(content)?;
    file.sync_all()
}

/// Resolves the platform config directory, including the `IHSClient` part.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("IHSClient"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("ihsclient"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("IHSClient")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
