//! # Configuration Management
//!
//! This module handles loading and managing application configuration from
//! multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! The recognition settings (encoding, sample rate, language) live here
//! instead of being process-wide constants so that handlers receive them as
//! an explicit value and tests can inject alternate configs.
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Environment variables (APP_SERVER_HOST, GOOGLE_API_KEY, etc.)
//! 2. Configuration file (config.toml)
//! 3. Default values (defined in the Default impl)

use anyhow::Result;              // Better error handling with context
use serde::{Deserialize, Serialize};  // For converting to/from TOML, JSON, etc.
use std::env;                    // For reading environment variables
use std::path::PathBuf;

/// Main application configuration that contains all settings.
///
/// ## Why separate config structs:
/// Breaking configuration into logical groups (server, recognition, upload)
/// makes it easier to understand and maintain as the application grows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub recognition: RecognitionConfig,
    pub upload: UploadConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
/// - `port = 8080`: Common development port (production often uses 80 or 443)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Settings for the external speech-recognition service.
///
/// ## Fields:
/// - `endpoint`: Base URL of the recognition API (overridable so tests can
///   point at a local stub)
/// - `api_key`: Optional API key sent as a query parameter (`GOOGLE_API_KEY`)
/// - `encoding`: Audio encoding label sent with every request ("LINEAR16")
/// - `sample_rate_hertz`: Sample rate the service should assume (41000)
/// - `language_code`: BCP-47 language tag for transcription ("en-US")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub encoding: String,
    pub sample_rate_hertz: u32,
    pub language_code: String,
}

/// Settings for the scratch storage used while an upload is in flight.
///
/// ## Fields:
/// - `scratch_dir`: Directory that holds per-request scratch files; each
///   request gets a unique file name, so concurrent uploads never collide
/// - `max_upload_bytes`: Hard cap on a single uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    pub scratch_dir: String,
    pub max_upload_bytes: usize,
}

impl UploadConfig {
    /// The scratch directory as a path.
    pub fn scratch_path(&self) -> PathBuf {
        PathBuf::from(&self.scratch_dir)
    }
}

/// Provides default configuration values.
///
/// ## Why defaults matter:
/// Default values ensure the application can start even if no configuration
/// file exists. They also serve as documentation of reasonable starting values.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),  // Localhost only (safe for development)
                port: 8080,                     // Common development port
            },
            recognition: RecognitionConfig {
                endpoint: "https://speech.googleapis.com".to_string(),
                api_key: None,                       // Usually injected via GOOGLE_API_KEY
                encoding: "LINEAR16".to_string(),    // 16-bit PCM
                sample_rate_hertz: 41000,
                language_code: "en-US".to_string(),
            },
            upload: UploadConfig {
                // Platform temp dir; on some hosts this is an in-memory
                // filesystem, so uploads must fit in instance memory.
                scratch_dir: env::temp_dir().to_string_lossy().into_owned(),
                max_upload_bytes: 50 * 1024 * 1024,  // 50MB
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST, PORT and GOOGLE_API_KEY
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER_HOST=0.0.0.0`: Override server host
    /// - `APP_RECOGNITION_ENDPOINT=http://localhost:9090`: Override API endpoint
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    /// - `GOOGLE_API_KEY=...`: Credential for the recognition service
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            // 1. Start with defaults - converts our Default impl to config format
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // 2. Load from config.toml file (if it exists) - required(false) means "don't error if missing"
            .add_source(config::File::with_name("config").required(false))
            // 3. Load from environment variables with APP_ prefix
            // Example: APP_SERVER_HOST becomes server.host in the config
            .add_source(config::Environment::with_prefix("APP").separator("_"));

        // Handle special environment variables used by deployment platforms
        // These don't follow the APP_ prefix convention but are commonly used
        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        // The recognition credential follows the Google SDK convention
        if let Ok(key) = env::var("GOOGLE_API_KEY") {
            settings = settings.set_override("recognition.api_key", key)?;
        }

        // Build the final configuration and convert it back to our AppConfig struct
        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## Why validate:
    /// Catching configuration errors early prevents runtime failures and
    /// provides clear error messages about what's wrong.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.recognition.endpoint.is_empty() {
            return Err(anyhow::anyhow!("Recognition endpoint cannot be empty"));
        }

        if self.recognition.encoding.is_empty() {
            return Err(anyhow::anyhow!("Recognition encoding cannot be empty"));
        }

        if self.recognition.sample_rate_hertz == 0 {
            return Err(anyhow::anyhow!("Sample rate must be greater than 0"));
        }

        if self.recognition.language_code.is_empty() {
            return Err(anyhow::anyhow!("Language code cannot be empty"));
        }

        if self.upload.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Max upload size must be greater than 0"));
        }

        Ok(())  // All validation passed
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// ## Partial updates:
    /// This method allows updating only some fields, not the entire
    /// configuration. For example, you can send just
    /// `{"recognition": {"language_code": "en-GB"}}` to change only the language.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        // Parse the JSON string into a generic value
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;

        // Update server configuration if provided
        if let Some(server) = partial_config.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                self.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                self.server.port = port as u16;
            }
        }

        // Update recognition configuration if provided
        if let Some(recognition) = partial_config.get("recognition") {
            if let Some(endpoint) = recognition.get("endpoint").and_then(|v| v.as_str()) {
                self.recognition.endpoint = endpoint.to_string();
            }
            if let Some(key) = recognition.get("api_key").and_then(|v| v.as_str()) {
                self.recognition.api_key = Some(key.to_string());
            }
            if let Some(encoding) = recognition.get("encoding").and_then(|v| v.as_str()) {
                self.recognition.encoding = encoding.to_string();
            }
            if let Some(rate) = recognition.get("sample_rate_hertz").and_then(|v| v.as_u64()) {
                self.recognition.sample_rate_hertz = rate as u32;
            }
            if let Some(language) = recognition.get("language_code").and_then(|v| v.as_str()) {
                self.recognition.language_code = language.to_string();
            }
        }

        // Update upload configuration if provided
        if let Some(upload) = partial_config.get("upload") {
            if let Some(dir) = upload.get("scratch_dir").and_then(|v| v.as_str()) {
                self.upload.scratch_dir = dir.to_string();
            }
            if let Some(max) = upload.get("max_upload_bytes").and_then(|v| v.as_u64()) {
                self.upload.max_upload_bytes = max as usize;
            }
        }

        // Validate the updated configuration to ensure it's still valid
        self.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test that the default configuration is valid and has expected values.
    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.recognition.encoding, "LINEAR16");
        assert_eq!(config.recognition.sample_rate_hertz, 41000);
        assert_eq!(config.recognition.language_code, "en-US");
        // Ensure the default config passes validation
        assert!(config.validate().is_ok());
    }

    /// Test that validation catches invalid configurations.
    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;  // Invalid port
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.recognition.language_code.clear();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.upload.max_upload_bytes = 0;
        assert!(config.validate().is_err());
    }

    /// Test that runtime configuration updates work correctly.
    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"recognition": {"language_code": "en-GB", "sample_rate_hertz": 16000}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.recognition.language_code, "en-GB");
        assert_eq!(config.recognition.sample_rate_hertz, 16000);
        // Other fields should remain unchanged
        assert_eq!(config.recognition.encoding, "LINEAR16");
        assert_eq!(config.server.host, "127.0.0.1");
    }

    /// Test that an update failing validation is rejected.
    #[test]
    fn test_config_update_rejects_invalid() {
        let mut config = AppConfig::default();
        let json = r#"{"server": {"port": 0}}"#;
        assert!(config.update_from_json(json).is_err());
    }
}
