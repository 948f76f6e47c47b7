//! Configuration module for the voicebridge gateway.
//!
//! Configuration is loaded from environment variables, with a `.env` file
//! picked up by `dotenvy` before the server starts. Collaborator settings
//! (Supabase, analytics webhooks) are optional: when absent the gateway
//! still bridges calls and logs a startup warning.
//!
//! # Example
//! ```rust,no_run
//! use voicebridge_gateway::config::ServerConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::from_env()?;
//! println!("Server listening on {}", config.address());
//! # Ok(())
//! # }
//! ```

use std::env;

use thiserror::Error;

mod tenant;

pub use tenant::{FieldKind, FieldSpec, TenantProfile};

/// Errors produced while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is missing
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A variable is present but unparseable
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Why the value was rejected
        reason: String,
    },
}

/// Default bound on frames buffered while the AI connection handshake is
/// still pending. Frames beyond the bound are dropped with a warning.
pub const DEFAULT_PENDING_FRAME_LIMIT: usize = 64;

/// Server configuration.
///
/// Contains everything needed to run the gateway:
/// - Server settings (host, port)
/// - OpenAI Realtime settings (API key, model, voice, VAD thresholds)
/// - Tenant profile selection
/// - Structured-record store (Supabase) settings
/// - Analytics webhook endpoints
#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Server settings
    pub host: String,
    pub port: u16,

    /// OpenAI API key for the Realtime API
    pub openai_api_key: String,
    /// Realtime model identifier
    pub realtime_model: String,
    /// Voice for audio output
    pub realtime_voice: String,
    /// Server VAD activation threshold (0.0 to 1.0)
    pub vad_threshold: f32,
    /// Audio included before detected speech (ms)
    pub vad_prefix_padding_ms: u32,
    /// Silence duration that ends a turn (ms)
    pub vad_silence_duration_ms: u32,

    /// Which tenant profile drives instructions / tool schema / table
    pub tenant: TenantProfile,

    /// Supabase project URL (e.g. `https://xyz.supabase.co`)
    pub supabase_url: Option<String>,
    /// Supabase service-role key
    pub supabase_service_key: Option<String>,

    /// Webhook receiving every call-outcome summary
    pub call_data_webhook: Option<String>,
    /// Webhook receiving the enriched payload when a record was collected
    pub record_webhook: Option<String>,

    /// Bound on frames buffered during the AI connection handshake
    pub pending_frame_limit: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("PORT", 3002u16)?;

        let openai_api_key =
            env::var("OPENAI_API_KEY").map_err(|_| ConfigError::MissingVar("OPENAI_API_KEY"))?;
        if openai_api_key.trim().is_empty() {
            return Err(ConfigError::MissingVar("OPENAI_API_KEY"));
        }

        let realtime_model = env::var("REALTIME_MODEL")
            .unwrap_or_else(|_| "gpt-4o-realtime-preview-2024-10-01".to_string());
        let realtime_voice = env::var("REALTIME_VOICE").unwrap_or_else(|_| "alloy".to_string());

        let vad_threshold = parse_var("VAD_THRESHOLD", 0.5f32)?;
        let vad_prefix_padding_ms = parse_var("VAD_PREFIX_PADDING_MS", 300u32)?;
        let vad_silence_duration_ms = parse_var("VAD_SILENCE_DURATION_MS", 500u32)?;

        let tenant_name = env::var("TENANT").unwrap_or_else(|_| "cleaning".to_string());
        let tenant = TenantProfile::parse(&tenant_name).ok_or(ConfigError::InvalidValue {
            var: "TENANT",
            reason: format!("unknown tenant '{tenant_name}', expected 'cleaning' or 'massage'"),
        })?;

        let config = Self {
            host,
            port,
            openai_api_key,
            realtime_model,
            realtime_voice,
            vad_threshold,
            vad_prefix_padding_ms,
            vad_silence_duration_ms,
            tenant,
            supabase_url: non_empty_var("SUPABASE_URL"),
            supabase_service_key: non_empty_var("SUPABASE_SERVICE_ROLE_KEY"),
            call_data_webhook: non_empty_var("CALL_DATA_WEBHOOK"),
            record_webhook: non_empty_var("RECORD_WEBHOOK"),
            pending_frame_limit: parse_var("PENDING_FRAME_LIMIT", DEFAULT_PENDING_FRAME_LIMIT)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.vad_threshold) {
            return Err(ConfigError::InvalidValue {
                var: "VAD_THRESHOLD",
                reason: format!("{} is outside 0.0..=1.0", self.vad_threshold),
            });
        }
        if self.pending_frame_limit == 0 {
            return Err(ConfigError::InvalidValue {
                var: "PENDING_FRAME_LIMIT",
                reason: "must be at least 1".to_string(),
            });
        }
        // The store needs both halves of the credential pair.
        if self.supabase_url.is_some() != self.supabase_service_key.is_some() {
            return Err(ConfigError::InvalidValue {
                var: "SUPABASE_URL",
                reason: "SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY must be set together"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Get the server address as a string in the format "host:port".
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether a structured-record store is configured.
    pub fn has_record_store(&self) -> bool {
        self.supabase_url.is_some() && self.supabase_service_key.is_some()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3002,
            openai_api_key: String::new(),
            realtime_model: "gpt-4o-realtime-preview-2024-10-01".to_string(),
            realtime_voice: "alloy".to_string(),
            vad_threshold: 0.5,
            vad_prefix_padding_ms: 300,
            vad_silence_duration_ms: 500,
            tenant: TenantProfile::cleaning(),
            supabase_url: None,
            supabase_service_key: None,
            call_data_webhook: None,
            record_webhook: None,
            pending_frame_limit: DEFAULT_PENDING_FRAME_LIMIT,
        }
    }
}

/// Read an env var, treating empty strings as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an env var with a fallback default.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: name,
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3002);
        assert_eq!(config.address(), "0.0.0.0:3002");
        assert!(!config.has_record_store());
        assert_eq!(config.tenant.id, "cleaning");
    }

    #[test]
    fn test_validate_vad_threshold_range() {
        let config = ServerConfig {
            vad_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                var: "VAD_THRESHOLD",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_pending_frame_limit() {
        let config = ServerConfig {
            pending_frame_limit: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_supabase_pair() {
        let config = ServerConfig {
            supabase_url: Some("https://example.supabase.co".to_string()),
            supabase_service_key: None,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            supabase_url: Some("https://example.supabase.co".to_string()),
            supabase_service_key: Some("service-key".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert!(config.has_record_store());
    }
}
