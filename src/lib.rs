//! Voicebridge gateway.
//!
//! Bridges Twilio Media Streams to the OpenAI Realtime API so a tenant's
//! phone line is answered by a voice assistant. Each call gets one session
//! and one bridge task that relays G.711 u-law audio in both directions,
//! resolves the tenant's structured-output tool against a record store, and
//! reports the call outcome to analytics webhooks at teardown.

pub mod analytics;
pub mod bridge;
pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod records;
pub mod routes;
pub mod state;
pub mod telephony;

// Re-export commonly used items for convenience
pub use config::{ServerConfig, TenantProfile};
pub use errors::{AppError, AppResult};
pub use state::AppState;
