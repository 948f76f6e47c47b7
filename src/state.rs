//! Shared application state.

use std::sync::Arc;

use crate::analytics::{AnalyticsSink, WebhookReporter};
use crate::bridge::SessionStore;
use crate::config::ServerConfig;
use crate::core::realtime::{AiConnector, OpenAiConnector};
use crate::records::{RecordStore, SupabaseStore};

/// State shared across all connections.
///
/// Handlers receive this through axum's `State` extractor; each call's bridge
/// task holds a clone for the duration of the call.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Live sessions, keyed by call SID
    pub sessions: Arc<SessionStore>,
    /// Opens AI sessions
    pub connector: Arc<dyn AiConnector>,
    /// Structured-record store, when configured
    pub record_store: Option<Arc<dyn RecordStore>>,
    /// Call-outcome delivery
    pub analytics: Arc<dyn AnalyticsSink>,
}

impl AppState {
    /// Build production state from configuration.
    pub fn new(config: ServerConfig) -> Self {
        let record_store: Option<Arc<dyn RecordStore>> = match (
            config.supabase_url.as_deref(),
            config.supabase_service_key.as_deref(),
        ) {
            (Some(url), Some(key)) => Some(Arc::new(SupabaseStore::new(url, key))),
            _ => {
                tracing::warn!("No record store configured; collected records are not persisted");
                None
            }
        };

        let analytics = WebhookReporter::new(
            config.call_data_webhook.clone(),
            config.record_webhook.clone(),
        );

        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionStore::new()),
            connector: Arc::new(OpenAiConnector::new()),
            record_store,
            analytics: Arc::new(analytics),
        }
    }

    /// State with every collaborator supplied explicitly; used by tests to
    /// plug in doubles.
    pub fn with_collaborators(
        config: ServerConfig,
        connector: Arc<dyn AiConnector>,
        record_store: Option<Arc<dyn RecordStore>>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            sessions: Arc::new(SessionStore::new()),
            connector,
            record_store,
            analytics,
        }
    }
}
