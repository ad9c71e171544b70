pub mod memory;
pub mod redis;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::Settings;
use crate::state::ConversationState;

pub type SharedStateStore = Arc<dyn StateStore>;

/// Durable key-value mapping from conversation id to conversation state.
///
/// Resilience contract: `get` and `save` never fail the request. On any
/// backend error the store logs the fault and degrades — `get` hands back a
/// freshly created state, `save` drops the write. State loss on backend
/// error is an accepted, explicit trade-off.
#[async_trait]
pub trait StateStore: Send + Sync + std::fmt::Debug {
    /// Returns the stored state, or a fresh one when absent (or on error).
    async fn get(&self, conversation_id: &str, flow_id: &str) -> ConversationState;

    /// Persists the state, refreshing its expiry (fixed TTL, reset on every
    /// write).
    async fn save(&self, state: &ConversationState);

    /// Deletes a conversation's state outright (out-of-band session reset).
    async fn delete(&self, conversation_id: &str);

    /// All currently stored states. Diagnostic only.
    async fn list_active(&self) -> Vec<ConversationState>;
}

/// Connects the configured durable backend, transparently falling back to
/// the in-process store when it cannot be reached at startup. The engine
/// never learns which backend is active.
pub async fn connect(settings: &Settings) -> SharedStateStore {
    if settings.use_redis {
        match redis::RedisStateStore::connect(&settings.redis_url, settings.redis_ttl_secs).await
        {
            Ok(store) => {
                info!("conversation state backed by redis at {}", settings.redis_url);
                return Arc::new(store);
            }
            Err(e) => {
                warn!("redis unavailable ({e}), falling back to in-memory state store");
            }
        }
    }
    Arc::new(memory::InMemoryStateStore::new(settings.redis_ttl_secs))
}
