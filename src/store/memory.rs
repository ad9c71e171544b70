use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::info;

use super::StateStore;
use crate::state::ConversationState;

/// Process-local fallback store: a TTL'd in-memory mapping. Entries expire a
/// fixed interval after their last write, matching the durable backend's
/// refresh-on-write behavior.
#[derive(Debug)]
pub struct InMemoryStateStore {
    cache: Cache<String, ConversationState>,
}

impl InMemoryStateStore {
    pub fn new(ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(ttl_secs))
            .eviction_listener(|key, _state, cause| {
                info!("conversation expired: key={key}, cause={cause:?}");
            })
            .build();
        Self { cache }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, conversation_id: &str, flow_id: &str) -> ConversationState {
        match self.cache.get(conversation_id).await {
            Some(state) => state,
            None => ConversationState::new(conversation_id, flow_id),
        }
    }

    async fn save(&self, state: &ConversationState) {
        self.cache
            .insert(state.conversation_id().to_string(), state.clone())
            .await;
    }

    async fn delete(&self, conversation_id: &str) {
        self.cache.invalidate(conversation_id).await;
    }

    async fn list_active(&self) -> Vec<ConversationState> {
        // moka applies writes asynchronously; flush before iterating.
        self.cache.run_pending_tasks().await;
        self.cache.iter().map(|(_, state)| state).collect()
    }
}
