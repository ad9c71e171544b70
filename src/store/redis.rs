use std::fmt;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::warn;

use super::StateStore;
use crate::error::StoreError;
use crate::state::ConversationState;

const KEY_PREFIX: &str = "conversation:";

/// Durable conversation store on redis. Every write is a `SETEX` with the
/// configured TTL, so expiry is fixed and refreshed on write. Read/write
/// faults degrade to a fresh state for that call; they are logged, never
/// surfaced to the caller.
#[derive(Clone)]
pub struct RedisStateStore {
    connection: ConnectionManager,
    ttl_secs: u64,
}

// ConnectionManager has no Debug impl, and the trait requires one.
impl fmt::Debug for RedisStateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStateStore")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl RedisStateStore {
    /// Opens the connection and verifies it with a `PING`; a failure here is
    /// what triggers the in-memory fallback at startup.
    pub async fn connect(url: &str, ttl_secs: u64) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|e| StoreError::Unreachable(e.to_string()))?;
        let mut connection = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        let _pong: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| StoreError::Unreachable(e.to_string()))?;
        Ok(Self { connection, ttl_secs })
    }

    fn key(conversation_id: &str) -> String {
        format!("{KEY_PREFIX}{conversation_id}")
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn get(&self, conversation_id: &str, flow_id: &str) -> ConversationState {
        let mut connection = self.connection.clone();
        let raw: Option<String> = match connection.get(Self::key(conversation_id)).await {
            Ok(value) => value,
            Err(e) => {
                warn!("redis read failed for `{conversation_id}`: {e}; starting fresh state");
                None
            }
        };

        match raw {
            Some(json) => serde_json::from_str(&json).unwrap_or_else(|e| {
                warn!("stored state for `{conversation_id}` is unreadable: {e}; starting fresh");
                ConversationState::new(conversation_id, flow_id)
            }),
            None => ConversationState::new(conversation_id, flow_id),
        }
    }

    async fn save(&self, state: &ConversationState) {
        let json = match serde_json::to_string(state) {
            Ok(json) => json,
            Err(e) => {
                warn!("could not serialize state for `{}`: {e}", state.conversation_id());
                return;
            }
        };
        let mut connection = self.connection.clone();
        let result: Result<(), _> = connection
            .set_ex(Self::key(state.conversation_id()), json, self.ttl_secs)
            .await;
        if let Err(e) = result {
            warn!("redis write failed for `{}`: {e}", state.conversation_id());
        }
    }

    async fn delete(&self, conversation_id: &str) {
        let mut connection = self.connection.clone();
        let result: Result<(), _> = connection.del(Self::key(conversation_id)).await;
        if let Err(e) = result {
            warn!("redis delete failed for `{conversation_id}`: {e}");
        }
    }

    async fn list_active(&self) -> Vec<ConversationState> {
        let mut connection = self.connection.clone();
        let keys: Vec<String> = match connection.keys(format!("{KEY_PREFIX}*")).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("redis keys scan failed: {e}");
                return Vec::new();
            }
        };

        let mut states = Vec::with_capacity(keys.len());
        for key in keys {
            let raw: Option<String> = match connection.get(&key).await {
                Ok(value) => value,
                Err(_) => None,
            };
            if let Some(json) = raw {
                if let Ok(state) = serde_json::from_str(&json) {
                    states.push(state);
                }
            }
        }
        states
    }
}
