use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{info, warn};

use crate::error::FlowError;
use crate::flow::Flow;

/// Read-only source of flow definitions, keyed by flow id. Where the
/// definitions physically live (file, database, remote config) is opaque to
/// the engine.
#[async_trait]
pub trait FlowStore: Send + Sync + std::fmt::Debug {
    async fn load(&self, flow_id: &str) -> Result<Arc<Flow>, FlowError>;
}

/// Loads `<dir>/<flow_id>.json`, parsing and validating once; subsequent
/// loads are served from an in-process cache.
#[derive(Debug)]
pub struct FileFlowStore {
    dir: PathBuf,
    cache: DashMap<String, Arc<Flow>>,
}

impl FileFlowStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), cache: DashMap::new() }
    }
}

#[async_trait]
impl FlowStore for FileFlowStore {
    async fn load(&self, flow_id: &str) -> Result<Arc<Flow>, FlowError> {
        if let Some(flow) = self.cache.get(flow_id) {
            return Ok(flow.clone());
        }

        let path = self.dir.join(format!("{flow_id}.json"));
        if !path.exists() {
            return Err(FlowError::NotFound(flow_id.to_string()));
        }
        let contents =
            fs::read_to_string(&path).map_err(|e| FlowError::Io(e.to_string()))?;
        let flow = Arc::new(Flow::from_json(&contents)?);

        for (step, target) in flow.dangling_references() {
            warn!("flow `{}`: step `{}` references missing step `{}`", flow_id, step, target);
        }
        info!("loaded flow `{}` ({} steps) from {}", flow_id, flow.steps().len(), path.display());

        self.cache.insert(flow_id.to_string(), flow.clone());
        Ok(flow)
    }
}

/// Registry-backed store, mostly for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryFlowStore {
    flows: DashMap<String, Arc<Flow>>,
}

impl InMemoryFlowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, flow: Flow) {
        self.flows.insert(flow.id().to_string(), Arc::new(flow));
    }
}

#[async_trait]
impl FlowStore for InMemoryFlowStore {
    async fn load(&self, flow_id: &str) -> Result<Arc<Flow>, FlowError> {
        self.flows
            .get(flow_id)
            .map(|f| f.clone())
            .ok_or_else(|| FlowError::NotFound(flow_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FLOW_JSON: &str = r#"{
        "id": "saludo",
        "start_step": "inicio",
        "error_step": "inicio",
        "steps": {
            "inicio": {"type": "end", "text": "hola"}
        }
    }"#;

    #[tokio::test]
    async fn file_store_loads_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = fs::File::create(dir.path().join("saludo.json")).unwrap();
        file.write_all(FLOW_JSON.as_bytes()).unwrap();

        let store = FileFlowStore::new(dir.path());
        let flow = store.load("saludo").await.unwrap();
        assert_eq!(flow.id(), "saludo");

        // Second load must come from the cache even if the file vanishes.
        fs::remove_file(dir.path().join("saludo.json")).unwrap();
        let again = store.load("saludo").await.unwrap();
        assert!(Arc::ptr_eq(&flow, &again));
    }

    #[tokio::test]
    async fn missing_flow_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFlowStore::new(dir.path());
        let err = store.load("fantasma").await.unwrap_err();
        assert!(matches!(err, FlowError::NotFound(ref id) if id == "fantasma"));
    }

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = InMemoryFlowStore::new();
        store.register(Flow::from_json(FLOW_JSON).unwrap());
        assert!(store.load("saludo").await.is_ok());
        assert!(store.load("otro").await.is_err());
    }
}
