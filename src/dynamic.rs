use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One row of an externally sourced dataset.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DataRecord {
    pub label: String,
    pub value: String,
}

impl DataRecord {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self { label: label.into(), value: value.into() }
    }
}

/// Fetch capability behind `dynamic_data` steps, keyed by a service name.
///
/// This is the seam for future external-service integrations: swapping the
/// mock for a real remote client must not change step semantics.
#[async_trait]
pub trait DynamicDataProvider: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, service: &str) -> Result<Vec<DataRecord>, String>;
}

/// Fixed dataset used until a real integration lands.
#[derive(Debug, Clone, Default)]
pub struct MockDataProvider;

#[async_trait]
impl DynamicDataProvider for MockDataProvider {
    async fn fetch(&self, _service: &str) -> Result<Vec<DataRecord>, String> {
        Ok(vec![
            DataRecord::new("Servicio A", "$100"),
            DataRecord::new("Servicio B", "$200"),
            DataRecord::new("Servicio C", "$300"),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_returns_fixed_rows() {
        let provider = MockDataProvider;
        let rows = provider.fetch("servicios").await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], DataRecord::new("Servicio A", "$100"));
    }
}
