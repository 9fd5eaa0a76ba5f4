//! Mock catalog client for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::catalog::{CatalogClient, CatalogError, RawMediaInfo};

/// Mock implementation of the CatalogClient trait.
///
/// Answers every query with the configured media info and records the
/// queried sources.
#[derive(Debug, Clone, Default)]
pub struct MockCatalog {
    /// Answer for every source.
    info: Arc<RwLock<Option<RawMediaInfo>>>,
    /// Sources queried so far.
    queries: Arc<RwLock<Vec<String>>>,
    /// If set, the next query will fail with this error.
    next_error: Arc<RwLock<Option<CatalogError>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the answer returned for any source.
    pub async fn set_info(&self, info: RawMediaInfo) {
        *self.info.write().await = Some(info);
    }

    /// Configure the next query to fail with the given error.
    pub async fn set_next_error(&self, error: CatalogError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn query_count(&self) -> usize {
        self.queries.read().await.len()
    }

    pub async fn recorded_queries(&self) -> Vec<String> {
        self.queries.read().await.clone()
    }
}

#[async_trait]
impl CatalogClient for MockCatalog {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get_info(&self, source: &str) -> Result<RawMediaInfo, CatalogError> {
        self.queries.write().await.push(source.to_string());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        self.info
            .read()
            .await
            .clone()
            .ok_or_else(|| CatalogError::query_failed(format!("no media info for {}", source)))
    }
}
