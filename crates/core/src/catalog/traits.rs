//! Trait definitions for the catalog module.

use async_trait::async_trait;

use super::error::CatalogError;
use super::types::RawMediaInfo;

/// A source of remote format metadata.
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Returns the name of this catalog implementation.
    fn name(&self) -> &str;

    /// Fetches the title and every available format for a source reference.
    async fn get_info(&self, source: &str) -> Result<RawMediaInfo, CatalogError>;
}
