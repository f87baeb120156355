pub mod models;
pub mod repository;

use std::collections::BTreeMap;

use async_trait::async_trait;

pub use repository::{ParameterRepository, StorageError};

/// Hierarchical name/value parameters, looked up by path prefix.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Direct children of `path_prefix`, keyed by name with the prefix removed.
    async fn get_parameters(
        &self,
        path_prefix: &str,
    ) -> Result<BTreeMap<String, String>, StorageError>;
}

#[async_trait]
impl ParameterStore for ParameterRepository {
    async fn get_parameters(
        &self,
        path_prefix: &str,
    ) -> Result<BTreeMap<String, String>, StorageError> {
        self.get_parameters_by_path(path_prefix).await
    }
}
