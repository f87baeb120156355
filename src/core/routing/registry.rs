use std::collections::BTreeMap;

use crate::core::storage::{ParameterStore, StorageError};

pub const DEFAULT_CHANNEL: &str = "default";

/// Channel name to webhook URL, as registered in the parameter store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookRegistry {
    webhooks: BTreeMap<String, String>,
}

impl WebhookRegistry {
    pub fn new(webhooks: BTreeMap<String, String>) -> Self {
        let webhooks = webhooks
            .into_iter()
            .map(|(name, url)| (name, url.trim().to_string()))
            .filter(|(name, url)| {
                if url.is_empty() {
                    tracing::warn!(channel = %name, "ignoring webhook with blank url");
                }
                !url.is_empty()
            })
            .collect();
        Self { webhooks }
    }

    pub async fn load(store: &dyn ParameterStore, path_prefix: &str) -> Result<Self, StorageError> {
        let parameters = store.get_parameters(path_prefix).await?;
        let registry = Self::new(parameters);
        if registry.default_url().is_none() {
            tracing::warn!(
                path = path_prefix,
                "no \"default\" webhook registered; unmatched entries will not be delivered"
            );
        }
        let channels: Vec<&str> = registry.channel_names().collect();
        tracing::info!(path = path_prefix, ?channels, "webhook registry loaded");
        Ok(registry)
    }

    pub fn url_for(&self, channel: &str) -> Option<&str> {
        self.webhooks.get(channel).map(String::as_str)
    }

    pub fn default_url(&self) -> Option<&str> {
        self.url_for(DEFAULT_CHANNEL)
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> {
        self.webhooks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.webhooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.webhooks.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for WebhookRegistry
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(
            iter.into_iter()
                .map(|(name, url)| (name.into(), url.into()))
                .collect(),
        )
    }
}
