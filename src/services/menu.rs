//! Menu lookup service implementation
//!
//! HTTP adapter for the read-only catalog API, with an optional Redis
//! read-through cache so browsing does not hammer the upstream on every
//! message. Cached entries expire after the configured TTL.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::MenuConfig;
use crate::models::catalog::{Category, MenuItem};
use crate::utils::errors::{ChowBuddyError, MenuError, Result};

use super::MenuLookup;

/// Redis cache handle for menu responses
#[derive(Clone)]
struct MenuCache {
    redis_client: redis::Client,
    prefix: String,
    ttl_seconds: u64,
}

/// HTTP menu lookup client
#[derive(Clone)]
pub struct HttpMenuLookup {
    client: Client,
    base_url: String,
    cache: Option<MenuCache>,
}

impl HttpMenuLookup {
    /// Create a new menu lookup client without caching
    pub fn new(config: &MenuConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("ChowBuddy-Bot/1.0")
            .build()
            .map_err(ChowBuddyError::Http)?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            cache: None,
        })
    }

    /// Attach a Redis read-through cache
    pub fn with_cache(mut self, redis_client: redis::Client, prefix: &str, ttl_seconds: u64) -> Self {
        self.cache = Some(MenuCache {
            redis_client,
            prefix: prefix.to_string(),
            ttl_seconds,
        });
        self
    }

    async fn fetch<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Fetching from menu API");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ChowBuddyError::Menu(MenuError::Timeout)
            } else if e.is_connect() {
                ChowBuddyError::Menu(MenuError::ServiceUnavailable)
            } else {
                ChowBuddyError::Menu(MenuError::RequestFailed(e.to_string()))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ChowBuddyError::Menu(MenuError::RequestFailed(format!(
                "HTTP {}: {}",
                status, error_text
            ))));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ChowBuddyError::Menu(MenuError::InvalidResponse(e.to_string())))
    }

    async fn get_cached<T: serde::de::DeserializeOwned>(&self, key_suffix: &str) -> Result<Option<T>> {
        let Some(cache) = &self.cache else {
            return Ok(None);
        };

        let mut conn = cache.redis_client.get_async_connection().await?;
        let cache_key = format!("{}menu:{}", cache.prefix, key_suffix);

        let cached_data: Option<String> = conn.get(&cache_key).await?;

        if let Some(data) = cached_data {
            match serde_json::from_str::<T>(&data) {
                Ok(value) => return Ok(Some(value)),
                Err(e) => {
                    warn!(key = %cache_key, error = %e, "Failed to deserialize cached menu entry");
                    // Remove corrupted cache entry
                    let _: () = conn.del(&cache_key).await?;
                }
            }
        }

        Ok(None)
    }

    async fn cache_value<T: serde::Serialize>(&self, key_suffix: &str, value: &T) -> Result<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };

        let mut conn = cache.redis_client.get_async_connection().await?;
        let cache_key = format!("{}menu:{}", cache.prefix, key_suffix);
        let serialized = serde_json::to_string(value)?;

        let _: () = conn.set_ex(&cache_key, serialized, cache.ttl_seconds).await?;

        debug!(key = %cache_key, "Cached menu entry");
        Ok(())
    }
}

#[async_trait]
impl MenuLookup for HttpMenuLookup {
    async fn get_categories(&self) -> Result<Vec<Category>> {
        if let Some(cached) = self.get_cached::<Vec<Category>>("categories").await? {
            debug!("Serving categories from cache");
            return Ok(cached);
        }

        let mut categories: Vec<Category> = self.fetch("/categories").await?;
        categories.sort_by(|a, b| a.ordering.cmp(&b.ordering).then_with(|| a.name.cmp(&b.name)));

        self.cache_value("categories", &categories).await?;
        Ok(categories)
    }

    async fn get_items(&self, category_id: i64) -> Result<Vec<MenuItem>> {
        let key = format!("items:{}", category_id);
        if let Some(cached) = self.get_cached::<Vec<MenuItem>>(&key).await? {
            debug!(category_id = category_id, "Serving items from cache");
            return Ok(cached);
        }

        let mut items: Vec<MenuItem> = self
            .fetch(&format!("/categories/{}/items", category_id))
            .await?;
        items.retain(|item| item.is_available);
        items.sort_by(|a, b| a.name.cmp(&b.name));

        self.cache_value(&key, &items).await?;
        Ok(items)
    }
}

impl std::fmt::Debug for HttpMenuLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpMenuLookup")
            .field("base_url", &self.base_url)
            .field("cached", &self.cache.is_some())
            .finish_non_exhaustive()
    }
}
