use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;

mod json;
pub use json::JsonCacheStore;

/// Locator → change token mapping carried across runs.
///
/// An entry with an empty token means the origin gave no validator; such
/// locators are never considered fresh and are fetched again on the next run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FreshnessCache {
    tokens: BTreeMap<String, String>,
}

impl FreshnessCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fresh(&self, locator: &str) -> bool {
        self.tokens
            .get(locator)
            .map(|token| !token.is_empty())
            .unwrap_or(false)
    }

    pub fn token(&self, locator: &str) -> Option<&str> {
        self.tokens.get(locator).map(String::as_str)
    }

    pub fn record(&mut self, locator: impl Into<String>, token: Option<String>) {
        self.tokens.insert(locator.into(), token.unwrap_or_default());
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FreshnessCache {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            tokens: iter
                .into_iter()
                .map(|(locator, token)| (locator.into(), token.into()))
                .collect(),
        }
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn load(&self) -> Result<FreshnessCache>;
    async fn save(&self, cache: &FreshnessCache) -> Result<()>;
}
