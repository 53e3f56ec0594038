//! Read-side response cache shared by the HTTP routers.
//!
//! Bounded by entry count and TTL. Owned by whoever builds the router state, so
//! it lives exactly as long as the server that created it.

use moka::sync::Cache;
use serde_json::Value;

use crate::config::CacheConfig;

pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: String, value: Value);
    fn invalidate(&self, key: &str);
    fn invalidate_all(&self);
}

pub struct MokaResponseCache {
    cache: Cache<String, Value>,
}

impl MokaResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();

        Self { cache }
    }
}

impl ResponseCache for MokaResponseCache {
    fn get(&self, key: &str) -> Option<Value> {
        self.cache.get(key)
    }

    fn set(&self, key: String, value: Value) {
        self.cache.insert(key, value);
    }

    fn invalidate(&self, key: &str) {
        self.cache.invalidate(key);
    }

    fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn cache(ttl: Duration) -> MokaResponseCache {
        MokaResponseCache::new(&CacheConfig {
            max_entries: 16,
            ttl,
        })
    }

    #[test]
    fn set_then_get() {
        let cache = cache(Duration::from_secs(60));
        cache.set("companies".to_string(), json!([{ "name": "Harbor Dental" }]));
        assert_eq!(
            cache.get("companies"),
            Some(json!([{ "name": "Harbor Dental" }]))
        );
        assert_eq!(cache.get("audits:statistics"), None);
    }

    #[test]
    fn invalidate_removes_single_key() {
        let cache = cache(Duration::from_secs(60));
        cache.set("a".to_string(), json!(1));
        cache.set("b".to_string(), json!(2));
        cache.invalidate("a");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(json!(2)));
    }

    #[test]
    fn invalidate_all_clears_entries() {
        let cache = cache(Duration::from_secs(60));
        cache.set("a".to_string(), json!(1));
        cache.set("b".to_string(), json!(2));
        cache.invalidate_all();
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), None);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = cache(Duration::from_millis(20));
        cache.set("a".to_string(), json!(1));
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(cache.get("a"), None);
    }
}
