// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::constants::DEFAULT_KEY_TTL;
use crate::key_resolver::ResolvedKey;
use http::HeaderMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
// Using tokio's wrapper makes the cache testable without relying on clock times.
use tokio::time::Instant;

#[derive(Clone, Debug)]
struct CacheEntry {
    key: ResolvedKey,
    expires_at: Instant,
}

/// A cache of resolved keys, indexed by certificate URL and key id.
#[derive(Clone, Debug, Default)]
pub(crate) struct KeyCache {
    entries: Arc<RwLock<HashMap<(String, String), CacheEntry>>>,
}

impl KeyCache {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn get(&self, certificate_url: &str, key_id: &str) -> Option<ResolvedKey> {
        let entries = self.entries.read().await;
        entries
            .get(&(certificate_url.to_string(), key_id.to_string()))
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.key.clone())
    }

    pub(crate) async fn insert(&self, certificate_url: &str, key: ResolvedKey, ttl: Duration) {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        // A lifetime past the end of the clock's range is not cached.
        let Some(expires_at) = now.checked_add(ttl) else {
            tracing::debug!(certificate_url, ?ttl, "key lifetime overflows, not caching");
            return;
        };
        entries.insert(
            (certificate_url.to_string(), key.key_id().to_string()),
            CacheEntry { key, expires_at },
        );
    }
}

/// Returns how long the keys in a certificate response may be cached.
///
/// Google returns `Cache-Control: public, max-age=N, ...` with its
/// certificates. A response without `max-age` is cached for one hour, and
/// responses marked `no-store` or `no-cache` are not cached.
pub(crate) fn time_to_live(headers: &HeaderMap) -> Duration {
    let Some(value) = headers
        .get(http::header::CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
    else {
        return DEFAULT_KEY_TTL;
    };
    let mut ttl = DEFAULT_KEY_TTL;
    for directive in value.split(',').map(str::trim) {
        let directive = directive.to_ascii_lowercase();
        if directive == "no-store" || directive == "no-cache" {
            return Duration::ZERO;
        }
        if let Some(seconds) = directive.strip_prefix("max-age=") {
            if let Ok(seconds) = seconds.trim_matches('"').parse::<u64>() {
                ttl = Duration::from_secs(seconds);
            }
        }
    }
    ttl
}
