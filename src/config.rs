// Copyright 2024 OctoFHIR Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine configuration options

use serde::Deserialize;

/// Configuration for [`StellarEngine`](crate::engine::StellarEngine)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Whether compiled expressions are memoized by source text
    pub cache_enabled: bool,

    /// Number of cached expressions at which the cache is cleared
    pub max_cache_size: usize,
}

impl EngineConfig {
    /// Create a configuration with custom settings
    pub fn new(cache_enabled: bool, max_cache_size: usize) -> Self {
        Self {
            cache_enabled,
            max_cache_size,
        }
    }

    /// Create a configuration for large rule sets evaluated at high rates
    pub fn high_throughput() -> Self {
        Self {
            cache_enabled: true,
            max_cache_size: 100_000,
        }
    }

    /// Create a configuration with caching disabled
    pub fn no_cache() -> Self {
        Self {
            cache_enabled: false,
            max_cache_size: 0,
        }
    }

    /// Read a configuration from JSON; missing fields keep their defaults
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            max_cache_size: 1_000,
        }
    }
}
