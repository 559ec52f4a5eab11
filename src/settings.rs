// Copyright (c) 2024 Mike Tsao

//! Engine-wide settings. Intended to be serialized.

use crate::events::EventRegistry;
use anyhow::Context;
use derivative::Derivative;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Sizes and switches that apply to the whole engine.
#[derive(Clone, Debug, Derivative, PartialEq, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(rename_all = "kebab-case", default)]
pub struct EngineSettings {
    /// How many events can be in flight at once. Actions beyond this are
    /// dropped.
    #[derivative(Default(value = "256"))]
    pub pool_size: usize,

    /// How deeply dispatches may nest on one thread, for example when one
    /// `go-sub` triggers another.
    #[derivative(Default(value = "16"))]
    pub max_dispatch_depth: usize,

    /// Starts with verbose dispatch tracing on.
    pub debug: bool,

    /// How many buckets keyboard bindings are spread over.
    #[derivative(Default(value = "EventRegistry::DEFAULT_KEY_INDEX_SIZE"))]
    pub key_index_size: u32,
}
impl EngineSettings {
    /// Parses settings from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = EngineSettings::default();
        assert_eq!(s.pool_size, 256);
        assert_eq!(s.max_dispatch_depth, 16);
        assert!(!s.debug);
        assert_eq!(s.key_index_size, 512);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let s = EngineSettings::from_json(r#"{ "pool-size": 8, "debug": true }"#).unwrap();
        assert_eq!(s.pool_size, 8);
        assert!(s.debug);
        assert_eq!(s.max_dispatch_depth, 16);

        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("max-dispatch-depth"));
        assert!(EngineSettings::from_json("{ \"pool-size\": \"lots\" }").is_err());
    }
}
