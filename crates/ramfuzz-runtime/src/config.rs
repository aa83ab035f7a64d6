/// Runtime configuration: recursion and spin limits, size caps, seeding.
use serde::{Deserialize, Serialize};

/// Configuration for one [`Gen`](crate::Gen).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Nested calls into one harness type before its may-recurse methods
    /// bail out (default: 4).
    pub depth_limit: u32,
    /// Upper bound on method-roulette spins per object (default: 3).
    pub spin_limit: u32,
    /// Chance of building a subclass when one is allowed (default: 0.5).
    pub subclass_probability: f64,
    /// Largest unconstrained `u64` handed out by `make` (default: `u32::MAX`).
    pub wide_unsigned_cap: u64,
    /// Longest generated `Vec` (default: 1000).
    pub max_collection_len: u32,
    /// Longest generated C string, terminator excluded (default: 256).
    pub max_cstring_len: u32,
    /// Largest placeholder buffer for `void` pointees (default: 64).
    pub max_void_buffer: u32,
    /// Seed for the local engine. None = seed from the OS.
    pub seed: Option<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            depth_limit: 4,
            spin_limit: 3,
            subclass_probability: 0.5,
            wide_unsigned_cap: u64::from(u32::MAX),
            max_collection_len: 1000,
            max_cstring_len: 256,
            max_void_buffer: 64,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.depth_limit, 4);
        assert_eq!(config.spin_limit, 3);
        assert_eq!(config.subclass_probability, 0.5);
        assert_eq!(config.max_collection_len, 1000);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{ "spin_limit": 7, "seed": 42 }"#).unwrap();
        assert_eq!(config.spin_limit, 7);
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.depth_limit, 4);
    }
}
