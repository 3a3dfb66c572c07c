use serde::{Deserialize, Serialize};

/// Engine limits and answer policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Hard bound on steps visited in one execution.
    pub max_steps: usize,
    /// Reject answers naming parameters the script never declares.
    pub strict_answers: bool,
    /// Compiled models an executor keeps; zero disables the cache.
    pub model_cache_capacity: usize,
}

impl EngineConfig {
    pub const DEFAULT_MAX_STEPS: usize = 1000;
    pub const DEFAULT_MODEL_CACHE_CAPACITY: usize = 64;
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_steps: Self::DEFAULT_MAX_STEPS,
            strict_answers: false,
            model_cache_capacity: Self::DEFAULT_MODEL_CACHE_CAPACITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"strict_answers": true}"#).unwrap();
        assert_eq!(config.max_steps, 1000);
        assert_eq!(config.model_cache_capacity, 64);
        assert!(config.strict_answers);
    }

    #[test]
    fn unknown_key_rejected() {
        assert!(serde_json::from_str::<EngineConfig>(r#"{"max_step": 3}"#).is_err());
    }
}
