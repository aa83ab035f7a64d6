/// Generator configuration: output names, includes and class selection.
use serde::{Deserialize, Serialize};

/// Configuration for one generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenConfig {
    /// Namespace wrapping all generated code (default: `ramfuzz`).
    pub namespace: String,
    /// Runtime header included by the generated header.
    pub runtime_header: String,
    /// Name under which the source stream includes the header stream.
    pub header_name: String,
    /// Extra headers included ahead of the inputs, e.g. `<string>`.
    pub extra_includes: Vec<String>,
    /// Qualified-name prefixes whose harnesses the runtime supplies. Classes
    /// under these prefixes are never reported missing.
    pub runtime_provided: Vec<String>,
    /// Only classes declared in input files get harnesses, not classes from
    /// headers those files include.
    pub main_file_only: bool,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            namespace: "ramfuzz".to_string(),
            runtime_header: "ramfuzz-rt.hpp".to_string(),
            header_name: "fuzz.hpp".to_string(),
            extra_includes: Vec::new(),
            runtime_provided: vec!["std::".to_string()],
            main_file_only: true,
        }
    }
}

impl GenConfig {
    pub fn is_runtime_provided(&self, qualified: &str) -> bool {
        self.runtime_provided
            .iter()
            .any(|prefix| qualified.starts_with(prefix.as_str()))
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("Namespace '{0}' is not a C++ identifier")]
    BadNamespace(String),

    #[error("Empty {field}")]
    EmptyName { field: &'static str },
}

pub fn validate_config(config: &GenConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    if !is_identifier(&config.namespace) {
        errors.push(ConfigError::BadNamespace(config.namespace.clone()));
    }
    if config.runtime_header.is_empty() {
        errors.push(ConfigError::EmptyName {
            field: "runtime header",
        });
    }
    if config.header_name.is_empty() {
        errors.push(ConfigError::EmptyName {
            field: "header name",
        });
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&GenConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_namespace_and_empty_header() {
        let config = GenConfig {
            namespace: "9lives".to_string(),
            header_name: String::new(),
            ..Default::default()
        };
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0], ConfigError::BadNamespace("9lives".to_string()));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: GenConfig = serde_json::from_str(r#"{ "namespace": "fz" }"#).unwrap();
        assert_eq!(config.namespace, "fz");
        assert_eq!(config.runtime_header, "ramfuzz-rt.hpp");
        assert!(config.is_runtime_provided("std::vector< int>"));
        assert!(!config.is_runtime_provided("ns::A"));
    }
}
