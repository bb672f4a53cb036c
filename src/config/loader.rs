//! Configuration loader with environment variable expansion

use super::{Config, ConfigError};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate configuration from YAML text
    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content);
        let mut config: Config = serde_yaml::from_str(&expanded)?;
        config.api.csrf_token = config.api.csrf_token.filter(|t| !t.is_empty());
        config.api.auth_token = config.api.auth_token.filter(|t| !t.is_empty());
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables in a string.
    ///
    /// Supports two syntaxes:
    /// - `${VAR_NAME}` - keeps the placeholder if the variable is unset
    /// - `${VAR_NAME:-default}` - falls back to `default` (which may be empty)
    fn expand_env_vars(content: &str) -> String {
        let re = regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}")
            .expect("static regex is valid");
        let mut last_match = 0;
        let mut result = String::with_capacity(content.len());

        for cap in re.captures_iter(content) {
            let Some(full_match) = cap.get(0) else {
                continue;
            };
            let var_name = &cap[1];

            result.push_str(&content[last_match..full_match.start()]);

            let value = match std::env::var(var_name) {
                Ok(val) => val,
                Err(_) => match cap.get(2) {
                    Some(default) => default.as_str().to_string(),
                    None => full_match.as_str().to_string(),
                },
            };
            result.push_str(&value);

            last_match = full_match.end();
        }

        result.push_str(&content[last_match..]);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_expand_env_vars() {
        std::env::set_var("OMICS_TEST_VAR", "test_value");
        let content = "key: ${OMICS_TEST_VAR}";
        let expanded = ConfigLoader::expand_env_vars(content);
        assert_eq!(expanded, "key: test_value");
        std::env::remove_var("OMICS_TEST_VAR");
    }

    #[test]
    #[serial]
    fn test_expand_env_vars_default_and_missing() {
        std::env::remove_var("OMICS_MISSING_VAR");
        assert_eq!(
            ConfigLoader::expand_env_vars("a: ${OMICS_MISSING_VAR:-fallback}"),
            "a: fallback"
        );
        assert_eq!(
            ConfigLoader::expand_env_vars("a: \"${OMICS_MISSING_VAR:-}\""),
            "a: \"\""
        );
        assert_eq!(
            ConfigLoader::expand_env_vars("a: ${OMICS_MISSING_VAR}"),
            "a: ${OMICS_MISSING_VAR}"
        );
    }

    #[test]
    #[serial]
    fn test_empty_tokens_become_none() {
        std::env::remove_var("OMICS_NO_TOKEN");
        let yaml = r#"
api:
  base_url: "http://localhost:8000"
  csrf_token: "${OMICS_NO_TOKEN:-}"
"#;
        let config = ConfigLoader::parse(yaml).unwrap();
        assert!(config.api.csrf_token.is_none());
        assert_eq!(config.upload.chunk_size, crate::config::DEFAULT_CHUNK_SIZE);
    }
}
