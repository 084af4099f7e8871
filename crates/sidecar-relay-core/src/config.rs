use crate::error::SupervisorError;
use crate::process::SpawnRequest;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Per-invocation spawn options.
///
/// Deserializes from a loose options map: every field is optional and keys
/// this crate does not understand are kept in `extra` rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpawnOptions {
    /// Working directory for the child
    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Do not inherit the parent's environment
    #[serde(default)]
    pub clear_env: bool,

    /// Kill the child after this many milliseconds (no limit when absent)
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SpawnOptions {
    pub fn from_json(value: serde_json::Value) -> Result<Self, SupervisorError> {
        serde_json::from_value(value)
            .map_err(|e| SupervisorError::Configuration(format!("Invalid spawn options: {e}")))
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Validate the options and return errors if invalid
    pub fn validate(&self) -> Result<(), SupervisorError> {
        if self.timeout_ms == Some(0) {
            return Err(SupervisorError::Configuration(
                "timeoutMs must be greater than zero".to_string(),
            ));
        }

        if let Some(cwd) = &self.cwd {
            if !cwd.is_dir() {
                return Err(SupervisorError::Configuration(format!(
                    "cwd is not a directory: {}",
                    cwd.display()
                )));
            }
        }

        Ok(())
    }
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`
pub fn millis_saturating(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// What to run: a program identifier, its arguments and spawn options
#[derive(Default, Debug, Clone, PartialEq, Builder)]
#[builder(setter(into))]
pub struct SidecarConfig {
    /// Logical program identifier, resolved to a path before spawning
    pub program: String,
    #[builder(default)]
    #[builder(setter(custom))]
    pub args: Vec<String>,
    #[builder(default)]
    pub options: SpawnOptions,
}

impl SidecarConfig {
    pub fn builder() -> SidecarConfigBuilder {
        SidecarConfigBuilder::default()
    }

    /// Build the platform request once `program` was resolved to `command`
    pub fn spawn_request(&self, command: String) -> SpawnRequest {
        SpawnRequest {
            command,
            args: self.args.clone(),
            working_dir: self.options.cwd.clone(),
            env: self.options.env.clone(),
            clear_env: self.options.clear_env,
        }
    }
}

impl SidecarConfigBuilder {
    pub fn args<S: ToString, I: IntoIterator<Item = S>>(&mut self, iter: I) -> &mut Self {
        let args: Vec<String> = iter.into_iter().map(|s| s.to_string()).collect();
        self.args = Some(args);
        self
    }

    pub fn env<T: ToString>(&mut self, key: T, value: T) -> &mut Self {
        self.options_mut()
            .env
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn timeout(&mut self, timeout: Duration) -> &mut Self {
        self.options_mut().timeout_ms = Some(millis_saturating(timeout));
        self
    }

    fn options_mut(&mut self) -> &mut SpawnOptions {
        self.options.get_or_insert_with(SpawnOptions::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_options_map() {
        let options = SpawnOptions::from_json(json!({})).unwrap();
        assert_eq!(options, SpawnOptions::default());
        assert!(options.timeout().is_none());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_unknown_keys_are_kept() {
        let options = SpawnOptions::from_json(json!({
            "timeoutMs": 1500,
            "encoding": "utf-8",
            "env": { "RUST_LOG": "debug" }
        }))
        .unwrap();

        assert_eq!(options.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(options.env.get("RUST_LOG").map(String::as_str), Some("debug"));
        assert_eq!(options.extra.get("encoding"), Some(&json!("utf-8")));
    }

    #[test]
    fn test_wrongly_typed_option_is_rejected() {
        let err = SpawnOptions::from_json(json!({ "timeoutMs": "soon" })).unwrap_err();
        assert!(matches!(err, SupervisorError::Configuration(_)));
    }

    #[test]
    fn test_invalid_options() {
        let options = SpawnOptions {
            timeout_ms: Some(0),
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = SpawnOptions {
            cwd: Some(PathBuf::from("/definitely/not/a/dir")),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_builder() {
        let config = SidecarConfig::builder()
            .program("./bin/horsed")
            .args(["--help"])
            .env("HORSED_LOG", "info")
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();

        assert_eq!(config.program, "./bin/horsed");
        assert_eq!(config.args, vec!["--help"]);
        assert_eq!(config.options.timeout_ms, Some(2000));

        let request = config.spawn_request("/opt/app/bin/horsed".to_string());
        assert_eq!(request.command, "/opt/app/bin/horsed");
        assert_eq!(request.args, vec!["--help"]);
        assert_eq!(request.env.get("HORSED_LOG").map(String::as_str), Some("info"));
    }

    #[test]
    fn test_huge_timeout_saturates() {
        assert_eq!(millis_saturating(Duration::from_millis(1500)), 1500);
        assert_eq!(millis_saturating(Duration::MAX), u64::MAX);

        let config = SidecarConfig::builder()
            .program("./bin/horsed")
            .timeout(Duration::MAX)
            .build()
            .unwrap();
        assert_eq!(config.options.timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn test_builder_requires_program() {
        assert!(SidecarConfig::builder().args(["--help"]).build().is_err());
    }
}
