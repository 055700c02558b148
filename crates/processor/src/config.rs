use std::path::PathBuf;
use std::time::Duration;

use rexec_core::error::CoreError;
use rexec_core::types::ExecutionMode;
use rexec_remote::poll::PollPolicy;
use serde::Deserialize;

/// Default seconds between status checks in asynchronous mode.
pub const DEFAULT_POLLING_TIME_SECS: f64 = 3.0;

/// Settings for one remote execution processor.
///
/// Deserializable from a processor definition document, or loaded from
/// the environment with [`ProcessorConfig::from_env`].
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorConfig {
    /// Root under which per-job working directories are created.
    pub private_processor_dir: PathBuf,
    /// Base URL of the remote executor.
    pub url_executor: String,
    #[serde(default = "default_polling_time_secs")]
    pub polling_time_secs: f64,
    /// `true` asks the executor to answer only when the job is done.
    #[serde(default = "default_remote_execute_synch")]
    pub remote_execute_synch: bool,
    /// Wall-clock budget for polling. Unbounded when absent.
    #[serde(default)]
    pub max_wait_secs: Option<f64>,
    /// Maximum number of unfinished status checks. Unbounded when absent.
    #[serde(default)]
    pub max_polls: Option<u32>,
    /// Per-request HTTP timeout. None when absent.
    #[serde(default)]
    pub request_timeout_secs: Option<f64>,
}

fn default_polling_time_secs() -> f64 {
    DEFAULT_POLLING_TIME_SECS
}

fn default_remote_execute_synch() -> bool {
    true
}

impl ProcessorConfig {
    /// Minimal config with defaults for everything optional.
    pub fn new(private_processor_dir: impl Into<PathBuf>, url_executor: impl Into<String>) -> Self {
        Self {
            private_processor_dir: private_processor_dir.into(),
            url_executor: url_executor.into(),
            polling_time_secs: DEFAULT_POLLING_TIME_SECS,
            remote_execute_synch: true,
            max_wait_secs: None,
            max_polls: None,
            request_timeout_secs: None,
        }
    }

    /// Parse and validate a processor definition document.
    pub fn from_definition(definition: &serde_json::Value) -> Result<Self, CoreError> {
        let config: Self = serde_json::from_value(definition.clone())
            .map_err(|e| CoreError::Usage(format!("Invalid processor definition: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                 | Default    |
    /// |-------------------------|------------|
    /// | `PRIVATE_PROCESSOR_DIR` | (required) |
    /// | `URL_EXECUTOR`          | (required) |
    /// | `POLLING_TIME_SECS`     | `3`        |
    /// | `REMOTE_EXECUTE_SYNCH`  | `true`     |
    /// | `MAX_WAIT_SECS`         | unbounded  |
    /// | `MAX_POLLS`             | unbounded  |
    /// | `REQUEST_TIMEOUT_SECS`  | none       |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. [`from_env`](Self::from_env) uses the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CoreError> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| CoreError::Usage(format!("Undefined '{key}' in configuration")))
        };

        let mut config = Self::new(
            required("PRIVATE_PROCESSOR_DIR")?,
            required("URL_EXECUTOR")?,
        );

        if let Some(raw) = lookup("POLLING_TIME_SECS") {
            config.polling_time_secs = parse_number("POLLING_TIME_SECS", &raw)?;
        }
        if let Some(raw) = lookup("REMOTE_EXECUTE_SYNCH") {
            config.remote_execute_synch = parse_bool("REMOTE_EXECUTE_SYNCH", &raw)?;
        }
        if let Some(raw) = lookup("MAX_WAIT_SECS") {
            config.max_wait_secs = Some(parse_number("MAX_WAIT_SECS", &raw)?);
        }
        if let Some(raw) = lookup("MAX_POLLS") {
            config.max_polls = Some(parse_number("MAX_POLLS", &raw)?);
        }
        if let Some(raw) = lookup("REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = Some(parse_number("REQUEST_TIMEOUT_SECS", &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot drive a processor.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.private_processor_dir.as_os_str().is_empty() {
            return Err(CoreError::Usage(
                "Undefined 'private_processor_dir' in configuration".into(),
            ));
        }
        if self.url_executor.trim().is_empty() {
            return Err(CoreError::Usage(
                "Undefined 'url_executor' in configuration".into(),
            ));
        }
        positive_duration("polling_time_secs", self.polling_time_secs)?;
        if let Some(secs) = self.max_wait_secs {
            positive_duration("max_wait_secs", secs)?;
            if secs < self.polling_time_secs {
                return Err(CoreError::Usage(format!(
                    "'max_wait_secs' ({secs}) must not be shorter than 'polling_time_secs' ({})",
                    self.polling_time_secs
                )));
            }
        }
        if let Some(secs) = self.request_timeout_secs {
            positive_duration("request_timeout_secs", secs)?;
        }
        if self.max_polls == Some(0) {
            return Err(CoreError::Usage("'max_polls' must be at least 1".into()));
        }
        Ok(())
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        ExecutionMode::from_synch_flag(self.remote_execute_synch)
    }

    pub fn poll_policy(&self) -> Result<PollPolicy, CoreError> {
        Ok(PollPolicy {
            interval: positive_duration("polling_time_secs", self.polling_time_secs)?,
            max_wait: self
                .max_wait_secs
                .map(|secs| positive_duration("max_wait_secs", secs))
                .transpose()?,
            max_polls: self.max_polls,
        })
    }

    pub fn request_timeout(&self) -> Result<Option<Duration>, CoreError> {
        self.request_timeout_secs
            .map(|secs| positive_duration("request_timeout_secs", secs))
            .transpose()
    }
}

fn positive_duration(field: &str, secs: f64) -> Result<Duration, CoreError> {
    match Duration::try_from_secs_f64(secs) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(CoreError::Usage(format!(
            "'{field}' must be a positive number of seconds, got {secs}"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, CoreError> {
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Usage(format!("{key} must be a number, got '{raw}'")))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, CoreError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CoreError::Usage(format!(
            "{key} must be a boolean, got '{raw}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn definition_applies_defaults() {
        let config = ProcessorConfig::from_definition(&json!({
            "private_processor_dir": "/srv/private",
            "url_executor": "http://executor:5000/",
        }))
        .unwrap();

        assert_eq!(config.polling_time_secs, 3.0);
        assert!(config.remote_execute_synch);
        assert_eq!(config.execution_mode(), ExecutionMode::Synchronous);
        assert_eq!(config.poll_policy().unwrap(), PollPolicy::default());
        assert_eq!(config.request_timeout().unwrap(), None);
    }

    #[test]
    fn definition_requires_directory_and_url() {
        let err = ProcessorConfig::from_definition(&json!({ "url_executor": "http://x/" }))
            .unwrap_err();
        assert_matches!(err, CoreError::Usage(msg) if msg.contains("private_processor_dir"));

        let err = ProcessorConfig::from_definition(&json!({
            "private_processor_dir": "/srv/private",
            "url_executor": "  ",
        }))
        .unwrap_err();
        assert_matches!(err, CoreError::Usage(msg) if msg.contains("url_executor"));
    }

    #[test]
    fn definition_reads_polling_bounds() {
        let config = ProcessorConfig::from_definition(&json!({
            "private_processor_dir": "/srv/private",
            "url_executor": "http://executor:5000/",
            "polling_time_secs": 0.5,
            "remote_execute_synch": false,
            "max_wait_secs": 600,
            "max_polls": 100,
        }))
        .unwrap();

        assert_eq!(config.execution_mode(), ExecutionMode::Asynchronous);
        assert_eq!(
            config.poll_policy().unwrap(),
            PollPolicy {
                interval: Duration::from_millis(500),
                max_wait: Some(Duration::from_secs(600)),
                max_polls: Some(100),
            }
        );
    }

    #[test]
    fn rejects_non_positive_polling_time() {
        for secs in [0.0, -1.0, f64::NAN] {
            let mut config = ProcessorConfig::new("/srv/private", "http://executor/");
            config.polling_time_secs = secs;
            assert_matches!(config.validate(), Err(CoreError::Usage(_)), "{secs}");
        }
    }

    #[test]
    fn rejects_max_wait_shorter_than_polling_time() {
        let mut config = ProcessorConfig::new("/srv/private", "http://executor/");
        config.polling_time_secs = 3.0;
        config.max_wait_secs = Some(1.0);
        assert_matches!(
            config.validate(),
            Err(CoreError::Usage(msg)) if msg.contains("max_wait_secs")
        );

        config.max_wait_secs = Some(3.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_max_polls() {
        let mut config = ProcessorConfig::new("/srv/private", "http://executor/");
        config.max_polls = Some(0);
        assert_matches!(config.validate(), Err(CoreError::Usage(_)));
    }

    #[test]
    fn lookup_reads_all_keys() {
        let config = ProcessorConfig::from_lookup(lookup(&[
            ("PRIVATE_PROCESSOR_DIR", "/srv/private"),
            ("URL_EXECUTOR", "http://executor:5000/"),
            ("POLLING_TIME_SECS", "10"),
            ("REMOTE_EXECUTE_SYNCH", "False"),
            ("MAX_WAIT_SECS", "3600"),
            ("MAX_POLLS", "360"),
            ("REQUEST_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();

        assert_eq!(config.private_processor_dir, PathBuf::from("/srv/private"));
        assert_eq!(config.polling_time_secs, 10.0);
        assert!(!config.remote_execute_synch);
        assert_eq!(config.max_wait_secs, Some(3600.0));
        assert_eq!(config.max_polls, Some(360));
        assert_eq!(config.request_timeout().unwrap(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn lookup_missing_required_key() {
        let err = ProcessorConfig::from_lookup(lookup(&[("URL_EXECUTOR", "http://x/")]))
            .unwrap_err();
        assert_matches!(err, CoreError::Usage(msg) if msg.contains("PRIVATE_PROCESSOR_DIR"));
    }

    #[test]
    fn lookup_rejects_bad_values() {
        let base = [
            ("PRIVATE_PROCESSOR_DIR", "/srv/private"),
            ("URL_EXECUTOR", "http://x/"),
        ];

        let mut vars = base.to_vec();
        vars.push(("POLLING_TIME_SECS", "soon"));
        assert_matches!(ProcessorConfig::from_lookup(lookup(&vars)), Err(CoreError::Usage(_)));

        let mut vars = base.to_vec();
        vars.push(("REMOTE_EXECUTE_SYNCH", "maybe"));
        assert_matches!(ProcessorConfig::from_lookup(lookup(&vars)), Err(CoreError::Usage(_)));
    }
}
