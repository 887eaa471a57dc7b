//! Per-query execution settings.
//!
//! Settings are plain data, loadable from JSON:
//!
//! ```rust
//! use rivulet_query::settings::{ErrorPolicy, QuerySettings};
//!
//! let settings = QuerySettings::from_json(r#"{"error_policy": "skip", "max_groups": 1000}"#).unwrap();
//! assert_eq!(settings.error_policy, ErrorPolicy::Skip);
//! assert_eq!(settings.max_groups, Some(1000));
//! assert_eq!(settings.default_source, "dual");
//! ```

use rivulet_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// What happens when evaluating one record fails at runtime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Terminate the output stream with the error.
    #[default]
    Fail,
    /// Drop the record, log it at `warn`, continue.
    Skip,
}

impl ErrorPolicy {
    /// Whether a per-record failure is dropped rather than ending the execution.
    ///
    /// Source failures and `GroupLimit` always end it.
    pub fn skips(&self, err: &Error) -> bool {
        *self == ErrorPolicy::Skip && !matches!(err, Error::Source { .. } | Error::GroupLimit { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub error_policy: ErrorPolicy,
    /// Upper bound on live group keys per window instance.
    pub max_groups: Option<usize>,
    /// Source read by a top-level select without `from`.
    pub default_source: String,
    /// IANA zone used by `now(format)` and `date_format` when none is given.
    pub timezone: Option<String>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::Fail,
            max_groups: None,
            default_source: "dual".to_string(),
            timezone: None,
        }
    }
}

impl QuerySettings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::parse(format!("invalid settings: {}", e)))
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn with_max_groups(mut self, limit: usize) -> Self {
        self.max_groups = Some(limit);
        self
    }

    pub fn with_timezone(mut self, tz: impl Into<String>) -> Self {
        self.timezone = Some(tz.into());
        self
    }
}
