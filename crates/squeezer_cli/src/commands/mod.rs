//! CLI command implementations.
//!
//! Each command turns its arguments into an entity (natural key plus
//! desired attributes) or a workflow call and runs it against the engine.

pub mod artifact;
pub mod content;
pub mod distribution;
pub mod orphans;
pub mod remote;
pub mod repair;
pub mod repository;
pub mod sync;
pub mod task;
pub mod x509_guard;

use crate::error::CliError;
use serde_json::Value;
use squeezer_core::Attributes;

/// Desired attributes built from optional arguments.
///
/// Arguments that were not given never enter the map, so they never take
/// part in the diff.
#[derive(Debug, Default)]
pub struct Desired(Attributes);

impl Desired {
    /// Creates an empty set of attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `field` when `value` was given.
    pub fn set<V: Into<Value>>(mut self, field: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.0.insert(field.to_string(), value.into());
        }
        self
    }

    /// Adds `field` when `value` was given; an empty string clears it.
    pub fn nullable(mut self, field: &str, value: Option<&str>) -> Self {
        if let Some(value) = value {
            let value = if value.is_empty() {
                Value::Null
            } else {
                Value::from(value)
            };
            self.0.insert(field.to_string(), value);
        }
        self
    }

    /// Returns the collected attributes.
    pub fn into_attributes(self) -> Attributes {
        self.0
    }
}

/// Rejects `present` and `absent` without a name.
pub fn require_name(state: Option<&str>, name: Option<&str>) -> Result<(), CliError> {
    match (state, name) {
        (Some(state @ ("present" | "absent")), None) => Err(CliError::Usage(format!(
            "state is {state} but all of the following are missing: name"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn desired_skips_missing_values() {
        let desired = Desired::new()
            .set("url", Some("https://example.com/"))
            .set::<u32>("download_concurrency", None)
            .nullable("proxy_url", Some(""))
            .nullable("ca_cert", None)
            .into_attributes();
        assert_eq!(
            Value::Object(desired),
            json!({"url": "https://example.com/", "proxy_url": null})
        );
    }

    #[test]
    fn name_is_required_for_present_and_absent() {
        assert!(require_name(Some("present"), None).is_err());
        assert!(require_name(Some("absent"), None).is_err());
        assert!(require_name(Some("present"), Some("r1")).is_ok());
        assert!(require_name(None, None).is_ok());
    }
}
