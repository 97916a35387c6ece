//! The closed catalog of setting keys.

use stackit_shared::duration::DurationParser;
use uuid::Uuid;

pub const PROJECT_ID: &str = "project.id";
pub const REGION: &str = "region";
pub const OUTPUT_FORMAT: &str = "output.format";
pub const VERBOSITY: &str = "verbosity";
pub const ASSUME_YES: &str = "assume-yes";
pub const ASYNC: &str = "async";
pub const SESSION_TIME_LIMIT: &str = "session.time-limit";
pub const IDP_CUSTOM_ENDPOINT: &str = "identity-provider.custom-endpoint";
pub const IDP_CUSTOM_CLIENT_ID: &str = "identity-provider.custom-client-id";
pub const TOKEN_CUSTOM_ENDPOINT: &str = "token.custom-endpoint";

pub const DEFAULT_REGION: &str = "eu01";
pub const DEFAULT_SESSION_TIME_LIMIT: &str = "12h";
const MAX_SESSION_TIME_LIMIT_SECS: u64 = 24 * 60 * 60;

pub const OUTPUT_FORMATS: &[&str] = &["pretty", "json", "yaml"];
pub const VERBOSITY_LEVELS: &[&str] = &["error", "warning", "info", "debug"];

/// Services with a `<svc>.custom-endpoint` key.
pub const SERVICES: &[&str] = &[
    "iaas",
    "ske",
    "dns",
    "resource-manager",
    "service-account",
    "authorization",
    "kms",
    "secrets-manager",
    "load-balancer",
    "object-storage",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Uuid,
    Bool,
    Url,
    Enum(&'static [&'static str]),
    /// Duration string with an upper bound in seconds.
    Duration { max_seconds: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingKey {
    pub name: String,
    pub kind: ValueKind,
    pub default: Option<&'static str>,
}

impl SettingKey {
    fn new(name: impl Into<String>, kind: ValueKind, default: Option<&'static str>) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
        }
    }

    /// `STACKIT_` plus the upper-cased key with `.` and `-` turned into `_`.
    pub fn env_var(&self) -> String {
        env_var_for(&self.name)
    }

    /// Check a raw value and return its canonical form.
    pub fn validate(&self, raw: &str) -> Result<String, String> {
        let value = raw.trim();
        match self.kind {
            ValueKind::Text => Ok(value.to_string()),
            ValueKind::Uuid => Uuid::parse_str(value)
                .map(|id| id.to_string())
                .map_err(|e| format!("invalid UUID {value:?}: {e}")),
            ValueKind::Bool => match value.to_ascii_lowercase().as_str() {
                "true" | "1" => Ok("true".to_string()),
                "false" | "0" => Ok("false".to_string()),
                _ => Err(format!("invalid boolean {value:?}")),
            },
            ValueKind::Url => reqwest::Url::parse(value)
                .map(|_| value.to_string())
                .map_err(|e| format!("invalid URL {value:?}: {e}")),
            ValueKind::Enum(allowed) => {
                if allowed.contains(&value) {
                    Ok(value.to_string())
                } else {
                    Err(format!(
                        "{value:?} is not one of the allowed values: {}",
                        allowed.join(", ")
                    ))
                }
            }
            ValueKind::Duration { max_seconds } => DurationParser::new()
                .max_seconds(max_seconds)
                .parse(value)
                .map(|_| value.to_string())
                .map_err(|e| e.to_string()),
        }
    }
}

pub fn env_var_for(key: &str) -> String {
    format!(
        "STACKIT_{}",
        key.to_ascii_uppercase().replace(['.', '-'], "_")
    )
}

pub fn custom_endpoint_key(service: &str) -> String {
    format!("{service}.custom-endpoint")
}

/// Every known key, in display order.
pub fn catalog() -> Vec<SettingKey> {
    let mut keys = vec![
        SettingKey::new(PROJECT_ID, ValueKind::Uuid, None),
        SettingKey::new(REGION, ValueKind::Text, Some(DEFAULT_REGION)),
        SettingKey::new(OUTPUT_FORMAT, ValueKind::Enum(OUTPUT_FORMATS), Some("pretty")),
        SettingKey::new(VERBOSITY, ValueKind::Enum(VERBOSITY_LEVELS), Some("info")),
        SettingKey::new(ASSUME_YES, ValueKind::Bool, Some("false")),
        SettingKey::new(ASYNC, ValueKind::Bool, Some("false")),
        SettingKey::new(
            SESSION_TIME_LIMIT,
            ValueKind::Duration {
                max_seconds: MAX_SESSION_TIME_LIMIT_SECS,
            },
            Some(DEFAULT_SESSION_TIME_LIMIT),
        ),
        SettingKey::new(IDP_CUSTOM_ENDPOINT, ValueKind::Url, None),
        SettingKey::new(IDP_CUSTOM_CLIENT_ID, ValueKind::Text, None),
        SettingKey::new(TOKEN_CUSTOM_ENDPOINT, ValueKind::Url, None),
    ];
    keys.extend(
        SERVICES
            .iter()
            .map(|svc| SettingKey::new(custom_endpoint_key(svc), ValueKind::Url, None)),
    );
    keys
}

pub fn lookup(name: &str) -> Option<SettingKey> {
    catalog().into_iter().find(|key| key.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("project.id", "STACKIT_PROJECT_ID")]
    #[test_case("session.time-limit", "STACKIT_SESSION_TIME_LIMIT")]
    #[test_case("iaas.custom-endpoint", "STACKIT_IAAS_CUSTOM_ENDPOINT")]
    #[test_case("assume-yes", "STACKIT_ASSUME_YES")]
    fn test_env_var_mapping(key: &str, expected: &str) {
        assert_eq!(env_var_for(key), expected);
    }

    #[test]
    fn test_catalog_is_closed() {
        assert!(lookup("secrets-manager.custom-endpoint").is_some());
        assert!(lookup("nonexistent").is_none());
        let names: Vec<String> = catalog().into_iter().map(|k| k.name).collect();
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(names.len(), deduped.len());
    }

    #[test]
    fn test_validation() {
        let key = lookup(PROJECT_ID).unwrap();
        assert!(key.validate("not-a-uuid").is_err());
        assert_eq!(
            key.validate(" 00000000-0000-0000-0000-000000000001 ").unwrap(),
            "00000000-0000-0000-0000-000000000001"
        );

        let key = lookup(SESSION_TIME_LIMIT).unwrap();
        assert_eq!(key.validate("2h").unwrap(), "2h");
        assert!(key.validate("25h").is_err());

        let key = lookup(OUTPUT_FORMAT).unwrap();
        assert!(key.validate("xml").unwrap_err().contains("pretty, json, yaml"));

        let key = lookup(ASYNC).unwrap();
        assert_eq!(key.validate("TRUE").unwrap(), "true");
    }
}
