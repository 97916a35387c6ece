//! Typed flag values shared by every command.
//!
//! clap does the parsing. Optional inputs are `Option<T>` so handlers can tell
//! "not passed" from "passed with the default value"; the `value` side is
//! `flag.unwrap_or(default)`. Boolean flags that feed sparse payloads are
//! `Option<bool>` taking `--flag`, `--flag=true` or `--flag=false`.

use clap::Args;
use ipnet::IpNet;
use serde::Serialize;
use stackit_api::dns::RecordType;
use stackit_shared::duration::{DurationError, DurationParser};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::{Settings, keys};
use crate::errors::CliError;
use crate::print::{Level, OutputFormat};

/// Flags accepted by every command.
#[derive(Args, Debug, Clone, Default, PartialEq, Serialize)]
pub struct GlobalFlags {
    /// Project ID
    #[arg(long = "project-id", short = 'p', global = true, value_parser = parse_uuid)]
    pub project_id: Option<Uuid>,

    /// Target region for region-specific requests
    #[arg(long, global = true)]
    pub region: Option<String>,

    /// Output format
    #[arg(long = "output-format", short = 'o', global = true, value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Verbosity of the CLI
    #[arg(long, global = true, value_enum)]
    pub verbosity: Option<Level>,

    /// If set, skips all confirmation prompts
    #[arg(
        long = "assume-yes",
        short = 'y',
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub assume_yes: Option<bool>,

    /// If set, runs the command asynchronously
    #[arg(
        long = "async",
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub r#async: Option<bool>,
}

impl GlobalFlags {
    /// Layer explicitly passed flags on top of the resolved settings.
    pub fn apply(&self, mut settings: Settings) -> Settings {
        if let Some(id) = self.project_id {
            settings = settings.with_flag(keys::PROJECT_ID, id.to_string());
        }
        if let Some(region) = &self.region {
            settings = settings.with_flag(keys::REGION, region.clone());
        }
        if let Some(format) = self.output_format {
            settings = settings.with_flag(keys::OUTPUT_FORMAT, format.as_str());
        }
        if let Some(level) = self.verbosity {
            settings = settings.with_flag(keys::VERBOSITY, level.as_str());
        }
        if let Some(yes) = self.assume_yes {
            settings = settings.with_flag(keys::ASSUME_YES, yes.to_string());
        }
        if let Some(is_async) = self.r#async {
            settings = settings.with_flag(keys::ASYNC, is_async.to_string());
        }
        settings
    }
}

/// Global values after precedence resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalModel {
    pub project_id: Option<String>,
    pub region: String,
    pub output_format: OutputFormat,
    pub verbosity: Level,
    pub assume_yes: bool,
    pub r#async: bool,
}

impl GlobalModel {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            project_id: settings.project_id(),
            region: settings.region(),
            output_format: settings.output_format(),
            verbosity: settings.verbosity(),
            assume_yes: settings.assume_yes(),
            r#async: settings.is_async(),
        }
    }
}

pub fn parse_uuid(s: &str) -> Result<Uuid, String> {
    Uuid::parse_str(s.trim()).map_err(|e| format!("invalid UUID {s:?}: {e}"))
}

/// Positional UUID. Failures name the argument rather than a flag.
pub fn uuid_arg(arg: &str, value: &str) -> Result<Uuid, CliError> {
    parse_uuid(value).map_err(|details| CliError::arg(arg, details))
}

pub fn parse_cidr(s: &str) -> Result<IpNet, String> {
    s.trim()
        .parse::<IpNet>()
        .map_err(|e| format!("invalid CIDR {s:?}: {e}"))
}

pub fn parse_positive(s: &str) -> Result<i64, String> {
    match s.trim().parse::<i64>() {
        Ok(n) if n > 0 => Ok(n),
        Ok(_) => Err("must be greater than 0".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

/// `key=value` pairs separated by commas.
pub fn parse_string_map(s: &str) -> Result<BTreeMap<String, String>, String> {
    let mut map = BTreeMap::new();
    for pair in s.split(',').filter(|p| !p.trim().is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("{pair:?} must be formatted as key=value"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("{pair:?} has an empty key"));
        }
        map.insert(key.to_string(), value.trim().to_string());
    }
    Ok(map)
}

/// A literal, or with a leading `@` the contents of the named file.
pub fn parse_file_or_literal(s: &str) -> Result<String, String> {
    match s.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path.trim())
            .map_err(|e| format!("read file {:?}: {e}", path.trim())),
        None => Ok(s.to_string()),
    }
}

pub fn parse_record_type(s: &str) -> Result<RecordType, String> {
    let wanted = s.trim().to_ascii_uppercase();
    RecordType::ALL
        .into_iter()
        .find(|t| t.as_str() == wanted)
        .ok_or_else(|| {
            let allowed: Vec<&str> = RecordType::ALL.iter().map(RecordType::as_str).collect();
            format!(
                "{s:?} is not one of the allowed values: {}",
                allowed.join(", ")
            )
        })
}

/// Record set TTL: a duration, or bare seconds.
pub fn parse_record_ttl(s: &str) -> Result<u64, DurationError> {
    let s = s.trim();
    let parser = DurationParser::new().min_seconds(60).max_seconds(99_999_999);
    if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
        parser.parse(&format!("{s}s"))
    } else {
        parser.parse(s)
    }
}

/// Kubeconfig lifetime; the service accepts at most one year.
pub fn parse_kubeconfig_expiration(s: &str) -> Result<u64, DurationError> {
    DurationParser::new()
        .min_seconds(600)
        .max_seconds(365 * 24 * 60 * 60)
        .parse(s)
}

/// `n/a` for absent values in tables.
pub fn or_na<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "n/a".to_string())
}

/// One `key: value` entry per label, in key order.
pub fn label_lines(labels: Option<&BTreeMap<String, serde_json::Value>>) -> Vec<String> {
    labels
        .into_iter()
        .flatten()
        .map(|(k, v)| match v {
            serde_json::Value::String(s) => format!("{k}: {s}"),
            other => format!("{k}: {other}"),
        })
        .collect()
}

/// Labels as a multi-line table cell.
pub fn join_labels(labels: Option<&BTreeMap<String, serde_json::Value>>) -> String {
    label_lines(labels).join("\n")
}
