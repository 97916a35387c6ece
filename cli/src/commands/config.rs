//! `stackit config set | unset | list`

use clap::{Args, Subcommand};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::commands::CmdParams;
use crate::config::{ConfigError, Source, keys};
use crate::errors::CliError;
use crate::print::Table;

#[derive(Subcommand, Debug, PartialEq)]
pub enum ConfigCommands {
    /// Sets CLI configuration options
    ///
    /// Values given through the global flags (--project-id, --region,
    /// --output-format, --verbosity, --assume-yes, --async) and the flags
    /// below are stored in the active profile.
    Set(SetArgs),

    /// Unsets CLI configuration options
    Unset(UnsetArgs),

    /// Lists the current CLI configuration values
    List,
}

impl ConfigCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            ConfigCommands::Set(args) => handle_set(params, args),
            ConfigCommands::Unset(args) => handle_unset(params, args),
            ConfigCommands::List => handle_list(params),
        }
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize)]
pub struct SetArgs {
    /// Maximum time before the user session expires and a new login is
    /// required, e.g. 30m or 12h. Reaching it forces a new login even if the
    /// token could still be refreshed
    #[arg(long = "session-time-limit")]
    pub session_time_limit: Option<String>,

    /// Identity provider base URL, used for user authentication
    #[arg(long = "identity-provider-custom-endpoint")]
    pub identity_provider_custom_endpoint: Option<String>,

    /// Identity provider client ID, used for user authentication
    #[arg(long = "identity-provider-custom-client-id")]
    pub identity_provider_custom_client_id: Option<String>,

    /// Custom endpoint for the token API
    #[arg(long = "token-custom-endpoint")]
    pub token_custom_endpoint: Option<String>,

    /// IaaS API base URL
    #[arg(long = "iaas-custom-endpoint")]
    pub iaas_custom_endpoint: Option<String>,

    /// SKE API base URL
    #[arg(long = "ske-custom-endpoint")]
    pub ske_custom_endpoint: Option<String>,

    /// DNS API base URL
    #[arg(long = "dns-custom-endpoint")]
    pub dns_custom_endpoint: Option<String>,

    /// Resource Manager API base URL
    #[arg(long = "resource-manager-custom-endpoint")]
    pub resource_manager_custom_endpoint: Option<String>,

    /// Service Account API base URL
    #[arg(long = "service-account-custom-endpoint")]
    pub service_account_custom_endpoint: Option<String>,

    /// Authorization API base URL
    #[arg(long = "authorization-custom-endpoint")]
    pub authorization_custom_endpoint: Option<String>,

    /// KMS API base URL
    #[arg(long = "kms-custom-endpoint")]
    pub kms_custom_endpoint: Option<String>,

    /// Secrets Manager API base URL
    #[arg(long = "secrets-manager-custom-endpoint")]
    pub secrets_manager_custom_endpoint: Option<String>,

    /// Load Balancer API base URL
    #[arg(long = "load-balancer-custom-endpoint")]
    pub load_balancer_custom_endpoint: Option<String>,

    /// Object Storage API base URL
    #[arg(long = "object-storage-custom-endpoint")]
    pub object_storage_custom_endpoint: Option<String>,
}

impl SetArgs {
    fn values(&self) -> Vec<(String, &String)> {
        let fixed = [
            (keys::SESSION_TIME_LIMIT, &self.session_time_limit),
            (keys::IDP_CUSTOM_ENDPOINT, &self.identity_provider_custom_endpoint),
            (keys::IDP_CUSTOM_CLIENT_ID, &self.identity_provider_custom_client_id),
            (keys::TOKEN_CUSTOM_ENDPOINT, &self.token_custom_endpoint),
        ];
        let endpoints = [
            ("iaas", &self.iaas_custom_endpoint),
            ("ske", &self.ske_custom_endpoint),
            ("dns", &self.dns_custom_endpoint),
            ("resource-manager", &self.resource_manager_custom_endpoint),
            ("service-account", &self.service_account_custom_endpoint),
            ("authorization", &self.authorization_custom_endpoint),
            ("kms", &self.kms_custom_endpoint),
            ("secrets-manager", &self.secrets_manager_custom_endpoint),
            ("load-balancer", &self.load_balancer_custom_endpoint),
            ("object-storage", &self.object_storage_custom_endpoint),
        ];
        fixed
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .chain(
                endpoints
                    .into_iter()
                    .map(|(svc, value)| (keys::custom_endpoint_key(svc), value)),
            )
            .filter_map(|(key, value)| value.as_ref().map(|v| (key, v)))
            .collect()
    }
}

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnsetArgs {
    /// Setting keys to remove, e.g. project.id or iaas.custom-endpoint
    #[arg(required = true, value_name = "KEY")]
    pub keys: Vec<String>,
}

/// Validated `key = value` pairs to store.
fn parse_set_input(
    params: &CmdParams,
    args: &SetArgs,
) -> Result<BTreeMap<String, String>, CliError> {
    let mut raw: Vec<(String, String)> = keys::catalog()
        .into_iter()
        .filter_map(|key| match params.settings.resolve(&key.name) {
            Some((value, Source::Flag)) => Some((key.name, value)),
            _ => None,
        })
        .collect();
    raw.extend(args.values().into_iter().map(|(k, v)| (k, v.clone())));

    if raw.is_empty() {
        return Err(CliError::EmptyUpdate);
    }
    raw.into_iter()
        .map(|(key, value)| {
            let setting = keys::lookup(&key).ok_or_else(|| ConfigError::UnknownKey(key.clone()))?;
            let canonical = setting
                .validate(&value)
                .map_err(|reason| ConfigError::InvalidValue {
                    key: key.clone(),
                    reason,
                })?;
            Ok((key, canonical))
        })
        .collect()
}

fn handle_set(params: &CmdParams, args: SetArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let values = parse_set_input(params, &args)?;
    let profile = params.settings.profile().to_string();
    params.store.update(|file| {
        let stored = file.profiles.entry(profile.clone()).or_default();
        for (key, value) in &values {
            stored.insert(key.clone(), value.clone());
        }
        Ok(())
    })?;
    for key in values.keys() {
        params.printer.debug(format!("set {key} in profile {profile}"));
    }
    Ok(())
}

fn handle_unset(params: &CmdParams, args: UnsetArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    for key in &args.keys {
        if keys::lookup(key).is_none() {
            return Err(ConfigError::UnknownKey(key.clone()).into());
        }
    }
    let profile = params.settings.profile().to_string();
    params.store.update(|file| {
        if let Some(stored) = file.profiles.get_mut(&profile) {
            for key in &args.keys {
                stored.remove(key);
            }
        }
        Ok(())
    })?;
    Ok(())
}

#[derive(Serialize)]
struct ListedValue {
    value: String,
    source: &'static str,
}

fn handle_list(params: &CmdParams) -> Result<(), CliError> {
    // Flags only live for this invocation, so they are not part of the configuration.
    let configured: BTreeMap<String, ListedValue> = params
        .settings
        .configured()
        .into_iter()
        .filter(|(_, _, source)| *source != Source::Flag)
        .map(|(key, value, source)| {
            (
                key.name,
                ListedValue {
                    value,
                    source: source.as_str(),
                },
            )
        })
        .collect();

    let values: BTreeMap<&String, &String> =
        configured.iter().map(|(k, v)| (k, &v.value)).collect();
    params
        .printer
        .output_result(params.output_format(), &values, || {
            if configured.is_empty() {
                params.printer.info(format!(
                    "No configuration values set for profile {:?}",
                    params.settings.profile()
                ));
                return Ok::<(), CliError>(());
            }
            let mut table = Table::new();
            table.set_title(format!("Profile: {}", params.settings.profile()));
            table.set_header(["NAME", "VALUE", "SOURCE"]);
            for (key, listed) in &configured {
                table.add_row([key.as_str(), listed.value.as_str(), listed.source]);
            }
            params.printer.output_table(table)?;
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{PROJECT_ID, harness};
    use crate::print::OutputFormat;

    #[test]
    fn test_set_stores_global_flags_and_service_endpoints() {
        let h = harness(&[], "").with_settings(|s| s.with_flag(keys::PROJECT_ID, PROJECT_ID));
        handle_set(
            &h.params,
            SetArgs {
                iaas_custom_endpoint: Some("http://localhost:8080".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let file = h.params.store.load().unwrap();
        let stored = file.active_values().unwrap();
        assert_eq!(stored.get("project.id").map(String::as_str), Some(PROJECT_ID));
        assert_eq!(
            stored.get("iaas.custom-endpoint").map(String::as_str),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn test_set_without_values_is_an_empty_update() {
        let h = harness(&[], "");
        let err = handle_set(&h.params, SetArgs::default()).unwrap_err();
        assert!(matches!(err, CliError::EmptyUpdate));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_set_rejects_invalid_values_before_writing() {
        let h = harness(&[], "");
        let err = handle_set(
            &h.params,
            SetArgs {
                session_time_limit: Some("48h".into()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(!h.params.store.path().exists());
    }

    #[test]
    fn test_unset_removes_keys() {
        let h = harness(&[], "").with_settings(|s| s.with_flag(keys::REGION, "eu02"));
        handle_set(&h.params, SetArgs::default()).unwrap();
        handle_unset(
            &h.params,
            UnsetArgs {
                keys: vec!["region".into()],
            },
        )
        .unwrap();
        let file = h.params.store.load().unwrap();
        assert!(file.active_values().unwrap().get("region").is_none());

        let err = handle_unset(
            &h.params,
            UnsetArgs {
                keys: vec!["nope".into()],
            },
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_list_json_skips_flag_values() {
        let h = harness(&[("STACKIT_REGION", "eu02")], "").with_settings(|s| {
            s.with_flag(keys::OUTPUT_FORMAT, OutputFormat::Json.as_str())
        });
        handle_list(&h.params).unwrap();
        let listed: serde_json::Value = serde_json::from_str(&h.out.contents()).unwrap();
        assert_eq!(listed, serde_json::json!({"region": "eu02"}));
    }

    #[test]
    fn test_list_pretty_table() {
        let h = harness(&[("STACKIT_REGION", "eu02")], "");
        handle_list(&h.params).unwrap();
        let out = h.out.contents();
        assert!(out.starts_with("Profile: default\n"));
        assert!(out.contains("region │ eu02  │ env"));
    }
}
