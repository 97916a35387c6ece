//! Service account activation from a token or a key file.

use crate::client::authenticator;
use crate::commands::CmdParams;
use crate::config::keys;
use crate::errors::CliError;
use clap::Args;
use serde::Serialize;
use stackit_shared::auth::{AuthError, ServiceAccountKey};

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize)]
pub struct ActivateServiceAccountArgs {
    /// Service account long-lived access token
    #[arg(
        long = "service-account-token",
        env = "STACKIT_SERVICE_ACCOUNT_TOKEN",
        hide_env_values = true,
        conflicts_with = "service_account_key_path"
    )]
    pub service_account_token: Option<String>,

    /// Service account key path
    #[arg(
        long = "service-account-key-path",
        env = "STACKIT_SERVICE_ACCOUNT_KEY_PATH"
    )]
    pub service_account_key_path: Option<String>,

    /// RSA private key path. It takes precedence over the private key
    /// included in the service account key, if present
    #[arg(
        long = "private-key-path",
        env = "STACKIT_PRIVATE_KEY_PATH",
        requires = "service_account_key_path"
    )]
    pub private_key_path: Option<String>,

    /// Custom endpoint for the token API, which is used to request access tokens
    /// when the service account authentication is activated
    #[arg(long = "token-custom-endpoint")]
    pub token_custom_endpoint: Option<String>,
}

const SECRET_FIELDS: &[&str] = &["service_account_token"];

/// How the service account is presented.
#[derive(Debug, PartialEq)]
enum Activation {
    Token(String),
    Key {
        key_json: String,
        private_key: Option<String>,
    },
}

fn parse_input(args: &ActivateServiceAccountArgs) -> Result<Activation, CliError> {
    if let Some(token) = args
        .service_account_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
    {
        return Ok(Activation::Token(token.trim().to_string()));
    }
    let Some(key_path) = args.service_account_key_path.as_deref() else {
        return Err(CliError::Usage(
            "either --service-account-token or --service-account-key-path must be provided"
                .to_string(),
        ));
    };
    let key_json = std::fs::read_to_string(key_path)
        .map_err(|e| CliError::io(format!("read service account key {key_path:?}"), e))?;
    let private_key = args
        .private_key_path
        .as_deref()
        .map(|path| {
            std::fs::read_to_string(path)
                .map_err(|e| CliError::io(format!("read private key {path:?}"), e))
        })
        .transpose()?;
    Ok(Activation::Key {
        key_json,
        private_key,
    })
}

pub async fn handle_activate(
    params: &CmdParams,
    args: ActivateServiceAccountArgs,
) -> Result<(), CliError> {
    params.log_input(&args, SECRET_FIELDS);
    let activation = parse_input(&args)?;
    let token_endpoint = args
        .token_custom_endpoint
        .clone()
        .or_else(|| params.settings.get(keys::TOKEN_CUSTOM_ENDPOINT));

    let auth = authenticator(params)?;
    let email = match activation {
        Activation::Token(token) => auth
            .activate_service_account_token(&token)
            .map_err(CliError::ServiceAccountActivation)?,
        Activation::Key {
            key_json,
            private_key,
        } => {
            let key = ServiceAccountKey::parse(&key_json, private_key)
                .map_err(CliError::ServiceAccountActivation)?;
            let email = auth
                .activate_service_account_key(key, token_endpoint)
                .await
                .map_err(|e| match e {
                    AuthError::AuthEndpointUnreachable { .. } => CliError::Auth(e),
                    other => CliError::ServiceAccountActivation(other),
                })?;
            Some(email)
        }
    };

    match email {
        Some(email) => params.printer.info(format!(
            "You have been successfully authenticated to the STACKIT CLI!\nService account email: {email}\n"
        )),
        None => params
            .printer
            .info("You have been successfully authenticated to the STACKIT CLI!\n"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        args: ActivateServiceAccountArgs,
    }

    #[test]
    fn test_token_and_key_path_conflict() {
        let err = Harness::try_parse_from([
            "stackit",
            "--service-account-token",
            "t",
            "--service-account-key-path",
            "k.json",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_private_key_requires_key_path() {
        assert!(Harness::try_parse_from(["stackit", "--private-key-path", "p.pem"]).is_err());
    }

    #[test]
    fn test_parse_input() {
        let token = ActivateServiceAccountArgs {
            service_account_token: Some(" tok ".into()),
            ..Default::default()
        };
        assert_eq!(parse_input(&token).unwrap(), Activation::Token("tok".into()));

        assert!(matches!(
            parse_input(&ActivateServiceAccountArgs::default()),
            Err(CliError::Usage(_))
        ));

        let dir = tempfile::TempDir::new().unwrap();
        let key_path = dir.path().join("key.json");
        let pem_path = dir.path().join("key.pem");
        std::fs::write(&key_path, "{}").unwrap();
        std::fs::write(&pem_path, "PEM").unwrap();
        let key = ActivateServiceAccountArgs {
            service_account_key_path: Some(key_path.display().to_string()),
            private_key_path: Some(pem_path.display().to_string()),
            ..Default::default()
        };
        assert_eq!(
            parse_input(&key).unwrap(),
            Activation::Key {
                key_json: "{}".into(),
                private_key: Some("PEM".into())
            }
        );
    }

    #[test]
    fn test_secret_token_is_redacted() {
        let args = ActivateServiceAccountArgs {
            service_account_token: Some("very-secret".into()),
            ..Default::default()
        };
        let rendered = stackit_shared::redact::debug_string(&args, SECRET_FIELDS).unwrap();
        assert_eq!(rendered, "[service_account_token: <redacted>]");
    }
}
