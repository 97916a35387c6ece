//! Error taxonomy of the binary and its exit codes.

use crate::config::ConfigError;
use crate::print::PrintError;
use stackit_api::{ApiError, WaitError};
use stackit_shared::auth::AuthError;
use stackit_shared::cache::CacheError;
use thiserror::Error;

pub const MISSING_PROJECT_ID: &str = "the project ID is not currently set.

It can be set on the command level by re-running your command with the --project-id flag.

You can configure it for all commands by running:

  $ stackit config set --project-id xxx

or you can also set it through the environment variable [STACKIT_PROJECT_ID]";

pub const EMPTY_UPDATE: &str = "please specify at least one field to update.

Get details on the available flags by re-running your command with the --help flag.";

pub const FAILED_AUTH: &str = "you are not authenticated.

You can authenticate as a user by running:
  $ stackit auth login

or use a service account by running:
  $ stackit auth activate-service-account";

pub const FAILED_SERVICE_ACCOUNT_ACTIVATION: &str = "could not setup authentication based on the provided service account credentials.
Please double check if they are correctly configured.

For more details run:
  $ stackit auth activate-service-account -h";

pub const MUTATION_HINT: &str =
    "the operation was started; re-run with --async or query the resource state";

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("the provided flag --{flag} is invalid: {details}")]
    FlagValidation { flag: String, details: String },

    #[error("the provided argument \"{arg}\" is invalid: {details}")]
    ArgValidation { arg: String, details: String },

    #[error("{}", MISSING_PROJECT_ID)]
    ProjectIdMissing,

    #[error("{}", EMPTY_UPDATE)]
    EmptyUpdate,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("{}", auth_message(.0))]
    Auth(#[from] AuthError),

    #[error("{msg}\n\n{0}", msg = FAILED_SERVICE_ACCOUNT_ACTIVATION)]
    ServiceAccountActivation(AuthError),

    #[error(transparent)]
    Remote(#[from] ApiError),

    /// Waiting failed after the backend accepted a mutation.
    #[error("{source}\n\n{}", MUTATION_HINT)]
    Wait {
        #[source]
        source: WaitError,
    },

    #[error(transparent)]
    Print(#[from] PrintError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<CliError>,
    },

    #[error("{0}")]
    Other(String),
}

fn auth_message(err: &AuthError) -> String {
    match err {
        AuthError::NotLoggedIn => FAILED_AUTH.to_string(),
        AuthError::TokenExpiredAndUnrefreshable(_) | AuthError::AuthEndpointUnreachable { .. } => {
            format!("{err}\n\n{FAILED_AUTH}")
        }
        other => other.to_string(),
    }
}

impl CliError {
    pub fn flag(flag: impl Into<String>, details: impl ToString) -> Self {
        Self::FlagValidation {
            flag: flag.into(),
            details: details.to_string(),
        }
    }

    pub fn arg(arg: impl Into<String>, details: impl ToString) -> Self {
        Self::ArgValidation {
            arg: arg.into(),
            details: details.to_string(),
        }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Wait failure after a successful mutation.
    pub fn wait(source: WaitError) -> Self {
        Self::Wait { source }
    }

    /// Innermost error of a context chain.
    pub fn root(&self) -> &CliError {
        match self {
            CliError::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// 2 for input problems, 1 for everything else.
    pub fn exit_code(&self) -> u8 {
        match self.root() {
            CliError::Usage(_)
            | CliError::FlagValidation { .. }
            | CliError::ArgValidation { .. }
            | CliError::ProjectIdMissing
            | CliError::EmptyUpdate => 2,
            CliError::Config(e) if e.is_usage() => 2,
            _ => 1,
        }
    }

    /// Full cause chain with variant names, for debug verbosity.
    pub fn debug_chain(&self) -> Vec<String> {
        let mut chain = vec![format!("{self:?}")];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }
        chain
    }
}

/// Prefix errors with a one-line context.
pub trait Context<T> {
    fn context(self, context: impl Into<String>) -> Result<T, CliError>;
}

impl<T, E: Into<CliError>> Context<T> for Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T, CliError> {
        self.map_err(|e| CliError::Context {
            context: context.into(),
            source: Box::new(e.into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(err: &CliError) -> u8 {
        err.exit_code()
    }

    #[test]
    fn test_usage_errors_exit_two() {
        assert_eq!(code(&CliError::Usage("bad".into())), 2);
        assert_eq!(code(&CliError::flag("ttl", "x")), 2);
        assert_eq!(code(&CliError::ProjectIdMissing), 2);
        assert_eq!(code(&CliError::EmptyUpdate), 2);
        assert_eq!(
            code(&CliError::Config(ConfigError::UnknownKey("k".into()))),
            2
        );
    }

    #[test]
    fn test_operational_errors_exit_one() {
        assert_eq!(code(&CliError::Auth(AuthError::NotLoggedIn)), 1);
        assert_eq!(
            code(&CliError::wait(WaitError::Failed {
                reason: "InsufficientQuota".into()
            })),
            1
        );
        assert_eq!(
            code(&CliError::Print(PrintError::ConfirmationRequired)),
            1
        );
    }

    #[test]
    fn test_context_keeps_exit_code_and_prefixes_message() {
        let err: Result<(), CliError> = Err(CliError::flag("limit", "must be greater than 0"));
        let err = err.context("list images").unwrap_err();
        assert_eq!(
            err.to_string(),
            "list images: the provided flag --limit is invalid: must be greater than 0"
        );
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_wait_failure_carries_hint() {
        let err: Result<(), WaitError> = Err(WaitError::Failed {
            reason: "InsufficientQuota".into(),
        });
        let err = err
            .map_err(CliError::wait)
            .context("wait for SKE cluster creation")
            .unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("wait for SKE cluster creation: InsufficientQuota"));
        assert!(message.ends_with(MUTATION_HINT));
    }

    #[test]
    fn test_auth_message_has_remediation() {
        let message = CliError::Auth(AuthError::NotLoggedIn).to_string();
        assert!(message.starts_with("you are not authenticated."));
        assert!(message.contains("$ stackit auth login"));
        assert!(message.contains("$ stackit auth activate-service-account"));
    }

    #[test]
    fn test_service_account_activation_shows_cause() {
        let err = CliError::ServiceAccountActivation(AuthError::InvalidServiceAccountKey(
            "missing private key".into(),
        ));
        let message = err.to_string();
        assert!(message.starts_with(FAILED_SERVICE_ACCOUNT_ACTIVATION));
        assert!(message.ends_with("\n\ninvalid service account key: missing private key"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_argument_errors_name_the_argument() {
        let err = CliError::arg("IMAGE_ID", "not a UUID");
        assert!(
            err.to_string()
                .starts_with("the provided argument \"IMAGE_ID\" is invalid: ")
        );
        assert_eq!(err.exit_code(), 2);
    }
}
