//! The command tree.
//!
//! Every area is a clap `Subcommand` enum whose `run` dispatches to one handler
//! per leaf. A subtree mounted at more than one path is the same enum embedded
//! at each mount site, so every mount gets its own parsed copy.

use clap::Subcommand;
use serde::Serialize;
use stackit_shared::redact;
use tokio_util::sync::CancellationToken;

use crate::config::{ConfigStore, Settings};
use crate::errors::CliError;
use crate::flags::GlobalModel;
use crate::print::{OutputFormat, Printer};

pub mod auth;
pub mod beta;
pub mod config;
pub mod dns;
pub mod image;
pub mod profile;
pub mod routing_table;
pub mod ske;

pub use auth::AuthCommands;
pub use beta::BetaCommands;
pub use config::ConfigCommands;
pub use dns::DnsCommands;
pub use image::ImageCommands;
pub use profile::ProfileCommands;
pub use routing_table::RoutingTableCommands;
pub use ske::SkeCommands;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate the STACKIT CLI
    #[command(subcommand, arg_required_else_help = true)]
    Auth(AuthCommands),

    /// Provide functionality for CLI configuration options
    #[command(subcommand, arg_required_else_help = true)]
    Config(ConfigCommands),

    /// Manage the CLI configuration profiles
    #[command(subcommand, arg_required_else_help = true)]
    Profile(ProfileCommands),

    /// Manage server images
    #[command(subcommand, arg_required_else_help = true)]
    Image(ImageCommands),

    /// Manage routing tables and their routes
    #[command(name = "routing-table", subcommand, arg_required_else_help = true)]
    RoutingTable(RoutingTableCommands),

    /// Provides functionality for SKE
    #[command(subcommand, arg_required_else_help = true)]
    Ske(SkeCommands),

    /// Provides functionality for DNS
    #[command(subcommand, arg_required_else_help = true)]
    Dns(DnsCommands),

    /// Contains beta STACKIT CLI commands
    #[command(subcommand, arg_required_else_help = true)]
    Beta(BetaCommands),
}

impl Commands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            Commands::Auth(cmd) => cmd.run(params).await,
            Commands::Config(cmd) => cmd.run(params).await,
            Commands::Profile(cmd) => cmd.run(params).await,
            Commands::Image(cmd) => cmd.run(params).await,
            Commands::RoutingTable(cmd) => cmd.run(params).await,
            Commands::Ske(cmd) => cmd.run(params).await,
            Commands::Dns(cmd) => cmd.run(params).await,
            Commands::Beta(cmd) => cmd.run(params).await,
        }
    }
}

/// Everything a handler needs besides its own flags.
pub struct CmdParams {
    pub printer: Printer,
    /// Resolved settings with the global flags applied.
    pub settings: Settings,
    pub global: GlobalModel,
    pub store: ConfigStore,
    pub cancel: CancellationToken,
}

impl CmdParams {
    pub fn new(printer: Printer, settings: Settings, store: ConfigStore) -> Self {
        Self {
            global: GlobalModel::from_settings(&settings),
            printer,
            settings,
            store,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn project_id(&self) -> Result<String, CliError> {
        self.global
            .project_id
            .clone()
            .ok_or(CliError::ProjectIdMissing)
    }

    pub fn output_format(&self) -> OutputFormat {
        self.global.output_format
    }

    /// Ask before a side-effectful call unless `--assume-yes` is in effect.
    pub fn confirm(&self, question: &str) -> Result<(), CliError> {
        if self.global.assume_yes {
            return Ok(());
        }
        self.printer.prompt_for_confirmation(question)?;
        Ok(())
    }

    /// Debug-log a parsed input model with `secrets` redacted.
    pub fn log_input<T: Serialize>(&self, model: &T, secrets: &[&str]) {
        match redact::debug_string(model, secrets) {
            Ok(rendered) => self
                .printer
                .debug(format!("parsed input values: {rendered}")),
            Err(e) => self
                .printer
                .debug(format!("convert input model to string for debugging: {e}")),
        }
    }
}

/// Test scaffolding shared by the handler tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::{ConfigFile, Environment};
    use crate::print::testing::{SharedBuf, buffered};
    use tempfile::TempDir;

    pub const PROJECT_ID: &str = "00000000-0000-0000-0000-000000000001";

    pub struct Harness {
        pub params: CmdParams,
        pub out: SharedBuf,
        pub err: SharedBuf,
        pub dir: TempDir,
    }

    /// Params over buffers with a temp config dir and the given environment.
    pub fn harness(env: &[(&str, &str)], stdin: &str) -> Harness {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path());
        let settings = Settings::new(
            ConfigFile::default(),
            Environment::from_pairs(env.iter().copied()),
        )
        .unwrap();
        let (printer, out, err) = buffered(stdin);
        let printer = printer.with_verbosity(settings.verbosity());
        Harness {
            params: CmdParams::new(printer, settings, store),
            out,
            err,
            dir,
        }
    }

    impl Harness {
        /// Re-resolve the global model after changing settings.
        pub fn with_settings(mut self, f: impl FnOnce(Settings) -> Settings) -> Self {
            let settings = f(self.params.settings.clone());
            self.params.global = GlobalModel::from_settings(&settings);
            self.params.settings = settings;
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::config::keys;
    use crate::print::PrintError;

    #[test]
    fn test_missing_project_id() {
        let h = harness(&[], "");
        assert!(matches!(
            h.params.project_id(),
            Err(CliError::ProjectIdMissing)
        ));
        let h = harness(&[("STACKIT_PROJECT_ID", PROJECT_ID)], "");
        assert_eq!(h.params.project_id().unwrap(), PROJECT_ID);
    }

    #[test]
    fn test_confirmation_required_without_terminal() {
        let h = harness(&[], "y\n");
        assert!(matches!(
            h.params.confirm("Are you sure?"),
            Err(CliError::Print(PrintError::ConfirmationRequired))
        ));

        let h = harness(&[], "").with_settings(|s| s.with_flag(keys::ASSUME_YES, "true"));
        assert!(h.params.confirm("Are you sure?").is_ok());
    }

    #[test]
    fn test_log_input_redacts_secrets() {
        #[derive(serde::Serialize)]
        struct Model {
            name: String,
            token: String,
        }
        let h = harness(&[("STACKIT_VERBOSITY", "debug")], "");
        h.params.log_input(
            &Model {
                name: "x".into(),
                token: "secret".into(),
            },
            &["token"],
        );
        let err = h.err.contents();
        assert!(err.contains("parsed input values: [name: x, token: <redacted>]"));
        assert!(!err.contains("secret"));
    }
}
