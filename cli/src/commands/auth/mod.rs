//! Authentication commands.
//!
//! - `stackit auth login` - browser login as a user
//! - `stackit auth logout` - forget the active profile's credentials
//! - `stackit auth activate-service-account` - authenticate with a service account
//! - `stackit auth get-access-token` - print a valid access token

mod activate_service_account;
mod get_access_token;
mod login;
mod logout;

pub use activate_service_account::ActivateServiceAccountArgs;
pub(crate) use login::handle_login;

use crate::commands::CmdParams;
use crate::errors::CliError;
use clap::Subcommand;

#[derive(Subcommand, Debug, PartialEq)]
pub enum AuthCommands {
    /// Logs in to the STACKIT CLI
    ///
    /// Opens a browser window for the user to authenticate. The session is
    /// capped by the `session.time-limit` setting: once it is reached, a new
    /// login is required even if the identity provider would still refresh
    /// the token.
    Login,

    /// Logs the user account out of the STACKIT CLI
    Logout,

    /// Authenticates using a service account
    #[command(name = "activate-service-account")]
    ActivateServiceAccount(ActivateServiceAccountArgs),

    /// Prints a short-lived access token
    #[command(name = "get-access-token")]
    GetAccessToken,
}

impl AuthCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            AuthCommands::Login => login::handle_login(params).await,
            AuthCommands::Logout => logout::handle_logout(params),
            AuthCommands::ActivateServiceAccount(args) => {
                activate_service_account::handle_activate(params, args).await
            }
            AuthCommands::GetAccessToken => get_access_token::handle_get_access_token(params).await,
        }
    }
}
