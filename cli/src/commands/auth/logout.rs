use crate::client::authenticator;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};

pub fn handle_logout(params: &CmdParams) -> Result<(), CliError> {
    authenticator(params)?
        .logout()
        .context("log out failed")?;
    params
        .printer
        .info("Successfully logged out of the STACKIT CLI.\n");
    Ok(())
}
