use crate::client::authenticator;
use crate::commands::CmdParams;
use crate::errors::CliError;

/// Print a valid bearer, refreshing it when needed.
pub async fn handle_get_access_token(params: &CmdParams) -> Result<(), CliError> {
    let token = authenticator(params)?.access_token().await?;
    params.printer.outputln(token)?;
    Ok(())
}
