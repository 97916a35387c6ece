//! Browser login with the authorization code flow.

use crate::client::{auth_settings, authenticator, http_client};
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use stackit_shared::auth::AuthError;
use stackit_shared::oauth::{CallbackListener, OAuthConfig, OAuthFlow};

const SUCCESS_PAGE: &str = "<!DOCTYPE html>
<html>
<head><title>STACKIT CLI</title></head>
<body>
<h1>You have been successfully logged in to the STACKIT CLI.</h1>
<p>You can close this window and return to the terminal.</p>
</body>
</html>";

pub async fn handle_login(params: &CmdParams) -> Result<(), CliError> {
    let settings = auth_settings(&params.settings);
    let listener = CallbackListener::bind()
        .await
        .map_err(|e| AuthError::from_grant(e, AuthError::Login))
        .context("start login callback server")?;
    let flow = OAuthFlow::new(OAuthConfig::for_idp(
        &settings.idp_endpoint,
        &settings.client_id,
        listener.redirect_url(),
    ));

    let url = flow.authorization_url();
    params.printer.debug(format!("opening browser for {url}"));
    if open::that(&url).is_err() {
        params.printer.info(format!(
            "Failed to open a browser automatically. Open this URL to log in:\n\n  {url}\n"
        ));
    } else {
        params
            .printer
            .info("A browser window was opened to authenticate. Waiting for the login to complete.");
    }

    let code = tokio::select! {
        _ = params.cancel.cancelled() => return Err(CliError::Other("login cancelled".to_string())),
        code = listener.wait_for_code(flow.state(), SUCCESS_PAGE.to_string()) => code,
    }
    .map_err(|e| AuthError::from_grant(e, AuthError::Login))?;

    let tokens = flow
        .exchange_code(&http_client()?, &code)
        .await
        .map_err(|e| AuthError::from_grant(e, AuthError::Login))?;
    let email = authenticator(params)?.complete_user_login(tokens)?;

    params
        .printer
        .info(format!("Successfully logged into STACKIT CLI as {email}.\n"));
    Ok(())
}
