mod create;
mod login;

use clap::Subcommand;

use crate::commands::CmdParams;
use crate::errors::CliError;

#[derive(Subcommand, Debug, PartialEq)]
pub enum KubeconfigCommands {
    /// Creates or updates a local kubeconfig file of an SKE cluster
    ///
    /// By default the kubeconfig is written to .kube/config in the home
    /// directory and merged with the clusters, users and contexts already
    /// there. --overwrite replaces the file instead. An expiration time can be
    /// given in seconds (s), minutes (m), hours (h), days (d) or months (M),
    /// e.g. 30d; the service default is 1h.
    Create(create::CreateArgs),

    /// Login plugin for Kubernetes clients
    ///
    /// Creates short-lived credentials for an SKE cluster. Use it through a
    /// kubeconfig from `stackit ske kubeconfig create CLUSTER --login`; the
    /// Kubernetes client then calls this command to obtain credentials.
    Login,
}

impl KubeconfigCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            KubeconfigCommands::Create(args) => create::handle_create(params, args).await,
            KubeconfigCommands::Login => login::handle_login(params).await,
        }
    }
}
