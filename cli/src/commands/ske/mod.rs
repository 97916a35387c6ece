//! `stackit ske` - STACKIT Kubernetes Engine.

pub mod cluster;
pub mod kubeconfig;

use clap::Subcommand;

pub use cluster::ClusterCommands;
pub use kubeconfig::KubeconfigCommands;

use crate::commands::CmdParams;
use crate::errors::CliError;

#[derive(Subcommand, Debug, PartialEq)]
pub enum SkeCommands {
    /// Provides functionality for SKE clusters
    #[command(subcommand, arg_required_else_help = true)]
    Cluster(ClusterCommands),

    /// Provides functionality for SKE kubeconfig
    #[command(subcommand, arg_required_else_help = true)]
    Kubeconfig(KubeconfigCommands),
}

impl SkeCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            SkeCommands::Cluster(cmd) => cmd.run(params).await,
            SkeCommands::Kubeconfig(cmd) => cmd.run(params).await,
        }
    }
}
