//! `stackit beta` - commands whose interface may still change.

use clap::Subcommand;

use super::RoutingTableCommands;
use crate::commands::CmdParams;
use crate::errors::CliError;

#[derive(Subcommand, Debug, PartialEq)]
pub enum BetaCommands {
    /// Manage routing tables and their routes
    #[command(name = "routing-table", subcommand, arg_required_else_help = true)]
    RoutingTable(RoutingTableCommands),
}

impl BetaCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            BetaCommands::RoutingTable(cmd) => cmd.run(params).await,
        }
    }
}
