mod create;

use clap::Subcommand;

use crate::commands::CmdParams;
use crate::errors::CliError;

#[derive(Subcommand, Debug, PartialEq)]
pub enum RecordSetCommands {
    /// Creates a DNS record set
    ///
    /// Waits until the record set is active unless --async is given.
    Create(create::CreateArgs),
}

impl RecordSetCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            RecordSetCommands::Create(args) => create::handle_create(params, args).await,
        }
    }
}
