//! `stackit dns` - zones and record sets.

mod record_set;

use clap::Subcommand;
use stackit_api::ApiClient;
use stackit_api::dns::GetZoneRequest;

use crate::commands::CmdParams;
use crate::errors::CliError;

pub use record_set::RecordSetCommands;

#[derive(Subcommand, Debug, PartialEq)]
pub enum DnsCommands {
    /// Provides functionality for DNS record sets
    #[command(name = "record-set", subcommand, arg_required_else_help = true)]
    RecordSet(RecordSetCommands),
}

impl DnsCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            DnsCommands::RecordSet(cmd) => cmd.run(params).await,
        }
    }
}

/// Zone name for messages, else the zone id.
pub(crate) async fn zone_label(
    params: &CmdParams,
    client: &ApiClient,
    request: GetZoneRequest,
) -> String {
    match request.execute(client).await {
        Ok(response) => match response.zone.name {
            Some(name) if !name.is_empty() => name,
            _ => request.zone_id,
        },
        Err(e) => {
            params.printer.debug(format!("get zone name: {e}"));
            request.zone_id
        }
    }
}
