//! `stackit routing-table route list | describe`

mod describe;
mod list;

use clap::{Args, Subcommand};
use serde::Serialize;
use stackit_api::iaas::RoutingTableRef;
use uuid::Uuid;

use crate::commands::CmdParams;
use crate::errors::CliError;
use crate::flags::parse_uuid;

#[derive(Subcommand, Debug, PartialEq)]
pub enum RoutingTableCommands {
    /// Manage routes of a routing table
    #[command(subcommand, arg_required_else_help = true)]
    Route(RouteCommands),
}

impl RoutingTableCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            RoutingTableCommands::Route(cmd) => cmd.run(params).await,
        }
    }
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum RouteCommands {
    /// Lists all routes in a routing table
    List(list::ListArgs),

    /// Describes a route in a routing table
    Describe(describe::DescribeArgs),
}

impl RouteCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            RouteCommands::List(args) => list::handle_list(params, args).await,
            RouteCommands::Describe(args) => describe::handle_describe(params, args).await,
        }
    }
}

/// Location of the routing table; the region comes from the global flags.
#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct TableFlags {
    /// Organization ID
    #[arg(long = "organization-id", value_parser = parse_uuid)]
    pub organization_id: Uuid,

    /// Network-Area ID
    #[arg(long = "network-area-id", value_parser = parse_uuid)]
    pub network_area_id: Uuid,

    /// Routing-Table ID
    #[arg(long = "routing-table-id", value_parser = parse_uuid)]
    pub routing_table_id: Uuid,
}

impl TableFlags {
    fn table_ref(&self, params: &CmdParams) -> RoutingTableRef {
        RoutingTableRef {
            organization_id: self.organization_id.to_string(),
            network_area_id: self.network_area_id.to_string(),
            region: params.global.region.clone(),
            routing_table_id: self.routing_table_id.to_string(),
        }
    }
}

fn format_time(time: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(subcommand)]
        command: RoutingTableCommands,
    }

    #[test]
    fn test_table_flags_are_required_uuids() {
        let parsed = Harness::try_parse_from([
            "stackit",
            "route",
            "list",
            "--organization-id",
            "00000000-0000-0000-0000-00000000000a",
            "--network-area-id",
            "00000000-0000-0000-0000-00000000000b",
            "--routing-table-id",
            "00000000-0000-0000-0000-00000000000c",
        ]);
        assert!(parsed.is_ok());
        assert!(Harness::try_parse_from(["stackit", "route", "list"]).is_err());
        assert!(
            Harness::try_parse_from([
                "stackit",
                "route",
                "list",
                "--organization-id",
                "org",
                "--network-area-id",
                "00000000-0000-0000-0000-00000000000b",
                "--routing-table-id",
                "00000000-0000-0000-0000-00000000000c",
            ])
            .is_err()
        );
    }

    #[test]
    fn test_time_is_rfc3339() {
        let t: chrono::DateTime<chrono::Utc> = "2024-05-01T10:00:00Z".parse().unwrap();
        assert_eq!(format_time(Some(&t)), "2024-05-01T10:00:00Z");
        assert_eq!(format_time(None), "");
    }
}
