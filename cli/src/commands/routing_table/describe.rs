use clap::Args;
use serde::Serialize;
use stackit_api::Service;
use stackit_api::iaas::{GetRouteRequest, Route};

use super::{TableFlags, format_time};
use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::{label_lines, uuid_arg};
use crate::print::Table;

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct DescribeArgs {
    /// Route ID
    #[arg(value_name = "ROUTE_ID")]
    pub route_id: String,

    #[command(flatten)]
    pub table: TableFlags,
}

fn build_request(params: &CmdParams, args: &DescribeArgs) -> Result<GetRouteRequest, CliError> {
    Ok(GetRouteRequest {
        table: args.table.table_ref(params),
        route_id: uuid_arg("ROUTE_ID", &args.route_id)?.to_string(),
    })
}

pub async fn handle_describe(params: &CmdParams, args: DescribeArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = build_request(params, &args)?;
    let client = configure(params, Service::Iaas).await?;

    let route = request
        .execute(&client)
        .await
        .context("describe route")?;
    params
        .printer
        .output_result(params.output_format(), &route, || {
            params.printer.output_table(build_table(&route))?;
            Ok::<(), CliError>(())
        })
}

fn build_table(route: &Route) -> Table {
    let destination = route.destination.clone().unwrap_or_default();
    let mut table = Table::new();
    table.set_header([
        "ID",
        "CREATED_AT",
        "UPDATED_AT",
        "DESTINATION TYPE",
        "DESTINATION VALUE",
        "NEXTHOP TYPE",
        "NEXTHOP VALUE",
        "LABELS",
    ]);
    let mut labels = label_lines(route.labels.as_ref());
    if labels.is_empty() {
        labels.push(String::new());
    }
    // The next-hop columns repeat the destination fields; scripts parse this output.
    for label in labels {
        table.add_row([
            route.id.clone().unwrap_or_default(),
            format_time(route.created_at.as_ref()),
            format_time(route.updated_at.as_ref()),
            destination.kind.clone().unwrap_or_default(),
            destination.value.clone().unwrap_or_default(),
            destination.kind.clone().unwrap_or_default(),
            destination.value.clone().unwrap_or_default(),
            label,
        ]);
    }
    // One row per label; the route fields print on the first only.
    table.enable_auto_merge(&[0, 1, 2, 3, 4, 5, 6]);
    table
}
