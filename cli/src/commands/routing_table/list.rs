use clap::Args;
use serde::Serialize;
use stackit_api::Service;
use stackit_api::iaas::{ListRoutesRequest, Route};

use super::{TableFlags, format_time};
use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::{join_labels, or_na, parse_positive};
use crate::print::Table;

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct ListArgs {
    #[command(flatten)]
    pub table: TableFlags,

    /// Filter routes by labels, e.g. env=prod
    #[arg(long = "label-selector")]
    pub label_selector: Option<String>,

    /// Maximum number of entries to list
    #[arg(long, value_parser = parse_positive)]
    pub limit: Option<i64>,
}

fn build_request(params: &CmdParams, args: &ListArgs) -> ListRoutesRequest {
    ListRoutesRequest {
        table: args.table.table_ref(params),
        label_selector: args.label_selector.clone(),
    }
}

pub async fn handle_list(params: &CmdParams, args: ListArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = build_request(params, &args);
    let client = configure(params, Service::Iaas).await?;

    let mut items = request
        .execute(&client)
        .await
        .context("list routes")?
        .items;
    if let Some(limit) = args.limit {
        items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }

    if items.is_empty() {
        params.printer.outputln(format!(
            "No routes  found for routing-table {:?}",
            request.table.routing_table_id
        ))?;
        return Ok(());
    }
    params
        .printer
        .output_result(params.output_format(), &items, || {
            params.printer.output_table(build_table(&items))?;
            Ok::<(), CliError>(())
        })
}

fn build_table(items: &[Route]) -> Table {
    let mut table = Table::new();
    table.set_header([
        "ID",
        "DEST. TYPE",
        "DEST. VALUE",
        "NEXTHOP TYPE",
        "NEXTHOP VALUE",
        "LABELS",
        "CREATED",
        "UPDATED",
    ]);
    for route in items {
        let destination = route.destination.clone().unwrap_or_default();
        let nexthop = route.nexthop.clone().unwrap_or_default();
        table.add_row([
            or_na(route.id.as_ref()),
            or_na(destination.kind.as_ref()),
            or_na(destination.value.as_ref()),
            or_na(nexthop.kind.as_ref()),
            or_na(nexthop.value.as_ref()),
            join_labels(route.labels.as_ref()),
            format_time(route.created_at.as_ref()),
            format_time(route.updated_at.as_ref()),
        ]);
    }
    table
}
