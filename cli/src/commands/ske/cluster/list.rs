use clap::Args;
use serde::Serialize;
use stackit_api::Service;
use stackit_api::ske::{Cluster, ListClustersRequest};

use super::{kubernetes_version, node_pool_count};
use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::{or_na, parse_positive};
use crate::print::Table;

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListArgs {
    /// Maximum number of entries to list
    #[arg(long, value_parser = parse_positive)]
    pub limit: Option<i64>,
}

pub async fn handle_list(params: &CmdParams, args: ListArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = ListClustersRequest {
        project_id: params.project_id()?,
        region: params.global.region.clone(),
    };
    let client = configure(params, Service::Ske).await?;

    let mut items = request
        .execute(&client)
        .await
        .context("get SKE clusters")?
        .items;
    if let Some(limit) = args.limit {
        items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }

    if items.is_empty() {
        params.printer.outputln(format!(
            "No clusters found for project {:?}",
            request.project_id
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

fn build_table(items: &[Cluster]) -> Table {
    let mut table = Table::new();
    table.set_header(["NAME", "STATE", "VERSION", "POOLS"]);
    for cluster in items {
        table.add_row([
            or_na(cluster.name.as_ref()),
            or_na(cluster.state()),
            or_na(kubernetes_version(cluster)),
            node_pool_count(cluster).to_string(),
        ]);
    }
    table
}
