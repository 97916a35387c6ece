use stackit_api::Service;
use stackit_api::ske::{Cluster, GetClusterRequest};

use super::{ClusterNameArg, cluster_ref, kubernetes_version, node_pool_count};
use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::or_na;
use crate::print::Table;

pub async fn handle_describe(params: &CmdParams, args: ClusterNameArg) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = GetClusterRequest {
        cluster: cluster_ref(params, &args.cluster_name)?,
    };
    let client = configure(params, Service::Ske).await?;

    let cluster = request
        .execute(&client)
        .await
        .context("read SKE cluster")?;
    params
        .printer
        .output_result(params.output_format(), &cluster, || {
            params.printer.output_table(build_table(&cluster))?;
            Ok::<(), CliError>(())
        })
}

fn build_table(cluster: &Cluster) -> Table {
    let created = cluster
        .status
        .as_ref()
        .and_then(|s| s.creation_time)
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Secs, true));
    let rows = [
        ("NAME", or_na(cluster.name.as_ref())),
        ("STATE", or_na(cluster.state())),
        ("VERSION", or_na(kubernetes_version(cluster))),
        ("POOLS", node_pool_count(cluster).to_string()),
        ("CREATED", or_na(created)),
    ];
    let mut table = Table::new();
    for (i, (key, value)) in rows.into_iter().enumerate() {
        if i > 0 {
            table.add_separator();
        }
        table.add_row([key.to_string(), value]);
    }
    table
}
