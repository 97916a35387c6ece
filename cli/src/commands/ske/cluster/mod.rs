mod create;
mod delete;
mod describe;
mod list;

use clap::{Args, Subcommand};
use serde::Serialize;
use stackit_api::ske::{Cluster, ClusterRef};

use crate::commands::CmdParams;
use crate::errors::CliError;

#[derive(Subcommand, Debug, PartialEq)]
pub enum ClusterCommands {
    /// Lists all SKE clusters
    List(list::ListArgs),

    /// Shows details of a SKE cluster
    Describe(ClusterNameArg),

    /// Creates an SKE cluster
    ///
    /// Without --payload the cluster is created with one node pool using the
    /// newest supported Kubernetes and Flatcar versions of the region.
    Create(create::CreateArgs),

    /// Deletes a SKE cluster
    Delete(ClusterNameArg),
}

impl ClusterCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            ClusterCommands::List(args) => list::handle_list(params, args).await,
            ClusterCommands::Describe(args) => describe::handle_describe(params, args).await,
            ClusterCommands::Create(args) => create::handle_create(params, args).await,
            ClusterCommands::Delete(args) => delete::handle_delete(params, args).await,
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct ClusterNameArg {
    /// Cluster name
    #[arg(value_name = "CLUSTER_NAME")]
    pub cluster_name: String,
}

pub(crate) fn cluster_ref(params: &CmdParams, cluster_name: &str) -> Result<ClusterRef, CliError> {
    Ok(ClusterRef {
        project_id: params.project_id()?,
        region: params.global.region.clone(),
        cluster_name: cluster_name.to_string(),
    })
}

fn kubernetes_version(cluster: &Cluster) -> Option<&str> {
    cluster
        .kubernetes
        .as_ref()?
        .get("version")?
        .as_str()
}

fn node_pool_count(cluster: &Cluster) -> usize {
    cluster.nodepools.as_ref().map_or(0, Vec::len)
}
