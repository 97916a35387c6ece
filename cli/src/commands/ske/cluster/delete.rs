use stackit_api::Service;
use stackit_api::ske::{DeleteClusterRequest, default_wait_config, wait_for_cluster_deleted};

use super::{ClusterNameArg, cluster_ref};
use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::print::Spinner;

pub async fn handle_delete(params: &CmdParams, args: ClusterNameArg) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = DeleteClusterRequest {
        cluster: cluster_ref(params, &args.cluster_name)?,
    };
    let client = configure(params, Service::Ske).await?;

    params.confirm(&format!(
        "Are you sure you want to delete cluster {:?}?",
        args.cluster_name
    ))?;

    request
        .execute(&client)
        .await
        .context("delete SKE cluster")?;

    if params.global.r#async {
        params
            .printer
            .info(format!("Triggered deletion of cluster {:?}", args.cluster_name));
        return Ok(());
    }

    let spinner = Spinner::start(&params.printer, "Deleting cluster");
    let waited =
        wait_for_cluster_deleted(&client, &request.cluster, default_wait_config(), &params.cancel)
            .await;
    spinner.stop().await;
    waited
        .map_err(CliError::wait)
        .context("wait for SKE cluster deletion")?;

    params
        .printer
        .info(format!("Deleted cluster {:?}", args.cluster_name));
    Ok(())
}
