use clap::Args;
use serde::Serialize;
use serde_json::json;
use stackit_api::Service;
use stackit_api::ske::{
    CreateOrUpdateClusterPayload, CreateOrUpdateClusterRequest, ListClustersRequest,
    ListProviderOptionsRequest, ProviderOptions, default_wait_config, wait_for_cluster_ready,
};

use super::cluster_ref;
use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::parse_file_or_literal;
use crate::print::Spinner;

const SUPPORTED_STATE: &str = "supported";
const DEFAULT_CRI: &str = "containerd";
const DEFAULT_MACHINE_TYPE: &str = "b1.2";
const DEFAULT_MACHINE_IMAGE: &str = "flatcar";
const DEFAULT_NODEPOOL_NAME: &str = "pool-default";
const DEFAULT_VOLUME_TYPE: &str = "storage_premium_perf2";
const DEFAULT_VOLUME_SIZE: i64 = 50;

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct CreateArgs {
    /// Cluster name
    #[arg(value_name = "CLUSTER_NAME")]
    pub cluster_name: String,

    /// Request payload (JSON), or @path to read it from a file
    #[arg(long, value_parser = parse_file_or_literal)]
    pub payload: Option<String>,
}

fn parse_payload(args: &CreateArgs) -> Result<Option<CreateOrUpdateClusterPayload>, CliError> {
    args.payload
        .as_deref()
        .map(|raw| {
            serde_json::from_str(raw).map_err(|e| CliError::flag("payload", format!("encode payload: {e}")))
        })
        .transpose()
}

/// One node pool on the newest supported Kubernetes and Flatcar versions.
fn default_payload(
    options: &ProviderOptions,
    region: &str,
) -> Result<CreateOrUpdateClusterPayload, CliError> {
    let kubernetes_version = newest(
        options
            .kubernetes_versions
            .iter()
            .filter(|v| v.state.as_deref() == Some(SUPPORTED_STATE))
            .filter_map(|v| v.version.as_deref()),
    )
    .ok_or_else(|| CliError::Other("no supported Kubernetes version found".to_string()))?;

    let image_version = newest(
        options
            .machine_images
            .iter()
            .filter(|image| image.name.as_deref() == Some(DEFAULT_MACHINE_IMAGE))
            .flat_map(|image| image.versions.iter())
            .filter(|v| v.state.as_deref() == Some(SUPPORTED_STATE))
            .filter(|v| v.cri.iter().any(|c| c.name.as_deref() == Some(DEFAULT_CRI)))
            .filter_map(|v| v.version.as_deref()),
    )
    .ok_or_else(|| CliError::Other("no supported images found".to_string()))?;

    Ok(CreateOrUpdateClusterPayload {
        kubernetes: json!({ "version": kubernetes_version }),
        nodepools: vec![json!({
            "name": DEFAULT_NODEPOOL_NAME,
            "availabilityZones": [format!("{region}-3")],
            "cri": { "name": DEFAULT_CRI },
            "machine": {
                "type": DEFAULT_MACHINE_TYPE,
                "image": { "name": DEFAULT_MACHINE_IMAGE, "version": image_version },
            },
            "maxSurge": 1,
            "maximum": 2,
            "minimum": 1,
            "volume": { "type": DEFAULT_VOLUME_TYPE, "size": DEFAULT_VOLUME_SIZE },
        })],
        extensions: Some(json!({ "acl": { "allowedCidrs": [], "enabled": false } })),
        ..Default::default()
    })
}

/// Highest semantic version; unparsable entries are skipped.
fn newest<'a>(versions: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    versions
        .filter_map(|raw| semver::Version::parse(raw).ok().map(|parsed| (parsed, raw)))
        .max_by(|a, b| a.0.cmp(&b.0))
        .map(|(_, raw)| raw)
}

pub async fn handle_create(params: &CmdParams, args: CreateArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let cluster = cluster_ref(params, &args.cluster_name)?;
    let payload = parse_payload(&args)?;
    let client = configure(params, Service::Ske).await?;

    params.confirm(&format!(
        "Are you sure you want to create a cluster for project {:?}?",
        cluster.project_id
    ))?;

    let existing = ListClustersRequest {
        project_id: cluster.project_id.clone(),
        region: cluster.region.clone(),
    }
    .execute(&client)
    .await
    .context("list SKE clusters")?;
    if existing
        .items
        .iter()
        .any(|c| c.name.as_deref() == Some(cluster.cluster_name.as_str()))
    {
        return Err(CliError::Other(format!(
            "cluster with name {} already exists",
            cluster.cluster_name
        )));
    }

    let payload = match payload {
        Some(payload) => payload,
        None => {
            let options = ListProviderOptionsRequest {
                region: cluster.region.clone(),
            }
            .execute(&client)
            .await
            .context("get SKE provider options")?;
            default_payload(&options, &cluster.region).context("get default payload")?
        }
    };

    let request = CreateOrUpdateClusterRequest {
        cluster: cluster.clone(),
        payload,
    };
    let mut created = request
        .execute(&client)
        .await
        .context("create SKE cluster")?;

    if !params.global.r#async {
        let spinner = Spinner::start(&params.printer, "Creating cluster");
        let waited =
            wait_for_cluster_ready(&client, &cluster, default_wait_config(), &params.cancel).await;
        spinner.stop().await;
        created = waited
            .map_err(CliError::wait)
            .context("wait for SKE cluster creation")?;
    }

    params
        .printer
        .output_result(params.output_format(), &created, || {
            let verb = if params.global.r#async {
                "Triggered creation of"
            } else {
                "Created"
            };
            params.printer.outputln(format!(
                "{verb} cluster for project {:?}. Cluster name: {}",
                cluster.project_id, cluster.cluster_name
            ))?;
            Ok::<(), CliError>(())
        })
}
