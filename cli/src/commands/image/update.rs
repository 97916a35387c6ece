use clap::Args;
use serde::Serialize;
use stackit_api::Service;
use stackit_api::iaas::{GetImageRequest, UpdateImagePayload, UpdateImageRequest};
use std::collections::BTreeMap;

use super::{ImageConfigFlags, image_label, to_labels};
use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::{parse_string_map, uuid_arg};

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct UpdateArgs {
    /// Image ID
    #[arg(value_name = "IMAGE_ID")]
    pub image_id: String,

    /// The new name of the image
    #[arg(long)]
    pub name: Option<String>,

    /// The disk format of the image
    #[arg(long = "disk-format")]
    pub disk_format: Option<String>,

    #[command(flatten)]
    pub config: ImageConfigFlags,

    /// Labels are key-value string pairs which can be attached to an image,
    /// e.g. --labels key1=value1,key2=value2
    #[arg(long, value_parser = parse_string_map)]
    pub labels: Option<BTreeMap<String, String>>,

    /// Minimum disk size in GB
    #[arg(long = "min-disk-size")]
    pub min_disk_size: Option<i64>,

    /// Minimum RAM in MB
    #[arg(long = "min-ram")]
    pub min_ram: Option<i64>,

    /// Protect the image from deletion
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    pub protected: Option<bool>,
}

fn build_request(params: &CmdParams, args: &UpdateArgs) -> Result<UpdateImageRequest, CliError> {
    let image_id = uuid_arg("IMAGE_ID", &args.image_id)?;
    let config = args.config.to_config();
    let payload = UpdateImagePayload {
        name: args.name.clone(),
        disk_format: args.disk_format.clone(),
        config: (!config.is_empty()).then_some(config),
        labels: to_labels(&args.labels),
        min_disk_size: args.min_disk_size,
        min_ram: args.min_ram,
        protected: args.protected,
    };
    if payload.is_empty() {
        return Err(CliError::EmptyUpdate);
    }
    Ok(UpdateImageRequest {
        project_id: params.project_id()?,
        region: params.global.region.clone(),
        image_id: image_id.to_string(),
        payload,
    })
}

pub async fn handle_update(params: &CmdParams, args: UpdateArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = build_request(params, &args)?;
    let client = configure(params, Service::Iaas).await?;

    let label = image_label(
        params,
        &client,
        GetImageRequest {
            project_id: request.project_id.clone(),
            region: request.region.clone(),
            image_id: request.image_id.clone(),
        },
    )
    .await;
    params.confirm(&format!(
        "Are you sure you want to update the image {label:?}?"
    ))?;

    let updated = request
        .execute(&client)
        .await
        .context("update image")?;

    params
        .printer
        .output_result(params.output_format(), &updated, || {
            params.printer.outputln(format!("Updated image {label:?}"))?;
            Ok::<(), CliError>(())
        })
}
