use clap::Args;
use serde::Serialize;
use stackit_api::Service;
use stackit_api::iaas::{DeleteImageRequest, GetImageRequest};
use super::image_label;
use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::uuid_arg;

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct DeleteArgs {
    /// Image ID
    #[arg(value_name = "IMAGE_ID")]
    pub image_id: String,
}

fn build_request(params: &CmdParams, args: &DeleteArgs) -> Result<DeleteImageRequest, CliError> {
    Ok(DeleteImageRequest {
        project_id: params.project_id()?,
        region: params.global.region.clone(),
        image_id: uuid_arg("IMAGE_ID", &args.image_id)?.to_string(),
    })
}

pub async fn handle_delete(params: &CmdParams, args: DeleteArgs) -> Result<(), CliError> {
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
        "Are you sure you want to delete the image {label:?}?"
    ))?;

    request.execute(&client).await.context("delete image")?;
    params.printer.info(format!("Deleted image {label:?}"));
    Ok(())
}
