use clap::Args;
use serde::Serialize;
use stackit_api::Service;
use stackit_api::iaas::{GetImageRequest, Image};

use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::{label_lines, or_na, uuid_arg};
use crate::print::Table;

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct DescribeArgs {
    /// Image ID
    #[arg(value_name = "IMAGE_ID")]
    pub image_id: String,
}

fn build_request(params: &CmdParams, args: &DescribeArgs) -> Result<GetImageRequest, CliError> {
    Ok(GetImageRequest {
        project_id: params.project_id()?,
        region: params.global.region.clone(),
        image_id: uuid_arg("IMAGE_ID", &args.image_id)?.to_string(),
    })
}

pub async fn handle_describe(params: &CmdParams, args: DescribeArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = build_request(params, &args)?;
    let client = configure(params, Service::Iaas).await?;
    let image = request
        .execute(&client)
        .await
        .context("get image details")?;
    params
        .printer
        .output_result(params.output_format(), &image, || {
            params.printer.output_table(build_table(&image))?;
            Ok::<(), CliError>(())
        })
}

fn build_table(image: &Image) -> Table {
    let config = image.config.clone().unwrap_or_default();
    let mut table = Table::new();
    table.add_row(["ID".to_string(), or_na(image.id.as_ref())]);
    table.add_separator();
    table.add_row(["NAME".to_string(), or_na(image.name.as_ref())]);
    table.add_separator();
    table.add_row(["FORMAT".to_string(), or_na(image.disk_format.as_ref())]);
    table.add_separator();
    table.add_row(["STATUS".to_string(), or_na(image.status.as_ref())]);
    table.add_separator();
    table.add_row(["OPERATING SYSTEM".to_string(), or_na(config.operating_system.as_ref())]);
    table.add_separator();
    table.add_row([
        "OPERATING SYSTEM DISTRIBUTION".to_string(),
        or_na(config.operating_system_distro.as_ref()),
    ]);
    table.add_separator();
    table.add_row([
        "OPERATING SYSTEM VERSION".to_string(),
        or_na(config.operating_system_version.as_ref()),
    ]);
    table.add_separator();
    table.add_row(["ARCHITECTURE".to_string(), or_na(config.architecture.as_ref())]);
    table.add_separator();
    table.add_row(["UEFI".to_string(), or_na(config.uefi)]);
    table.add_separator();
    table.add_row(["SECURE BOOT".to_string(), or_na(config.secure_boot)]);
    table.add_separator();
    table.add_row(["MIN DISK SIZE".to_string(), or_na(image.min_disk_size)]);
    table.add_separator();
    table.add_row(["MIN RAM".to_string(), or_na(image.min_ram)]);
    table.add_separator();
    table.add_row(["PROTECTED".to_string(), or_na(image.protected)]);
    table.add_separator();
    table.add_row(["SIZE".to_string(), or_na(image.size)]);
    table.add_separator();
    let labels = label_lines(image.labels.as_ref());
    if labels.is_empty() {
        table.add_row(["LABELS".to_string(), String::new()]);
    }
    for label in labels {
        table.add_row(["LABELS".to_string(), label]);
    }
    table.enable_auto_merge(&[0]);
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_table() {
        let image: Image = serde_json::from_value(serde_json::json!({
            "id": "i1",
            "name": "ubuntu",
            "config": {"uefi": true},
            "labels": {"a": "1", "b": "2"}
        }))
        .unwrap();
        let rendered = build_table(&image).render();
        assert!(rendered.starts_with("ID                            │ i1\n"));
        assert!(rendered.contains("UEFI                          │ true\n"));
        assert!(rendered.contains("FORMAT                        │ n/a\n"));
        assert!(rendered.ends_with(
            "LABELS                        │ a: 1\n                              │ b: 2\n"
        ));
    }

    #[test]
    fn test_label_key_is_printed_once() {
        let image: Image = serde_json::from_value(serde_json::json!({
            "id": "i1",
            "labels": {"a": "1", "b": "2", "c": "3"}
        }))
        .unwrap();
        let rendered = build_table(&image).render();
        assert_eq!(rendered.matches("LABELS").count(), 1);
        assert!(rendered.ends_with(
            "LABELS                        │ a: 1\n                              │ b: 2\n                              │ c: 3\n"
        ));

        let bare: Image = serde_json::from_value(serde_json::json!({"id": "i1"})).unwrap();
        assert!(build_table(&bare).render().ends_with("LABELS                        │\n"));
    }
}
