use clap::Args;
use serde::Serialize;
use stackit_api::Service;
use stackit_api::iaas::{Image, ListImagesRequest};

use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::{join_labels, or_na, parse_positive};
use crate::print::Table;

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListArgs {
    /// Filter images by labels, e.g. os=linux
    #[arg(long = "label-selector")]
    pub label_selector: Option<String>,

    /// Maximum number of entries to list
    #[arg(long, value_parser = parse_positive)]
    pub limit: Option<i64>,
}

fn build_request(params: &CmdParams, args: &ListArgs) -> Result<ListImagesRequest, CliError> {
    Ok(ListImagesRequest {
        project_id: params.project_id()?,
        region: params.global.region.clone(),
        label_selector: args.label_selector.clone(),
    })
}

pub async fn handle_list(params: &CmdParams, args: ListArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = build_request(params, &args)?;
    let client = configure(params, Service::Iaas).await?;

    let mut items = request
        .execute(&client)
        .await
        .context("list images")?
        .items;
    if let Some(limit) = args.limit {
        items.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }

    if items.is_empty() {
        params.printer.outputln(format!(
            "No images found for project {:?}",
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

fn build_table(items: &[Image]) -> Table {
    let mut table = Table::new();
    table.set_header([
        "ID",
        "NAME",
        "OS",
        "ARCHITECTURE",
        "DISTRIBUTION",
        "VERSION",
        "LABELS",
    ]);
    for image in items {
        let config = image.config.clone().unwrap_or_default();
        table.add_row([
            or_na(image.id.as_ref()),
            or_na(image.name.as_ref()),
            or_na(config.operating_system.as_ref()),
            or_na(config.architecture.as_ref()),
            or_na(config.operating_system_distro.as_ref()),
            or_na(config.operating_system_version.as_ref()),
            join_labels(image.labels.as_ref()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{PROJECT_ID, harness};

    #[test]
    fn test_build_request_uses_resolved_globals() {
        let h = harness(
            &[("STACKIT_PROJECT_ID", PROJECT_ID), ("STACKIT_REGION", "eu02")],
            "",
        );
        let request = build_request(
            &h.params,
            &ListArgs {
                label_selector: Some("os=linux".into()),
                limit: None,
            },
        )
        .unwrap();
        assert_eq!(
            request,
            ListImagesRequest {
                project_id: PROJECT_ID.into(),
                region: "eu02".into(),
                label_selector: Some("os=linux".into()),
            }
        );
    }

    #[test]
    fn test_missing_project_fails_before_any_call() {
        let h = harness(&[], "");
        let err = build_request(&h.params, &ListArgs::default()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_table_fills_missing_cells() {
        let image: Image = serde_json::from_value(serde_json::json!({
            "id": "i1",
            "name": "ubuntu",
            "config": {"operatingSystem": "linux"},
            "labels": {"team": "core"}
        }))
        .unwrap();
        let rendered = build_table(&[image]).render();
        let row = rendered.lines().nth(2).unwrap();
        assert_eq!(
            row,
            "i1 │ ubuntu │ linux │ n/a          │ n/a          │ n/a     │ team: core"
        );
    }
}
