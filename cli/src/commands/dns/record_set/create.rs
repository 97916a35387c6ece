use clap::Args;
use serde::Serialize;
use stackit_api::Service;
use stackit_api::dns::{
    CreateRecordSetPayload, CreateRecordSetRequest, GetRecordSetRequest, GetZoneRequest, Record,
    RecordSet, RecordType, default_wait_config, wait_for_record_set_created,
};
use uuid::Uuid;

use crate::client::configure;
use crate::commands::CmdParams;
use crate::commands::dns::zone_label;
use crate::errors::{CliError, Context};
use crate::flags::{parse_record_ttl, parse_record_type, parse_uuid};
use crate::print::Spinner;

/// Longest character string a TXT record may carry.
const TXT_CHUNK_LEN: usize = 255;

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct CreateArgs {
    /// Zone ID
    #[arg(long = "zone-id", value_parser = parse_uuid)]
    pub zone_id: Uuid,

    /// Name of the record, should be compliant with RFC1035, Section 2.3.4
    #[arg(long)]
    pub name: String,

    /// Records belonging to the record set, repeat the flag for several records
    #[arg(long = "record", required = true)]
    pub records: Vec<String>,

    /// Time to live, e.g. 1h or 3600 (60s up to 99999999s)
    #[arg(long, value_parser = parse_record_ttl)]
    pub ttl: Option<u64>,

    /// Record set type
    #[arg(long = "type", default_value = "A", value_parser = parse_record_type)]
    pub record_type: RecordType,

    /// User comment
    #[arg(long)]
    pub comment: Option<String>,
}

/// Values over 255 characters are split into quoted strings.
fn format_txt_record(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= TXT_CHUNK_LEN {
        return value.to_string();
    }
    chars
        .chunks(TXT_CHUNK_LEN)
        .map(|chunk| format!("\"{}\"", chunk.iter().collect::<String>()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn build_request(params: &CmdParams, args: &CreateArgs) -> Result<CreateRecordSetRequest, CliError> {
    let records = args
        .records
        .iter()
        .map(|content| Record {
            content: match args.record_type {
                RecordType::Txt => format_txt_record(content),
                _ => content.clone(),
            },
        })
        .collect();
    let ttl = args
        .ttl
        .map(i64::try_from)
        .transpose()
        .map_err(|e| CliError::flag("ttl", e))?;

    Ok(CreateRecordSetRequest {
        project_id: params.project_id()?,
        zone_id: args.zone_id.to_string(),
        payload: CreateRecordSetPayload {
            name: args.name.clone(),
            kind: args.record_type,
            records,
            ttl,
            comment: args.comment.clone(),
        },
    })
}

/// The created record set's ID; without it there is nothing to wait on or report.
fn record_set_id(rrset: &RecordSet) -> Result<String, CliError> {
    rrset
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| CliError::Other("missing record set id".to_string()))
}

pub async fn handle_create(params: &CmdParams, args: CreateArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = build_request(params, &args)?;
    let client = configure(params, Service::Dns).await?;

    let zone = zone_label(
        params,
        &client,
        GetZoneRequest {
            project_id: request.project_id.clone(),
            zone_id: request.zone_id.clone(),
        },
    )
    .await;

    params.confirm(&format!(
        "Are you sure you want to create a record set for zone {zone}?"
    ))?;

    let mut response = request
        .execute(&client)
        .await
        .context("create DNS record set")?;
    let record_set_id = record_set_id(&response.rrset).context("create DNS record set")?;

    if !params.global.r#async {
        let spinner = Spinner::start(&params.printer, "Creating record set");
        let waited = wait_for_record_set_created(
            &client,
            &GetRecordSetRequest {
                project_id: request.project_id.clone(),
                zone_id: request.zone_id.clone(),
                record_set_id: record_set_id.clone(),
            },
            default_wait_config(),
            &params.cancel,
        )
        .await;
        spinner.stop().await;
        response.rrset = waited
            .map_err(CliError::wait)
            .context("wait for DNS record set creation")?;
    }

    params
        .printer
        .output_result(params.output_format(), &response, || {
            let verb = if params.global.r#async {
                "Triggered creation of"
            } else {
                "Created"
            };
            params.printer.outputln(format!(
                "{verb} record set for zone {zone}. Record set ID: {record_set_id}"
            ))?;
            Ok::<(), CliError>(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{PROJECT_ID, harness};
    use clap::Parser;

    const ZONE_ID: &str = "22222222-2222-2222-2222-222222222222";

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        args: CreateArgs,
    }

    fn parse(extra: &[&str]) -> Result<CreateArgs, clap::Error> {
        let argv = ["stackit", "--zone-id", ZONE_ID, "--name", "www"]
            .into_iter()
            .chain(extra.iter().copied());
        Harness::try_parse_from(argv).map(|h| h.args)
    }

    #[test]
    fn test_defaults_to_a_records() {
        let h = harness(&[("STACKIT_PROJECT_ID", PROJECT_ID)], "");
        let args = parse(&["--record", "1.2.3.4", "--record", "5.6.7.8"]).unwrap();
        let request = build_request(&h.params, &args).unwrap();
        assert_eq!(request.zone_id, ZONE_ID);
        assert_eq!(
            serde_json::to_value(&request.payload).unwrap(),
            serde_json::json!({
                "name": "www",
                "type": "A",
                "records": [{"content": "1.2.3.4"}, {"content": "5.6.7.8"}]
            })
        );
    }

    #[test]
    fn test_ttl_and_type_are_sent() {
        let h = harness(&[("STACKIT_PROJECT_ID", PROJECT_ID)], "");
        let args = parse(&["--record", "mail.example.com", "--type", "cname", "--ttl", "2h"]).unwrap();
        let request = build_request(&h.params, &args).unwrap();
        assert_eq!(request.payload.kind, RecordType::Cname);
        assert_eq!(request.payload.ttl, Some(7200));
    }

    #[test]
    fn test_record_is_required() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn test_ttl_below_minimum_is_a_usage_error() {
        let err = parse(&["--record", "1.2.3.4", "--ttl", "30s"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(
            err.to_string()
                .contains("duration is below minimum: 30 seconds (minimum: 60 seconds)")
        );
    }

    #[test]
    fn test_response_without_id_is_an_error() {
        let rrset: RecordSet = serde_json::from_value(serde_json::json!({"name": "www"})).unwrap();
        let err = record_set_id(&rrset).unwrap_err();
        assert_eq!(err.to_string(), "missing record set id");
        assert_eq!(err.exit_code(), 1);

        let rrset: RecordSet =
            serde_json::from_value(serde_json::json!({"id": "rs-1", "name": "www"})).unwrap();
        assert_eq!(record_set_id(&rrset).unwrap(), "rs-1");
    }

    #[test]
    fn test_long_txt_records_are_split() {
        let short = "v=spf1 -all";
        assert_eq!(format_txt_record(short), short);
        assert_eq!(format_txt_record(""), "");

        let exact = "x".repeat(255);
        assert_eq!(format_txt_record(&exact), exact);

        let long = format!("{}b", "x".repeat(255));
        assert_eq!(format_txt_record(&long), format!("\"{}\" \"b\"", "x".repeat(255)));
    }

    #[test]
    fn test_txt_formatting_only_applies_to_txt() {
        let h = harness(&[("STACKIT_PROJECT_ID", PROJECT_ID)], "");
        let long = "y".repeat(300);
        let args = parse(&["--record", long.as_str(), "--type", "TXT"]).unwrap();
        let request = build_request(&h.params, &args).unwrap();
        assert!(request.payload.records[0].content.starts_with('"'));

        let args = parse(&["--record", long.as_str(), "--type", "A"]).unwrap();
        let request = build_request(&h.params, &args).unwrap();
        assert_eq!(request.payload.records[0].content, long);
    }
}
