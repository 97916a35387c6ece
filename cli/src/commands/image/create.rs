//! Image creation: register the image, then stream the local file to the
//! returned upload URL.

use clap::Args;
use futures_util::StreamExt;
use serde::Serialize;
use stackit_api::Service;
use stackit_api::iaas::{CreateImagePayload, CreateImageRequest, upload_image};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio_util::io::ReaderStream;

use super::{ImageConfigFlags, to_labels};
use crate::client::configure;
use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::parse_string_map;
use crate::print::Printer;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct CreateArgs {
    /// The name of the image
    #[arg(long)]
    pub name: String,

    /// The disk format of the image
    #[arg(long = "disk-format")]
    pub disk_format: String,

    /// The path to the local disk image file
    #[arg(long = "local-file-path")]
    pub local_file_path: String,

    /// Do not show the upload progress
    #[arg(long = "no-progress")]
    pub no_progress: bool,

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

fn build_request(params: &CmdParams, args: &CreateArgs) -> Result<CreateImageRequest, CliError> {
    let mut config = args.config.to_config();
    config.uefi = Some(args.config.uefi.unwrap_or(true));
    Ok(CreateImageRequest {
        project_id: params.project_id()?,
        region: params.global.region.clone(),
        payload: CreateImagePayload {
            name: args.name.clone(),
            disk_format: args.disk_format.clone(),
            config: Some(config),
            labels: to_labels(&args.labels),
            min_disk_size: args.min_disk_size,
            min_ram: args.min_ram,
            protected: args.protected,
        },
    })
}

pub async fn handle_create(params: &CmdParams, args: CreateArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let request = build_request(params, &args)?;
    let client = configure(params, Service::Iaas).await?;

    let size = tokio::fs::metadata(&args.local_file_path)
        .await
        .map_err(|e| {
            CliError::io(
                format!("file {:?} is not readable", args.local_file_path),
                e,
            )
        })?
        .len();

    params.confirm(&format!(
        "Are you sure you want to create the image {:?}?",
        args.name
    ))?;

    let created = request
        .execute(&client)
        .await
        .context("create image")?;
    let upload_url = created
        .upload_url
        .clone()
        .ok_or_else(|| CliError::Other("no upload URL has been provided".to_string()))
        .context("create image")?;

    let printer = progress_printer(&params.printer, args.no_progress);
    upload(params, &printer, &upload_url, &args.local_file_path, size)
        .await
        .context("upload image")?;

    params
        .printer
        .output_result(params.output_format(), &created, || {
            params.printer.outputln(format!(
                "Created image {:?} with id {}",
                args.name, created.id
            ))?;
            Ok::<(), CliError>(())
        })
}

/// Printer for upload progress. `--no-progress` silences only this command.
fn progress_printer(printer: &Printer, no_progress: bool) -> Printer {
    let mut printer = printer.clone();
    if no_progress {
        printer.disable_progress();
    }
    printer
}

/// Stream `path` to `url`. Progress updates travel over a capacity-1 channel
/// and are dropped while the reporter has not caught up.
async fn upload(
    params: &CmdParams,
    printer: &Printer,
    url: &str,
    path: &str,
    size: u64,
) -> Result<(), CliError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| CliError::io(format!("file {path:?} is not readable"), e))?;

    let (progress_tx, progress_rx) = mpsc::channel::<u64>(1);
    let mut sent = 0u64;
    let body = ReaderStream::new(file).map(move |chunk| {
        if let Ok(bytes) = &chunk {
            sent += bytes.len() as u64;
            let _ = progress_tx.try_send(sent);
        }
        chunk
    });

    let reporter = printer
        .progress_enabled()
        .then(|| tokio::spawn(report_progress(printer.clone(), progress_rx, size)));

    let result = tokio::select! {
        _ = params.cancel.cancelled() => Err(CliError::Other("upload cancelled".to_string())),
        uploaded = upload_image(url, reqwest::Body::wrap_stream(body), size) => uploaded.map_err(CliError::from),
    };
    if let Some(reporter) = reporter {
        reporter.abort();
    }
    result
}

async fn report_progress(printer: Printer, mut updates: mpsc::Receiver<u64>, total: u64) {
    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    ticker.tick().await;
    let mut uploaded = 0u64;
    loop {
        ticker.tick().await;
        loop {
            match updates.try_recv() {
                Ok(bytes) => uploaded = bytes,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return,
            }
        }
        printer.info(format!("uploaded {:3.1}%", percent(uploaded, total)));
    }
}

fn percent(uploaded: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    uploaded as f64 * 100.0 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{PROJECT_ID, harness};
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        args: CreateArgs,
    }

    fn parse(extra: &[&str]) -> CreateArgs {
        let mut argv = vec![
            "stackit",
            "--name",
            "my-img",
            "--disk-format",
            "raw",
            "--local-file-path",
            "/tmp/x",
        ];
        argv.extend_from_slice(extra);
        Harness::try_parse_from(argv).unwrap().args
    }

    #[test]
    fn test_local_file_path_is_required() {
        assert!(
            Harness::try_parse_from(["stackit", "--name", "n", "--disk-format", "raw"]).is_err()
        );
    }

    #[test]
    fn test_uefi_defaults_to_true() {
        let h = harness(&[("STACKIT_PROJECT_ID", PROJECT_ID)], "");
        let request = build_request(&h.params, &parse(&[])).unwrap();
        let payload = serde_json::to_value(&request.payload).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({"name": "my-img", "diskFormat": "raw", "config": {"uefi": true}})
        );

        let request = build_request(&h.params, &parse(&["--uefi=false", "--labels", "a=b"])).unwrap();
        let payload = serde_json::to_value(&request.payload).unwrap();
        assert_eq!(payload["config"]["uefi"], serde_json::json!(false));
        assert_eq!(payload["labels"], serde_json::json!({"a": "b"}));
    }

    #[test]
    fn test_no_progress_flag_silences_upload_progress() {
        let h = harness(&[], "");
        let printer = h.params.printer.clone().with_interactive_stderr(true);
        assert!(progress_printer(&printer, false).progress_enabled());
        assert!(!progress_printer(&printer, true).progress_enabled());
        assert!(printer.progress_enabled());
        assert!(parse(&["--no-progress"]).no_progress);
    }

    #[test]
    fn test_percent() {
        assert_eq!(format!("{:3.1}", percent(1, 4)), "25.0");
        assert_eq!(percent(0, 0), 100.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_reports_latest_value() {
        let h = harness(&[], "");
        let (tx, rx) = mpsc::channel(1);
        let reporter = tokio::spawn(report_progress(h.params.printer.clone(), rx, 4));
        tx.send(2).await.unwrap();
        tokio::time::sleep(PROGRESS_INTERVAL + Duration::from_millis(10)).await;
        drop(tx);
        tokio::time::sleep(PROGRESS_INTERVAL).await;
        reporter.await.unwrap();
        assert_eq!(h.err.contents(), "uploaded 50.0%\n");
    }
}
