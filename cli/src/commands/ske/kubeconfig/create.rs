use clap::Args;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use stackit_api::Service;
use stackit_api::ske::{
    CreateKubeconfigPayload, CreateKubeconfigRequest, GetLoginKubeconfigRequest, Kubeconfig,
    LoginKubeconfig,
};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::client::configure;
use crate::commands::CmdParams;
use crate::commands::ske::cluster::cluster_ref;
use crate::errors::{CliError, Context};
use crate::flags::parse_kubeconfig_expiration;
use crate::print::OutputFormat;

/// Sections merged entry by entry, matched on `name`.
const NAMED_SECTIONS: [&str; 3] = ["clusters", "users", "contexts"];

#[derive(Args, Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateArgs {
    /// Cluster name
    #[arg(value_name = "CLUSTER_NAME")]
    pub cluster_name: String,

    /// Create a login kubeconfig that obtains valid credentials via the
    /// STACKIT CLI. This flag is mutually exclusive with the expiration flag
    #[arg(long, short = 'l', conflicts_with = "expiration")]
    pub login: bool,

    /// Expiration time for the kubeconfig, e.g. 30d. By default, expiration
    /// time is 1h
    #[arg(long, short = 'e', value_parser = parse_kubeconfig_expiration)]
    pub expiration: Option<u64>,

    /// Path to create the kubeconfig file. By default, the kubeconfig is
    /// created as 'config' in the .kube folder, in the user's home directory
    #[arg(long)]
    pub filepath: Option<String>,

    /// Disable the writing of kubeconfig. Set the output format to json or
    /// yaml using the --output-format flag to display the kubeconfig
    #[arg(long = "disable-writing")]
    pub disable_writing: bool,

    /// Replace the kubeconfig file instead of merging into it
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Created {
    Kubeconfig(Kubeconfig),
    Login(LoginKubeconfig),
}

fn validate(params: &CmdParams, args: &CreateArgs) -> Result<(), CliError> {
    if args.disable_writing && params.output_format() == OutputFormat::Pretty {
        return Err(CliError::Usage(format!(
            "when setting the flag --disable-writing, you must specify --output-format as one of the values: {}, {}",
            OutputFormat::Json,
            OutputFormat::Yaml
        )));
    }
    Ok(())
}

pub fn default_kubeconfig_path() -> Result<PathBuf, CliError> {
    dirs::home_dir()
        .map(|home| home.join(".kube").join("config"))
        .ok_or_else(|| CliError::Other("get user home directory: not found".to_string()))
}

pub async fn handle_create(params: &CmdParams, args: CreateArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let cluster = cluster_ref(params, &args.cluster_name)?;
    validate(params, &args)?;
    let client = configure(params, Service::Ske).await?;

    if !args.disable_writing {
        let question = if args.overwrite {
            format!(
                "Are you sure you want to create a kubeconfig for SKE cluster {:?}? This will OVERWRITE your current kubeconfig file, if it exists.",
                args.cluster_name
            )
        } else {
            format!(
                "Are you sure you want to update your kubeconfig for SKE cluster {:?}? The file is created if it does not exist.",
                args.cluster_name
            )
        };
        params.confirm(&question)?;
    }

    let (kubeconfig, created) = if args.login {
        let response = GetLoginKubeconfigRequest { cluster }
            .execute(&client)
            .await
            .context("create login kubeconfig for SKE cluster")?;
        let data = response
            .kubeconfig
            .clone()
            .ok_or_else(|| CliError::Other("no login kubeconfig returned from the API".to_string()))?;
        (data, Created::Login(response))
    } else {
        let response = CreateKubeconfigRequest {
            cluster,
            payload: CreateKubeconfigPayload {
                expiration_seconds: args.expiration.map(|secs| secs.to_string()),
            },
        }
        .execute(&client)
        .await
        .context("create kubeconfig for SKE cluster")?;
        let data = response
            .kubeconfig
            .clone()
            .ok_or_else(|| CliError::Other("no kubeconfig returned from the API".to_string()))?;
        (data, Created::Kubeconfig(response))
    };

    let path = match &args.filepath {
        Some(path) => PathBuf::from(path),
        None => default_kubeconfig_path().context("get default kubeconfig path")?,
    };
    if !args.disable_writing {
        write_kubeconfig(&path, &kubeconfig, args.overwrite).context("write kubeconfig file")?;
    }

    params
        .printer
        .output_result(params.output_format(), &created, || {
            let expiration = match &created {
                Created::Kubeconfig(Kubeconfig {
                    expiration_timestamp: Some(at),
                    ..
                }) => format!(
                    ", with expiration date {} (UTC)",
                    at.format("%Y-%m-%d %H:%M:%S")
                ),
                _ => String::new(),
            };
            params.printer.outputln(format!(
                "Created kubeconfig file for cluster {} in {:?}{}",
                args.cluster_name,
                path.display().to_string(),
                expiration
            ))?;
            Ok::<(), CliError>(())
        })
}

/// Write `data` to `path`, merging into an existing file unless `overwrite`.
/// The directory is created owner-only and the file is written 0600.
pub fn write_kubeconfig(path: &Path, data: &str, overwrite: bool) -> Result<(), CliError> {
    if data.is_empty() {
        return Err(CliError::Other("no data to write".to_string()));
    }
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        create_private_dir(dir).map_err(|e| CliError::io("create config directory", e))?;
    }

    let contents = match std::fs::read_to_string(path) {
        Ok(existing) if !overwrite && !existing.trim().is_empty() => {
            merge_kubeconfig(&existing, data)?
        }
        Ok(_) => data.to_string(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => data.to_string(),
        Err(e) => return Err(CliError::io("read kubeconfig file", e)),
    };

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options
        .open(path)
        .map_err(|e| CliError::io("write file", e))?;
    file.write_all(contents.as_bytes())
        .map_err(|e| CliError::io("write file", e))
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }
    builder.create(dir)
}

/// Replace or append the named entries of `incoming` in `existing` and switch
/// to the incoming current context.
fn merge_kubeconfig(existing: &str, incoming: &str) -> Result<String, CliError> {
    let parse = |raw: &str, what: &str| {
        serde_yaml::from_str::<Mapping>(raw)
            .map_err(|e| CliError::Other(format!("parse {what} kubeconfig: {e}")))
    };
    let mut base = parse(existing, "existing")?;
    let update = parse(incoming, "new")?;

    for section in NAMED_SECTIONS {
        let entries = update
            .get(section)
            .and_then(Value::as_sequence)
            .cloned()
            .unwrap_or_default();
        let slot = base
            .entry(Value::from(section))
            .or_insert_with(|| Value::Sequence(Vec::new()));
        let Some(list) = slot.as_sequence_mut() else {
            *slot = Value::Sequence(entries);
            continue;
        };
        for entry in entries {
            match list
                .iter_mut()
                .find(|current| current.get("name") == entry.get("name"))
            {
                Some(current) => *current = entry,
                None => list.push(entry),
            }
        }
    }
    if let Some(current) = update.get("current-context") {
        base.insert(Value::from("current-context"), current.clone());
    }

    serde_yaml::to_string(&base).map_err(|e| CliError::Other(format!("encode kubeconfig: {e}")))
}
