//! `stackit profile create | activate | delete | list | export | import`

use clap::{Args, Subcommand};
use serde::Serialize;

use crate::commands::CmdParams;
use crate::errors::{CliError, Context};
use crate::flags::parse_file_or_literal;
use crate::print::Table;

#[derive(Subcommand, Debug, PartialEq)]
pub enum ProfileCommands {
    /// Creates a CLI configuration profile
    ///
    /// The new profile starts as a copy of the active profile and becomes
    /// active, unless --empty or --no-set are given.
    Create(CreateArgs),

    /// Activates a CLI configuration profile
    #[command(alias = "set")]
    Activate(NameArg),

    /// Deletes a CLI configuration profile
    Delete(NameArg),

    /// Lists all CLI configuration profiles
    List,

    /// Exports a CLI configuration profile as TOML
    Export(ExportArgs),

    /// Imports a CLI configuration profile from TOML
    Import(ImportArgs),
}

impl ProfileCommands {
    pub async fn run(self, params: &CmdParams) -> Result<(), CliError> {
        match self {
            ProfileCommands::Create(args) => handle_create(params, args),
            ProfileCommands::Activate(args) => handle_activate(params, args),
            ProfileCommands::Delete(args) => handle_delete(params, args),
            ProfileCommands::List => handle_list(params),
            ProfileCommands::Export(args) => handle_export(params, args),
            ProfileCommands::Import(args) => handle_import(params, args),
        }
    }
}

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct NameArg {
    /// Profile name
    #[arg(value_name = "PROFILE")]
    pub name: String,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct CreateArgs {
    /// Profile name
    #[arg(value_name = "PROFILE")]
    pub name: String,

    /// Create the profile without copying the active profile's values
    #[arg(long)]
    pub empty: bool,

    /// Do not activate the new profile
    #[arg(long = "no-set")]
    pub no_set: bool,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct ExportArgs {
    /// Profile name
    #[arg(value_name = "PROFILE")]
    pub name: String,

    /// Write the profile to this file instead of stdout
    #[arg(long = "file-path")]
    pub file_path: Option<String>,
}

#[derive(Args, Debug, Clone, PartialEq, Serialize)]
pub struct ImportArgs {
    /// Name of the new profile
    #[arg(long)]
    pub name: String,

    /// Profile document, or @path to read it from a file
    #[arg(long, value_parser = parse_file_or_literal)]
    pub config: String,

    /// Do not activate the imported profile
    #[arg(long = "no-set")]
    pub no_set: bool,
}

fn handle_create(params: &CmdParams, args: CreateArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    params
        .store
        .update(|file| file.create_profile(&args.name, !args.empty, !args.no_set))?;
    params
        .printer
        .info(format!("Successfully created profile {:?}", args.name));
    if !args.no_set {
        params
            .printer
            .info(format!("Successfully activated profile {:?}", args.name));
    }
    Ok(())
}

fn handle_activate(params: &CmdParams, args: NameArg) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    params
        .store
        .update(|file| file.activate_profile(&args.name))?;
    params
        .printer
        .info(format!("Successfully activated profile {:?}", args.name));
    Ok(())
}

fn handle_delete(params: &CmdParams, args: NameArg) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    params.confirm(&format!(
        "Are you sure you want to delete profile {:?}?",
        args.name
    ))?;
    let was_active = params
        .store
        .update(|file| file.delete_profile(&args.name))
        .context(format!("delete profile {:?}", args.name))?;
    if was_active {
        params
            .printer
            .warn("The deleted profile was active, the default profile is now active");
    }
    params
        .printer
        .info(format!("Successfully deleted profile {:?}", args.name));
    Ok(())
}

#[derive(Serialize)]
struct ListedProfile {
    name: String,
    active: bool,
}

fn handle_list(params: &CmdParams) -> Result<(), CliError> {
    let file = params.store.load()?;
    let profiles: Vec<ListedProfile> = file
        .list_profiles()
        .into_iter()
        .map(|(name, active)| ListedProfile { name, active })
        .collect();
    params
        .printer
        .output_result(params.output_format(), &profiles, || {
            let mut table = Table::new();
            table.set_header(["NAME", "ACTIVE"]);
            for profile in &profiles {
                table.add_row([
                    profile.name.as_str(),
                    if profile.active { "true" } else { "" },
                ]);
            }
            params.printer.output_table(table)?;
            Ok::<(), CliError>(())
        })
}

fn handle_export(params: &CmdParams, args: ExportArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    let document = params.store.load()?.export_profile(&args.name)?;
    match &args.file_path {
        Some(path) => {
            std::fs::write(path, &document)
                .map_err(|e| CliError::io(format!("write profile to {path:?}"), e))?;
            params.printer.info(format!(
                "Exported profile {:?} to {path:?}",
                args.name
            ));
        }
        None => params.printer.outputf(document)?,
    }
    Ok(())
}

fn handle_import(params: &CmdParams, args: ImportArgs) -> Result<(), CliError> {
    params.log_input(&args, &[]);
    params
        .store
        .update(|file| file.import_profile(&args.name, &args.config, !args.no_set))?;
    params
        .printer
        .info(format!("Successfully imported profile {:?}", args.name));
    Ok(())
}
