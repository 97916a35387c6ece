use clap::Parser;
use clap::error::ErrorKind;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod client;
mod commands;
mod config;
mod errors;
mod flags;
mod print;

use commands::{CmdParams, Commands};
use config::{CONFIG_DIR_ENV, ConfigStore, Environment, Settings};
use errors::CliError;
use flags::GlobalFlags;
use print::{Level, Printer};

#[derive(Parser, Debug)]
#[command(name = "stackit", version)]
#[command(about = "Manage STACKIT cloud services", long_about = None)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(flatten)]
    global: GlobalFlags,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(std::env::args_os()) {
        Ok(cli) => cli,
        Err(e) => {
            // Help for an incomplete command is not a failure.
            if e.kind() == ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand {
                let _ = e.print();
                return ExitCode::SUCCESS;
            }
            let _ = e.print();
            return ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(2));
        }
    };

    let cancel = CancellationToken::new();
    let params = match setup(&cli.global) {
        Ok(params) => params.with_cancel(cancel.clone()),
        Err(e) => {
            Printer::stdio().error(&e);
            return ExitCode::from(e.exit_code());
        }
    };

    if params.printer.verbosity() == Level::Debug {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    format!(
                        "error,{}=debug,stackit_shared=debug,stackit_api=debug",
                        env!("CARGO_CRATE_NAME")
                    )
                    .into()
                }),
            )
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match cli.command.run(&params).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            params.printer.error(&e);
            for cause in e.debug_chain() {
                params.printer.debug(cause);
            }
            ExitCode::from(e.exit_code())
        }
    }
}

/// Resolve settings for this invocation: flags over env over the active profile.
fn setup(global: &GlobalFlags) -> Result<CmdParams, CliError> {
    let env = Environment::capture();
    let store = ConfigStore::locate(env.get(CONFIG_DIR_ENV))?;
    let file = store.load()?;
    let settings = global.apply(Settings::new(file, env)?);
    let mut printer = Printer::stdio().with_verbosity(settings.verbosity());
    if !printer.stderr_is_tty() {
        printer.disable_progress();
    }
    Ok(CmdParams::new(printer, settings, store))
}
