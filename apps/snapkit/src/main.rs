//! snapkit - client for snapd and the Snap Store
//!
//! Parses the command line, loads configuration, builds a `SnapClient` and
//! renders results while change and mirror events stream to stderr.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands, ConfigCommands, StoreCommands};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use futures::StreamExt;
use serde_json::Value;
use snapkit_client::{
    CancellationToken, InstallOptions, RemoveOptions, SearchParams, SnapClient,
    WaitOutcome,
};
use snapkit_config::Config;
use snapkit_events::EventReceiver;
use snapkit_types::{ChangeSnapshot, OutputFormat, SnapConfiguration};
use std::process;
use tokio::select;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json_mode = cli.global.json || cli.global.output == Some(OutputFormat::Json);

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if json_mode {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting snapkit v{}", env!("CARGO_PKG_VERSION"));

    // file (or defaults), then environment, then flags
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;
    config.merge_env()?;
    apply_cli_config(&mut config, &cli.global);

    if let Some(output) = cli.global.output {
        config.general.default_output = output;
    }
    let json_output = cli.global.json || config.general.default_output == OutputFormat::Json;
    let colors = !json_output && console::Term::stdout().features().colors_supported();

    let (event_sender, event_receiver) = snapkit_events::channel();
    let client = SnapClient::with_events(&config, Some(event_sender))?;

    let renderer = OutputRenderer::new(json_output, colors);
    let mut event_handler = EventHandler::new(colors, cli.global.debug, json_output);

    let output = execute_command_with_events(
        cli.command,
        client,
        event_receiver,
        &mut event_handler,
        !json_output,
    )
    .await?;
    event_handler.finish();

    renderer.render_result(&output)?;
    ensure_change_succeeded(&output)?;

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    client: SnapClient,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
    show_progress: bool,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, client, show_progress));
    let mut events_open = true;

    loop {
        select! {
            result = &mut command_future => {
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            event = event_receiver.recv(), if events_open => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => events_open = false,
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    client: SnapClient,
    show_progress: bool,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Ping => {
            let response = client.ping().await?;
            Ok(CommandOutput::Pong {
                status: response.status,
                reason: response.reason,
            })
        }

        Commands::List => {
            let response = client.snaps().list_installed().await?;
            Ok(CommandOutput::Snaps(response.result))
        }

        Commands::Info { snap } => {
            let response = client.snaps().get(&snap).await?;
            Ok(CommandOutput::Snap(Box::new(response.result)))
        }

        Commands::Install {
            snap,
            channel,
            revision,
            classic,
            devmode,
            dangerous,
            no_wait,
        } => {
            let options = InstallOptions {
                channel,
                revision,
                classic,
                devmode,
                dangerous,
            };
            let outcome = client.snaps().install(&snap, &options, !no_wait).await?;
            Ok(submitted("install", snap, outcome))
        }

        Commands::Remove {
            snap,
            purge,
            terminate,
            no_wait,
        } => {
            let options = RemoveOptions { purge, terminate };
            let outcome = client.snaps().remove(&snap, &options, !no_wait).await?;
            Ok(submitted("remove", snap, outcome))
        }

        Commands::Refresh {
            snap,
            channel,
            no_wait,
        } => {
            let outcome = client
                .snaps()
                .refresh(&snap, channel.as_deref(), !no_wait)
                .await?;
            Ok(submitted("refresh", snap, outcome))
        }

        Commands::Change { change_id } => {
            let snapshot = client.get_change(&change_id).await?;
            Ok(CommandOutput::Change(Box::new(snapshot)))
        }

        Commands::Watch { change_id } => {
            let snapshot = watch_change(&client, &change_id, show_progress).await?;
            Ok(CommandOutput::Change(Box::new(snapshot)))
        }

        Commands::Config(ConfigCommands::Get { snap, keys }) => {
            let response = client.config().get(&snap, &keys).await?;
            Ok(CommandOutput::Configuration(response.result))
        }

        Commands::Config(ConfigCommands::Set {
            snap,
            pairs,
            no_wait,
        }) => {
            let configuration = parse_pairs(&pairs)?;
            let outcome = client.config().set(&snap, &configuration, !no_wait).await?;
            Ok(submitted("configure", snap, outcome))
        }

        Commands::Store(store_cmd) => execute_store_command(store_cmd, &client).await,

        Commands::Mirror {
            snap,
            dir,
            start,
            arch,
        } => {
            let summary = client.mirror_revisions(&snap, &dir, start, &arch).await?;
            Ok(CommandOutput::Mirror(summary))
        }
    }
}

async fn execute_store_command(
    command: StoreCommands,
    client: &SnapClient,
) -> Result<CommandOutput, CliError> {
    let store = client.store();
    match command {
        StoreCommands::Categories { fields } => {
            let response = store.categories(&fields).await?;
            Ok(CommandOutput::Categories(
                response.categories.unwrap_or_default(),
            ))
        }
        StoreCommands::Category { name, fields } => {
            let response = store.category(&name, &fields).await?;
            Ok(CommandOutput::Category(response.category))
        }
        StoreCommands::Search {
            query,
            fields,
            category,
            arch,
        } => {
            let params = SearchParams {
                fields,
                category,
                arch,
            };
            Ok(CommandOutput::Search(store.search(&query, &params).await?))
        }
        StoreCommands::Info { snap, fields, arch } => {
            let info = store.info(&snap, &fields, arch.as_deref()).await?;
            Ok(CommandOutput::StoreInfo(Box::new(info)))
        }
        StoreCommands::Arch { arch } => Ok(CommandOutput::ArchListing(
            store.snaps_for_arch(&arch).await?,
        )),
        StoreCommands::Revision {
            snap,
            revision,
            arch,
            fields,
        } => Ok(CommandOutput::Revision(
            store.revision_info(&snap, revision, &arch, &fields).await?,
        )),
    }
}

fn submitted(action: &str, snap: String, outcome: WaitOutcome) -> CommandOutput {
    CommandOutput::Submitted {
        action: action.to_string(),
        snap,
        outcome,
    }
}

/// Follow a change until it is ready or Ctrl-C is pressed
///
/// Configured poll bounds apply, so an unknown id does not poll forever.
async fn watch_change(
    client: &SnapClient,
    change_id: &str,
    show_progress: bool,
) -> Result<ChangeSnapshot, CliError> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut snapshots = Box::pin(client.watch_change(change_id, cancel));
    let mut last = None;
    while let Some(snapshot) = snapshots.next().await {
        let snapshot = snapshot?;
        if show_progress {
            let status = snapshot
                .change_status()
                .map_or_else(|| snapshot.status.clone(), |s| s.to_string());
            let tasks = snapshot
                .change()
                .map(|c| format!(" [{}/{} tasks]", c.finished_tasks(), c.tasks.len()))
                .unwrap_or_default();
            eprintln!("change {change_id}: {status}{tasks}");
        }
        last = Some(snapshot);
    }
    interrupt.abort();

    last.filter(ChangeSnapshot::ready)
        .ok_or_else(|| snapkit_errors::Error::Cancelled.into())
}

/// Parse `key=value` arguments; values that are valid JSON keep their type
fn parse_pairs(pairs: &[String]) -> Result<SnapConfiguration, CliError> {
    let mut configuration = SnapConfiguration::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            CliError::InvalidArguments(format!("expected KEY=VALUE, got '{pair}'"))
        })?;
        if key.is_empty() {
            return Err(CliError::InvalidArguments(format!(
                "missing key in '{pair}'"
            )));
        }
        let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
        configuration.insert(key.to_string(), value);
    }
    Ok(configuration)
}

/// Turn a change that finished unsuccessfully into an error exit
fn ensure_change_succeeded(output: &CommandOutput) -> Result<(), CliError> {
    let snapshot = match output {
        CommandOutput::Submitted {
            outcome: WaitOutcome::Completed(snapshot),
            ..
        } => snapshot,
        CommandOutput::Change(snapshot) => snapshot.as_ref(),
        _ => return Ok(()),
    };

    match snapshot.change() {
        Some(change) if change.status.is_failure() => Err(CliError::ChangeFailed {
            id: change.id.clone(),
            status: change.status,
            message: change.err.clone(),
        }),
        _ => Ok(()),
    }
}

/// Initialize tracing/logging
///
/// Logs go to stderr. `RUST_LOG` wins; otherwise only warnings are shown
/// unless `--debug` is set. `--json` switches to the JSON formatter.
fn init_tracing(json_mode: bool, debug_enabled: bool) {
    let default_filter = if debug_enabled {
        "warn,snapkit=debug,snapkit_client=debug,snapkit_changes=debug,snapkit_net=debug,snapkit_config=debug"
    } else {
        "warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json_mode {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &cli::GlobalArgs) {
    if let Some(socket) = &global.socket {
        config.daemon.socket_path = Some(socket.clone());
        config.daemon.tcp_location = None;
    }
    if let Some(tcp) = &global.tcp {
        config.daemon.tcp_location = Some(tcp.clone());
        config.daemon.socket_path = None;
    }
    if let Some(timeout) = global.poll_timeout {
        config.polling.timeout_secs = Some(timeout);
    }
}
