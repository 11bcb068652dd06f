//! arbor CLI - task-file automation for a directory-backed identity service.
//!
//! A task file names a connection and an ordered list of actions; every
//! action dispatches through the registry to the client library. `--check`
//! computes the would-be outcome of each apply without writing, `--force`
//! takes the create path unconditionally.

use std::path::PathBuf;
use std::sync::Arc;

use arbor_client::http::HttpTransport;
use arbor_client::{
    ApplyContext, ApplyOptions, ContainerPath, DirectoryClient, DirectoryConfig, PathResolver,
};
use arbor_wire::ApiError;
use clap::{Args, Parser, Subcommand};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod registry;
mod tasks;

use error::{CliError, CliResult};
use tasks::TaskFile;

/// arbor - directory service automation
#[derive(Parser)]
#[command(name = "arbor")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tasks in a YAML task file, in order
    Apply(ApplyArgs),

    /// Translate a container path to its identifier, or back
    Resolve(ResolveArgs),

    /// Print the connected server's version
    Version(ConnectionArgs),
}

#[derive(Args, Debug)]
struct ApplyArgs {
    /// Path to the task file
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Report what would change without writing anything
    #[arg(long)]
    check: bool,

    /// Take the create path even when a matching object exists
    #[arg(long)]
    force: bool,
}

#[derive(Args, Debug)]
struct ResolveArgs {
    /// Task file providing the connection block
    #[arg(short = 'f', long = "file")]
    file: PathBuf,

    /// Container path to translate, e.g. '//Acme//ou::Engineering'
    #[arg(long, conflicts_with = "dn")]
    path: Option<String>,

    /// Identifier to translate back to a container path
    #[arg(long)]
    dn: Option<String>,
}

#[derive(Args, Debug)]
struct ConnectionArgs {
    /// Task file providing the connection block
    #[arg(short = 'f', long = "file")]
    file: PathBuf,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => {}
        Err(e) => {
            error!("{e}");
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Apply(args) => apply(args).await,
        Commands::Resolve(args) => resolve(args).await,
        Commands::Version(args) => version(args).await,
    }
}

async fn connect(config: &DirectoryConfig) -> CliResult<(DirectoryClient, PathResolver)> {
    let transport = Arc::new(HttpTransport::new(config).map_err(ApiError::from)?);
    let client = DirectoryClient::connect(config, transport).await?;
    let resolver = PathResolver::bootstrap(&client).await?;
    Ok((client, resolver))
}

async fn apply(args: ApplyArgs) -> CliResult<()> {
    let task_file = TaskFile::load(&args.file)?;
    let (client, resolver) = connect(&task_file.connection).await?;
    let cx = ApplyContext {
        client: &client,
        resolver: &resolver,
    };
    let options = ApplyOptions {
        check_mode: args.check,
        force: args.force,
    };

    let mut failed = 0usize;
    for (index, task) in task_file.tasks.iter().enumerate() {
        let label = task.label();
        let outcome =
            registry::dispatch(&cx, &task.action, task.with.clone(), options).await?;

        for warning in &outcome.warnings {
            warn!(task = label, "{warning}");
        }
        if outcome.failed() {
            failed += 1;
        }
        println!(
            "[{}/{}] {}: rc={} changed={}",
            index + 1,
            task_file.tasks.len(),
            label,
            outcome.return_code,
            outcome.changed
        );
        if let Some(payload) = &outcome.payload {
            if !payload.is_null() {
                println!("{}", serde_json::to_string_pretty(payload)?);
            }
        }
    }

    if failed > 0 {
        return Err(CliError::TasksFailed { failed });
    }
    Ok(())
}

async fn resolve(args: ResolveArgs) -> CliResult<()> {
    let task_file = TaskFile::load(&args.file)?;
    let (client, resolver) = connect(&task_file.connection).await?;

    match (args.path, args.dn) {
        (Some(path), None) => {
            let parsed = ContainerPath::parse(&path)?;
            println!("{}", resolver.path_to_dn(&client, &parsed).await?);
            Ok(())
        }
        (None, Some(dn)) => {
            println!("{}", resolver.dn_to_path(&client, &dn).await?);
            Ok(())
        }
        _ => Err(CliError::Input(
            "exactly one of --path or --dn is required".to_string(),
        )),
    }
}

async fn version(args: ConnectionArgs) -> CliResult<()> {
    let task_file = TaskFile::load(&args.file)?;
    let (client, _resolver) = connect(&task_file.connection).await?;
    println!("{}", client.server_version());
    Ok(())
}
