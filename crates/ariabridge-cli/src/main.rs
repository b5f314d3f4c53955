//! CLI entry point - the composition root.

use std::process::ExitCode;
use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use ariabridge_cli::handlers::control::{self, Control};
use ariabridge_cli::handlers::{add, serve, status};
use ariabridge_cli::{Cli, CliConfig, CliError, Commands, bootstrap};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command.as_ref() else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::from_cli(&cli)?;

    if let Commands::Serve(args) = command {
        let config = config.with_serve_args(args, cli.rpc_url.is_some());
        serve::execute(config, Duration::from_secs(args.ready_timeout)).await?;
        return Ok(());
    }

    let ctx = bootstrap(config)?;
    match command {
        Commands::Serve(_) => {}
        Commands::Add {
            url,
            wait,
            interval,
        } => add::execute(&ctx, url, *wait, Duration::from_secs(*interval)).await?,
        Commands::AddTorrent { file } => add::torrent(&ctx, file).await?,
        Commands::Status { gid, json } => status::execute(&ctx, gid, *json).await?,
        Commands::Pause { gid } => control::execute(&ctx, Control::Pause, gid).await?,
        Commands::Resume { gid } => control::execute(&ctx, Control::Resume, gid).await?,
        Commands::Stop { gid } => control::execute(&ctx, Control::Stop, gid).await?,
        Commands::Remove { gid } => control::execute(&ctx, Control::Remove, gid).await?,
        Commands::Purge => control::purge(&ctx).await?,
        Commands::Shutdown => control::shutdown(&ctx).await?,
        Commands::SetDir { path } => control::set_dir(&ctx, path).await?,
        Commands::Version => status::version(&ctx).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}
