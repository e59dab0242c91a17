use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{category, log, stats, status, track};
use wt_cli::{App, Cli, Commands, Config, exit_code};

fn run(cli: &Cli) -> Result<()> {
    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    let app = App::open(&config, cli.user.as_deref())?;

    let mut stdout = std::io::stdout().lock();
    match command {
        Commands::Start(args) => track::start(&mut stdout, &app, args)?,
        Commands::Pause => track::pause(&mut stdout, &app)?,
        Commands::Resume => track::resume(&mut stdout, &app)?,
        Commands::Stop => track::stop(&mut stdout, &app)?,
        Commands::Delete { entry_id } => track::delete(&mut stdout, &app, entry_id)?,
        Commands::Status { json } => status::run(&mut stdout, &app, *json)?,
        Commands::Log { json } => log::run(&mut stdout, &app, *json)?,
        Commands::Stats(args) => stats::run(&mut stdout, &app, args)?,
        Commands::Category(action) => category::run(&mut stdout, &app, action)?,
    }
    stdout.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so command output stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}
