//! Forecaster CLI - register forecasts, submit estimates, resolve outcomes

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use forecaster::commands::{CommandHandler, Invoker, Reply, StaticDirectory, UserDirectory};
use forecaster::config::{self, ForecasterConfig};
use forecaster::forecast::normalize_shortname;
use forecaster::storage::ForecastStore;
use forecaster::{ui, ForecastType};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "forecaster")]
#[command(version)]
#[command(about = "Lightweight tracking of forecasts, estimates and resolutions")]
#[command(long_about = r#"
Forecaster keeps a small SQLite database of community forecasts:
  • Register a forecast (probability or numeric)
  • Submit estimates, optionally as percentages
  • Resolve forecasts once the outcome is known

Example usage:
  forecaster create rain-tmrw "Will it rain tomorrow" --type PROB
  forecaster estimate rain-tmrw 60%
  forecaster resolve rain-tmrw 1.0
"#)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit replies as JSON
    #[arg(long, global = true)]
    json: bool,

    /// User id issuing the command (defaults to $USER)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Path to the database file (overrides config)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },

    #[command(flatten)]
    Forecast(ForecastCommands),
}

/// Commands that run against the forecast database
#[derive(Subcommand)]
enum ForecastCommands {
    /// Create a new forecast
    Create {
        /// Unique short name
        shortname: String,

        /// What is being forecast
        description: String,

        /// Forecast type (PROB or NUMERIC)
        #[arg(short = 't', long = "type", default_value = "PROB")]
        forecast_type: ForecastType,
    },

    /// Submit an estimate, e.g. `0.6` or `60%`
    Estimate {
        shortname: String,

        #[arg(allow_hyphen_values = true)]
        estimate: String,
    },

    /// List all forecasts
    Forecasts {
        /// Render as a table
        #[arg(long)]
        table: bool,
    },

    /// List the estimates for a forecast
    Estimates {
        shortname: String,

        /// Render as a table
        #[arg(long)]
        table: bool,
    },

    /// List the forecasts created by a user (defaults to you)
    User {
        user_id: Option<String>,
    },

    /// Record the outcome of a forecast
    Resolve {
        shortname: String,

        #[arg(allow_hyphen_values = true)]
        result: String,
    },

    /// Show database statistics
    Stats,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn resolve_invoker(cli_user: Option<String>, users: &StaticDirectory) -> Invoker {
    let id = cli_user
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "anonymous".to_string());
    let name = users.display_name(&id).unwrap_or_else(|| id.clone());
    Invoker::new(id, name)
}

fn emit(reply: &Reply, json: bool) -> anyhow::Result<ExitCode> {
    if json {
        println!("{}", serde_json::to_string_pretty(reply)?);
    } else {
        ui::reply(reply);
    }
    Ok(if reply.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn write_default_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<ExitCode> {
    let path = path.unwrap_or_else(config::default_config_path);
    let config = ForecasterConfig {
        database: Some(config::default_database_path().to_string_lossy().to_string()),
        ..Default::default()
    };
    config::write_config(&path, &config, force)?;
    ui::success(&format!("Wrote config to {}", path.display()));
    Ok(ExitCode::SUCCESS)
}

fn run(command: ForecastCommands, cli: &GlobalArgs) -> anyhow::Result<ExitCode> {
    let config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    let database = cli.database.clone().unwrap_or_else(|| config.database_path());

    // A store that cannot be opened is fatal
    let store = ForecastStore::open(&database)
        .with_context(|| format!("failed to open database at {}", database.display()))?;
    tracing::info!("Using database {}", database.display());

    let users = config.directory();
    let invoker = resolve_invoker(cli.user.clone(), &users);
    let handler = CommandHandler::new(store, users);

    match command {
        ForecastCommands::Create {
            shortname,
            description,
            forecast_type,
        } => emit(
            &handler.make_forecast(&invoker, &shortname, &description, forecast_type),
            cli.json,
        ),

        ForecastCommands::Estimate { shortname, estimate } => {
            emit(&handler.estimate(&invoker, &shortname, &estimate), cli.json)
        }

        ForecastCommands::Forecasts { table } if table && !cli.json => {
            let forecasts = handler
                .store()
                .get_forecasts()
                .collect::<forecaster::Result<Vec<_>>>()?;
            ui::header(&format!("{} forecasts", forecasts.len()));
            println!("{}", ui::forecasts_table(&forecasts, &config.directory()));
            Ok(ExitCode::SUCCESS)
        }

        ForecastCommands::Forecasts { .. } => emit(&handler.list_forecasts(), cli.json),

        ForecastCommands::Estimates { shortname, table } if table && !cli.json => {
            let shortname = normalize_shortname(&shortname)?;
            let estimates = handler
                .store()
                .get_estimates(shortname)
                .collect::<forecaster::Result<Vec<_>>>()?;
            ui::header(&format!("Estimates for `{}`", shortname));
            println!("{}", ui::estimates_table(&estimates, &config.directory()));
            Ok(ExitCode::SUCCESS)
        }

        ForecastCommands::Estimates { shortname, .. } => {
            emit(&handler.list_estimates(&shortname), cli.json)
        }

        ForecastCommands::User { user_id } => {
            let user_id = user_id.unwrap_or_else(|| invoker.id.clone());
            emit(&handler.user_forecasts(&user_id), cli.json)
        }

        ForecastCommands::Resolve { shortname, result } => {
            emit(&handler.resolve(&invoker, &shortname, &result), cli.json)
        }

        ForecastCommands::Stats => {
            let stats = handler.store().stats()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                ui::header(&format!("Forecaster statistics ({})", database.display()));
                println!("{}", ui::stats_table(&stats));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let Cli { global, command } = Cli::parse();
    init_logging(global.verbose);

    match command {
        // the config file is written before any database exists
        Commands::Init { force } => write_default_config(global.config, force),
        Commands::Forecast(command) => run(command, &global),
    }
}
