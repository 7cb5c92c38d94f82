//! Backoffice CLI - headless front end for the admin console.
//!
//! # Usage
//!
//! ```bash
//! # Show who the configured credentials belong to
//! bo-cli whoami
//!
//! # Sign in with a password (read from CONSOLE_PASSWORD) before running a command
//! bo-cli --operator admin@example.com users list --role manager --page 2
//!
//! # Create a restaurant
//! bo-cli tenants create --name "Pizza Hut" --address "1 Main St"
//!
//! # Rename an account (new-account passwords come from CONSOLE_NEW_USER_PASSWORD)
//! bo-cli users update 12 --first-name Ada
//! ```
//!
//! # Commands
//!
//! - `whoami` - Resolve the session and print the principal
//! - `logout` - End the session
//! - `users list|create|update` - Manage accounts
//! - `tenants list|create|update` - Manage restaurants

#![cfg_attr(not(test), forbid(unsafe_code))]

use backoffice_console::{ConsoleConfig, telemetry};
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bo-cli")]
#[command(author, version, about = "Backoffice console CLI")]
struct Cli {
    /// Operator email to sign in with when no session is established
    #[arg(long, global = true, env = "CONSOLE_EMAIL")]
    operator: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the session and print the signed-in principal
    Whoami,
    /// End the session
    Logout,
    /// Manage accounts
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Manage restaurants
    Tenants {
        #[command(subcommand)]
        action: TenantAction,
    },
}

#[derive(Args)]
struct ListArgs {
    /// Page to show (1-based)
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Free-text search
    #[arg(short, long)]
    search: Option<String>,
}

#[derive(Subcommand)]
enum UserAction {
    /// List accounts
    List {
        #[command(flatten)]
        list: ListArgs,

        /// Role filter (`admin`, `manager`, `customer`)
        #[arg(short, long)]
        role: Option<String>,

        /// Status filter (`active`, `ban`)
        #[arg(long)]
        status: Option<String>,
    },
    /// Create an account
    Create {
        #[command(flatten)]
        fields: commands::users::UserFields,
    },
    /// Update an account
    Update {
        /// Account id
        id: i32,

        #[command(flatten)]
        fields: commands::users::UserFields,
    },
}

#[derive(Subcommand)]
enum TenantAction {
    /// List restaurants
    List {
        #[command(flatten)]
        list: ListArgs,
    },
    /// Create a restaurant
    Create {
        #[command(flatten)]
        fields: commands::tenants::TenantFields,
    },
    /// Update a restaurant
    Update {
        /// Restaurant id
        id: i32,

        #[command(flatten)]
        fields: commands::tenants::TenantFields,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match ConsoleConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_logging();
            tracing::error!("Configuration failed: {e}");
            std::process::exit(1);
        }
    };
    // Flushes Sentry on exit
    let sentry_guard = telemetry::init(&config);

    if let Err(e) = run(cli, config).await {
        e.report();
        drop(sentry_guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: ConsoleConfig) -> Result<(), commands::CliError> {
    let console = commands::Console::connect(config, cli.operator.as_deref()).await?;

    match cli.command {
        Commands::Whoami => commands::session::whoami(&console),
        Commands::Logout => commands::session::logout(&console).await,
        Commands::Users { action } => match action {
            UserAction::List { list, role, status } => {
                commands::users::list(
                    &console,
                    list.page,
                    list.search,
                    role.as_deref(),
                    status.as_deref(),
                )
                .await?;
            }
            UserAction::Create { fields } => commands::users::create(&console, fields).await?,
            UserAction::Update { id, fields } => {
                commands::users::update(&console, id, fields).await?;
            }
        },
        Commands::Tenants { action } => match action {
            TenantAction::List { list } => {
                commands::tenants::list(&console, list.page, list.search).await?;
            }
            TenantAction::Create { fields } => {
                commands::tenants::create(&console, fields).await?;
            }
            TenantAction::Update { id, fields } => {
                commands::tenants::update(&console, id, fields).await?;
            }
        },
    }
    Ok(())
}
