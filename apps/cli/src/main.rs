use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use client_core::{FileSessionStore, MarketplaceClient, SessionManager};
use shared::domain::{PaymentMethod, ReservationStatus, TicketStatus};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use config::load_settings;

#[derive(Parser, Debug)]
#[command(name = "marketplace", about = "Home-services marketplace client")]
struct Cli {
    /// Config file; defaults to ./marketplace.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Overrides the configured API base URL.
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        email: String,
        #[arg(long, env = "MARKETPLACE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    Whoami,
    /// Browse the employee roster.
    Employees(EmployeeFilters),
    Services {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    #[command(subcommand)]
    Reviews(ReviewCommand),
    #[command(subcommand)]
    Reservations(ReservationCommand),
    Transactions {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    #[command(subcommand)]
    Tickets(TicketCommand),
    /// Reservation, revenue, ticket and review figures.
    Dashboard,
    /// Book an employee, then pay for the reservation.
    Book(BookArgs),
    /// Ask the API for a hosted payment page for an existing reservation.
    PayLink { reservation_id: String },
    /// Run a registration wizard from a JSON file of section updates.
    Register {
        #[arg(value_enum)]
        kind: RegistrationKind,
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Args, Debug, Default)]
struct EmployeeFilters {
    #[arg(long)]
    service: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long)]
    min_rate: Option<i64>,
    #[arg(long)]
    max_rate: Option<i64>,
    #[arg(long)]
    search: Option<String>,
    #[arg(long)]
    status: Option<String>,
}

#[derive(Subcommand, Debug)]
enum ReviewCommand {
    List {
        #[arg(long)]
        search: Option<String>,
        /// `published` or `archived`.
        #[arg(long)]
        status: Option<String>,
    },
    Archive { id: String },
}

#[derive(Subcommand, Debug)]
enum ReservationCommand {
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    SetStatus { id: String, status: ReservationStatus },
}

#[derive(Subcommand, Debug)]
enum TicketCommand {
    List {
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    SetStatus { id: String, status: TicketStatus },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RegistrationKind {
    Client,
    Housekeeper,
}

#[derive(Args, Debug)]
struct BookArgs {
    employee_id: String,
    #[arg(long)]
    service: String,
    /// e.g. 2026-11-02T09:00
    #[arg(long)]
    start: String,
    #[arg(long)]
    hours: Option<u32>,
    #[arg(long)]
    address: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    phone: String,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    notes: Option<String>,
    #[arg(long, default_value = "mobile_money")]
    method: PaymentMethod,
    /// Mobile money number; defaults to the contact phone.
    #[arg(long)]
    pay_phone: Option<String>,
    /// wave, orange_money or free_money.
    #[arg(long, default_value = "wave")]
    operator: String,
    #[arg(long)]
    card_number: Option<String>,
    #[arg(long)]
    card_expiry: Option<String>,
    #[arg(long)]
    card_cvc: Option<String>,
    #[arg(long)]
    account_holder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        settings.api_url = api_url;
    }
    debug!(
        api_url = %settings.api_url,
        session = %settings.session_path.display(),
        "settings loaded"
    );

    let store = Arc::new(FileSessionStore::new(settings.session_path.clone()));
    let session = Arc::new(SessionManager::restore(store).context("failed to read saved session")?);
    let client = MarketplaceClient::new(settings.client_config()?, session)
        .context("failed to build http client")?;

    commands::run(&client, cli.command).await
}
