use clap::{Parser, Subcommand};
use colored::Colorize;
use env_logger::Env;

mod auth;
mod contact;
mod context;
mod dashboard;
mod family;
mod notifications;
mod photo;
mod ping;
mod search;
mod stats;
mod upload;

#[derive(Parser)]
#[command(name = "hgm")]
#[command(about = "Field client for the Har Ghar Munga household plant program", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(short = 'd', long = "debug", global = true, hide = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, log out, or show the current session
    Auth(auth::AuthArgs),

    /// Check that the server is reachable
    Ping(ping::PingArgs),

    /// Search households by child name or mobile number
    #[command(alias = "s")]
    Search(search::SearchArgs),

    /// Register, inspect and update households
    #[command(alias = "f")]
    Family(family::FamilyArgs),

    /// Upload a plant growth photo
    Photo(photo::PhotoArgs),

    /// Upload a photo or document
    Upload(upload::UploadArgs),

    /// Program-wide totals
    Stats(stats::StatsArgs),

    /// Role-specific landing view
    #[command(alias = "d")]
    Dashboard(dashboard::DashboardArgs),

    /// Recent activity on this device
    Notifications(notifications::NotificationsArgs),

    /// Look up an account by contact number
    Contact(contact::ContactArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {e}", "Error:".red());
        for cause in e.chain().skip(1) {
            eprintln!("  {cause}");
        }
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let env = if cli.debug {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("error")
    };
    env_logger::Builder::from_env(env).init();

    match cli.command {
        Commands::Auth(args) => auth::execute(args),
        Commands::Ping(args) => ping::execute(args),
        Commands::Search(args) => search::execute(args),
        Commands::Family(args) => family::execute(args),
        Commands::Photo(args) => photo::execute(args),
        Commands::Upload(args) => upload::execute(args),
        Commands::Stats(args) => stats::execute(args),
        Commands::Dashboard(args) => dashboard::execute(args),
        Commands::Notifications(args) => notifications::execute(args),
        Commands::Contact(args) => contact::execute(args),
    }
}
