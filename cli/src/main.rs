use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod util;

use commands::chat::ChatArgs;
use commands::classify::ClassifyArgs;
use commands::note::NoteCommands;
use commands::parse_plan::ParsePlanArgs;
use commands::plan::PlanCommands;
use commands::profile::ProfileCommands;
use util::Target;

#[derive(Parser)]
#[command(name = "trener", version, about = "Trener CLI: log workouts and meals, manage daily plans")]
struct Cli {
    /// API base URL
    #[arg(long, env = "TRENER_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Chat user id, sent as x-user-id
    #[arg(long, env = "TRENER_USER_ID")]
    user_id: Option<String>,

    /// Print compact JSON
    #[arg(long, global = true)]
    raw: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Read and write daily notes
    Note {
        #[command(subcommand)]
        command: NoteCommands,
    },
    /// Send a chat message and run one turn
    Chat(ChatArgs),
    /// Workout plan checklist and plan generation
    Plan {
        #[command(subcommand)]
        command: PlanCommands,
    },
    /// Training profile and goals used to personalise plans
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },
    /// Classify a message locally (no API call)
    Classify(ClassifyArgs),
    /// Parse plan text locally (no API call)
    ParsePlan(ParsePlanArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TRENER_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let target = Target {
        api_url: cli.api_url.trim_end_matches('/'),
        user_id: cli.user_id.as_deref(),
        raw: cli.raw,
    };

    let code = match cli.command {
        Commands::Health => commands::health::run(target).await,
        Commands::Note { command } => commands::note::run(target, command).await,
        Commands::Chat(args) => commands::chat::run(target, args).await,
        Commands::Plan { command } => commands::plan::run(target, command).await,
        Commands::Profile { command } => commands::profile::run(target, command).await,
        Commands::Classify(args) => commands::classify::run(args, cli.raw),
        Commands::ParsePlan(args) => commands::parse_plan::run(args, cli.raw),
    };

    std::process::exit(code);
}
