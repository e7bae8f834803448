//! Strictly Digits - Unified CLI
//!
//! HTTP server, terminal play, statistics, and profile management over one
//! SQLite database.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use strictly_digits::MemorySessionStore;
use strictly_digits_server::{
    AppState, Cli, Command, GameRepository, GameService, ProfileService, Registration,
    ServerConfig, UserAction, run_play, serve,
};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut config = ServerConfig::load(cli.config.as_deref())?;
    if let Some(db_path) = cli.db_path {
        config.set_db_path(db_path);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let repository = GameRepository::open(config.db_path().clone())?;
    info!(db_path = %config.db_path(), "Database ready");

    match cli.command {
        Command::Serve { port, host } => {
            if let Some(port) = port {
                config.set_port(port);
            }
            if let Some(host) = host {
                config.set_host(host);
            }
            run_server(config, repository).await
        }
        Command::Play { user } => {
            tokio::task::spawn_blocking(move || run_terminal(repository, &user)).await?
        }
        Command::Stats { user } => print_stats(repository, user),
        Command::User { action } => manage_users(repository, action),
    }
}

/// Run the HTTP game server
#[instrument(skip_all, fields(host = %config.host(), port = config.port()))]
async fn run_server(config: ServerConfig, repository: GameRepository) -> Result<()> {
    info!("Starting Strictly Digits HTTP server");
    serve(config.host(), *config.port(), AppState::new(repository)).await
}

/// Play in the terminal as `name`
#[instrument(skip(repository))]
fn run_terminal(repository: GameRepository, name: &str) -> Result<()> {
    let profiles = ProfileService::new(repository.clone());
    let user = profiles.get_or_create_user(name)?;
    info!(user_id = user.id(), "Player ready");

    let service = GameService::new(MemorySessionStore::new(), repository.clone())
        .with_guess_log(Arc::new(repository));

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_play(&service, user.user_id(), stdin.lock(), stdout.lock())
}

/// Print overall or per-player statistics
#[instrument(skip(repository))]
fn print_stats(repository: GameRepository, user: Option<String>) -> Result<()> {
    use strictly_digits::StatisticsSource;

    match user {
        None => {
            let stats = repository.aggregate_statistics()?;
            println!("Players:              {}", stats.total_users());
            println!("Games played:         {}", stats.total_games_played());
            println!("Average moves/game:   {:.1}", stats.average_moves_per_game());
            println!("Correct guesses:      {}", stats.total_correct_guesses());
        }
        Some(name) => {
            let profiles = ProfileService::new(repository.clone());
            let Some(user) = profiles.find(&name)? else {
                anyhow::bail!("no player named '{}'", name);
            };
            let stats = repository.user_statistics(user.user_id())?;
            println!("Player:         {}", user.display_name());
            println!("Games:          {}", stats.total_games());
            println!("Wins:           {}", stats.total_wins());
            println!("Average moves:  {:.2}", stats.average_moves());
            println!("Win ratio:      {:.2}%", stats.win_ratio_percent());

            for record in repository.user_history(user.user_id())? {
                println!(
                    "  {}  {}  {} moves",
                    record.recorded_at(),
                    record.outcome(),
                    record.total_moves()
                );
            }
        }
    }
    Ok(())
}

/// Register or list players
#[instrument(skip(repository))]
fn manage_users(repository: GameRepository, action: UserAction) -> Result<()> {
    let profiles = ProfileService::new(repository);
    match action {
        UserAction::Add { name } => match profiles.register(&name)? {
            Registration::Created(user) => {
                println!("Registered '{}' with id {}", user.display_name(), user.id());
            }
            Registration::Taken(user) => {
                anyhow::bail!("display name '{}' is taken (id {})", user.display_name(), user.id());
            }
        },
        UserAction::List => {
            for user in profiles.list()? {
                println!("{:>4}  {}  (since {})", user.id(), user.display_name(), user.created_at());
            }
        }
    }
    Ok(())
}
