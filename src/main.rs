//! Warden CLI entry point.

use clap::Parser;

use warden::cli::{commands, Cli, Commands};
use warden::infrastructure::config::ConfigLoader;
use warden::infrastructure::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(err) => {
            warden::cli::handle_error(err, cli.json);
            return;
        }
    };

    // Held for the life of the process so file output flushes.
    let _logging_guard = init_logging(&config.logging);

    let result = match cli.command {
        Commands::Init => commands::init(&config, cli.json).await,
        Commands::Agent(args) => commands::agent(args, &config, cli.json).await,
        Commands::Episode(args) => commands::episode(args, &config, cli.json).await,
        Commands::Authorize {
            agent_id,
            action,
            force,
        } => commands::authorize(&agent_id, &action, force, &config, cli.json).await,
        Commands::Graduate {
            agent_id,
            target,
            approver,
            token,
        } => commands::graduate(&agent_id, target, approver, token, &config, cli.json).await,
        Commands::Retrieve { agent_id, query, k } => {
            commands::retrieve(&agent_id, &query, k, &config, cli.json).await
        }
        Commands::Audit { agent, limit } => commands::audit(agent, limit, &config, cli.json).await,
    };

    if let Err(err) = result {
        warden::cli::handle_error(err, cli.json);
    }
}
