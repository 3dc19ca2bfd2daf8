pub mod commands;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "church-registry")]
#[command(about = "Church registry API server and admin tools")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP API (default)")]
    Serve {
        #[arg(long, help = "Port to listen on, overriding PORT")]
        port: Option<u16>,
    },

    #[command(about = "Create an admin account")]
    CreateAdmin {
        #[arg(long, help = "Username for the new admin")]
        username: String,
        #[arg(long, help = "Password (at least 6 characters)")]
        password: String,
    },
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    config.validate()?;

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => commands::serve::handle(config, port).await,
        Commands::CreateAdmin { username, password } => {
            commands::create_admin::handle(config, &username, &password).await
        }
    }
}
