// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Chatlink CLI
//!
//! Command-line client for the chat server's real-time connection.

mod commands;
mod config;
mod display;

use std::io;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use config::CliConfig;

#[derive(Parser)]
#[command(name = "chatlink")]
#[command(version, about = "Real-time chat connection client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// WebSocket endpoint (default: CHATLINK_SERVER_URL or the built-in server)
    #[arg(long, global = true)]
    server: Option<String>,

    /// Bearer token
    #[arg(long, global = true, env = "CHATLINK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Your user id, used for typing notices and own-message resolution
    #[arg(long, global = true, env = "CHATLINK_USER_ID")]
    user_id: Option<i64>,

    /// Heartbeat interval in seconds
    #[arg(long, global = true)]
    heartbeat: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Stay connected and print server events until Ctrl-C
    Listen {
        /// Conversation to join (repeatable)
        #[arg(short, long = "conversation", value_name = "ID")]
        conversations: Vec<String>,
    },

    /// Connect once and print the connection status
    Status {
        /// Seconds to wait for the connection
        #[arg(long, default_value = "10")]
        wait: u64,
    },

    /// Send one heartbeat ping
    Ping,

    /// Send a typing notice to a conversation
    Typing {
        /// Conversation id
        conversation: String,

        /// Send "stopped typing" instead
        #[arg(long)]
        stop: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chatlink_core=info".parse()?),
        )
        .init();

    let config = CliConfig {
        server_url: cli.server,
        token: cli.token,
        user_id: cli.user_id,
        heartbeat_secs: cli.heartbeat,
    };

    match cli.command {
        Commands::Listen { conversations } => {
            commands::listen::run(&config, &conversations).await?;
        }
        Commands::Status { wait } => commands::status::run(&config, wait).await?,
        Commands::Ping => commands::ping::run(&config).await?,
        Commands::Typing { conversation, stop } => {
            commands::typing::run(&config, &conversation, !stop).await?;
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "chatlink", &mut io::stdout());
        }
    }

    Ok(())
}
