pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::gateway::Gateways;

#[derive(Parser)]
#[command(name = "edu")]
#[command(about = "Edu CLI - operate the education platform API and drive its gateways")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the API server and background job scheduler")]
    Serve {
        #[arg(long, help = "Apply pending migrations before serving")]
        migrate: bool,
    },

    #[command(about = "Apply database migrations")]
    Migrate,

    #[command(about = "Inspect and run background jobs")]
    Jobs {
        #[command(subcommand)]
        cmd: commands::jobs::JobsCommands,
    },

    #[command(about = "Bearer token utilities")]
    Token {
        #[command(subcommand)]
        cmd: commands::token::TokenCommands,
    },

    #[command(about = "Fetch, attempt and submit quizzes")]
    Quiz {
        #[command(subcommand)]
        cmd: commands::quiz::QuizCommands,
    },

    #[command(about = "External course registry")]
    Registry {
        #[command(subcommand)]
        cmd: commands::registry::RegistryCommands,
    },

    #[command(about = "Assignment submissions")]
    Submission {
        #[command(subcommand)]
        cmd: commands::submission::SubmissionCommands,
    },

    #[command(about = "Grades on submissions")]
    Grade {
        #[command(subcommand)]
        cmd: commands::grade::GradeCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config().clone();

    match cli.command {
        Commands::Serve { migrate } => crate::server::serve(config, migrate).await,
        Commands::Migrate => commands::migrate::handle(config, output_format).await,
        Commands::Jobs { cmd } => commands::jobs::handle(cmd, config, output_format).await,
        Commands::Token { cmd } => commands::token::handle(cmd, &config, output_format),
        Commands::Quiz { cmd } => commands::quiz::handle(cmd, &Gateways::from_config(&config)?, output_format).await,
        Commands::Registry { cmd } => {
            commands::registry::handle(cmd, &Gateways::from_config(&config)?, output_format).await
        }
        Commands::Submission { cmd } => {
            commands::submission::handle(cmd, &Gateways::from_config(&config)?, output_format).await
        }
        Commands::Grade { cmd } => commands::grade::handle(cmd, &Gateways::from_config(&config)?, output_format).await,
    }
}
