use clap::Subcommand;

use crate::cli::utils::{output_list, output_record};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::state::AppState;

#[derive(Subcommand)]
pub enum JobsCommands {
    #[command(about = "List registered jobs with their schedule and last run")]
    List,

    #[command(about = "Run one job now and print its report")]
    Run {
        #[arg(help = "Job name, e.g. due-soon or retention")]
        name: String,
    },
}

pub async fn handle(cmd: JobsCommands, config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let state = AppState::from_config(config).await?;

    match cmd {
        JobsCommands::List => output_list(output_format, "jobs", &state.jobs.list(), |job| {
            format!(
                "{:<22} every {:>6}s  {}",
                job.name,
                job.interval_secs,
                if job.enabled { "enabled" } else { "disabled" }
            )
        }),
        JobsCommands::Run { name } => {
            let report = state.jobs.run_once(&name).await?;
            output_record(output_format, "report", &report)
        }
    }
}
