use clap::Subcommand;
use uuid::Uuid;

use crate::cli::utils::output_record;
use crate::cli::OutputFormat;
use crate::gateway::Gateways;

#[derive(Subcommand)]
pub enum GradeCommands {
    #[command(about = "Grade a submission")]
    Set {
        #[arg(help = "Submission id")]
        submission_id: Uuid,
        #[arg(long, help = "Score between 0 and the assignment's points")]
        score: f64,
        #[arg(long, help = "Feedback for the student")]
        feedback: Option<String>,
    },

    #[command(about = "Show the grade on a submission")]
    Get {
        #[arg(help = "Submission id")]
        submission_id: Uuid,
    },
}

pub async fn handle(cmd: GradeCommands, gateways: &Gateways, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        GradeCommands::Set { submission_id, score, feedback } => {
            let grade = gateways.grading.set_grade(submission_id, score, feedback).await?;
            output_record(output_format, "grade", &grade)
        }
        GradeCommands::Get { submission_id } => {
            let grade = gateways.grading.get_grade(submission_id).await?;
            output_record(output_format, "grade", &grade)
        }
    }
}
