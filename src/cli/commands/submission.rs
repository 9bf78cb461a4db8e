use clap::Subcommand;
use uuid::Uuid;

use crate::cli::utils::{output_list, output_record};
use crate::cli::OutputFormat;
use crate::gateway::Gateways;

#[derive(Subcommand)]
pub enum SubmissionCommands {
    #[command(about = "Submit (or resubmit) work for an assignment")]
    Submit {
        #[arg(help = "Assignment id")]
        assignment_id: Uuid,
        #[arg(long, help = "Submission text")]
        body: Option<String>,
        #[arg(long, help = "Id of an uploaded file to attach")]
        file: Option<Uuid>,
    },

    #[command(about = "List submissions for an assignment")]
    List {
        #[arg(help = "Assignment id")]
        assignment_id: Uuid,
    },
}

pub async fn handle(cmd: SubmissionCommands, gateways: &Gateways, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        SubmissionCommands::Submit { assignment_id, body, file } => {
            if body.is_none() && file.is_none() {
                anyhow::bail!("a submission needs --body, --file or both");
            }
            let submission = gateways.submission.submit(assignment_id, body, file).await?;
            output_record(output_format, "submission", &submission)
        }
        SubmissionCommands::List { assignment_id } => {
            let submissions = gateways.submission.list(assignment_id).await?;
            output_list(output_format, "submissions", &submissions, |s| {
                format!("{}  {:<9} student {}", s.id, s.status, s.student_id)
            })
        }
    }
}
