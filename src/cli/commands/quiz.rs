use clap::Subcommand;
use uuid::Uuid;

use crate::cli::utils::{output_record, parse_answers};
use crate::cli::OutputFormat;
use crate::gateway::Gateways;

#[derive(Subcommand)]
pub enum QuizCommands {
    #[command(about = "Show a quiz with its questions")]
    Get {
        #[arg(help = "Quiz id")]
        quiz_id: Uuid,
    },

    #[command(about = "Start (or resume) an attempt")]
    Attempt {
        #[arg(help = "Quiz id")]
        quiz_id: Uuid,
    },

    #[command(about = "Submit answers for an attempt")]
    Submit {
        #[arg(help = "Attempt id")]
        attempt_id: Uuid,
        #[arg(long, help = "Comma-separated choice indexes, '-' to skip (e.g. 0,2,-,1)")]
        answers: String,
    },
}

pub async fn handle(cmd: QuizCommands, gateways: &Gateways, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        QuizCommands::Get { quiz_id } => {
            let quiz = gateways.quiz.get_quiz(quiz_id).await?;
            output_record(output_format, "quiz", &quiz)
        }
        QuizCommands::Attempt { quiz_id } => {
            let attempt = gateways.quiz.start_attempt(quiz_id).await?;
            output_record(output_format, "attempt", &attempt)
        }
        QuizCommands::Submit { attempt_id, answers } => {
            let answers = parse_answers(&answers)?;
            let attempt = gateways.quiz.submit_attempt(attempt_id, answers).await?;
            output_record(output_format, "attempt", &attempt)
        }
    }
}
