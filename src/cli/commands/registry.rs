use clap::Subcommand;
use uuid::Uuid;

use crate::cli::utils::{output_list, output_record};
use crate::cli::OutputFormat;
use crate::gateway::Gateways;

#[derive(Subcommand)]
pub enum RegistryCommands {
    #[command(about = "List registry courses")]
    List {
        #[arg(long, help = "Filter by status: draft, published or archived")]
        status: Option<String>,
    },

    #[command(about = "List versions of a registry course, newest first")]
    Versions {
        #[arg(help = "Registry course id")]
        course_id: Uuid,
    },

    #[command(about = "Publish a new version of a registry course")]
    PublishVersion {
        #[arg(help = "Registry course id")]
        course_id: Uuid,
        #[arg(long, help = "Semantic version, greater than every existing one")]
        version: String,
        #[arg(long, default_value = "{}", help = "Manifest as a JSON object")]
        manifest: String,
    },
}

pub async fn handle(cmd: RegistryCommands, gateways: &Gateways, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        RegistryCommands::List { status } => {
            let courses = gateways.registry.list_courses(status.as_deref()).await?;
            output_list(output_format, "courses", &courses, |c| {
                format!("{}  {:<10} {} ({})", c.id, c.status, c.title, c.external_id)
            })
        }
        RegistryCommands::Versions { course_id } => {
            let versions = gateways.registry.list_versions(course_id).await?;
            output_list(output_format, "versions", &versions, |v| {
                format!("{}  {:<10} {}", v.id, v.status, v.version)
            })
        }
        RegistryCommands::PublishVersion { course_id, version, manifest } => {
            let manifest: serde_json::Value = serde_json::from_str(&manifest)
                .map_err(|e| anyhow::anyhow!("manifest is not valid JSON: {}", e))?;
            let created = gateways.registry.publish_version(course_id, &version, manifest).await?;
            output_record(output_format, "version", &created)
        }
    }
}
