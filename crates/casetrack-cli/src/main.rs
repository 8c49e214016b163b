//! casetrack: command-line client for the case tracking API.
//!
//! Set CASETRACK_API_URL (or API_URL) and optionally CASETRACK_TOKEN.

use anyhow::Context;
use casetrack_cli::{init_tracing, ApiClient};
use casetrack_core::models::MediaKind;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "casetrack", about = "Case tracking API CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cases, newest first
    List,
    /// Get a single case with its media
    Get {
        /// Case UUID
        id: Uuid,
    },
    /// Create a case from a JSON file
    Create {
        /// Path to a JSON case body
        #[arg(long)]
        file: PathBuf,
    },
    /// Apply a partial update from a JSON file
    Update {
        /// Case UUID
        id: Uuid,
        /// Path to a JSON body with the fields to change
        #[arg(long)]
        file: PathBuf,
    },
    /// Delete a case and its media
    Delete {
        /// Case UUID
        id: Uuid,
    },
    /// Attach files to a case
    Upload {
        /// Case UUID
        case_id: Uuid,
        /// Files to upload in one batch
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Send the files as videos instead of images
        #[arg(long)]
        video: bool,
    },
    /// Remove one media item from a case
    DeleteMedia {
        /// Case UUID
        case_id: Uuid,
        /// Media UUID
        media_id: Uuid,
    },
    /// List the advisory crime types
    CrimeTypes,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

fn read_json(path: &PathBuf) -> anyhow::Result<serde_json::Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let client = ApiClient::from_env().context("Failed to create API client")?;
    let cli = Cli::parse();

    match cli.command {
        Commands::List => print_json(&client.list_cases().await?)?,
        Commands::Get { id } => print_json(&client.get_case(id).await?)?,
        Commands::Create { file } => {
            let body = read_json(&file)?;
            print_json(&client.create_case(&body).await?)?;
        }
        Commands::Update { id, file } => {
            let body = read_json(&file)?;
            print_json(&client.update_case(id, &body).await?)?;
        }
        Commands::Delete { id } => print_json(&client.delete_case(id).await?)?,
        Commands::Upload {
            case_id,
            files,
            video,
        } => {
            let kind = if video {
                MediaKind::Video
            } else {
                MediaKind::Image
            };
            let response = client.upload_media(case_id, kind, files.as_slice()).await?;
            for warning in &response.warnings {
                tracing::warn!(?warning, "Upload warning");
            }
            print_json(&response)?;
        }
        Commands::DeleteMedia { case_id, media_id } => {
            print_json(&client.delete_media(case_id, media_id).await?)?;
        }
        Commands::CrimeTypes => print_json(&client.crime_types().await?)?,
    }

    Ok(())
}
