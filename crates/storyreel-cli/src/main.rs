//! Storyreel CLI: command-line client for the trailer generation backend.
//!
//! Set STORYREEL_API_URL (or API_URL). Workflow timings are read from
//! `STORYREEL_*` variables, see `WorkflowConfig`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use storyreel_api_client::ApiClient;
use storyreel_cli::{failure_lines, init_tracing, progress_line, truncate_string};
use storyreel_core::models::{AssetType, CreateProjectRequest, ImageProvider, VideoProvider};
use storyreel_core::WorkflowConfig;
use storyreel_workflow::{StageReport, WorkflowSession, WorkflowSnapshot};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "storyreel", about = "Trailer generation workflow CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project operations
    Projects {
        #[command(subcommand)]
        sub: ProjectCommands,
    },
    /// List the scenes of a project in order
    Scenes {
        project: Uuid,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the generated assets of a project
    Assets {
        project: Uuid,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the video providers and their capabilities
    Providers,
    /// Split the project script into scenes
    Analyze {
        project: Uuid,
        /// Read the script from a file instead of the project
        #[arg(long)]
        script_file: Option<PathBuf>,
    },
    /// Generate one image per scene
    Images {
        project: Uuid,
        /// dalle, aimlapi, higgsfield or gemini
        #[arg(long, default_value_t = ImageProvider::default())]
        provider: ImageProvider,
    },
    /// Animate every scene that has an image
    Animate {
        project: Uuid,
        /// veo, kling or sora
        #[arg(long, default_value_t = VideoProvider::default())]
        provider: VideoProvider,
    },
    /// Analyze, generate images and animate, in order
    Run {
        project: Uuid,
        #[arg(long)]
        script_file: Option<PathBuf>,
        #[arg(long, default_value_t = ImageProvider::default())]
        image_provider: ImageProvider,
        #[arg(long, default_value_t = VideoProvider::default())]
        video_provider: VideoProvider,
    },
    /// Download every image and video asset of a project
    Download {
        project: Uuid,
        /// Destination directory, created if missing
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    /// List all projects
    List,
    /// Get a single project by ID
    Get { id: Uuid },
    /// Create a new project
    Create {
        #[arg(long)]
        title: String,
        #[arg(long, conflicts_with = "script_file")]
        script: Option<String>,
        #[arg(long)]
        script_file: Option<PathBuf>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        style: Option<String>,
        /// Target duration in seconds
        #[arg(long)]
        duration: Option<u32>,
    },
    /// Delete a project by ID
    Delete { id: Uuid },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

async fn read_script(path: &PathBuf) -> anyhow::Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read script: {}", path.display()))
}

async fn open_session(client: ApiClient, project_id: Uuid) -> anyhow::Result<WorkflowSession> {
    let config = WorkflowConfig::from_env()?;
    let session = WorkflowSession::open(client, project_id, config).await?;

    let token = session.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, tearing the session down");
            token.cancel();
        }
    });

    Ok(session)
}

/// Print progress to stderr until aborted.
fn spawn_renderer(mut updates: watch::Receiver<WorkflowSnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_line = None;
        let mut last_error = None;
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            if snapshot.progress.error != last_error {
                if let Some(error) = &snapshot.progress.error {
                    eprintln!("! {}", error);
                }
                last_error = snapshot.progress.error.clone();
            }
            let line = progress_line(&snapshot);
            if line.is_some() && line != last_line {
                if let Some(line) = &line {
                    eprintln!("{}", line);
                }
            }
            last_line = line;
        }
    })
}

fn print_report(report: &StageReport) {
    match report {
        StageReport::Analyzed { total_scenes } => {
            println!("Analysis complete: {} scenes", total_scenes);
        }
        StageReport::ImagesGenerated { generated, total } => match (generated, total) {
            (Some(generated), Some(total)) => {
                println!("Images generated: {}/{}", generated, total)
            }
            (Some(generated), None) => println!("Images generated: {}", generated),
            _ => println!("Image generation finished"),
        },
        StageReport::Animated {
            started,
            ready,
            total,
        } => {
            println!(
                "Animation complete: {} started, {}/{} scenes with video",
                started, ready, total
            );
        }
    }
}

async fn analyze(session: &mut WorkflowSession, script_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let script = match script_file {
        Some(path) => read_script(path).await?,
        None => session
            .project()
            .and_then(|project| project.script())
            .unwrap_or_default()
            .to_string(),
    };

    let renderer = spawn_renderer(session.subscribe());
    let result = session.analyze_script(&script).await;
    renderer.abort();
    print_report(&result?);
    Ok(())
}

async fn generate_images(
    session: &mut WorkflowSession,
    provider: ImageProvider,
) -> anyhow::Result<()> {
    let renderer = spawn_renderer(session.subscribe());
    let result = session.generate_images(provider).await;
    renderer.abort();
    print_report(&result?);
    Ok(())
}

async fn animate(session: &mut WorkflowSession, provider: VideoProvider) -> anyhow::Result<()> {
    let renderer = spawn_renderer(session.subscribe());
    let result = session.animate_scenes(provider).await;
    renderer.abort();
    print_report(&result?);
    Ok(())
}

async fn run(command: Commands, client: ApiClient) -> anyhow::Result<()> {
    match command {
        Commands::Projects { sub } => match sub {
            ProjectCommands::List => {
                let projects = client.list_projects().await?;
                if projects.is_empty() {
                    println!("No projects found.");
                    return Ok(());
                }
                println!("{:<36} {:<12} {:<40} {:>20}", "ID", "Status", "Title", "Created At");
                println!("{}", "-".repeat(111));
                for project in &projects {
                    println!(
                        "{:<36} {:<12} {:<40} {:>20}",
                        project.id,
                        project.status.to_string(),
                        truncate_string(&project.title, 40),
                        project.created_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }
            ProjectCommands::Get { id } => {
                let project = client.get_project(id).await?;
                print_json(&project)?;
            }
            ProjectCommands::Create {
                title,
                script,
                script_file,
                description,
                style,
                duration,
            } => {
                let original_script = match script_file {
                    Some(path) => Some(read_script(&path).await?),
                    None => script,
                };
                let request = CreateProjectRequest {
                    title,
                    description,
                    original_script,
                    style,
                    duration_target: duration,
                };
                let project = client.create_project(&request).await?;
                print_json(&project)?;
            }
            ProjectCommands::Delete { id } => {
                client.delete_project(id).await?;
                print_json(
                    &serde_json::json!({ "success": true, "message": format!("Project {} deleted", id) }),
                )?;
            }
        },
        Commands::Scenes { project, json } => {
            let mut scenes = client.list_scenes(project).await?;
            storyreel_core::models::scene::sort_by_order(&mut scenes);
            if json {
                return print_json(&scenes);
            }
            println!("{:>5} {:<12} {:<40} {:>8}", "Order", "Status", "Title", "Secs");
            println!("{}", "-".repeat(68));
            for scene in &scenes {
                println!(
                    "{:>5} {:<12} {:<40} {:>8}",
                    scene.order,
                    scene.status.to_string(),
                    truncate_string(scene.title.as_deref().unwrap_or("-"), 40),
                    scene
                        .duration
                        .map(|secs| format!("{:.1}", secs))
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        Commands::Assets { project, json } => {
            let assets = client.list_assets(project).await?;
            if json {
                return print_json(&assets);
            }
            println!("{:<36} {:<8} {:<12} {:<50}", "ID", "Type", "Status", "URL");
            println!("{}", "-".repeat(109));
            for asset in &assets {
                println!(
                    "{:<36} {:<8} {:<12} {:<50}",
                    asset.id,
                    asset.asset_type.to_string(),
                    truncate_string(&asset.status, 12),
                    truncate_string(&asset.url, 50)
                );
            }
        }
        Commands::Providers => {
            let providers = client.list_video_providers().await?;
            for (id, info) in &providers {
                let availability = if info.available { "available" } else { "unavailable" };
                println!("{:<8} {:<20} {}", id, info.name, availability);
                if !info.features.is_empty() {
                    println!("         features: {}", info.features.join(", "));
                }
                if let Some(note) = &info.note {
                    println!("         {}", note);
                }
            }
        }
        Commands::Analyze {
            project,
            script_file,
        } => {
            let mut session = open_session(client, project).await?;
            analyze(&mut session, script_file.as_ref()).await?;
        }
        Commands::Images { project, provider } => {
            let mut session = open_session(client, project).await?;
            generate_images(&mut session, provider).await?;
        }
        Commands::Animate { project, provider } => {
            let mut session = open_session(client, project).await?;
            animate(&mut session, provider).await?;
        }
        Commands::Run {
            project,
            script_file,
            image_provider,
            video_provider,
        } => {
            let mut session = open_session(client, project).await?;
            analyze(&mut session, script_file.as_ref()).await?;
            generate_images(&mut session, image_provider).await?;
            animate(&mut session, video_provider).await?;
        }
        Commands::Download { project, out } => {
            tokio::fs::create_dir_all(&out)
                .await
                .with_context(|| format!("Failed to create directory: {}", out.display()))?;
            let assets = client.list_assets(project).await?;
            let mut downloaded = 0usize;
            for asset in assets
                .iter()
                .filter(|asset| matches!(asset.asset_type, AssetType::Image | AssetType::Video))
            {
                let path = out.join(asset.download_file_name());
                let bytes = client.download_asset(asset, &path).await?;
                println!("{} ({} bytes)", path.display(), bytes);
                downloaded += 1;
            }
            println!("Downloaded {} assets to {}", downloaded, out.display());
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    let result = match ApiClient::from_env()
        .context("Failed to create API client. Set STORYREEL_API_URL (or API_URL)")
    {
        Ok(client) => run(cli.command, client).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            for line in failure_lines(&e) {
                eprintln!("{}", line);
            }
            ExitCode::FAILURE
        }
    }
}
