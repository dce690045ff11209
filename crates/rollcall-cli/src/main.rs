use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use rollcall_api::ApiClient;
use rollcall_core::view::{CaptureView, StudentCard};
use rollcall_core::{CaptureState, CaptureWidget, Dashboard, RosterView, StudentId, Upload};
use rollcall_hw::{Camera, V4lSource};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod config;
mod console;

use config::Config;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition attendance console")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Attendance server origin (overrides config and ROLLCALL_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// V4L2 camera device (overrides config and ROLLCALL_CAMERA_DEVICE)
    #[arg(long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the student roster
    Students {
        #[command(subcommand)]
        action: StudentAction,
    },
    /// Capture a photo and check in for a date
    CheckIn {
        /// Attendance date (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
        /// Use an image file instead of the camera
        #[arg(short, long)]
        photo: Option<PathBuf>,
    },
    /// Show roster attendance and counts for a date
    Status {
        /// Attendance date (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// Interactive attendance dashboard
    Dashboard {
        /// Initial attendance date (YYYY-MM-DD, default today)
        #[arg(short, long)]
        date: Option<NaiveDate>,
    },
    /// List V4L2 capture devices
    Devices,
    /// Print the resolved configuration
    Config,
}

#[derive(Subcommand)]
enum StudentAction {
    /// List registered students
    List,
    /// Register a student
    Add {
        /// Full name
        #[arg(short, long)]
        name: String,
        /// Reference photo
        #[arg(short, long)]
        photo: Option<PathBuf>,
    },
    /// Remove a student by ID
    Remove {
        /// Student ID
        id: String,
    },
}

/// Read an image file into a multipart upload.
pub(crate) fn upload_from_path(path: &Path) -> Result<Upload> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    Ok(Upload {
        file_name,
        content_type: mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string(),
        bytes,
    })
}

fn parse_id(raw: &str) -> StudentId {
    match raw.parse::<i64>() {
        Ok(n) => StudentId::Number(n),
        Err(_) => StudentId::from(raw),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Dashboard for `date`, or for today when none was given.
pub(crate) fn open_dashboard(
    config: &Config,
    client: ApiClient,
    date: Option<NaiveDate>,
) -> Dashboard<ApiClient> {
    match date {
        Some(date) => Dashboard::with_date(client, config.api_url.clone(), date),
        None => Dashboard::new(client, config.api_url.clone()),
    }
}

/// Camera-backed capture widget that prints the pending view while a still is checked in.
pub(crate) fn camera_widget(config: &Config) -> CaptureWidget<V4lSource> {
    CaptureWidget::new(V4lSource::new(
        config.camera_device.clone(),
        config.jpeg_quality,
        config.warmup_frames,
    ))
    .on_pending(|state| {
        print!("{}", CaptureView(state));
        let _ = std::io::stdout().flush();
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(api_url) = cli.api_url {
        config.api_url = api_url;
    }
    if let Some(device) = cli.device {
        config.camera_device = device;
    }
    config.validate()?;
    tracing::debug!(?config, "configuration resolved");

    let client = ApiClient::new(&config.api_url)?;

    match cli.command {
        Commands::Students { action } => students(&config, &client, action).await?,
        Commands::CheckIn { date, photo } => {
            check_in(&config, &client, date.unwrap_or_else(today), photo).await?
        }
        Commands::Status { date } => {
            let mut dashboard = open_dashboard(&config, client, date);
            dashboard.mount().await;
            if let Some(error) = dashboard.roster().error() {
                bail!("failed to load students: {error}");
            }
            println!("Attendance for {}", dashboard.date());
            println!("{}", dashboard.counts());
            for card in dashboard.cards() {
                print!("{card}");
            }
        }
        Commands::Dashboard { date } => {
            console::run(&config, client, date).await?
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No V4L2 capture devices found");
            }
            for dev in devices {
                println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
        }
        Commands::Config => {
            let report = serde_json::json!({
                "config": config,
                "image_allowlist": config.image_allowlist()?,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn students(config: &Config, client: &ApiClient, action: StudentAction) -> Result<()> {
    let mut roster = RosterView::default();
    match action {
        StudentAction::List => {
            if !roster.load(client).await {
                bail!("failed to load students: {}", roster.error().unwrap_or_default());
            }
            if roster.students().is_empty() {
                println!("No students yet.");
            }
            for student in roster.students() {
                let card = StudentCard {
                    student,
                    status: None,
                    image_base: &config.api_url,
                };
                print!("{card}");
            }
        }
        StudentAction::Add { name, photo } => {
            roster.form.name = name;
            roster.form.photo = photo.as_deref().map(upload_from_path).transpose()?;
            if !roster.form.can_submit() {
                bail!("student name must not be empty");
            }
            if !roster.submit(client).await {
                bail!("failed to add student: {}", roster.error().unwrap_or_default());
            }
            for student in roster.students() {
                println!("Added {} (ID: {})", student.name, student.id);
            }
        }
        StudentAction::Remove { id } => {
            let id = parse_id(&id);
            if !roster.remove(client, &id).await {
                bail!("failed to remove student {id}: {}", roster.error().unwrap_or_default());
            }
            println!("Removed student {id}");
        }
    }
    Ok(())
}

async fn check_in(
    config: &Config,
    client: &ApiClient,
    date: NaiveDate,
    photo: Option<PathBuf>,
) -> Result<()> {
    use rollcall_core::AttendanceBackend;

    let state = match photo {
        Some(path) => {
            let upload = upload_from_path(&path)?;
            print!("{}", CaptureView(&CaptureState::AwaitingResult));
            match client.check_in(upload, date).await {
                Ok(result) => CaptureState::from_result(result),
                Err(e) => bail!("check-in failed: {e}"),
            }
        }
        None => {
            let mut widget = camera_widget(config);
            widget.initialize();
            let state = widget
                .capture(|photo| client.check_in(photo, date))
                .await
                .clone();
            widget.unmount();
            state
        }
    };

    print!("{}", CaptureView(&state));
    match state {
        CaptureState::Unavailable(e) | CaptureState::Failed(e) => bail!(e),
        _ => Ok(()),
    }
}
