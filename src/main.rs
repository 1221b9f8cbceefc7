use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use jobstronaut_uploader_lib::commands;
use jobstronaut_uploader_lib::config_utils::get_logs_dir;
use jobstronaut_uploader_lib::{AppStateManager, UploadStatus, UploaderConfig};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "jobstronaut-uploader", version, about = "Upload a résumé to Jobstronaut")]
struct Cli {
    /// Backend base URL (e.g. http://localhost:10000)
    #[arg(long, global = true, env = "JOBSTRONAUT_API_BASE")]
    api_base: Option<String>,

    /// Also write JSON logs to ~/.jobstronaut-uploader/logs
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a résumé file
    Upload {
        path: PathBuf,
        /// Contact email sent along with the presign request
        #[arg(long)]
        email: Option<String>,
        /// Accept Word, text, RTF and ODT documents as well as PDF
        #[arg(long)]
        permissive: bool,
        /// Export the debug log after the upload
        #[arg(long)]
        report: bool,
    },
    /// Join the waitlist
    Waitlist { email: String },
    /// Probe backend liveness
    Health,
}

fn init_tracing(log_file: bool) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    let (file_layer, guard) = match log_file.then(get_logs_dir).transpose() {
        Ok(Some(dir)) => {
            let appender = tracing_appender::rolling::daily(dir, "jobstronaut-uploader.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        Ok(None) => (None, None),
        Err(e) => {
            eprintln!("File logging disabled: {}", e);
            (None, None)
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn describe(status: &UploadStatus) -> Option<String> {
    match status {
        UploadStatus::Validating => None,
        UploadStatus::Presigning { filename } => Some(format!("Requesting upload URL for {}...", filename)),
        UploadStatus::Transferring { attempt: 1, method, .. } => Some(format!("Uploading ({})...", method)),
        UploadStatus::Transferring { attempt, .. } => Some(format!("Retrying upload (attempt {})...", attempt)),
        UploadStatus::Notifying { .. } => Some("Finalizing...".to_string()),
        UploadStatus::Done { .. } => None,
    }
}

async fn run_upload(
    state_manager: &AppStateManager,
    path: PathBuf,
    email: Option<String>,
    report: bool,
) -> Result<(), String> {
    let outcome = commands::upload::upload_resume(state_manager, &path, email, |status| {
        if let Some(line) = describe(status) {
            println!("{}", line);
        }
    })
    .await?;

    if report {
        match commands::debug::export_debug_log(state_manager) {
            Ok(path) => println!("Debug log saved to {}", path),
            Err(e) => eprintln!("Could not save debug log: {}", e),
        }
    }

    match outcome.error {
        None => {
            match outcome.object_key {
                Some(key) => println!("Uploaded! ({})", key),
                None => println!("Uploaded!"),
            }
            Ok(())
        }
        Some(error) => Err(error.user_message()),
    }
}

async fn run_health(state_manager: &AppStateManager) -> Result<(), String> {
    let report = commands::health::check_health(state_manager).await?;
    let body = match report.body {
        serde_json::Value::String(text) => text,
        other => other.to_string(),
    };
    println!("{} {}", report.status, body);

    if report.ok {
        Ok(())
    } else {
        Err(format!("Backend unhealthy ({})", report.status))
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file);

    let mut config = match UploaderConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring unreadable config file: {}", e);
            UploaderConfig::default().with_env_override()
        }
    };
    if let Some(ref base) = cli.api_base {
        config = config.with_base_url(base);
    }
    if let Commands::Upload { permissive: true, .. } = cli.command {
        config.permissive_types = true;
    }
    tracing::debug!(base_url = %config.base_url, "Using backend");

    let state_manager = AppStateManager::new(config);

    let result = match cli.command {
        Commands::Upload { path, email, report, .. } => run_upload(&state_manager, path, email, report).await,
        Commands::Waitlist { email } => commands::waitlist::join_waitlist(&state_manager, &email)
            .await
            .map(|()| println!("You're on the list!")),
        Commands::Health => run_health(&state_manager).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
