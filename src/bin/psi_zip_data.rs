use clap::Parser;
use psidata::core::archive::zip_data_with_progress;
use psidata::utils::logger;
use psidata::utils::monitor::SystemMonitor;
use std::path::PathBuf;
use std::sync::Arc;

/// Compress each psiexperiment folder into a zip file with an MD5 sidecar.
///
/// The MD5 file can be discarded once the zip has been moved to a filesystem
/// with built-in checksums (BTRFS, ZFS).
#[derive(Parser)]
#[command(name = "psi-zip-data")]
struct Args {
    /// Folder containing one sub-folder per experiment
    path: PathBuf,

    /// Move the zip and md5 files here once all folders are archived
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Log CPU and memory usage after each folder
    #[arg(long)]
    monitor: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let monitor = Arc::new(SystemMonitor::new(args.monitor));
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let path = args.path.clone();
    let destination = args.destination.clone();
    let task_monitor = Arc::clone(&monitor);
    let result = tokio::task::spawn_blocking(move || {
        zip_data_with_progress(&path, destination.as_deref(), |done, total, _| {
            task_monitor.log_stats(&format!("{}/{}", done, total));
        })
    })
    .await?;

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("❌ Archiving {} failed: {}", args.path.display(), e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code().max(1));
        }
    };

    monitor.log_final_stats();
    let total = report.archived.len() + report.failed.len();
    println!("✅ Archived {} of {} folders", report.archived.len(), total);
    if !report.failed.is_empty() {
        for (folder, reason) in &report.failed {
            eprintln!("❌ {}: {}", folder.display(), reason);
        }
        eprintln!(
            "❌ {} folders could not be archived and were left in place",
            report.failed.len()
        );
        std::process::exit(1);
    }
    Ok(())
}
