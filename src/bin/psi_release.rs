use clap::Parser;
use psidata::release::engine::{EnvTokens, PythonBuild};
use psidata::release::publish::IndexUploader;
use psidata::release::version::VcsState;
use psidata::release::{GitRef, Manifest, ReleaseEngine};
use psidata::utils::{logger, validation::Validate};
use psidata::{PsiDataError, ReleaseConfig};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "psidata-release.toml";

#[derive(Parser)]
#[command(name = "psi-release")]
#[command(about = "Build the sdist and wheel for a release tag and publish them")]
struct Args {
    /// Triggering ref, e.g. refs/tags/1.4.0 (defaults to $GITHUB_REF)
    #[arg(long = "ref")]
    git_ref: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use existing files in the dist directory instead of building
    #[arg(long)]
    skip_build: bool,

    /// Show what would be built and uploaded without doing it
    #[arg(long)]
    dry_run: bool,

    /// Print the version derived from git and exit
    #[arg(long)]
    print_version: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(path: Option<&Path>) -> psidata::Result<ReleaseConfig> {
    match path {
        Some(path) => ReleaseConfig::from_file(path),
        None if Path::new(DEFAULT_CONFIG).is_file() => ReleaseConfig::from_file(DEFAULT_CONFIG),
        None => Ok(ReleaseConfig::default()),
    }
}

fn fail(stage: &str, e: &PsiDataError) -> ! {
    tracing::error!(
        "❌ {} failed: {} (Category: {:?}, Severity: {:?})",
        stage,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.severity().exit_code().max(1));
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let config = load_config(args.config.as_deref()).unwrap_or_else(|e| fail("Loading configuration", &e));
    if let Err(e) = config.validate() {
        fail("Configuration validation", &e);
    }

    if args.print_version {
        let state = VcsState::detect(&config.project_dir(), chrono::Local::now().date_naive())
            .await
            .unwrap_or_else(|e| fail("Reading git state", &e));
        println!("{}", state.dynamic_version());
        return Ok(());
    }

    let manifest_path = config.manifest_path();
    let manifest = if manifest_path.is_file() {
        let manifest = Manifest::from_file(&manifest_path).unwrap_or_else(|e| fail("Loading pyproject.toml", &e));
        if let Err(e) = manifest.validate() {
            fail("Manifest validation", &e);
        }
        tracing::info!("📋 {} extras: {}", manifest.name, manifest.extras().join(", "));
        Some(manifest)
    } else {
        tracing::warn!("{} not found, skipping manifest checks", manifest_path.display());
        None
    };

    let reference = match args.git_ref.or_else(|| std::env::var("GITHUB_REF").ok()) {
        Some(reference) => reference,
        None => {
            eprintln!("❌ No ref given; pass --ref or set GITHUB_REF");
            std::process::exit(1);
        }
    };
    let git_ref = GitRef::parse(&reference);

    let python = config.package.python.clone();
    let settings = config
        .into_settings(manifest.as_ref(), args.skip_build, args.dry_run)
        .unwrap_or_else(|e| fail("Preparing release", &e));

    let engine = ReleaseEngine::new(PythonBuild::new(python), IndexUploader::new(), EnvTokens, settings);

    match engine.run(&git_ref).await {
        Ok(report) if !report.triggered() => {
            println!("ℹ️  {} is not a release tag, nothing to do", git_ref);
        }
        Ok(report) => {
            if let Some(version) = report.version {
                println!("✅ Released {}", version);
            }
            if !report.published.is_empty() {
                println!("⬆️  Published to: {}", report.published.join(", "));
            } else if !report.planned.is_empty() {
                println!("🔍 Planned uploads: {}", report.planned.join(", "));
            }
        }
        Err(e) => fail("Release", &e),
    }

    Ok(())
}
