use clap::Parser;
use psidata::core::archive::split_data;
use psidata::utils::logger;
use std::path::PathBuf;

/// Move files matching a pattern out of each experiment folder into a
/// parallel folder structure under DEST.
#[derive(Parser)]
#[command(name = "psi-split-data")]
struct Args {
    path: PathBuf,
    dest: PathBuf,
    /// Shell-style pattern, e.g. "*.pdf"
    pattern: String,

    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    match split_data(&args.path, &args.dest, &args.pattern) {
        Ok(moved) => {
            tracing::info!("🚚 Moved {} items to {}", moved, args.dest.display());
            println!("✅ Moved {} items", moved);
        }
        Err(e) => {
            tracing::error!("❌ Split failed: {} (Category: {:?})", e, e.category());
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.severity().exit_code().max(1));
        }
    }
}
