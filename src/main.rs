use clap::Parser;
use psidata::domain::ports::Storage;
use psidata::utils::{logger, validation::Validate};
use psidata::{load_raw_query, CliConfig, LoadOptions, LocalStorage, PsiDataError, PsiFilenameParser, RawQuery};

fn report_failure(e: &PsiDataError) -> i32 {
    tracing::error!(
        "❌ Query failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    e.severity().exit_code()
}

async fn run(config: CliConfig) -> psidata::Result<String> {
    let parser = PsiFilenameParser::new(&config.experiment_types(), config.include_ear)?;
    let query = RawQuery::new(&config.member, config.queries.clone(), config.file_format()?)?;
    let options = LoadOptions {
        include_dataset: config.include_dataset,
        info_as_cols: !config.info_as_index,
        should_load: None,
    };

    // 掃描與解壓縮都是同步 I/O
    let data_path = config.data_path.clone();
    let etype = config.etype.clone();
    let table = tokio::task::spawn_blocking(move || {
        load_raw_query(&query, etype.as_deref(), &data_path, &parser, &options)
    })
    .await
    .map_err(|e| PsiDataError::IoError(std::io::Error::other(e)))??;

    tracing::info!("📊 {} rows, columns: {}", table.len(), table.columns.join(", "));

    let storage = LocalStorage::new(&config.output_path);
    storage
        .write_file(&config.output_file, table.to_csv_string()?.as_bytes())
        .await?;
    Ok(storage.full_path(&config.output_file).display().to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting psidata query");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    match run(config).await {
        Ok(output_path) => {
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ Query completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Err(e) => {
            let exit_code = report_failure(&e);
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
