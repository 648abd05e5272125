use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 輸出格式可由 PSIDATA_LOG_FORMAT=json 切換
pub const LOG_FORMAT_ENV: &str = "PSIDATA_LOG_FORMAT";

/// 函式庫與各執行檔的 tracing target
pub const LOG_TARGETS: [&str; 4] = ["psidata", "psi_zip_data", "psi_split_data", "psi_release"];

/// 未設定 RUST_LOG 時使用的過濾規則
pub fn default_directives(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    let mut directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect();
    if verbose {
        directives.push("info".to_string());
    }
    directives.join(",")
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

pub fn init_cli_logger(verbose: bool) {
    if std::env::var(LOG_FORMAT_ENV).map(|v| v == "json").unwrap_or(false) {
        init_json_logger(verbose);
        return;
    }

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// CI 等非互動環境使用 JSON 格式
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
