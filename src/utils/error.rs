use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PsiDataError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Invalid glob pattern: {0}")]
    PatternError(#[from] glob::PatternError),

    #[error("Invalid regular expression: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{message}")]
    ParseError { message: String },

    #[error("Invalid query '{expression}': {reason}")]
    QueryError { expression: String, reason: String },

    #[error("Error processing {}", path.display())]
    ProcessingError {
        path: PathBuf,
        #[source]
        source: Box<PsiDataError>,
    },

    #[error("Column will get overwritten: {column}")]
    ColumnCollision { column: String },

    #[error("No data found")]
    NoDataFound,

    #[error("{member} in zipfile for {} is corrupted", archive.display())]
    CorruptedArchive { member: String, archive: PathBuf },

    #[error("Build failed: {message}")]
    BuildError { message: String },

    #[error("Upload to {index} failed with status {status}: {message}")]
    PublishError {
        index: String,
        status: u16,
        message: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Data,
    Archive,
    Network,
    Release,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(&self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,      // 警告，但成功
            ErrorSeverity::Medium => 2,   // 可重試
            ErrorSeverity::High => 1,     // 處理錯誤
            ErrorSeverity::Critical => 3, // 系統錯誤
        }
    }
}

impl PsiDataError {
    /// 包裝單一檔案處理時發生的錯誤
    pub fn processing(path: impl Into<PathBuf>, source: PsiDataError) -> Self {
        PsiDataError::ProcessingError {
            path: path.into(),
            source: Box::new(source),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            PsiDataError::ConfigError { .. }
            | PsiDataError::ConfigValidationError { .. }
            | PsiDataError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            PsiDataError::ParseError { .. }
            | PsiDataError::QueryError { .. }
            | PsiDataError::PatternError(_)
            | PsiDataError::RegexError(_)
            | PsiDataError::NoDataFound => ErrorCategory::Input,
            PsiDataError::CsvError(_)
            | PsiDataError::SerializationError(_)
            | PsiDataError::YamlError(_)
            | PsiDataError::ColumnCollision { .. }
            | PsiDataError::ValidationError { .. } => ErrorCategory::Data,
            PsiDataError::ProcessingError { source, .. } => source.category(),
            PsiDataError::ZipError(_) | PsiDataError::CorruptedArchive { .. } => {
                ErrorCategory::Archive
            }
            PsiDataError::HttpError(_) | PsiDataError::PublishError { .. } => {
                ErrorCategory::Network
            }
            PsiDataError::BuildError { .. } => ErrorCategory::Release,
            PsiDataError::IoError(_) | PsiDataError::WalkError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PsiDataError::HttpError(_) | PsiDataError::PublishError { .. } => {
                ErrorSeverity::Medium
            }
            PsiDataError::ProcessingError { source, .. } => source.severity(),
            PsiDataError::IoError(_)
            | PsiDataError::WalkError(_)
            | PsiDataError::CorruptedArchive { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        if let PsiDataError::NoDataFound = self {
            return "Check the data path and --etype; archives under _exclude folders are skipped";
        }
        match self.category() {
            ErrorCategory::Configuration => "Check the configuration file and command line arguments",
            ErrorCategory::Input => "Check the filename pattern, glob or query expression",
            ErrorCategory::Data => "Inspect the offending data file; it may be incomplete or use an unexpected layout",
            ErrorCategory::Archive => "Re-create the archive from the original experiment folder",
            ErrorCategory::Network => "Check network access and the index credentials, then retry",
            ErrorCategory::Release => "Make sure the build front-end is installed and the project builds locally",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            PsiDataError::NoDataFound => "No matching data files were found".to_string(),
            PsiDataError::ProcessingError { path, source } => {
                format!("Failed while processing {}: {}", path.display(), source)
            }
            PsiDataError::PublishError { index, status, .. } => {
                format!("The package index {} rejected the upload (HTTP {})", index, status)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PsiDataError>;
