use crate::release::engine::ReleaseSettings;
use crate::release::git_ref::{TagPattern, DEFAULT_TAG_PATTERN};
use crate::release::manifest::Manifest;
use crate::release::publish::{PackageIndex, PublishPlan};
use crate::utils::error::{PsiDataError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub package: PackageConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
    #[serde(default = "PackageIndex::defaults")]
    pub indexes: Vec<PackageIndex>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageConfig {
    /// 未設定時使用 pyproject.toml 的 project.name
    pub name: Option<String>,
    #[serde(default = "default_project_dir")]
    pub project_dir: String,
    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,
    #[serde(default = "default_python")]
    pub python: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_tag_pattern")]
    pub tag_pattern: String,
}

fn default_project_dir() -> String {
    ".".to_string()
}

fn default_dist_dir() -> String {
    "dist".to_string()
}

fn default_python() -> String {
    "python".to_string()
}

fn default_tag_pattern() -> String {
    DEFAULT_TAG_PATTERN.to_string()
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            name: None,
            project_dir: default_project_dir(),
            dist_dir: default_dist_dir(),
            python: default_python(),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            tag_pattern: default_tag_pattern(),
        }
    }
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            package: PackageConfig::default(),
            trigger: TriggerConfig::default(),
            indexes: PackageIndex::defaults(),
        }
    }
}

impl ReleaseConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PsiDataError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PSIDATA_INDEX_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn project_dir(&self) -> PathBuf {
        PathBuf::from(&self.package.project_dir)
    }

    /// 相對路徑以 project_dir 為基準
    pub fn dist_dir(&self) -> PathBuf {
        let dist_dir = PathBuf::from(&self.package.dist_dir);
        if dist_dir.is_absolute() {
            dist_dir
        } else {
            self.project_dir().join(dist_dir)
        }
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.project_dir().join("pyproject.toml")
    }

    pub fn into_settings(
        self,
        manifest: Option<&Manifest>,
        skip_build: bool,
        dry_run: bool,
    ) -> Result<ReleaseSettings> {
        let package_name = match (&self.package.name, manifest) {
            (Some(name), _) => name.clone(),
            (None, Some(manifest)) => manifest.name.clone(),
            (None, None) => {
                return Err(PsiDataError::ConfigValidationError {
                    field: "package.name".to_string(),
                    message: "Set package.name or provide a pyproject.toml".to_string(),
                })
            }
        };

        Ok(ReleaseSettings {
            package_name,
            summary: manifest.and_then(|m| m.description.clone()),
            requires_python: manifest.and_then(|m| m.requires_python.clone()),
            project_dir: self.project_dir(),
            dist_dir: self.dist_dir(),
            tag_pattern: TagPattern::new(&self.trigger.tag_pattern)?,
            indexes: self.indexes,
            skip_build,
            dry_run,
        })
    }
}

impl Validate for ReleaseConfig {
    fn validate(&self) -> Result<()> {
        if let Some(name) = &self.package.name {
            validate_non_empty_string("package.name", name)?;
        }
        validate_path("package.project_dir", &self.package.project_dir)?;
        validate_path("package.dist_dir", &self.package.dist_dir)?;
        validate_non_empty_string("package.python", &self.package.python)?;

        TagPattern::new(&self.trigger.tag_pattern).map_err(|e| {
            PsiDataError::InvalidConfigValueError {
                field: "trigger.tag_pattern".to_string(),
                value: self.trigger.tag_pattern.clone(),
                reason: e.to_string(),
            }
        })?;

        if self.indexes.is_empty() {
            return Err(PsiDataError::ConfigValidationError {
                field: "indexes".to_string(),
                message: "At least one package index is required".to_string(),
            });
        }
        PublishPlan {
            steps: self.indexes.clone(),
        }
        .validate()
    }
}
