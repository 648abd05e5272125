use crate::utils::error::{PsiDataError, Result};
use crate::utils::validation::{validate_non_empty_string, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// `pyproject.toml` 的 `[project]` 表格
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Manifest {
    pub name: String,
    pub description: Option<String>,
    pub readme: Option<String>,
    pub license: Option<toml::Value>,
    pub requires_python: Option<String>,
    #[serde(default)]
    pub authors: Vec<Person>,
    #[serde(default)]
    pub maintainers: Vec<Person>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub optional_dependencies: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub dynamic: Vec<String>,
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PyProject {
    project: Manifest,
}

impl Manifest {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let pyproject: PyProject =
            toml::from_str(content).map_err(|e| PsiDataError::ConfigValidationError {
                field: "pyproject.toml".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        Ok(pyproject.project)
    }

    /// 選用相依群組名稱 (docs、test、各儲存後端)
    pub fn extras(&self) -> Vec<&str> {
        self.optional_dependencies.keys().map(String::as_str).collect()
    }

    pub fn has_dynamic_version(&self) -> bool {
        self.dynamic.iter().any(|d| d == "version")
    }

    /// license 可能是字串或 `{ text = "..." }` / `{ file = "..." }`
    pub fn license_text(&self) -> Option<&str> {
        match self.license.as_ref()? {
            toml::Value::String(s) => Some(s.as_str()),
            toml::Value::Table(table) => table
                .get("text")
                .or_else(|| table.get("file"))
                .and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

impl Validate for Manifest {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("project.name", &self.name)?;

        if !self.has_dynamic_version() {
            return Err(PsiDataError::ValidationError {
                message: "project.dynamic must contain \"version\"".to_string(),
            });
        }
        if let Some(version) = &self.version {
            return Err(PsiDataError::ValidationError {
                message: format!(
                    "project.version ({}) must not be set; the version comes from version control",
                    version
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PYPROJECT: &str = r#"
[project]
name = "psidata"
description = "Lightweight wrapper for managing psiexperiment data"
requires-python = ">=3.7"
license = { file = "LICENSE.txt" }
authors = [{ name = "psidata developers" }]
maintainers = [{ name = "psidata developers" }]
dependencies = ["numpy", "pandas", "pyyaml"]
dynamic = ["version"]

[project.optional-dependencies]
docs = ["sphinx", "sphinx_rtd_theme", "pygments-enaml"]
test = ["pytest"]
bcolz-backend = ["bcolz"]
legacy-bcolz-backend = ["blosc"]
zarr-backend = ["zarr"]

[build-system]
requires = ["setuptools>=61.2", "wheel", "setuptools_scm[toml]>=3.4.3"]
build-backend = "setuptools.build_meta"
"#;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::from_toml_str(PYPROJECT).unwrap();

        assert_eq!(manifest.name, "psidata");
        assert_eq!(manifest.requires_python.as_deref(), Some(">=3.7"));
        assert_eq!(manifest.dependencies, vec!["numpy", "pandas", "pyyaml"]);
        assert_eq!(
            manifest.extras(),
            vec!["bcolz-backend", "docs", "legacy-bcolz-backend", "test", "zarr-backend"]
        );
        assert_eq!(manifest.license_text(), Some("LICENSE.txt"));
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_static_version_rejected() {
        let content = PYPROJECT.replace("dynamic = [\"version\"]", "version = \"1.0.0\"\ndynamic = [\"version\"]");
        let manifest = Manifest::from_toml_str(&content).unwrap();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_missing_dynamic_version_rejected() {
        let content = PYPROJECT.replace("dynamic = [\"version\"]", "dynamic = []");
        let manifest = Manifest::from_toml_str(&content).unwrap();
        assert!(!manifest.has_dynamic_version());
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_missing_project_table() {
        assert!(Manifest::from_toml_str("[tool.black]\nline-length = 79\n").is_err());
    }
}
