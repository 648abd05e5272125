use crate::core::archive::{md5sum, MD5_BLOCKSIZE};
use crate::release::artifacts::Distribution;
use crate::release::git_ref::GitRef;
use crate::utils::error::{PsiDataError, Result};
use crate::utils::validation::{validate_distinct, validate_url, Validate};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const TEST_INDEX_URL: &str = "https://test.pypi.org/legacy/";
pub const PRODUCTION_INDEX_URL: &str = "https://upload.pypi.org/legacy/";
pub const TEST_INDEX_SECRET: &str = "TEST_PYPI_API_TOKEN";
pub const PRODUCTION_INDEX_SECRET: &str = "PYPI_API_TOKEN";

/// 上傳目標與其專用的憑證 (環境變數名稱)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageIndex {
    pub name: String,
    pub url: String,
    pub secret: String,
}

impl PackageIndex {
    pub fn test_pypi() -> Self {
        Self {
            name: "testpypi".to_string(),
            url: TEST_INDEX_URL.to_string(),
            secret: TEST_INDEX_SECRET.to_string(),
        }
    }

    pub fn pypi() -> Self {
        Self {
            name: "pypi".to_string(),
            url: PRODUCTION_INDEX_URL.to_string(),
            secret: PRODUCTION_INDEX_SECRET.to_string(),
        }
    }

    /// 預設順序：先測試站，再正式站
    pub fn defaults() -> Vec<Self> {
        vec![Self::test_pypi(), Self::pypi()]
    }
}

/// 依觸發 ref 決定的上傳步驟
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishPlan {
    pub steps: Vec<PackageIndex>,
}

impl PublishPlan {
    pub fn for_ref(indexes: &[PackageIndex], git_ref: &GitRef) -> Result<Self> {
        let plan = Self {
            steps: indexes.to_vec(),
        };
        plan.validate()?;

        if !git_ref.is_tag() {
            tracing::info!("{} is not a tag, publish steps skipped", git_ref);
            return Ok(Self::default());
        }
        Ok(plan)
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Validate for PublishPlan {
    fn validate(&self) -> Result<()> {
        for (i, index) in self.steps.iter().enumerate() {
            validate_url(&format!("indexes[{}].url", i), &index.url)?;
        }
        let secrets: Vec<&str> = self.steps.iter().map(|s| s.secret.as_str()).collect();
        validate_distinct("indexes.secret", &secrets)?;
        let urls: Vec<&str> = self.steps.iter().map(|s| s.url.as_str()).collect();
        validate_distinct("indexes.url", &urls)
    }
}

/// 上傳時附帶的套件資訊
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseMetadata {
    pub name: String,
    pub version: String,
    pub summary: Option<String>,
    pub requires_python: Option<String>,
}

/// legacy upload API (multipart POST)
#[derive(Debug, Clone)]
pub struct IndexUploader {
    client: Client,
}

impl IndexUploader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    pub async fn upload(
        &self,
        index: &PackageIndex,
        token: &str,
        release: &ReleaseMetadata,
        dist: &Distribution,
    ) -> Result<()> {
        let content = tokio::fs::read(&dist.path).await?;
        let digest = md5sum(content.as_slice(), MD5_BLOCKSIZE)?;
        let filename = dist.filename();

        let mut form = Form::new()
            .text(":action", "file_upload")
            .text("protocol_version", "1")
            .text("metadata_version", "2.1")
            .text("name", release.name.clone())
            .text("version", release.version.clone())
            .text("filetype", dist.kind.filetype())
            .text("pyversion", dist.kind.pyversion())
            .text("md5_digest", digest);
        if let Some(summary) = &release.summary {
            form = form.text("summary", summary.clone());
        }
        if let Some(requires_python) = &release.requires_python {
            form = form.text("requires_python", requires_python.clone());
        }
        let part = Part::bytes(content)
            .file_name(filename.clone())
            .mime_str("application/octet-stream")?;
        form = form.part("content", part);

        tracing::debug!("Uploading {} to {}", filename, index.url);
        let response = self
            .client
            .post(&index.url)
            .basic_auth("__token__", Some(token))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PsiDataError::PublishError {
                index: index.name.clone(),
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        tracing::info!("⬆️  Uploaded {} to {}", filename, index.name);
        Ok(())
    }
}

impl Default for IndexUploader {
    fn default() -> Self {
        Self::new()
    }
}
