use crate::release::artifacts::{sdist_filename, wheel_filename, BuildOutput, Distribution};
use crate::release::git_ref::{GitRef, ReleaseVersion, TagPattern};
use crate::release::publish::{IndexUploader, PackageIndex, PublishPlan, ReleaseMetadata};
use crate::utils::error::{PsiDataError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::process::Command;

#[async_trait]
pub trait Builder: Send + Sync {
    async fn build(&self, project_dir: &Path, dist_dir: &Path) -> Result<()>;
}

#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        index: &PackageIndex,
        token: &str,
        release: &ReleaseMetadata,
        dist: &Distribution,
    ) -> Result<()>;
}

pub trait TokenSource: Send + Sync {
    fn token(&self, secret: &str) -> Result<String>;
}

/// `python -m build --sdist --wheel`
#[derive(Debug, Clone)]
pub struct PythonBuild {
    python: String,
}

impl PythonBuild {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

#[async_trait]
impl Builder for PythonBuild {
    async fn build(&self, project_dir: &Path, dist_dir: &Path) -> Result<()> {
        tracing::info!("🔨 Building sdist and wheel in {}", project_dir.display());
        let output = Command::new(&self.python)
            .args(["-m", "build", "--sdist", "--wheel", "--outdir"])
            .arg(dist_dir)
            .current_dir(project_dir)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
            return Err(PsiDataError::BuildError {
                message: format!(
                    "{} -m build exited with {}: {}",
                    self.python,
                    output.status,
                    tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Uploader for IndexUploader {
    async fn upload(
        &self,
        index: &PackageIndex,
        token: &str,
        release: &ReleaseMetadata,
        dist: &Distribution,
    ) -> Result<()> {
        IndexUploader::upload(self, index, token, release, dist).await
    }
}

/// 由環境變數取得上傳 token
#[derive(Debug, Clone, Default)]
pub struct EnvTokens;

impl TokenSource for EnvTokens {
    fn token(&self, secret: &str) -> Result<String> {
        match std::env::var(secret) {
            Ok(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(PsiDataError::ConfigError {
                message: format!("Secret {} is not set", secret),
            }),
        }
    }
}

impl TokenSource for HashMap<String, String> {
    fn token(&self, secret: &str) -> Result<String> {
        self.get(secret).cloned().ok_or_else(|| PsiDataError::ConfigError {
            message: format!("Secret {} is not set", secret),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    pub package_name: String,
    pub summary: Option<String>,
    pub requires_python: Option<String>,
    pub project_dir: PathBuf,
    pub dist_dir: PathBuf,
    pub tag_pattern: TagPattern,
    pub indexes: Vec<PackageIndex>,
    pub skip_build: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReleaseReport {
    pub version: Option<ReleaseVersion>,
    pub output: Option<BuildOutput>,
    pub planned: Vec<String>,
    pub published: Vec<String>,
}

impl ReleaseReport {
    pub fn triggered(&self) -> bool {
        self.version.is_some()
    }
}

/// tag → 建置 → 收集 → 依序上傳；任何步驟失敗即中止
pub struct ReleaseEngine<B: Builder, U: Uploader, T: TokenSource> {
    builder: B,
    uploader: U,
    tokens: T,
    settings: ReleaseSettings,
}

impl<B: Builder, U: Uploader, T: TokenSource> ReleaseEngine<B, U, T> {
    pub fn new(builder: B, uploader: U, tokens: T, settings: ReleaseSettings) -> Self {
        Self {
            builder,
            uploader,
            tokens,
            settings,
        }
    }

    pub async fn run(&self, git_ref: &GitRef) -> Result<ReleaseReport> {
        let mut report = ReleaseReport::default();

        let Some(version) = self.settings.tag_pattern.evaluate(git_ref)? else {
            tracing::info!(
                "{} does not match tag pattern '{}', nothing to release",
                git_ref,
                self.settings.tag_pattern.as_str()
            );
            return Ok(report);
        };
        report.version = Some(version);
        let version_str = version.to_string();

        let plan = PublishPlan::for_ref(&self.settings.indexes, git_ref)?;
        report.planned = plan.steps.iter().map(|s| s.name.clone()).collect();
        tracing::info!("🚀 Releasing {} {}", self.settings.package_name, version_str);

        if self.settings.dry_run {
            tracing::info!(
                "🔍 DRY RUN - would build {} and {}",
                sdist_filename(&self.settings.package_name, &version_str),
                wheel_filename(&self.settings.package_name, &version_str)
            );
            for step in &plan.steps {
                tracing::info!("🔍 DRY RUN - would upload to {} ({})", step.name, step.url);
            }
            return Ok(report);
        }

        if !self.settings.skip_build {
            tokio::fs::create_dir_all(&self.settings.dist_dir).await?;
            self.builder
                .build(&self.settings.project_dir, &self.settings.dist_dir)
                .await?;
        }

        // 上傳前必須恰好有一個 sdist 與一個 wheel
        let output = BuildOutput::collect(&self.settings.dist_dir)?;
        output.expect(&self.settings.package_name, &version_str)?;
        tracing::info!(
            "📦 Built {} and {}",
            output.sdist.filename(),
            output.wheel.filename()
        );
        report.output = Some(output.clone());

        let metadata = ReleaseMetadata {
            name: self.settings.package_name.clone(),
            version: version_str,
            summary: self.settings.summary.clone(),
            requires_python: self.settings.requires_python.clone(),
        };

        for step in &plan.steps {
            let token = self.tokens.token(&step.secret)?;
            for dist in output.distributions() {
                self.uploader.upload(step, &token, &metadata, dist).await?;
            }
            report.published.push(step.name.clone());
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    struct FakeBuild;

    #[async_trait]
    impl Builder for FakeBuild {
        async fn build(&self, _project_dir: &Path, dist_dir: &Path) -> Result<()> {
            std::fs::write(dist_dir.join("psidata-2.3.1.tar.gz"), b"sdist")?;
            std::fs::write(dist_dir.join("psidata-2.3.1-py3-none-any.whl"), b"wheel")?;
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingUploader {
        calls: Arc<Mutex<Vec<(String, String, String)>>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl Uploader for RecordingUploader {
        async fn upload(
            &self,
            index: &PackageIndex,
            token: &str,
            _release: &ReleaseMetadata,
            dist: &Distribution,
        ) -> Result<()> {
            if self.fail_on.as_deref() == Some(index.name.as_str()) {
                return Err(PsiDataError::PublishError {
                    index: index.name.clone(),
                    status: 403,
                    message: "forbidden".to_string(),
                });
            }
            self.calls.lock().unwrap().push((
                index.name.clone(),
                token.to_string(),
                dist.filename(),
            ));
            Ok(())
        }
    }

    fn tokens() -> HashMap<String, String> {
        HashMap::from([
            ("TEST_PYPI_API_TOKEN".to_string(), "test-token".to_string()),
            ("PYPI_API_TOKEN".to_string(), "prod-token".to_string()),
        ])
    }

    fn settings(dist_dir: &Path) -> ReleaseSettings {
        ReleaseSettings {
            package_name: "psidata".to_string(),
            summary: None,
            requires_python: Some(">=3.7".to_string()),
            project_dir: PathBuf::from("."),
            dist_dir: dist_dir.to_path_buf(),
            tag_pattern: TagPattern::default(),
            indexes: PackageIndex::defaults(),
            skip_build: false,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn test_tag_builds_and_publishes_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let uploader = RecordingUploader::default();
        let engine = ReleaseEngine::new(
            FakeBuild,
            uploader.clone(),
            tokens(),
            settings(temp_dir.path()),
        );

        let report = engine.run(&GitRef::parse("refs/tags/2.3.1")).await.unwrap();

        assert!(report.triggered());
        assert_eq!(report.published, vec!["testpypi", "pypi"]);
        let calls = uploader.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                ("testpypi".to_string(), "test-token".to_string(), "psidata-2.3.1.tar.gz".to_string()),
                ("testpypi".to_string(), "test-token".to_string(), "psidata-2.3.1-py3-none-any.whl".to_string()),
                ("pypi".to_string(), "prod-token".to_string(), "psidata-2.3.1.tar.gz".to_string()),
                ("pypi".to_string(), "prod-token".to_string(), "psidata-2.3.1-py3-none-any.whl".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_branch_push_does_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let uploader = RecordingUploader::default();
        let engine = ReleaseEngine::new(
            FakeBuild,
            uploader.clone(),
            tokens(),
            settings(temp_dir.path()),
        );

        let report = engine.run(&GitRef::parse("refs/heads/main")).await.unwrap();

        assert!(!report.triggered());
        assert!(report.output.is_none());
        assert!(uploader.calls.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_test_index_failure_halts_before_production() {
        let temp_dir = TempDir::new().unwrap();
        let uploader = RecordingUploader {
            fail_on: Some("testpypi".to_string()),
            ..Default::default()
        };
        let engine = ReleaseEngine::new(
            FakeBuild,
            uploader.clone(),
            tokens(),
            settings(temp_dir.path()),
        );

        let err = engine.run(&GitRef::parse("refs/tags/2.3.1")).await.unwrap_err();

        assert!(matches!(err, PsiDataError::PublishError { status: 403, .. }));
        assert!(uploader.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_matching_custom_pattern_without_version_fails() {
        let temp_dir = TempDir::new().unwrap();
        let uploader = RecordingUploader::default();
        let mut settings = settings(temp_dir.path());
        settings.tag_pattern = TagPattern::new(r"v\d+\.\d+\.\d+").unwrap();
        let engine = ReleaseEngine::new(FakeBuild, uploader.clone(), tokens(), settings);

        let err = engine.run(&GitRef::parse("refs/tags/v1.4.0")).await.unwrap_err();

        assert!(matches!(err, PsiDataError::ValidationError { .. }));
        assert!(uploader.calls.lock().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_build_output_halts() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = settings(temp_dir.path());
        settings.skip_build = true;
        let engine = ReleaseEngine::new(FakeBuild, RecordingUploader::default(), tokens(), settings);

        let err = engine.run(&GitRef::parse("refs/tags/2.3.1")).await.unwrap_err();
        assert!(matches!(err, PsiDataError::BuildError { .. }));
    }

    #[tokio::test]
    async fn test_dry_run_plans_without_building() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = settings(temp_dir.path());
        settings.dry_run = true;
        let engine = ReleaseEngine::new(FakeBuild, RecordingUploader::default(), tokens(), settings);

        let report = engine.run(&GitRef::parse("refs/tags/2.3.1")).await.unwrap();
        assert_eq!(report.planned, vec!["testpypi", "pypi"]);
        assert!(report.published.is_empty());
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }
}
