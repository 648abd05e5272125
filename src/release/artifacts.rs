use crate::utils::error::{PsiDataError, Result};
use std::fmt;
use std::path::{Path, PathBuf};

pub const SDIST_SUFFIX: &str = ".tar.gz";
pub const WHEEL_SUFFIX: &str = ".whl";

/// 發佈檔名使用的正規化名稱：小寫，連續的 `-_.` 轉成單一 `_`
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split(['-', '_', '.'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

pub fn sdist_filename(name: &str, version: &str) -> String {
    format!("{}-{}{}", normalize_name(name), version, SDIST_SUFFIX)
}

/// 純 Python 套件：`py3-none-any`
pub fn wheel_filename(name: &str, version: &str) -> String {
    format!("{}-{}-py3-none-any{}", normalize_name(name), version, WHEEL_SUFFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionKind {
    Sdist,
    Wheel,
}

impl DistributionKind {
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(SDIST_SUFFIX) {
            Some(DistributionKind::Sdist)
        } else if filename.ends_with(WHEEL_SUFFIX) {
            Some(DistributionKind::Wheel)
        } else {
            None
        }
    }

    /// 上傳表單的 `filetype`
    pub fn filetype(&self) -> &'static str {
        match self {
            DistributionKind::Sdist => "sdist",
            DistributionKind::Wheel => "bdist_wheel",
        }
    }

    /// 上傳表單的 `pyversion`
    pub fn pyversion(&self) -> &'static str {
        match self {
            DistributionKind::Sdist => "source",
            DistributionKind::Wheel => "py3",
        }
    }
}

impl fmt::Display for DistributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.filetype())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    pub path: PathBuf,
    pub kind: DistributionKind,
}

impl Distribution {
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// 建置結果：恰好一個 sdist 與一個 wheel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub sdist: Distribution,
    pub wheel: Distribution,
}

impl BuildOutput {
    pub fn collect(dist_dir: &Path) -> Result<Self> {
        let mut sdists = Vec::new();
        let mut wheels = Vec::new();

        for entry in std::fs::read_dir(dist_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match DistributionKind::from_filename(&filename) {
                Some(kind @ DistributionKind::Sdist) => sdists.push(Distribution { path, kind }),
                Some(kind @ DistributionKind::Wheel) => wheels.push(Distribution { path, kind }),
                None => tracing::debug!("Ignoring {} in {}", filename, dist_dir.display()),
            }
        }

        let sdist = exactly_one(sdists, "source distribution", dist_dir)?;
        let wheel = exactly_one(wheels, "wheel", dist_dir)?;
        Ok(Self { sdist, wheel })
    }

    /// 確認檔名與套件名稱、版本相符
    pub fn expect(&self, name: &str, version: &str) -> Result<()> {
        let expected = [
            (&self.sdist, sdist_filename(name, version)),
            (&self.wheel, wheel_filename(name, version)),
        ];
        for (dist, filename) in expected {
            if dist.filename() != filename {
                return Err(PsiDataError::ValidationError {
                    message: format!("Expected {} but found {}", filename, dist.filename()),
                });
            }
        }
        Ok(())
    }

    pub fn distributions(&self) -> [&Distribution; 2] {
        [&self.sdist, &self.wheel]
    }
}

fn exactly_one(mut found: Vec<Distribution>, label: &str, dist_dir: &Path) -> Result<Distribution> {
    match found.len() {
        1 => Ok(found.remove(0)),
        n => Err(PsiDataError::BuildError {
            message: format!(
                "expected exactly one {} in {}, found {}",
                label,
                dist_dir.display(),
                n
            ),
        }),
    }
}
