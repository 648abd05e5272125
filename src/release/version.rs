use crate::utils::error::{PsiDataError, Result};
use chrono::NaiveDate;
use std::path::Path;
use tokio::process::Command;

/// 推導版本號所需的版本控制狀態
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VcsState {
    pub tag: Option<String>,
    pub distance: u32,
    pub short_hash: Option<String>,
    pub dirty: bool,
    pub date: NaiveDate,
}

impl VcsState {
    /// 解析 `git describe --tags --long --dirty` 的輸出，例如 `2.3.1-4-gabc1234-dirty`
    pub fn from_describe(describe: &str, date: NaiveDate) -> Result<Self> {
        let invalid = || PsiDataError::ParseError {
            message: format!("Unexpected git describe output '{}'", describe),
        };

        let describe = describe.trim();
        let (describe, dirty) = match describe.strip_suffix("-dirty") {
            Some(rest) => (rest, true),
            None => (describe, false),
        };

        let mut parts = describe.rsplitn(3, '-');
        let hash = parts.next().ok_or_else(invalid)?;
        let distance = parts.next().ok_or_else(invalid)?;
        let tag = parts.next().ok_or_else(invalid)?;

        let short_hash = hash.strip_prefix('g').ok_or_else(invalid)?;
        let distance = distance.parse().map_err(|_| invalid())?;

        Ok(Self {
            tag: Some(tag.to_string()),
            distance,
            short_hash: Some(short_hash.to_string()),
            dirty,
            date,
        })
    }

    /// 從工作目錄讀取 git 狀態；沒有任何 tag 時以 commit 數作為距離
    pub async fn detect(repo_dir: &Path, date: NaiveDate) -> Result<Self> {
        if let Some(describe) =
            git_output(repo_dir, &["describe", "--tags", "--long", "--dirty"]).await?
        {
            return Self::from_describe(&describe, date);
        }

        let distance = git_output(repo_dir, &["rev-list", "--count", "HEAD"])
            .await?
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        let short_hash = git_output(repo_dir, &["rev-parse", "--short", "HEAD"])
            .await?
            .map(|s| s.trim().to_string());
        let dirty = git_output(repo_dir, &["status", "--porcelain", "--untracked-files=no"])
            .await?
            .map(|s| !s.trim().is_empty())
            .unwrap_or(false);

        Ok(Self {
            tag: None,
            distance,
            short_hash,
            dirty,
            date,
        })
    }

    /// setuptools-scm 風格的版本號 (guess-next-dev + node-and-date)
    pub fn dynamic_version(&self) -> String {
        let exact = self.distance == 0 && !self.dirty;
        let public = match &self.tag {
            Some(tag) if exact => return tag.clone(),
            Some(tag) => format!("{}.dev{}", guess_next(tag), self.distance),
            None => format!("0.1.dev{}", self.distance),
        };

        let mut local = Vec::new();
        if let Some(hash) = &self.short_hash {
            local.push(format!("g{}", hash));
        }
        if self.dirty {
            local.push(format!("d{}", self.date.format("%Y%m%d")));
        }

        if local.is_empty() {
            public
        } else {
            format!("{}+{}", public, local.join("."))
        }
    }
}

/// 最後一個數字欄位加一：`2.3.1` → `2.3.2`
fn guess_next(tag: &str) -> String {
    let tag = tag.strip_prefix('v').unwrap_or(tag);
    match tag.rsplit_once('.') {
        Some((head, last)) => match last.parse::<u64>() {
            Ok(n) => format!("{}.{}", head, n + 1),
            Err(_) => tag.to_string(),
        },
        None => match tag.parse::<u64>() {
            Ok(n) => (n + 1).to_string(),
            Err(_) => tag.to_string(),
        },
    }
}

async fn git_output(repo_dir: &Path, args: &[&str]) -> Result<Option<String>> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo_dir)
        .output()
        .await?;
    if !output.status.success() {
        tracing::debug!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
}
