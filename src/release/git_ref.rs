use crate::utils::error::{PsiDataError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const TAG_PREFIX: &str = "refs/tags/";
pub const BRANCH_PREFIX: &str = "refs/heads/";
pub const DEFAULT_TAG_PATTERN: &str = r"\d\.\d+\.\d+";

/// 觸發 CI 的 git ref
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitRef {
    Tag(String),
    Branch(String),
    Other(String),
}

impl GitRef {
    pub fn parse(reference: &str) -> Self {
        if let Some(name) = reference.strip_prefix(TAG_PREFIX) {
            GitRef::Tag(name.to_string())
        } else if let Some(name) = reference.strip_prefix(BRANCH_PREFIX) {
            GitRef::Branch(name.to_string())
        } else {
            GitRef::Other(reference.to_string())
        }
    }

    /// 上傳步驟只在 ref 以 `refs/tags/` 開頭時執行
    pub fn is_tag(&self) -> bool {
        matches!(self, GitRef::Tag(_))
    }

    pub fn name(&self) -> &str {
        match self {
            GitRef::Tag(name) | GitRef::Branch(name) | GitRef::Other(name) => name,
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GitRef::Tag(name) => write!(f, "{}{}", TAG_PREFIX, name),
            GitRef::Branch(name) => write!(f, "{}{}", BRANCH_PREFIX, name),
            GitRef::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReleaseVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for ReleaseVersion {
    type Err = PsiDataError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        let invalid = || PsiDataError::ParseError {
            message: format!("'{}' is not a MAJOR.MINOR.PATCH version", s),
        };
        if parts.len() != 3 {
            return Err(invalid());
        }
        let number = |p: &str| p.parse::<u64>().map_err(|_| invalid());
        Ok(Self {
            major: number(parts[0])?,
            minor: number(parts[1])?,
            patch: number(parts[2])?,
        })
    }
}

/// tag 名稱必須完全符合的樣式
#[derive(Debug, Clone)]
pub struct TagPattern {
    source: String,
    regex: Regex,
}

impl TagPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&format!("^(?:{})$", pattern))?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, tag: &str) -> bool {
        self.regex.is_match(tag)
    }

    /// 只有符合樣式的 tag 會觸發建置；符合樣式卻無法解析成版本號時回報錯誤
    pub fn evaluate(&self, git_ref: &GitRef) -> Result<Option<ReleaseVersion>> {
        match git_ref {
            GitRef::Tag(name) if self.matches(name) => name
                .parse()
                .map(Some)
                .map_err(|e| PsiDataError::ValidationError {
                    message: format!(
                        "Tag '{}' matches pattern '{}' but is not a release version: {}",
                        name, self.source, e
                    ),
                }),
            _ => Ok(None),
        }
    }
}

impl Default for TagPattern {
    fn default() -> Self {
        Self {
            source: DEFAULT_TAG_PATTERN.to_string(),
            regex: Regex::new(r"^(?:\d\.\d+\.\d+)$").expect("default tag pattern is valid"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refs() {
        assert_eq!(GitRef::parse("refs/tags/1.4.0"), GitRef::Tag("1.4.0".to_string()));
        assert_eq!(GitRef::parse("refs/heads/main"), GitRef::Branch("main".to_string()));
        assert_eq!(GitRef::parse("main"), GitRef::Other("main".to_string()));
        assert!(GitRef::parse("refs/tags/anything").is_tag());
        assert!(!GitRef::parse("refs/heads/refs/tags/x").is_tag());
        assert_eq!(GitRef::parse("refs/tags/2.3.1").to_string(), "refs/tags/2.3.1");
    }

    #[test]
    fn test_tag_pattern_full_match() {
        let pattern = TagPattern::default();
        assert!(pattern.matches("1.4.0"));
        assert!(pattern.matches("2.13.10"));
        assert!(!pattern.matches("v1.4.0"));
        assert!(!pattern.matches("1.4"));
        assert!(!pattern.matches("1.4.0rc1"));
        assert!(!pattern.matches("10.0.0"));
    }

    #[test]
    fn test_evaluate_only_triggers_for_matching_tags() {
        let pattern = TagPattern::default();
        assert_eq!(
            pattern.evaluate(&GitRef::parse("refs/tags/2.3.1")).unwrap(),
            Some(ReleaseVersion { major: 2, minor: 3, patch: 1 })
        );
        for reference in ["refs/heads/main", "refs/heads/2.3.1", "refs/tags/release-2.3.1"] {
            assert_eq!(pattern.evaluate(&GitRef::parse(reference)).unwrap(), None, "{}", reference);
        }
    }

    #[test]
    fn test_matching_tag_that_is_not_a_version_is_an_error() {
        let pattern = TagPattern::new(r"v\d+\.\d+\.\d+").unwrap();
        let err = pattern.evaluate(&GitRef::parse("refs/tags/v1.4.0")).unwrap_err();
        assert!(matches!(err, PsiDataError::ValidationError { .. }));
        assert!(err.to_string().contains("v1.4.0"));
        assert_eq!(pattern.evaluate(&GitRef::parse("refs/tags/1.4.0")).unwrap(), None);
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = TagPattern::new(r"\d+\.\d+\.\d+").unwrap();
        assert!(pattern.matches("10.0.0"));
        assert!(TagPattern::new("(").is_err());
    }
}
