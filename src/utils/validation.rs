use crate::utils::error::{PsiDataError, Result};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(PsiDataError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(PsiDataError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(PsiDataError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(PsiDataError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(PsiDataError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PsiDataError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 確認每個值只出現一次 (例如各上傳目標的憑證名稱)
pub fn validate_distinct(field_name: &str, values: &[&str]) -> Result<()> {
    let mut seen = HashSet::new();
    for value in values {
        if !seen.insert(*value) {
            return Err(PsiDataError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: value.to_string(),
                reason: "Value must not be reused".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("endpoint", "https://test.pypi.org/legacy/").is_ok());
        assert!(validate_url("endpoint", "http://localhost:8080/").is_ok());
        assert!(validate_url("endpoint", "").is_err());
        assert!(validate_url("endpoint", "invalid-url").is_err());
        assert!(validate_url("endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("dist_dir", "dist").is_ok());
        assert!(validate_path("dist_dir", "").is_err());
        assert!(validate_path("dist_dir", "di\0st").is_err());
    }

    #[test]
    fn test_validate_distinct() {
        assert!(validate_distinct("secret", &["TEST_PYPI_API_TOKEN", "PYPI_API_TOKEN"]).is_ok());
        assert!(validate_distinct("secret", &["PYPI_API_TOKEN", "PYPI_API_TOKEN"]).is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("name", "psidata").is_ok());
        assert!(validate_non_empty_string("name", "   ").is_err());
    }
}
