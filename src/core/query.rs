use crate::utils::error::{PsiDataError, Result};
use jmespath::{Expression, Variable};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 已編譯的 JMESPath 查詢
///
/// 找不到的節點回傳 `null`；語法錯誤在編譯時回報。
#[derive(Clone)]
pub struct CompiledQuery {
    expression: Arc<Expression<'static>>,
}

impl CompiledQuery {
    pub fn compile(expression: &str) -> Result<Self> {
        let compiled = jmespath::compile(expression).map_err(|e| PsiDataError::QueryError {
            expression: expression.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            expression: Arc::new(compiled),
        })
    }

    pub fn expression(&self) -> &str {
        self.expression.as_str()
    }

    pub fn search(&self, document: &Value) -> Result<Value> {
        let error = |reason: String| PsiDataError::QueryError {
            expression: self.expression().to_string(),
            reason,
        };

        let result = self
            .expression
            .search(Variable::try_from(document.clone()).map_err(|e| error(e.to_string()))?)
            .map_err(|e| error(e.to_string()))?;
        serde_json::to_value(&*result).map_err(|e| error(e.to_string()))
    }
}

impl fmt::Debug for CompiledQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledQuery").field(&self.expression()).finish()
    }
}

impl PartialEq for CompiledQuery {
    fn eq(&self, other: &Self) -> bool {
        self.expression() == other.expression()
    }
}

impl FromStr for CompiledQuery {
    type Err = PsiDataError;

    fn from_str(s: &str) -> Result<Self> {
        Self::compile(s)
    }
}
