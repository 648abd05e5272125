use crate::domain::model::InfoPairs;
use crate::utils::error::Result;
use std::path::Path;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 從資料檔路徑取得描述性欄位 (實驗者、動物編號等)
pub trait FilenameParse {
    fn parse(&self, path: &Path) -> Result<InfoPairs>;
}

impl<F> FilenameParse for F
where
    F: Fn(&Path) -> Result<InfoPairs>,
{
    fn parse(&self, path: &Path) -> Result<InfoPairs> {
        self(path)
    }
}
