use crate::core::query::CompiledQuery;
use crate::domain::model::{Record, Table};
use crate::domain::ports::FilenameParse;
use crate::utils::error::{PsiDataError, Result};
use serde_json::Value;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// 含有以下字串的路徑一律略過
const SKIPPED_PATH_MARKERS: [&str; 2] = ["_exclude", ".imaris_cache"];

pub type ShouldLoad = Box<dyn Fn(&Path) -> bool + Send + Sync>;

pub struct LoadOptions {
    /// 加入 `dataset` 欄位 (檔案所在的資料夾)
    pub include_dataset: bool,
    /// true: 檔名資訊併入每筆資料的欄位；false: 作為列索引
    pub info_as_cols: bool,
    pub should_load: Option<ShouldLoad>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            include_dataset: false,
            info_as_cols: true,
            should_load: None,
        }
    }
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("include_dataset", &self.include_dataset)
            .field("info_as_cols", &self.info_as_cols)
            .field("should_load", &self.should_load.is_some())
            .finish()
    }
}

fn is_skipped(path: &Path) -> bool {
    let text = path.to_string_lossy();
    SKIPPED_PATH_MARKERS.iter().any(|m| text.contains(m))
}

fn find_files(data_path: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&data_path.to_string_lossy());
    let full_pattern = format!("{}/{}", base.trim_end_matches('/'), pattern);

    let mut paths = glob::glob(&full_pattern)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| PsiDataError::IoError(e.into_error()))?;
    paths.sort();
    Ok(paths)
}

/// 掃描 `data_path` 下符合 `pattern` 的檔案，逐一載入並加上檔名資訊
pub fn load<L, P>(
    data_path: &Path,
    pattern: &str,
    mut loader: L,
    parser: &P,
    options: &LoadOptions,
) -> Result<Table>
where
    L: FnMut(&Path) -> Result<Vec<Record>>,
    P: FilenameParse + ?Sized,
{
    let paths = find_files(data_path, pattern)?;
    tracing::debug!(
        "Found {} candidate files for '{}' in {}",
        paths.len(),
        pattern,
        data_path.display()
    );

    let mut table: Option<Table> = None;

    for path in paths {
        if is_skipped(&path) {
            tracing::debug!("Skipping excluded path {}", path.display());
            continue;
        }
        if let Some(should_load) = &options.should_load {
            if !should_load(&path) {
                continue;
            }
        }

        load_file(&path, &mut loader, parser, options, &mut table)
            .map_err(|e| PsiDataError::processing(&path, e))?;
    }

    let table = table.ok_or(PsiDataError::NoDataFound)?;
    tracing::info!("Loaded {} rows", table.len());
    Ok(table)
}

fn load_file<L, P>(
    path: &Path,
    loader: &mut L,
    parser: &P,
    options: &LoadOptions,
    table: &mut Option<Table>,
) -> Result<()>
where
    L: FnMut(&Path) -> Result<Vec<Record>>,
    P: FilenameParse + ?Sized,
{
    let records = loader(path)?;
    let mut info = parser.parse(path)?;
    if options.include_dataset {
        let dataset = path
            .parent()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        info.push(("dataset".to_string(), Value::String(dataset)));
    }

    if options.info_as_cols {
        let table = table.get_or_insert_with(|| Table::new(Vec::new()));
        for mut record in records {
            for (key, value) in &info {
                if record.contains_key(key) {
                    return Err(PsiDataError::ColumnCollision {
                        column: key.clone(),
                    });
                }
                record.insert(key.clone(), value.clone());
            }
            table.push_row(Vec::new(), record);
        }
    } else {
        let names: Vec<String> = info.iter().map(|(k, _)| k.clone()).collect();
        let table = table.get_or_insert_with(|| Table::new(names.clone()));
        if table.index_names != names {
            return Err(PsiDataError::ValidationError {
                message: format!(
                    "Index fields {:?} differ from {:?}",
                    names, table.index_names
                ),
            });
        }
        let index: Vec<Value> = info.into_iter().map(|(_, v)| v).collect();
        for record in records {
            table.push_row(index.clone(), record);
        }
    }

    Ok(())
}

/// 原始資料 zip 檔的搜尋樣式
pub fn raw_pattern(etype: Option<&str>) -> String {
    match etype {
        Some(etype) => format!("**/*{}*.zip", glob::Pattern::escape(etype)),
        None => "**/*.zip".to_string(),
    }
}

pub fn load_raw<L, P>(
    loader: L,
    etype: Option<&str>,
    data_path: &Path,
    parser: &P,
    options: &LoadOptions,
) -> Result<Table>
where
    L: FnMut(&Path) -> Result<Vec<Record>>,
    P: FilenameParse + ?Sized,
{
    load(data_path, &raw_pattern(etype), loader, parser, options)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    /// 依副檔名判斷格式 (`.preferences` 為 YAML)
    pub fn infer(member: &str) -> Result<Self> {
        if member.ends_with(".json") {
            Ok(FileFormat::Json)
        } else if member.ends_with(".yaml") || member.ends_with(".preferences") {
            Ok(FileFormat::Yaml)
        } else {
            Err(PsiDataError::ConfigError {
                message: format!("Could not determine file format for {}", member),
            })
        }
    }

    pub fn decode(&self, text: &str) -> Result<Value> {
        match self {
            FileFormat::Json => Ok(serde_json::from_str(text)?),
            FileFormat::Yaml => yaml_to_json(serde_yaml::from_str(text)?),
        }
    }
}

impl FromStr for FileFormat {
    type Err = PsiDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(FileFormat::Json),
            "yaml" => Ok(FileFormat::Yaml),
            other => Err(PsiDataError::ConfigError {
                message: format!("Invalid file format {}", other),
            }),
        }
    }
}

/// YAML 節點轉為 JSON；自訂 tag (例如 python/object/apply:builtins.list) 直接取內容
fn yaml_to_json(value: serde_yaml::Value) -> Result<Value> {
    use serde_yaml::Value as Yaml;

    Ok(match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Yaml::Mapping(mapping) => {
            let mut object = serde_json::Map::new();
            for (key, value) in mapping {
                let key = match key {
                    Yaml::String(s) => s,
                    Yaml::Number(n) => n.to_string(),
                    Yaml::Bool(b) => b.to_string(),
                    Yaml::Null => "null".to_string(),
                    other => serde_yaml::to_string(&other)?.trim().to_string(),
                };
                object.insert(key, yaml_to_json(value)?);
            }
            Value::Object(object)
        }
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

/// 從 raw zip 檔內的 JSON/YAML 文件取出指定欄位
#[derive(Debug, Clone)]
pub struct RawQuery {
    member: String,
    queries: Vec<(String, CompiledQuery)>,
    file_format: FileFormat,
}

impl RawQuery {
    pub fn new<I, K, V>(member: &str, queries: I, file_format: Option<FileFormat>) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let queries = queries
            .into_iter()
            .map(|(name, expr)| Ok((name.into(), CompiledQuery::compile(expr.as_ref())?)))
            .collect::<Result<Vec<_>>>()?;

        let file_format = match file_format {
            Some(format) => format,
            None => FileFormat::infer(member)?,
        };

        Ok(Self {
            member: member.to_string(),
            queries,
            file_format,
        })
    }

    pub fn member(&self) -> &str {
        &self.member
    }

    pub fn file_format(&self) -> FileFormat {
        self.file_format
    }

    pub fn evaluate(&self, document: &Value) -> Result<Record> {
        let pairs = self
            .queries
            .iter()
            .map(|(name, query)| Ok((name.clone(), query.search(document)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Record::from_pairs(pairs))
    }

    pub fn read(&self, zip_path: &Path) -> Result<Record> {
        let mut archive = zip::ZipArchive::new(File::open(zip_path)?)?;
        let mut file = archive.by_name(&self.member)?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        let document = self.file_format.decode(&text)?;
        self.evaluate(&document)
    }
}

/// 每個 raw zip 檔產生一列查詢結果
pub fn load_raw_query<P>(
    query: &RawQuery,
    etype: Option<&str>,
    data_path: &Path,
    parser: &P,
    options: &LoadOptions,
) -> Result<Table>
where
    P: FilenameParse + ?Sized,
{
    load_raw(
        |path: &Path| Ok(vec![query.read(path)?]),
        etype,
        data_path,
        parser,
        options,
    )
}
