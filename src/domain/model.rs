use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::io::Write;

use crate::utils::error::Result;

/// 檔名或資料夾解析出的欄位，保持原有順序
pub type InfoPairs = Vec<(String, Value)>;

/// 單筆資料列 (欄位名稱 → 值)，欄位順序依插入順序保存
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub data: Map<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            data: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    pub index: Vec<Value>,
    pub values: Record,
}

/// 多個檔案載入後合併的結果表格
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub index_names: Vec<String>,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new(index_names: Vec<String>) -> Self {
        Self {
            index_names,
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, index: Vec<Value>, values: Record) {
        for key in values.data.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(TableRow { index, values });
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 取得指定欄位的所有值，缺值以 Null 表示
    pub fn column(&self, name: &str) -> Vec<Value> {
        self.rows
            .iter()
            .map(|row| row.values.get(name).cloned().unwrap_or(Value::Null))
            .collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        let header: Vec<&str> = self
            .index_names
            .iter()
            .chain(self.columns.iter())
            .map(String::as_str)
            .collect();
        csv_writer.write_record(&header)?;

        for row in &self.rows {
            let mut cells: Vec<String> = row.index.iter().map(render_cell).collect();
            // 索引欄位數不足時補空值
            cells.resize(self.index_names.len(), String::new());
            cells.extend(
                self.columns
                    .iter()
                    .map(|c| row.values.get(c).map(render_cell).unwrap_or_default()),
            );
            csv_writer.write_record(&cells)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
