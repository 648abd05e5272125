use crate::domain::model::InfoPairs;
use crate::domain::ports::FilenameParse;
use crate::utils::error::{PsiDataError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const DATETIME_FORMAT: &str = "%Y%m%d-%H%M%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ear {
    Left,
    Right,
}

impl Ear {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ear::Left => "left",
            Ear::Right => "right",
        }
    }
}

impl fmt::Display for Ear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ear {
    type Err = PsiDataError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(Ear::Left),
            "right" => Ok(Ear::Right),
            other => Err(PsiDataError::ParseError {
                message: format!("Unknown ear '{}'", other),
            }),
        }
    }
}

/// psiexperiment 資料檔名中可取得的資訊
#[derive(Debug, Clone, PartialEq)]
pub struct FilenameInfo {
    pub datetime: NaiveDateTime,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub experimenter: String,
    pub animal_id: String,
    pub ear: Option<Ear>,
    pub note: Option<String>,
    pub experiment_type: String,
}

impl FilenameInfo {
    pub fn to_pairs(&self, include_ear: bool) -> InfoPairs {
        let mut pairs = vec![
            (
                "datetime".to_string(),
                Value::String(self.datetime.format("%Y-%m-%d %H:%M:%S").to_string()),
            ),
            (
                "experimenter".to_string(),
                Value::String(self.experimenter.clone()),
            ),
            ("animal_id".to_string(), Value::String(self.animal_id.clone())),
        ];
        if include_ear {
            pairs.push((
                "ear".to_string(),
                self.ear
                    .map(|e| Value::String(e.as_str().to_string()))
                    .unwrap_or(Value::Null),
            ));
        }
        pairs.push((
            "note".to_string(),
            self.note.clone().map(Value::String).unwrap_or(Value::Null),
        ));
        pairs.push((
            "experiment_type".to_string(),
            Value::String(self.experiment_type.clone()),
        ));
        pairs.push((
            "date".to_string(),
            Value::String(self.date.format("%Y-%m-%d").to_string()),
        ));
        pairs.push((
            "time".to_string(),
            Value::String(self.time.format("%H:%M:%S").to_string()),
        ));
        pairs
    }
}

/// 依實驗類型清單建立的檔名解析器
///
/// 檔名格式: `<YYYYMMDD-HHMMSS> <experimenter> <animal_id> [left|right ][note ]<experiment>[_suffix]...`
#[derive(Debug, Clone)]
pub struct PsiFilenameParser {
    pattern: Regex,
    include_ear: bool,
}

impl PsiFilenameParser {
    pub fn new<S: AsRef<str>>(experiments: &[S], include_ear: bool) -> Result<Self> {
        let experiment_str = experiments
            .iter()
            .map(|e| regex::escape(e.as_ref()))
            .collect::<Vec<_>>()
            .join("|");

        let pattern = Regex::new(&format!(
            r"^(?P<datetime>\d{{8}}-\d{{6}}) (?P<experimenter>\w+) (?P<animal_id>[-\w]+) ((?P<ear>left|right) )?((?P<note>.*) )?(?P<experiment_type>(?:{})(_\w+)?).*$",
            experiment_str
        ))?;

        Ok(Self {
            pattern,
            include_ear,
        })
    }

    pub fn include_ear(&self) -> bool {
        self.include_ear
    }

    pub fn parse_stem(&self, stem: &str) -> Result<FilenameInfo> {
        let caps = self
            .pattern
            .captures(stem)
            .ok_or_else(|| PsiDataError::ParseError {
                message: format!("Could not parse {}", stem),
            })?;

        let datetime = NaiveDateTime::parse_from_str(&caps["datetime"], DATETIME_FORMAT)
            .map_err(|e| PsiDataError::ParseError {
                message: format!("Could not parse {}: invalid datetime ({})", stem, e),
            })?;

        let ear = caps.name("ear").map(|m| m.as_str().parse::<Ear>()).transpose()?;

        Ok(FilenameInfo {
            datetime,
            date: datetime.date(),
            time: datetime.time(),
            experimenter: caps["experimenter"].to_string(),
            animal_id: caps["animal_id"].to_string(),
            ear,
            note: caps.name("note").map(|m| m.as_str().to_string()),
            experiment_type: caps["experiment_type"].to_string(),
        })
    }

    pub fn parse_path(&self, path: &Path) -> Result<FilenameInfo> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| PsiDataError::ParseError {
                message: format!("Could not parse {}", path.display()),
            })?;
        self.parse_stem(stem)
    }
}

impl FilenameParse for PsiFilenameParser {
    fn parse(&self, path: &Path) -> Result<InfoPairs> {
        Ok(self.parse_path(path)?.to_pairs(self.include_ear))
    }
}
