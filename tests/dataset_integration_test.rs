use psidata::{load_raw_query, FileFormat, LoadOptions, PsiDataError, PsiFilenameParser, RawQuery};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn write_raw_zip(path: &Path, members: &[(&str, &str)]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut zip = ZipWriter::new(std::fs::File::create(path).unwrap());
    for (name, content) in members {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn io_json(channel: &str) -> String {
    json!({
        "output": {"starship_A_primary": {"channel": channel, "fs": 100000}},
        "input": {"microphone": {"gain": [20, 40]}}
    })
    .to_string()
}

fn setup() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    write_raw_zip(
        &root.join("cohort1/20230115-143022 bburan B001 left abr_io.zip"),
        &[
            ("io.json", &io_json("ao0")),
            ("final.preferences", "context:\n  level: !!python/object/apply:builtins.list\n  - 80\n  - 60\n"),
        ],
    );
    write_raw_zip(
        &root.join("cohort1/20230116-091500 bburan B002 right post noise abr_io.zip"),
        &[
            ("io.json", &io_json("ao1")),
            ("final.preferences", "context:\n  level: [70]\n"),
        ],
    );
    write_raw_zip(
        &root.join("cohort2/20230117-101010 bburan B003 dpoae_io.zip"),
        &[("io.json", &io_json("ao2"))],
    );
    write_raw_zip(
        &root.join("_exclude/20230118-101010 bburan B004 abr_io.zip"),
        &[("io.json", &io_json("ao3"))],
    );

    temp_dir
}

#[test]
fn test_query_io_json_across_archives() {
    let temp_dir = setup();
    let parser = PsiFilenameParser::new(&["abr_io", "dpoae_io"], true).unwrap();
    let query = RawQuery::new(
        "io.json",
        [
            ("primary_output", "output.starship_A_primary.channel"),
            ("first_gain", "input.microphone.gain[0]"),
        ],
        None,
    )
    .unwrap();

    let table = load_raw_query(&query, None, temp_dir.path(), &parser, &LoadOptions::default()).unwrap();

    assert_eq!(table.len(), 3);
    assert_eq!(table.column("primary_output"), vec![json!("ao0"), json!("ao1"), json!("ao2")]);
    assert_eq!(table.column("animal_id"), vec![json!("B001"), json!("B002"), json!("B003")]);
    assert_eq!(table.column("ear"), vec![json!("left"), json!("right"), json!(null)]);
    assert_eq!(table.column("note"), vec![json!(null), json!("post noise"), json!(null)]);
    assert_eq!(table.column("first_gain"), vec![json!(20), json!(20), json!(20)]);
    assert_eq!(&table.columns[..2], &["primary_output".to_string(), "first_gain".to_string()]);

    let csv = table.to_csv_string().unwrap();
    assert!(csv.starts_with("primary_output,first_gain,datetime,experimenter,animal_id,ear,note,experiment_type,date,time\n"));
    assert!(csv.contains("ao1,20,2023-01-16 09:15:00,bburan,B002,right,post noise,abr_io,2023-01-16,09:15:00"));
}

#[test]
fn test_query_preferences_filtered_by_etype() {
    let temp_dir = setup();
    let parser = PsiFilenameParser::new(&["abr_io"], false).unwrap();
    let query = RawQuery::new("final.preferences", [("level", "context.level[0]")], None).unwrap();
    assert_eq!(query.file_format(), FileFormat::Yaml);

    let options = LoadOptions {
        include_dataset: true,
        ..Default::default()
    };
    let table = load_raw_query(&query, Some("abr_io"), temp_dir.path(), &parser, &options).unwrap();

    assert_eq!(table.column("level"), vec![json!(80), json!(70)]);
    assert!(!table.columns.contains(&"ear".to_string()));
    let dataset = table.column("dataset");
    assert!(dataset[0].as_str().unwrap().ends_with("cohort1"));
}

#[test]
fn test_missing_member_reports_archive() {
    let temp_dir = setup();
    let parser = PsiFilenameParser::new(&["abr_io", "dpoae_io"], true).unwrap();
    let query = RawQuery::new("final.preferences", [("level", "context.level")], None).unwrap();

    let err = load_raw_query(&query, None, temp_dir.path(), &parser, &LoadOptions::default()).unwrap_err();

    match err {
        PsiDataError::ProcessingError { path, source } => {
            assert!(path.to_string_lossy().contains("B003"));
            assert!(matches!(*source, PsiDataError::ZipError(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unmatched_etype_is_no_data() {
    let temp_dir = setup();
    let parser = PsiFilenameParser::new(&["memr"], true).unwrap();
    let query = RawQuery::new("io.json", [("fs", "output.starship_A_primary.fs")], None).unwrap();

    let err = load_raw_query(&query, Some("memr"), temp_dir.path(), &parser, &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, PsiDataError::NoDataFound));
}

#[test]
fn test_info_as_index_columns() {
    let temp_dir = setup();
    let parser = PsiFilenameParser::new(&["dpoae_io"], false).unwrap();
    let query = RawQuery::new("io.json", [("fs", "output.starship_A_primary.fs")], Some(FileFormat::Json)).unwrap();
    let options = LoadOptions {
        info_as_cols: false,
        ..Default::default()
    };

    let table = load_raw_query(&query, Some("dpoae_io"), temp_dir.path(), &parser, &options).unwrap();

    assert_eq!(table.columns, vec!["fs"]);
    assert_eq!(table.index_names[2], "animal_id");
    assert_eq!(table.rows[0].index[2], json!("B003"));
    assert_eq!(table.column("fs"), vec![json!(100000)]);
}
