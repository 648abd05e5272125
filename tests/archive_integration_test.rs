use anyhow::Result;
use psidata::core::archive::{md5sum, split_data, zip_data, zip_data_with_progress, MD5_BLOCKSIZE};
use std::fs;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;

fn make_experiment(root: &Path, name: &str) -> Result<()> {
    let folder = root.join(name);
    fs::create_dir_all(folder.join("microphone.zarr"))?;
    fs::write(folder.join("io.json"), br#"{"output": {}}"#)?;
    fs::write(folder.join("final.preferences"), b"context: {}\n")?;
    fs::write(folder.join("microphone.zarr/.zarray"), b"{\"shape\": [10]}")?;
    fs::write(folder.join(format!("{} summary.pdf", name)), b"%PDF-1.4")?;
    Ok(())
}

#[test]
fn test_zip_data_archives_and_relocates() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("raw");
    let destination = temp_dir.path().join("archive");
    make_experiment(&raw, "20230115-143022 bburan B001 abr_io")?;
    make_experiment(&raw, "20230116-091500 bburan B002 abr_io.v2")?;

    let report = zip_data(&raw, Some(&destination))?;

    assert_eq!(report.archived.len(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(report.relocated, 2);
    assert_eq!(report.archived[0].files, 4);

    // 原資料夾已刪除，zip 與 md5 都已搬移
    assert_eq!(fs::read_dir(&raw)?.count(), 0);
    let zip_path = destination.join("20230116-091500 bburan B002 abr_io.v2.zip");
    let md5_path = destination.join("20230116-091500 bburan B002 abr_io.v2.md5");
    assert!(zip_path.is_file());

    let recorded = fs::read_to_string(&md5_path)?;
    let actual = md5sum(fs::File::open(&zip_path)?, MD5_BLOCKSIZE)?;
    assert_eq!(recorded, actual);

    let mut archive = zip::ZipArchive::new(fs::File::open(&zip_path)?)?;
    let mut content = String::new();
    archive
        .by_name("microphone.zarr/.zarray")?
        .read_to_string(&mut content)?;
    assert_eq!(content, "{\"shape\": [10]}");
    Ok(())
}

#[test]
fn test_zip_data_without_destination_keeps_archives_in_place() -> Result<()> {
    let temp_dir = TempDir::new()?;
    make_experiment(temp_dir.path(), "20230115-143022 bburan B001 abr_io")?;

    let report = zip_data(temp_dir.path(), None)?;

    assert_eq!(report.relocated, 0);
    assert!(temp_dir.path().join("20230115-143022 bburan B001 abr_io.zip").is_file());
    assert!(temp_dir.path().join("20230115-143022 bburan B001 abr_io.md5").is_file());
    assert!(!temp_dir.path().join("20230115-143022 bburan B001 abr_io").exists());
    Ok(())
}

#[test]
fn test_split_data_builds_parallel_structure() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let raw = temp_dir.path().join("raw");
    let dest = temp_dir.path().join("figures");
    make_experiment(&raw, "exp1")?;
    make_experiment(&raw, "exp2")?;

    let moved = split_data(&raw, &dest, "*.pdf")?;

    assert_eq!(moved, 2);
    assert!(dest.join("exp1/exp1 summary.pdf").is_file());
    assert!(dest.join("exp2/exp2 summary.pdf").is_file());
    assert!(!raw.join("exp1/exp1 summary.pdf").exists());
    assert!(raw.join("exp1/io.json").is_file());
    Ok(())
}

#[test]
fn test_split_data_rejects_bad_pattern() -> Result<()> {
    let temp_dir = TempDir::new()?;
    assert!(split_data(temp_dir.path(), temp_dir.path(), "[").is_err());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_zip_data_keeps_folder_when_archive_cannot_be_written() -> Result<()> {
    let temp_dir = TempDir::new()?;
    make_experiment(temp_dir.path(), "exp1")?;
    make_experiment(temp_dir.path(), "exp2")?;
    // 指向不存在目錄的連結讓 exp1.zip 無法建立
    std::os::unix::fs::symlink(
        temp_dir.path().join("missing/exp1.zip"),
        temp_dir.path().join("exp1.zip"),
    )?;

    let mut progress = Vec::new();
    let report = zip_data_with_progress(temp_dir.path(), None, |done, total, _| {
        progress.push((done, total));
    })?;

    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("exp1"));
    assert_eq!(report.archived.len(), 1);
    assert!(temp_dir.path().join("exp1/io.json").is_file());
    assert!(!temp_dir.path().join("exp2").exists());
    assert_eq!(progress.len(), 2);
    assert_eq!(progress, vec![(1, 2), (2, 2)]);
    Ok(())
}
