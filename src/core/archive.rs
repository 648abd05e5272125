use crate::utils::error::{PsiDataError, Result};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const MD5_BLOCKSIZE: usize = 1024 * 1024;

/// 計算資料流的 MD5 (十六進位小寫)
pub fn md5sum<R: Read>(mut reader: R, blocksize: usize) -> Result<String> {
    let mut context = md5::Context::new();
    let mut buffer = vec![0u8; blocksize.max(1)];
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        context.consume(&buffer[..read]);
    }
    Ok(format!("{:x}", context.compute()))
}

/// `<path>.<suffix>`；路徑本身含有 '.' 時也不會被替換
fn with_appended_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

pub fn zip_path_for(folder: &Path) -> PathBuf {
    with_appended_suffix(folder, "zip")
}

pub fn md5_path_for(folder: &Path) -> PathBuf {
    with_appended_suffix(folder, "md5")
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true)
}

fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// 將資料夾內容寫入 zip (成員名稱相對於資料夾)，回傳檔案數
pub fn create_archive(folder: &Path, zip_path: &Path) -> Result<usize> {
    let mut zip = ZipWriter::new(File::create(zip_path)?);
    let mut count = 0;

    for entry in WalkDir::new(folder).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(folder).unwrap_or(entry.path());
        if relative.as_os_str().is_empty() {
            continue;
        }
        let name = archive_name(relative);

        if entry.file_type().is_dir() {
            zip.add_directory(name, file_options())?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, file_options())?;
            io::copy(&mut File::open(entry.path())?, &mut zip)?;
            count += 1;
        }
    }

    zip.finish()?;
    Ok(count)
}

/// 比對 zip 內每個檔案與原始資料夾中對應檔案的 MD5
pub fn validate(zip_path: &Path, source_dir: &Path) -> Result<usize> {
    let mut archive = ZipArchive::new(File::open(zip_path)?)?;
    let mut checked = 0;

    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        if member.is_dir() {
            continue;
        }
        let Some(relative) = member.enclosed_name() else {
            tracing::warn!("Skipping unsafe member name {} in {}", member.name(), zip_path.display());
            continue;
        };
        let name = member.name().to_string();
        let archive_md5 = md5sum(&mut member, MD5_BLOCKSIZE)?;

        let file = source_dir.join(relative);
        if file.is_file() {
            let file_md5 = md5sum(File::open(&file)?, MD5_BLOCKSIZE)?;
            if archive_md5 != file_md5 {
                return Err(PsiDataError::CorruptedArchive {
                    member: name,
                    archive: zip_path.to_path_buf(),
                });
            }
            checked += 1;
        }
    }

    Ok(checked)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedFolder {
    pub zip_path: PathBuf,
    pub md5_path: PathBuf,
    pub md5: String,
    pub files: usize,
}

/// 壓縮實驗資料夾、驗證、寫出 `.md5` 檔，最後刪除原資料夾
///
/// 驗證或寫出失敗時保留原資料夾。
pub fn archive_data(folder: &Path) -> Result<ArchivedFolder> {
    let zip_path = zip_path_for(folder);
    let md5_path = md5_path_for(folder);

    let files = create_archive(folder, &zip_path)?;
    tracing::debug!("Wrote {} files to {}", files, zip_path.display());

    validate(&zip_path, folder)?;
    let md5 = md5sum(File::open(&zip_path)?, MD5_BLOCKSIZE)?;
    fs::write(&md5_path, &md5)?;
    fs::remove_dir_all(folder)?;

    tracing::info!("📦 Archived {} ({})", folder.display(), md5);
    Ok(ArchivedFolder {
        zip_path,
        md5_path,
        md5,
        files,
    })
}

/// 搬移檔案或資料夾；跨檔案系統時改為複製後刪除
pub fn move_path(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    if from.is_dir() {
        for entry in WalkDir::new(from) {
            let entry = entry?;
            let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
            let dest = to.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&dest)?;
            } else {
                fs::copy(entry.path(), &dest)?;
            }
        }
        fs::remove_dir_all(from)?;
    } else {
        fs::copy(from, to)?;
        fs::remove_file(from)?;
    }
    Ok(())
}

fn sorted_entries(path: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

pub fn subdirectories(path: &Path) -> Result<Vec<PathBuf>> {
    Ok(sorted_entries(path)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect())
}

/// 將 `path` 中名稱符合 `pattern` 的項目搬到 `dest/<path 名稱>/` 下
pub fn move_files(path: &Path, dest: &Path, pattern: &glob::Pattern) -> Result<usize> {
    let parent_name = path.file_name().unwrap_or_default();
    let mut moved = 0;

    for file in sorted_entries(path)? {
        let Some(file_name) = file.file_name() else {
            continue;
        };
        if !pattern.matches(&file_name.to_string_lossy()) {
            continue;
        }
        let file_dest = dest.join(parent_name).join(file_name);
        if let Some(parent) = file_dest.parent() {
            fs::create_dir_all(parent)?;
        }
        move_path(&file, &file_dest)?;
        tracing::debug!("Moved {} -> {}", file.display(), file_dest.display());
        moved += 1;
    }

    Ok(moved)
}

/// 對每個實驗資料夾執行 `move_files`，建立平行的資料夾結構
pub fn split_data(path: &Path, dest: &Path, pattern: &str) -> Result<usize> {
    let pattern = glob::Pattern::new(pattern)?;
    let mut moved = 0;
    for folder in subdirectories(path)? {
        moved += move_files(&folder, dest, &pattern)?;
    }
    Ok(moved)
}

/// 將 `path` 下的 zip 檔及其 `.md5` 搬到 `destination`
pub fn relocate_archives(path: &Path, destination: &Path) -> Result<usize> {
    fs::create_dir_all(destination)?;
    let mut moved = 0;

    for zip_path in sorted_entries(path)? {
        if !zip_path.is_file() || zip_path.extension().map(|e| e != "zip").unwrap_or(true) {
            continue;
        }
        let md5_path = zip_path.with_extension("md5");
        for file in [&zip_path, &md5_path] {
            if !file.exists() {
                tracing::warn!("Missing {}, not moved", file.display());
                continue;
            }
            if let Some(name) = file.file_name() {
                move_path(file, &destination.join(name))?;
            }
        }
        moved += 1;
    }

    Ok(moved)
}

#[derive(Debug, Default)]
pub struct ZipDataReport {
    pub archived: Vec<ArchivedFolder>,
    pub failed: Vec<(PathBuf, String)>,
    pub relocated: usize,
}

/// 壓縮 `path` 下每個實驗資料夾；指定 `destination` 時再搬移 zip 與 md5
///
/// 單一資料夾失敗只記錄，不中斷其他資料夾。
pub fn zip_data(path: &Path, destination: Option<&Path>) -> Result<ZipDataReport> {
    zip_data_with_progress(path, destination, |_, _, _| {})
}

/// 同 [`zip_data`]，每處理完一個資料夾呼叫 `progress(完成數, 總數, 資料夾)`
pub fn zip_data_with_progress<F>(
    path: &Path,
    destination: Option<&Path>,
    mut progress: F,
) -> Result<ZipDataReport>
where
    F: FnMut(usize, usize, &Path),
{
    let mut report = ZipDataReport::default();
    let folders = subdirectories(path)?;
    let total = folders.len();
    tracing::info!("📁 Archiving {} folders in {}", total, path.display());

    for (i, folder) in folders.into_iter().enumerate() {
        match archive_data(&folder) {
            Ok(archived) => report.archived.push(archived),
            Err(e) => {
                // 保留原資料夾，繼續處理下一個
                tracing::error!("❌ Failed to archive {}: {}", folder.display(), e);
                tracing::error!("💡 {}", e.recovery_suggestion());
                report.failed.push((folder.clone(), e.to_string()));
            }
        }
        progress(i + 1, total, &folder);
    }

    if let Some(destination) = destination {
        report.relocated = relocate_archives(path, destination)?;
        tracing::info!("🚚 Moved {} archives to {}", report.relocated, destination.display());
    }

    Ok(report)
}
