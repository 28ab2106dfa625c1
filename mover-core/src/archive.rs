//! 归档编解码：目录树与单个 zip 文件之间的互相转换
//!
//! 这里的函数都是阻塞调用，异步代码中应放在 `spawn_blocking` 里执行。

use crate::constants::archive::PREVIEW_LIMIT;
use crate::error::{MoverError, Result};
use crate::options::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// 归档条目预览
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub size: u64,
    pub compressed_size: u64,
    pub is_dir: bool,
}

/// 归档概要信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveInfo {
    pub entry_count: usize,
    pub size_bytes: u64,
    /// 最多 PREVIEW_LIMIT 条
    pub entries: Vec<ArchiveEntry>,
}

impl From<Compression> for CompressionMethod {
    fn from(value: Compression) -> Self {
        match value {
            Compression::Zip => CompressionMethod::Deflated,
            Compression::Store => CompressionMethod::Stored,
        }
    }
}

/// 将 `source_dir` 打包为 `archive_path`
///
/// 父目录先于子项写入，同级按文件名排序；空目录也会保留。
/// 条目路径使用 `/` 分隔并相对于 `source_dir`。
pub fn create_archive(source_dir: &Path, archive_path: &Path, compression: Compression) -> Result<u64> {
    if let Some(parent) = archive_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            MoverError::ArchiveWrite(format!("{}: {e}", archive_path.display()))
        })?;
    }
    let file = File::create(archive_path)
        .map_err(|e| MoverError::ArchiveWrite(format!("{}: {e}", archive_path.display())))?;

    let mut zip = ZipWriter::new(BufWriter::new(file));
    let base_options = SimpleFileOptions::default().compression_method(compression.into());

    let mut entries = 0usize;
    for entry in WalkDir::new(source_dir).min_depth(1).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source_dir)?;
        let name = entry_name(relative);

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{name}/"), base_options)?;
        } else if entry.file_type().is_file() {
            let len = entry.metadata()?.len();
            let options = base_options.large_file(len >= u32::MAX as u64);
            zip.start_file(name, options)?;
            let mut reader = BufReader::new(File::open(entry.path())?);
            io::copy(&mut reader, &mut zip)?;
        } else {
            debug!("跳过非常规文件: {}", entry.path().display());
            continue;
        }
        entries += 1;
    }

    let mut writer = zip
        .finish()
        .map_err(|e| MoverError::ArchiveWrite(format!("{}: {e}", archive_path.display())))?;
    writer.flush()?;
    drop(writer);

    if !archive_path.is_file() {
        return Err(MoverError::ArchiveIncomplete(
            archive_path.display().to_string(),
        ));
    }

    let size = fs::metadata(archive_path)?.len();
    info!(
        "归档创建完成: {} ({} 个条目, {} 字节)",
        archive_path.display(),
        entries,
        size
    );
    Ok(size)
}

/// 相对路径转为 `/` 分隔的条目名
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn open_archive(archive_path: &Path) -> Result<ZipArchive<BufReader<File>>> {
    if !archive_path.is_file() {
        return Err(MoverError::ArchiveNotFound(
            archive_path.display().to_string(),
        ));
    }
    let file = File::open(archive_path)
        .map_err(|e| MoverError::ArchiveOpen(format!("{}: {e}", archive_path.display())))?;
    ZipArchive::new(BufReader::new(file))
        .map_err(|e| MoverError::ArchiveOpen(format!("{}: {e}", archive_path.display())))
}

/// 解压归档到 `destination_dir`，目录不存在时自动创建
pub fn extract_archive(archive_path: &Path, destination_dir: &Path) -> Result<usize> {
    let mut archive = open_archive(archive_path)?;
    let extract_err = |detail: String| MoverError::ArchiveExtract(detail);

    fs::create_dir_all(destination_dir)
        .map_err(|e| extract_err(format!("{}: {e}", destination_dir.display())))?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| extract_err(format!("条目 {i}: {e}")))?;

        // 拒绝越出目标目录的条目
        let Some(relative) = file.enclosed_name() else {
            return Err(extract_err(format!("非法条目路径: {}", file.name())));
        };
        let outpath = destination_dir.join(relative);

        if file.is_dir() {
            fs::create_dir_all(&outpath)
                .map_err(|e| extract_err(format!("{}: {e}", outpath.display())))?;
            continue;
        }

        if let Some(parent) = outpath.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| extract_err(format!("{}: {e}", parent.display())))?;
        }
        let mut outfile = File::create(&outpath)
            .map_err(|e| extract_err(format!("{}: {e}", outpath.display())))?;
        io::copy(&mut file, &mut outfile)
            .map_err(|e| extract_err(format!("{}: {e}", outpath.display())))?;
    }

    info!(
        "归档解压完成: {} -> {} ({} 个条目)",
        archive_path.display(),
        destination_dir.display(),
        archive.len()
    );
    Ok(archive.len())
}

/// 读取归档概要，只预览前 PREVIEW_LIMIT 个条目
pub fn archive_info(archive_path: &Path) -> Result<ArchiveInfo> {
    let mut archive = open_archive(archive_path)?;
    let size_bytes = fs::metadata(archive_path)?.len();
    let entry_count = archive.len();

    let mut entries = Vec::with_capacity(entry_count.min(PREVIEW_LIMIT));
    for i in 0..entry_count.min(PREVIEW_LIMIT) {
        let file = archive.by_index(i)?;
        entries.push(ArchiveEntry {
            name: file.name().to_string(),
            size: file.size(),
            compressed_size: file.compressed_size(),
            is_dir: file.is_dir(),
        });
    }

    Ok(ArchiveInfo {
        entry_count,
        size_bytes,
        entries,
    })
}

/// 完整读取每个条目以校验 CRC，任何失败都返回 false
pub fn validate_archive(archive_path: &Path) -> bool {
    let check = || -> Result<()> {
        let mut archive = open_archive(archive_path)?;
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            io::copy(&mut file, &mut io::sink())?;
        }
        Ok(())
    };

    match check() {
        Ok(()) => true,
        Err(e) => {
            debug!("归档校验失败 {}: {}", archive_path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("wp-content/uploads/2024/01")).unwrap();
        fs::create_dir_all(root.join("wp-content/empty")).unwrap();
        fs::write(root.join("wp-config.php"), b"<?php define('DB', 'x');").unwrap();
        fs::write(root.join("wp-content/uploads/2024/01/photo.jpg"), vec![7u8; 4096]).unwrap();
        fs::write(root.join("database.sql"), "DROP TABLE IF EXISTS \"t\";\n").unwrap();
    }

    /// 相对路径 -> 文件内容（目录为 None）
    fn snapshot(root: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
        WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .map(|e| e.unwrap())
            .map(|e| {
                let rel = entry_name(e.path().strip_prefix(root).unwrap());
                let content = e.file_type().is_file().then(|| fs::read(e.path()).unwrap());
                (rel, content)
            })
            .collect()
    }

    #[test]
    fn test_round_trip_preserves_tree() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        build_tree(&source);
        let archive = temp.path().join("out/site.zip");

        let size = create_archive(&source, &archive, Compression::Zip).unwrap();
        assert!(size > 0);

        let restored = temp.path().join("restored");
        extract_archive(&archive, &restored).unwrap();

        assert_eq!(snapshot(&source), snapshot(&restored));
        assert!(restored.join("wp-content/empty").is_dir());
    }

    #[test]
    fn test_entry_order_is_parent_first() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        build_tree(&source);
        let archive = temp.path().join("site.zip");
        create_archive(&source, &archive, Compression::Store).unwrap();

        let info = archive_info(&archive).unwrap();
        let names: Vec<&str> = info.entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "database.sql",
                "wp-config.php",
                "wp-content/",
                "wp-content/empty/",
                "wp-content/uploads/",
                "wp-content/uploads/2024/",
                "wp-content/uploads/2024/01/",
                "wp-content/uploads/2024/01/photo.jpg",
            ]
        );
        assert_eq!(info.entry_count, 8);
        assert!(info.entries.iter().all(|e| !e.name.contains('\\')));
    }

    #[test]
    fn test_info_preview_is_bounded() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("many");
        fs::create_dir_all(&source).unwrap();
        for i in 0..(PREVIEW_LIMIT + 20) {
            fs::write(source.join(format!("f{i:04}.txt")), b"x").unwrap();
        }
        let archive = temp.path().join("many.zip");
        create_archive(&source, &archive, Compression::Zip).unwrap();

        let info = archive_info(&archive).unwrap();
        assert_eq!(info.entry_count, PREVIEW_LIMIT + 20);
        assert_eq!(info.entries.len(), PREVIEW_LIMIT);
        assert_eq!(info.size_bytes, fs::metadata(&archive).unwrap().len());
    }

    #[test]
    fn test_validate_archive() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        build_tree(&source);
        let archive = temp.path().join("site.zip");
        create_archive(&source, &archive, Compression::Zip).unwrap();
        assert!(validate_archive(&archive));

        let garbage = temp.path().join("garbage.zip");
        fs::write(&garbage, b"definitely not a zip").unwrap();
        assert!(!validate_archive(&garbage));
        assert!(!validate_archive(&temp.path().join("missing.zip")));
    }

    #[test]
    fn test_extract_errors() {
        let temp = tempdir().unwrap();
        let missing = extract_archive(&temp.path().join("missing.zip"), temp.path());
        assert!(matches!(missing, Err(MoverError::ArchiveNotFound(_))));

        let garbage = temp.path().join("garbage.zip");
        fs::write(&garbage, b"PK not really").unwrap();
        let broken = extract_archive(&garbage, &temp.path().join("out"));
        assert!(matches!(broken, Err(MoverError::ArchiveOpen(_))));
    }

    #[test]
    fn test_create_into_unwritable_target() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("source");
        build_tree(&source);
        // 目标路径的父级是普通文件，无法创建
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"file").unwrap();

        let result = create_archive(&source, &blocker.join("site.zip"), Compression::Zip);
        assert!(matches!(result, Err(MoverError::ArchiveWrite(_))));
    }
}
