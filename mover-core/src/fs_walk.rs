use crate::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// 目录复制时的跳过规则，按路径前缀匹配
#[derive(Debug, Clone, Default)]
pub struct SkipRules {
    prefixes: Vec<PathBuf>,
}

impl SkipRules {
    pub fn none() -> Self {
        Self::default()
    }

    /// 跳过某个目录及其全部内容
    pub fn skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prefixes.push(dir.into());
        self
    }

    pub fn is_skipped(&self, path: &Path) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }
}

/// 复制统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files: u64,
    pub dirs: u64,
    pub bytes: u64,
}

/// 递归复制 `source` 到 `destination`，命中 `skip` 的子树整体跳过
///
/// 目标已存在时做覆盖合并，不删除目标中多余的文件。
pub fn copy_tree<F>(source: &Path, destination: &Path, skip: F) -> Result<CopyStats>
where
    F: Fn(&Path) -> bool,
{
    let mut stats = CopyStats::default();
    fs::create_dir_all(destination)?;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !skip(entry.path()));

    for entry in walker {
        let entry = entry?;
        let relative = entry.path().strip_prefix(source)?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
            stats.dirs += 1;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            stats.bytes += fs::copy(entry.path(), &target)?;
            stats.files += 1;
        } else {
            debug!("跳过非常规文件: {}", entry.path().display());
        }
    }

    Ok(stats)
}

/// 复制单个文件（若存在），返回是否复制
pub fn copy_file_if_exists(source: &Path, destination: &Path) -> Result<bool> {
    if !source.is_file() {
        return Ok(false);
    }
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination)?;
    Ok(true)
}
