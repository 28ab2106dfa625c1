use crate::constants::protocol;
use crate::error::{MoverError, Result};
use crate::operation::OperationId;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 归档压缩方式
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Deflate 压缩
    #[default]
    Zip,
    /// 仅存储，不压缩
    Store,
}

impl std::str::FromStr for Compression {
    type Err = MoverError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "zip" | "deflate" => Ok(Self::Zip),
            "store" | "none" => Ok(Self::Store),
            other => Err(MoverError::validation(format!("未知的压缩方式: {other}"))),
        }
    }
}

/// 导出选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOptions {
    /// 备份名称，校验后为安全文件名
    pub name: String,
    pub protocol: String,
    pub include_database: bool,
    pub include_media: bool,
    pub include_plugins: bool,
    pub include_themes: bool,
    /// 媒体阶段同时要求 include_media 与 include_uploads
    pub include_uploads: bool,
    pub compression: Compression,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            protocol: protocol::LOCAL.to_string(),
            include_database: true,
            include_media: true,
            include_plugins: true,
            include_themes: true,
            include_uploads: true,
            compression: Compression::Zip,
        }
    }
}

impl ExportOptions {
    /// 规范化名称：清洗为安全文件名，空名称使用时间戳
    pub fn normalized(mut self, now: DateTime<Utc>) -> Self {
        let cleaned = sanitize_name(&self.name);
        self.name = if cleaned.is_empty() {
            default_backup_name(now)
        } else {
            cleaned
        };
        self.protocol = self.protocol.trim().to_lowercase();
        self
    }

    /// 是否执行媒体阶段
    pub fn media_enabled(&self) -> bool {
        self.include_media && self.include_uploads
    }
}

/// 导入选项，来源二选一
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOptions {
    pub source_operation_id: Option<OperationId>,
    pub source_path: Option<PathBuf>,
    pub protocol: String,
    pub overwrite_database: bool,
    pub overwrite_files: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            source_operation_id: None,
            source_path: None,
            protocol: protocol::LOCAL.to_string(),
            overwrite_database: true,
            overwrite_files: true,
        }
    }
}

/// 已解析的导入来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    Operation(OperationId),
    Path(PathBuf),
}

impl ImportSource {
    /// 记录到操作上的来源描述
    pub fn describe(&self) -> String {
        match self {
            Self::Operation(id) => format!("operation:{id}"),
            Self::Path(path) => format!("path:{}", path.display()),
        }
    }
}

impl ImportOptions {
    /// 校验来源互斥：必须且只能设置一个
    pub fn source(&self) -> Result<ImportSource> {
        let path = self
            .source_path
            .as_ref()
            .filter(|path| !path.as_os_str().is_empty());

        match (self.source_operation_id, path) {
            (Some(_), Some(_)) => Err(MoverError::validation(
                "source_operation_id 与 source_path 不能同时设置",
            )),
            (None, None) => Err(MoverError::validation(
                "必须设置 source_operation_id 或 source_path 之一",
            )),
            (Some(id), None) => Ok(ImportSource::Operation(id)),
            (None, Some(path)) => Ok(ImportSource::Path(path.clone())),
        }
    }
}

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("备份名称正则表达式无效"));

/// 清洗备份名称：非安全字符替换为 `-`，去掉首尾的 `.` 与 `-`
pub fn sanitize_name(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name.trim(), "-");
    replaced
        .trim_matches(|c| c == '.' || c == '-')
        .to_string()
}

/// 默认备份名称 `backup-YYYY-MM-DD-HH-MM-SS`
pub fn default_backup_name(now: DateTime<Utc>) -> String {
    format!("backup-{}", now.format("%Y-%m-%d-%H-%M-%S"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("nightly"), "nightly");
        assert_eq!(sanitize_name("my backup/../etc"), "my-backup-..-etc");
        assert_eq!(sanitize_name("../secret"), "secret");
        assert_eq!(sanitize_name("  "), "");
        assert_eq!(sanitize_name("站点备份"), "");
    }

    #[test]
    fn test_empty_name_gets_timestamp() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        let options = ExportOptions::default().normalized(now);
        assert_eq!(options.name, "backup-2026-03-04-05-06-07");

        let options = ExportOptions {
            name: "Site Export!".to_string(),
            protocol: " FTP ".to_string(),
            ..Default::default()
        }
        .normalized(now);
        assert_eq!(options.name, "Site-Export");
        assert_eq!(options.protocol, "ftp");
    }

    #[test]
    fn test_import_source_exclusive() {
        let both = ImportOptions {
            source_operation_id: Some(1),
            source_path: Some(PathBuf::from("/tmp/a.zip")),
            ..Default::default()
        };
        assert!(matches!(both.source(), Err(MoverError::Validation(_))));

        let neither = ImportOptions::default();
        assert!(matches!(neither.source(), Err(MoverError::Validation(_))));

        let by_id = ImportOptions {
            source_operation_id: Some(7),
            ..Default::default()
        };
        assert_eq!(by_id.source().unwrap(), ImportSource::Operation(7));
    }

    #[test]
    fn test_media_requires_uploads() {
        let options = ExportOptions {
            include_uploads: false,
            ..Default::default()
        };
        assert!(!options.media_enabled());
        assert!(ExportOptions::default().media_enabled());
    }
}
