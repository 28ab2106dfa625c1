//! 站点描述：目录布局与在线数据库

mod duckdb_site;

pub use duckdb_site::{DuckDbSite, SiteDatabase, SqlValue};
pub(crate) use duckdb_site::quote_ident;

use crate::constants::site::{
    ACCESS_CONTROL_FILE, CACHE_DIR_NAME, CONTENT_DIR_NAME, PLUGINS_DIR_NAME, ROOT_CONFIG_FILE,
    THEMES_DIR_NAME, UPLOADS_DIR_NAME,
};
use std::path::{Path, PathBuf};

/// 站点目录布局
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteLayout {
    root: PathBuf,
    content_dir: PathBuf,
}

impl SiteLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let content_dir = root.join(CONTENT_DIR_NAME);
        Self { root, content_dir }
    }

    /// 内容目录不在默认位置时使用
    pub fn with_content_dir(mut self, content_dir: impl Into<PathBuf>) -> Self {
        self.content_dir = content_dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn content_dir(&self) -> PathBuf {
        self.content_dir.clone()
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.content_dir.join(UPLOADS_DIR_NAME)
    }

    pub fn plugins_dir(&self) -> PathBuf {
        self.content_dir.join(PLUGINS_DIR_NAME)
    }

    pub fn themes_dir(&self) -> PathBuf {
        self.content_dir.join(THEMES_DIR_NAME)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.content_dir.join(CACHE_DIR_NAME)
    }

    pub fn root_config_file(&self) -> PathBuf {
        self.root.join(ROOT_CONFIG_FILE)
    }

    pub fn access_control_file(&self) -> PathBuf {
        self.root.join(ACCESS_CONTROL_FILE)
    }
}
