//! 单元测试共用的站点夹具

use crate::database::Database;
use crate::pipeline::AppContext;
use crate::progress::ProgressTracker;
use crate::site::{DuckDbSite, SiteDatabase, SiteLayout};
use crate::storage::ProtocolRegistry;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

pub(crate) struct Fixture {
    pub _temp: TempDir,
    pub ctx: Arc<AppContext>,
    pub site_root: PathBuf,
    pub work_dir: PathBuf,
    pub backup_dir: PathBuf,
}

/// 站点：三张表、根目录配置文件、媒体/插件/主题/缓存目录
pub(crate) async fn fixture() -> Fixture {
    fixture_with_registry(ProtocolRegistry::with_defaults()).await
}

pub(crate) async fn fixture_with_registry(registry: ProtocolRegistry) -> Fixture {
    fixture_with(registry, ProgressTracker::in_memory()).await
}

pub(crate) async fn fixture_with(registry: ProtocolRegistry, progress: ProgressTracker) -> Fixture {
    let temp = tempdir().unwrap();
    let site_root = temp.path().join("site");
    let content = site_root.join("wp-content");
    fs::create_dir_all(content.join("uploads/2024/05")).unwrap();
    fs::create_dir_all(content.join("uploads/cache")).unwrap();
    fs::create_dir_all(content.join("plugins/seo")).unwrap();
    fs::create_dir_all(content.join("themes/classic")).unwrap();
    fs::create_dir_all(content.join("cache")).unwrap();
    fs::write(site_root.join("wp-config.php"), "<?php define('DB', 'site');").unwrap();
    fs::write(site_root.join(".htaccess"), "RewriteEngine On").unwrap();
    fs::write(content.join("uploads/2024/05/cover.png"), b"\x89PNG").unwrap();
    fs::write(content.join("uploads/cache/tmp.bin"), b"cached").unwrap();
    fs::write(content.join("plugins/seo/seo.php"), "<?php // seo").unwrap();
    fs::write(content.join("themes/classic/style.css"), "body{}").unwrap();
    fs::write(content.join("cache/page.html"), "<html>").unwrap();

    let site_db = DuckDbSite::open_in_memory().unwrap();
    site_db
        .execute(
            "CREATE TABLE posts (id INTEGER, title VARCHAR);
             CREATE TABLE options (name VARCHAR, value VARCHAR);
             CREATE TABLE users (id INTEGER, login VARCHAR);
             INSERT INTO posts VALUES (1, 'Hello'), (2, 'It''s here');
             INSERT INTO options VALUES ('siteurl', 'https://example.com');
             INSERT INTO users VALUES (1, 'admin');",
        )
        .unwrap();

    let work_dir = temp.path().join("work");
    let backup_dir = temp.path().join("backups");
    fs::create_dir_all(&work_dir).unwrap();

    let database = Arc::new(Database::connect_memory().await.unwrap());
    let ctx = AppContext {
        config: database.clone(),
        operations: database,
        progress,
        registry,
        site: SiteLayout::new(&site_root),
        site_db: Arc::new(site_db),
        work_dir: work_dir.clone(),
        default_backup_dir: backup_dir.clone(),
    };

    Fixture {
        _temp: temp,
        ctx: Arc::new(ctx),
        site_root,
        work_dir,
        backup_dir,
    }
}
