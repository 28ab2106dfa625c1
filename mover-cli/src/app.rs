use mover_core::{
    AppConfig, AppContext, Compression, ExportOptions, ImportOptions, MigrationOrchestrator,
    MoverError, error::Result,
};
use std::path::Path;
use std::sync::Arc;

use crate::cli::{Commands, SettingsCommand};
use crate::commands;

pub struct CliApp {
    pub config: AppConfig,
    pub orchestrator: MigrationOrchestrator,
}

impl CliApp {
    /// 加载配置文件并打开记录库
    pub async fn new_with_config(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Err(MoverError::validation(format!(
                "配置文件 '{}' 未找到，请先运行 'site-mover init'",
                config_path.display()
            )));
        }
        let config = AppConfig::load_from_file(config_path)?;
        Self::from_config(config).await
    }

    /// 在当前目录查找配置文件，找不到时创建默认配置
    pub async fn new_with_auto_config() -> Result<Self> {
        let config = AppConfig::find_and_load_config()?;
        Self::from_config(config).await
    }

    async fn from_config(config: AppConfig) -> Result<Self> {
        let context = AppContext::open(&config).await?;
        Ok(Self {
            config,
            orchestrator: MigrationOrchestrator::new(Arc::new(context)),
        })
    }

    /// 运行应用命令
    pub async fn run(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Init { .. } => unreachable!(), // 已经在 main.rs 中处理
            Commands::Export {
                name,
                protocol,
                no_database,
                no_media,
                no_plugins,
                no_themes,
                store,
                no_progress,
            } => {
                let options = ExportOptions {
                    name: name.unwrap_or_default(),
                    protocol,
                    include_database: !no_database,
                    include_media: !no_media,
                    include_plugins: !no_plugins,
                    include_themes: !no_themes,
                    include_uploads: !no_media,
                    compression: if store {
                        Compression::Store
                    } else {
                        Compression::Zip
                    },
                };
                commands::run_export(self, options, !no_progress).await
            }
            Commands::Import {
                from,
                path,
                protocol,
                skip_database,
                skip_files,
                no_progress,
            } => {
                let options = ImportOptions {
                    source_operation_id: from,
                    source_path: path,
                    protocol,
                    overwrite_database: !skip_database,
                    overwrite_files: !skip_files,
                };
                commands::run_import(self, options, !no_progress).await
            }
            Commands::List {
                kind,
                status,
                limit,
            } => commands::run_list(self, kind, status, limit).await,
            Commands::Delete { id } => commands::run_delete(self, id).await,
            Commands::Progress { id, watch } => commands::run_progress(self, id, watch).await,
            Commands::TestConnection { protocol } => {
                commands::run_test_connection(self, &protocol).await
            }
            Commands::ArchiveInfo { path } => commands::run_archive_info(&path).await,
            Commands::Verify { path } => commands::run_verify(&path).await,
            Commands::Cleanup => commands::run_cleanup(self).await,
            Commands::Settings(cmd) => self.run_settings_command(cmd).await,
        }
    }

    /// 运行设置相关命令
    async fn run_settings_command(&self, cmd: SettingsCommand) -> Result<()> {
        let manager = self.orchestrator.context().config_manager();
        match cmd {
            SettingsCommand::Show => commands::show_settings(self).await,
            SettingsCommand::SetStorage { protocol, file } => {
                commands::set_storage_from_file(self, &protocol, &file).await
            }
            SettingsCommand::MaxExecutionTime { seconds } => {
                manager.set_max_execution_time(seconds).await
            }
            SettingsCommand::MemoryLimit { limit } => manager.set_memory_limit(&limit).await,
            SettingsCommand::Retention { days } => manager.set_backup_retention(days).await,
            SettingsCommand::Logging { enabled } => manager.set_enable_logging(enabled).await,
        }
    }
}
