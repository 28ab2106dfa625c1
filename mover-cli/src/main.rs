use clap::Parser;
use mover_cli::{Cli, CliApp, Commands, run_init, setup_logging};
use mover_core::constants::config::get_config_file_path;
use tracing::error;

#[tokio::main]
async fn main() {
    // 解析命令行参数
    let cli = Cli::parse();

    // 设置日志记录
    setup_logging(cli.verbose);

    // `init` 命令是特例，它不需要预先加载配置
    if let Commands::Init { force } = cli.command {
        let config_path = cli.config.unwrap_or_else(get_config_file_path);
        if let Err(e) = run_init(&config_path, force).await {
            error!("❌ 初始化失败: {}", e);
            std::process::exit(1);
        }
        return;
    }

    let loaded = match &cli.config {
        Some(path) => CliApp::new_with_config(path).await,
        None => CliApp::new_with_auto_config().await,
    };
    let mut app = match loaded {
        Ok(app) => app,
        Err(e) => {
            error!("❌ 应用初始化失败 [{}]: {}", e.class(), e);
            std::process::exit(1);
        }
    };

    // 运行命令
    if let Err(e) = app.run(cli.command).await {
        error!("❌ 操作失败 [{}]: {}", e.class(), e);
        std::process::exit(1);
    }
}
