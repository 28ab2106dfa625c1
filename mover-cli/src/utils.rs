use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// # Site Mover 日志系统
///
/// 库代码只使用 `tracing` 宏，日志输出在 `main.rs` 中通过 `setup_logging()` 配置。
///
/// ## 日志配置选项
/// - `-v, --verbose`：启用详细日志模式（DEBUG 级别）
/// - `RUST_LOG`：标准的日志级别控制，优先于 `-v`
/// - `MOVER_LOG_FILE`：日志文件路径，设置后日志追加到文件而非终端
///
/// ## 使用示例
///
/// ```bash
/// # 日志输出到文件
/// MOVER_LOG_FILE=mover.log site-mover export --protocol sftp
///
/// # 只看流水线的调试日志
/// RUST_LOG=mover_core::pipeline=debug site-mover import --from 3
/// ```
pub fn setup_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_file = std::env::var("MOVER_LOG_FILE").ok().and_then(|path| {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("⚠️  无法打开日志文件 {path}: {e}，改为输出到终端");
                None
            }
        }
    });

    match log_file {
        // 文件输出使用详细格式
        Some(file) => fmt()
            .with_env_filter(env_filter)
            .with_writer(file)
            .with_target(true)
            .with_thread_names(true)
            .with_line_number(true)
            .init(),
        None => fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false)
            .without_time()
            .compact()
            .init(),
    }
}

/// 格式化字节数
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = bytes as f64;
    if size >= GB {
        format!("{:.2} GB", size / GB)
    } else if size >= MB {
        format!("{:.2} MB", size / MB)
    } else if size >= KB {
        format!("{:.2} KB", size / KB)
    } else {
        format!("{bytes} B")
    }
}

/// 百分比进度条
pub fn percent_bar(prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("{prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    bar.set_prefix(prefix.to_string());
    bar.enable_steady_tick(Duration::from_millis(200));
    bar
}

/// 截断过长的文本用于表格输出
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{kept}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("backup", 10), "backup");
        assert_eq!(truncate("备份名称很长很长", 5), "备份名称…");
    }
}
