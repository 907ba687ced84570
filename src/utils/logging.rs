//! 日志工具模块

use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化全局日志
///
/// 默认 info 级别，RUST_LOG 环境变量可以覆盖
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 记录程序启动信息
pub fn log_startup(mode: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 大学刷课机器人 - {} 模式", mode);
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}
