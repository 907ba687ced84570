use anyhow::Result;
use tracing::{error, info};

use auto_lesson_bot::config::Config;
use auto_lesson_bot::{console, telegram, utils};

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    utils::logging::init();

    let console_mode = std::env::args().any(|arg| arg == "--console");
    utils::logging::log_startup(if console_mode { "控制台" } else { "Telegram" });

    // 加载配置
    let config = Config::load("config.toml")?;

    if let Err(e) = config.validate(console_mode) {
        error!("{}", e);
        print_config_help();
        return Err(e.into());
    }

    let saved = &config.university;
    if saved.save_credentials && !saved.username.is_empty() {
        info!("已保存账号: {}", saved.username);
    }

    if console_mode {
        console::run(config).await
    } else {
        telegram::bot::run(config).await
    }
}

/// 配置不完整时的排错指引
fn print_config_help() {
    info!("");
    info!("打开 config.toml 并配置:");
    info!("\t1. bot_token: 在 Telegram 中找 @BotFather 创建机器人获取");
    info!("\t2. chat_id: 在 Telegram 中找 @userinfobot 获取自己的 ID");
    info!("");
    info!("示例 config.toml:");
    info!("\t[telegram]");
    info!("\tbot_token = \"1234567890:ABCdefGHI...\"");
    info!("\tchat_id = 123456789");
    info!("");
    info!("只想本地跑不用机器人的话，加 --console 参数启动");
}
