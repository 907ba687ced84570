//! Telegram 机器人命令循环
//!
//! 只有配置里的那一个 Chat ID 被授权，其余会话一律拒绝。
//! 识别的命令: /start /run /status /screenshot /stop，
//! 其它输入回一份帮助

use std::sync::Arc;
use teloxide::dptree;
use teloxide::payloads::{SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode};
use tracing::{info, warn};

use crate::config::Config;
use crate::infrastructure::PageDriver;
use crate::models::UserCredentials;
use crate::orchestrator::RunController;
use crate::ports::{CredentialSource, Notifier, PageAutomation};
use crate::telegram::{TelegramInput, TelegramNotifier};

/// 识别出的操作者命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Run(Vec<String>),
    Status,
    Screenshot,
    Stop,
    Unknown,
}

/// 解析一条消息文本
pub fn parse_command(text: &str) -> Command {
    let mut parts = text.split_whitespace();
    let Some(head) = parts.next() else {
        return Command::Unknown;
    };

    match head.to_lowercase().as_str() {
        "/start" => Command::Start,
        "/run" => Command::Run(parts.map(|s| s.to_string()).collect()),
        "/status" => Command::Status,
        "/screenshot" => Command::Screenshot,
        "/stop" => Command::Stop,
        _ => Command::Unknown,
    }
}

/// 根据 /run 的参数和保存的配置确定本次运行的凭据
///
/// 支持三种形式:
/// - `/run` 全部使用保存值
/// - `/run <科目>` 账号密码用保存值，换科目
/// - `/run <账号> <密码> <科目...>` 本次运行用临时凭据
///
/// 没有保存凭据时只接受第三种形式
pub fn resolve_run_credentials(
    args: &[String],
    config: &Config,
) -> Result<UserCredentials, String> {
    let saved = &config.university;
    let has_saved = saved.save_credentials && !saved.username.is_empty();

    if has_saved {
        match args.len() {
            0 => {
                if saved.default_subject.is_empty() {
                    Err("❌ 没有配置默认科目，用 `/run <科目>` 指定".to_string())
                } else {
                    Ok(UserCredentials::new(
                        &saved.username,
                        &saved.password,
                        &saved.default_subject,
                    ))
                }
            }
            1 => Ok(UserCredentials::new(
                &saved.username,
                &saved.password,
                &args[0],
            )),
            n if n >= 3 => Ok(UserCredentials::new(
                &args[0],
                &args[1],
                args[2..].join(" "),
            )),
            _ => Err(concat!(
                "❌ /run 格式不对。支持的形式:\n",
                "`/run`\n`/run <科目>`\n`/run <账号> <密码> <科目>`"
            )
            .to_string()),
        }
    } else if args.len() >= 3 {
        Ok(UserCredentials::new(
            &args[0],
            &args[1],
            args[2..].join(" "),
        ))
    } else {
        Err(concat!(
            "❌ 没有保存的凭据，必须提供全部参数:\n",
            "`/run <账号> <密码> <科目>`"
        )
        .to_string())
    }
}

/// 启动机器人并阻塞在命令循环上，Ctrl-C 退出
pub async fn run(config: Config) -> anyhow::Result<()> {
    info!("启动 Telegram 机器人...");

    let bot = Bot::new(config.telegram.bot_token.clone());
    let allowed = ChatId(config.telegram.chat_id);

    let me = bot.get_me().await?;
    info!("✅ 机器人 @{} 连接成功", me.username());
    info!("授权 Chat ID: {}", allowed);

    let page: Arc<dyn PageAutomation> =
        Arc::new(PageDriver::new(config.browser.clone(), &config.timing));
    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(bot.clone(), allowed));
    let input: Arc<dyn CredentialSource> = Arc::new(TelegramInput::new());
    let controller = Arc::new(RunController::new(
        config.clone(),
        page,
        notifier,
        input,
    ));

    // 欢迎消息是尽力而为：对方可能还没有跟机器人开始会话
    if let Err(e) = bot
        .send_message(allowed, welcome_text(&config))
        .parse_mode(ParseMode::Markdown)
        .await
    {
        warn!("欢迎消息未发出（会话可能还没开始）: {}", e);
        info!("在 Telegram 中找到机器人并发送 /start 即可开始");
    }

    info!("✅ 机器人就绪，等待命令");

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![
            Arc::clone(&controller),
            Arc::new(config.clone())
        ])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    // 命令循环退出后，把可能还在跑的自动化停掉再走
    controller.stop_and_wait().await;
    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    controller: Arc<RunController>,
    config: Arc<Config>,
) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let allowed = ChatId(config.telegram.chat_id);
    if msg.chat.id != allowed {
        warn!("拒绝来自未授权会话 {} 的消息", msg.chat.id);
        bot.send_message(msg.chat.id, "你没有权限使用这个机器人")
            .await?;
        return Ok(());
    }

    info!("收到命令: {}", text);

    match parse_command(text) {
        Command::Start => {
            bot.send_message(allowed, welcome_text(&config))
                .parse_mode(ParseMode::Markdown)
                .await?;
        }
        Command::Run(args) => {
            handle_run(&bot, allowed, &controller, &config, &args).await?;
        }
        Command::Status => {
            bot.send_message(allowed, controller.status()).await?;
        }
        Command::Screenshot => {
            handle_screenshot(&bot, allowed, &controller).await?;
        }
        Command::Stop => {
            handle_stop(&bot, allowed, &controller).await?;
        }
        Command::Unknown => {
            bot.send_message(allowed, help_text())
                .parse_mode(ParseMode::Markdown)
                .await?;
        }
    }

    Ok(())
}

async fn handle_run(
    bot: &Bot,
    chat: ChatId,
    controller: &RunController,
    config: &Config,
    args: &[String],
) -> ResponseResult<()> {
    let credentials = match resolve_run_credentials(args, config) {
        Ok(c) => c,
        Err(message) => {
            bot.send_message(chat, message)
                .parse_mode(ParseMode::Markdown)
                .await?;
            return Ok(());
        }
    };

    match controller.start(Some(credentials.clone())) {
        Ok(()) => {
            let text = format!(
                "🚀 自动化已启动\n\n👤 账号: {}\n📚 科目: {}",
                credentials.username, credentials.subject
            );
            bot.send_message(chat, text).await?;
        }
        Err(_) => {
            bot.send_message(chat, "⚠️ 已有自动化在运行，先用 /stop 停掉它")
                .await?;
        }
    }

    Ok(())
}

async fn handle_screenshot(
    bot: &Bot,
    chat: ChatId,
    controller: &RunController,
) -> ResponseResult<()> {
    match controller.screenshot().await {
        Some(bytes) => {
            let caption = format!("屏幕截图 - {}", chrono::Local::now().format("%H:%M:%S"));
            let file = InputFile::memory(bytes).file_name("screenshot.png");
            bot.send_photo(chat, file).caption(caption).await?;
        }
        None => {
            bot.send_message(chat, "当前没有正在运行的自动化").await?;
        }
    }

    Ok(())
}

async fn handle_stop(
    bot: &Bot,
    chat: ChatId,
    controller: &RunController,
) -> ResponseResult<()> {
    if !controller.is_running() {
        bot.send_message(chat, "没有需要停止的自动化").await?;
        return Ok(());
    }

    bot.send_message(chat, "⏹️ 正在停止自动化...").await?;
    controller.stop_and_wait().await;
    bot.send_message(chat, "✅ 自动化已停止，可以用 /run 重新启动")
        .await?;

    Ok(())
}

/// 欢迎消息，附带当前配置下可用的 /run 形式
fn welcome_text(config: &Config) -> String {
    let mut text = String::from(
        "🤖 *大学刷课机器人已上线!*\n\
         可用命令:\n\n\
         /start - 显示本帮助\n\
         /run - 启动自动化\n\
         /status - 查看当前状态\n\
         /screenshot - 截取当前页面\n\
         /stop - 停止正在进行的自动化\n\n",
    );

    let saved = &config.university;
    if saved.save_credentials && !saved.username.is_empty() {
        text.push_str(&format!(
            "💾 *已保存凭据*\n账号: `{}`\n默认科目: *{}*\n\n\
             启动方式:\n\
             `/run` - 使用保存的账号和默认科目\n\
             `/run <科目>` - 保存的账号，换个科目\n\
             `/run <账号> <密码> <科目>` - 本次使用临时凭据",
            saved.username, saved.default_subject
        ));
    } else {
        text.push_str(
            "⚠️ *没有保存的凭据*\n启动时必须给全参数:\n`/run <账号> <密码> <科目>`",
        );
    }

    text
}

fn help_text() -> &'static str {
    "❓ *无法识别的命令*\n\n\
     可用命令:\n\
     /start - 帮助\n\
     /run - 启动自动化\n\
     /status - 当前状态\n\
     /screenshot - 页面截图\n\
     /stop - 停止自动化"
}
