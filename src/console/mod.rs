//! 控制台前端
//!
//! 不经过 Telegram 的本地运行方式：输入从标准输入来，
//! 通知直接打进日志，Ctrl-C 触发和 /stop 相同的协作式停止

use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AutomationError, Result};
use crate::infrastructure::PageDriver;
use crate::models::UserCredentials;
use crate::orchestrator::RunController;
use crate::ports::{CredentialSource, Notifier, PageAutomation};

/// 标准输入的交互式输入源
pub struct ConsoleInput;

#[async_trait]
impl CredentialSource for ConsoleInput {
    async fn get_value(&self, prompt: &str) -> Result<String> {
        let prompt = prompt.to_string();

        // 读 stdin 是阻塞操作，放到阻塞线程里做
        tokio::task::spawn_blocking(move || -> Result<String> {
            println!("[请输入] {}", prompt);
            print!("> ");
            std::io::stdout().flush()?;

            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok(line.trim().to_string())
        })
        .await
        .map_err(|e| AutomationError::Input(e.to_string()))?
    }
}

/// 把通知打进日志的通知器
pub struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn send_text(&self, message: &str) {
        info!("[通知] {}", message);
    }

    async fn send_image(&self, image: &[u8], caption: &str) {
        info!("[通知] 截图 {} 字节 ({})", image.len(), caption);
    }

    async fn send_progress(&self, label: &str, percentage: f64) {
        info!("[通知] {} 进度 {:.1}%", label, percentage);
    }
}

/// 控制台模式：启动一次自动化并等它结束
pub async fn run(config: Config) -> anyhow::Result<()> {
    let page: Arc<dyn PageAutomation> =
        Arc::new(PageDriver::new(config.browser.clone(), &config.timing));
    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let input: Arc<dyn CredentialSource> = Arc::new(ConsoleInput);
    let controller = RunController::new(config.clone(), page, notifier, input);

    // 配置里有可信的账号就直接用，否则运行中会走交互式提问
    let saved = &config.university;
    let credentials = if saved.save_credentials && !saved.username.is_empty() {
        info!("使用保存的账号: {}", saved.username);
        Some(UserCredentials::new(
            &saved.username,
            &saved.password,
            &saved.default_subject,
        ))
    } else {
        None
    };

    controller.start(credentials)?;

    tokio::select! {
        _ = controller.wait_until_idle() => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("收到 Ctrl-C，正在停止自动化...");
            controller.stop_and_wait().await;
        }
    }

    info!("控制台模式结束");
    Ok(())
}
