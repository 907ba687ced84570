//! 运行控制器
//!
//! 前端（Telegram 命令或控制台）看到的唯一入口。
//! 持有三个能力接口和共享的 RunState，实际运行在独立任务里执行；
//! 控制器与运行任务之间只通过取消标志和只读状态沟通

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AutomationError, Result};
use crate::models::{RunState, UserCredentials};
use crate::orchestrator::LessonOrchestrator;
use crate::ports::{CredentialSource, Notifier, PageAutomation};

/// 状态轮询的步长
const WAIT_STEP: Duration = Duration::from_millis(200);

/// 运行控制器
pub struct RunController {
    config: Config,
    page: Arc<dyn PageAutomation>,
    notifier: Arc<dyn Notifier>,
    input: Arc<dyn CredentialSource>,
    state: Arc<RunState>,
}

impl RunController {
    pub fn new(
        config: Config,
        page: Arc<dyn PageAutomation>,
        notifier: Arc<dyn Notifier>,
        input: Arc<dyn CredentialSource>,
    ) -> Self {
        Self {
            config,
            page,
            notifier,
            input,
            state: Arc::new(RunState::new()),
        }
    }

    /// 启动一次自动化
    ///
    /// 已有运行在进行时拒绝而不是排队；抢到门闸后把编排器丢进独立任务
    pub fn start(&self, credentials: Option<UserCredentials>) -> Result<()> {
        if !self.state.try_begin() {
            warn!("已有自动化在运行，拒绝新的启动请求");
            return Err(AutomationError::AlreadyRunning);
        }

        let orchestrator = LessonOrchestrator::new(
            &self.config,
            Arc::clone(&self.page),
            Arc::clone(&self.notifier),
            Arc::clone(&self.input),
            Arc::clone(&self.state),
        );

        tokio::spawn(async move {
            match orchestrator.run(credentials).await {
                Ok(()) => info!("自动化任务正常结束"),
                Err(e) if e.is_cancelled() => info!("自动化任务已按请求停止"),
                Err(e) => error!("自动化任务以错误结束: {}", e),
            }
        });

        Ok(())
    }

    /// 请求停止当前运行，立即返回
    ///
    /// 运行会在下一个检查点协作式退出；没有运行时是空操作
    pub fn request_stop(&self) -> bool {
        self.state.request_cancel()
    }

    /// 请求停止并等待运行退出
    ///
    /// 最多等配置的上限时间，超时后不再等，直接强制释放浏览器会话。
    /// 返回 false 表示本来就没有运行
    pub async fn stop_and_wait(&self) -> bool {
        if !self.state.request_cancel() {
            return false;
        }

        let deadline = Instant::now() + self.config.timing.stop_wait();
        while self.state.is_running() && Instant::now() < deadline {
            sleep(WAIT_STEP).await;
        }

        if self.state.is_running() {
            warn!("等待运行退出超时，强制清理浏览器会话");
            if let Err(e) = self.page.close().await {
                error!("强制清理浏览器会话失败: {}", e);
            }
        }

        true
    }

    /// 等待当前运行自然结束（不触发停止）
    pub async fn wait_until_idle(&self) {
        while self.state.is_running() {
            sleep(WAIT_STEP).await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    /// 给操作者看的状态文本
    pub fn status(&self) -> String {
        self.state.status_text()
    }

    /// 当前页面截图，没有运行时返回 None
    pub async fn screenshot(&self) -> Option<Vec<u8>> {
        if !self.state.is_running() {
            return None;
        }

        match self.page.screenshot().await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                error!("获取截图失败: {}", e);
                None
            }
        }
    }
}
