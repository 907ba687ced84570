//! 课程编排器
//!
//! 一次运行的完整状态机：
//!
//! ```text
//! 连接浏览器 → 登录 → 关闭引导遮罩 → 确定科目 → 打开课程
//!     → 重置课程列表 → 展开所有课程 → 逐节播放视频课 → 完成
//! ```
//!
//! 取消和失败可以在任意一步发生，统一在 `run` 的边界收口：
//! 通知操作者、补一张现场截图、清理浏览器会话（无论哪条路径都只清理一次）。
//! 所有状态都是实例字段，一次运行一个实例，用完即弃

use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::{Config, Selectors, TimingSettings};
use crate::error::{AutomationError, Result};
use crate::models::{RunState, UserCredentials};
use crate::orchestrator::completion_poll;
use crate::ports::{CredentialSource, Notifier, PageAutomation, WaitMode};

/// 课程编排器
///
/// 只依赖三个能力接口，不认识 Telegram、控制台或 chromiumoxide
pub struct LessonOrchestrator {
    page: Arc<dyn PageAutomation>,
    notifier: Arc<dyn Notifier>,
    input: Arc<dyn CredentialSource>,
    state: Arc<RunState>,
    selectors: Selectors,
    timing: TimingSettings,
    url: String,
    abort_on_lesson_error: bool,
}

impl LessonOrchestrator {
    pub fn new(
        config: &Config,
        page: Arc<dyn PageAutomation>,
        notifier: Arc<dyn Notifier>,
        input: Arc<dyn CredentialSource>,
        state: Arc<RunState>,
    ) -> Self {
        Self {
            page,
            notifier,
            input,
            state,
            selectors: config.selectors.clone(),
            timing: config.timing.clone(),
            url: config.university.url.clone(),
            abort_on_lesson_error: config.abort_on_lesson_error,
        }
    }

    /// 运行一次完整的自动化
    ///
    /// 调用方必须先通过 RunState 的准入门闸；本方法结束时负责清 running 标志
    pub async fn run(&self, credentials: Option<UserCredentials>) -> Result<()> {
        let result = self.execute(credentials).await;

        match &result {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {
                warn!("自动化被用户中止");
                self.notifier.send_text("⏹️ 自动化已被手动停止").await;
                self.capture_and_send_screenshot("自动化已停止").await;
            }
            Err(e) => {
                error!("自动化运行出错: {}", e);
                self.notifier.send_text(&format!("❌ 错误: {}", e)).await;
                self.capture_and_send_screenshot(&format!("错误: {}", e)).await;
            }
        }

        // 无论成功、失败还是取消，浏览器会话都在这里清理，只清理一次
        if let Err(e) = self.page.close().await {
            error!("清理浏览器会话失败: {}", e);
        }
        self.state.finish();

        result
    }

    async fn execute(&self, credentials: Option<UserCredentials>) -> Result<()> {
        self.notifier.send_text("🚀 开始大学课程自动化...").await;

        self.connect().await?;

        let mut credentials = match credentials {
            Some(c) => c,
            None => {
                warn!("没有提供凭据，向输入源请求...");
                self.input.get_credentials().await?
            }
        };

        self.login(&credentials).await?;
        self.dismiss_walkme().await;

        // 科目是唯一允许在运行中途补问的输入
        if credentials.subject.is_empty() {
            credentials.subject = self.input.get_value("请输入要学习的科目:").await?;
        }
        self.state.set_subject(&credentials.subject);
        self.notifier
            .send_text(&format!("已选择科目: {}", credentials.subject))
            .await;

        self.open_course(&credentials.subject).await?;
        self.reset_lesson_list().await?;
        self.open_all_lessons().await?;
        self.play_video_lessons().await?;

        self.notifier.send_text("✅ 自动化全部完成!").await;
        Ok(())
    }

    /// 获取浏览器会话并打开学习平台首页，失败直接终止运行
    async fn connect(&self) -> Result<()> {
        self.page.connect().await?;
        self.page.navigate(&self.url, WaitMode::NetworkIdle).await?;
        info!("✅ 已打开学习平台: {}", self.url);
        Ok(())
    }

    async fn login(&self, credentials: &UserCredentials) -> Result<()> {
        self.try_login(credentials).await.map_err(|e| {
            error!("登录失败: {}", e);
            AutomationError::LoginFailed(e.to_string())
        })?;

        self.notifier.send_text("登录成功").await;
        Ok(())
    }

    async fn try_login(&self, credentials: &UserCredentials) -> Result<()> {
        info!("填写账号...");
        self.page
            .fill(&self.selectors.username_input, &credentials.username)
            .await?;

        info!("填写密码...");
        self.page
            .fill(&self.selectors.password_input, &credentials.password)
            .await?;

        info!("点击登录按钮...");
        self.page.click(&self.selectors.login_button, 0).await?;
        self.page.wait_ready(WaitMode::DomReady).await?;

        // 登录后的界面渲染没有任何完成信号，只能等
        sleep(self.timing.settle()).await;
        Ok(())
    }

    /// 关闭 walkme 新手引导遮罩
    ///
    /// 遮罩大多数时候不挡后续点击，关不掉也继续跑
    async fn dismiss_walkme(&self) {
        info!("检查是否有 walkme 引导遮罩...");

        let exists = match self.page.count(&self.selectors.walkme_probe).await {
            Ok(n) => n > 0,
            Err(e) => {
                warn!("探测 walkme 遮罩失败: {}", e);
                false
            }
        };

        if !exists {
            info!("没有发现 walkme 遮罩");
            return;
        }

        match self.close_walkme().await {
            Ok(()) => info!("✅ walkme 遮罩已关闭"),
            Err(e) => warn!("关闭 walkme 遮罩失败: {}", e),
        }
    }

    async fn close_walkme(&self) -> Result<()> {
        self.page.click(&self.selectors.walkme_close, 0).await?;
        self.page.wait_ready(WaitMode::DomReady).await?;
        Ok(())
    }

    /// 在课程列表中找到目标课程并打开
    ///
    /// 先在 "Da Completare"（待完成）里找，找不到再切到
    /// "Da Iniziare"（待开始）找一次；两边都没有按未找到课程终止。
    /// 匹配规则是卡片文本对科目名的包含匹配，文档顺序第一个命中即用
    async fn open_course(&self, subject: &str) -> Result<()> {
        // 该按钮偶尔不渲染，点不到就直接在当前列表里搜
        if let Err(e) = self.apply_filter(&self.selectors.filter_to_complete).await {
            warn!("点击 'Da Completare' 筛选失败: {}", e);
        } else {
            info!("已应用 'Da Completare' 筛选");
        }

        info!("在 'Da Completare' 中查找课程 '{}'...", subject);
        let course_selector = self.selectors.course_link_for(subject);

        if self.page.count(&course_selector).await? > 0 {
            info!("✅ 在 'Da Completare' 中找到课程 '{}'", subject);
            self.enter_course(&course_selector).await?;
            return Ok(());
        }

        warn!("'Da Completare' 中没有课程 '{}'", subject);
        self.notifier.send_text("在 'Da Iniziare' 中继续查找课程...").await;

        self.apply_filter(&self.selectors.filter_to_start)
            .await
            .map_err(|e| {
                error!("无法切换到 'Da Iniziare' 筛选: {}", e);
                AutomationError::CourseNotFound(subject.to_string())
            })?;
        info!("已应用 'Da Iniziare' 筛选");

        info!("在 'Da Iniziare' 中查找课程 '{}'...", subject);
        if self.page.count(&course_selector).await? == 0 {
            return Err(AutomationError::CourseNotFound(subject.to_string()));
        }

        self.enter_course(&course_selector).await?;
        info!("✅ 在 'Da Iniziare' 中找到并打开课程 '{}'", subject);
        self.notifier.send_text("课程在 'Da Iniziare' 中找到").await;
        Ok(())
    }

    async fn apply_filter(&self, selector: &str) -> Result<()> {
        self.page.click(selector, 0).await?;
        self.page.wait_ready(WaitMode::DomReady).await?;
        sleep(self.timing.filter_settle()).await;
        Ok(())
    }

    async fn enter_course(&self, course_selector: &str) -> Result<()> {
        self.page.click(course_selector, 0).await?;
        self.page.wait_ready(WaitMode::NetworkIdle).await?;
        sleep(self.timing.settle()).await;
        Ok(())
    }

    /// 把课程列表收起来再展开，强制它完整渲染
    ///
    /// 列表第一次加载偶尔渲染不全，这一开一合是站点行为的已知绕法
    async fn reset_lesson_list(&self) -> Result<()> {
        info!("重置课程列表状态");

        self.toggle_lessons_group().await?;
        info!("课程组已折叠");

        self.toggle_lessons_group().await?;
        info!("✅ 课程组已重新展开");
        Ok(())
    }

    async fn toggle_lessons_group(&self) -> Result<()> {
        self.page.click(&self.selectors.lessons_toggle, 0).await?;
        self.page.wait_ready(WaitMode::NetworkIdle).await?;
        sleep(self.timing.settle()).await;
        Ok(())
    }

    /// 把每个课程条目都点开一遍
    ///
    /// 单个条目点不开只记警告继续，一行坏数据不应中断整个流程
    async fn open_all_lessons(&self) -> Result<()> {
        info!("展开所有课程...");
        let selector = &self.selectors.lesson_rows;

        let total = self.page.count(selector).await?;
        info!("共找到 {} 个课程条目", total);

        for index in 0..total {
            self.check_cancelled()?;

            info!("展开课程 {}/{}", index + 1, total);
            match self.open_lesson_row(selector, index).await {
                Ok(()) => info!("✅ 课程 {} 展开成功", index + 1),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => warn!("展开课程 {} 失败: {}", index + 1, e),
            }
        }

        info!("✅ 所有课程展开完毕");
        Ok(())
    }

    async fn open_lesson_row(&self, selector: &str, index: usize) -> Result<()> {
        self.page.click(selector, index).await?;
        self.page.wait_ready(WaitMode::NetworkIdle).await?;
        sleep(self.timing.lesson_settle()).await;
        Ok(())
    }

    /// 按文档顺序逐节处理视频课
    async fn play_video_lessons(&self) -> Result<()> {
        info!("开始处理视频课...");
        self.notifier.send_text("开始播放视频课...").await;

        let selector = &self.selectors.video_rows;
        let total = self.page.count(selector).await?;
        info!("共找到 {} 节视频课", total);
        self.notifier
            .send_text(&format!("共找到 {} 节视频课", total))
            .await;

        for index in 0..total {
            self.check_cancelled()?;

            match self.play_one_lesson(selector, index, total).await {
                Ok(true) => {
                    let label = format!("视频课 {}/{}", index + 1, total);
                    info!("✅ {} 看完", label);
                    self.notifier.send_text(&format!("✅ 完成 {}", label)).await;
                }
                Ok(false) => {
                    info!("视频课 {} 已经是 100%，跳过", index + 1);
                }
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!("视频课 {} 出错: {}", index + 1, e);
                    self.notifier
                        .send_text(&format!("⚠️ 视频课 {} 出错: {}", index + 1, e))
                        .await;

                    // 播放失败大概率是站点层面的问题，接着跑也会一路失败
                    if self.abort_on_lesson_error {
                        return Err(e);
                    }
                }
            }
        }

        info!("✅ 所有视频课处理完毕");
        self.notifier.send_text("🎉 所有视频课已看完!").await;
        Ok(())
    }

    /// 播放一节课，返回 true 表示真的播了，false 表示已完成直接跳过
    async fn play_one_lesson(
        &self,
        selector: &str,
        index: usize,
        total: usize,
    ) -> Result<bool> {
        let text = self.page.inner_text(selector, index).await?;
        if is_completed_label(&text) {
            return Ok(false);
        }

        let label = format!("视频课 {}/{}", index + 1, total);
        self.state.set_current_lesson(&label);
        info!("▶️ 开始 {}", label);
        self.notifier.send_text(&format!("▶️ 开始 {}", label)).await;

        self.page.click(selector, index).await?;
        self.page.wait_ready(WaitMode::NetworkIdle).await?;
        sleep(self.timing.lesson_settle()).await;

        completion_poll::wait_for_lesson_complete(
            self.page.as_ref(),
            self.notifier.as_ref(),
            &self.state,
            &self.timing,
            &self.selectors.progress_bar,
            &label,
        )
        .await?;

        Ok(true)
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.state.cancel_requested() {
            return Err(AutomationError::Cancelled);
        }
        Ok(())
    }

    /// 终止前的现场截图，任何失败只记日志，不能盖过主错误
    async fn capture_and_send_screenshot(&self, caption: &str) {
        match self.page.screenshot().await {
            Ok(bytes) => {
                info!("发送现场截图...");
                self.notifier.send_image(&bytes, caption).await;
            }
            Err(e) => error!("无法获取截图: {}", e),
        }
    }
}

/// 课程行文本带 "100" 说明已经看完（站点把完成度嵌在行文本里）
fn is_completed_label(text: &str) -> bool {
    let squashed: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    squashed.to_lowercase().contains("100")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_label_variants() {
        assert!(is_completed_label("100%"));
        assert!(is_completed_label("100 %"));
        assert!(is_completed_label("Completata 100"));
        assert!(is_completed_label("Lezione 1 100%"));
    }

    #[test]
    fn test_unfinished_label_is_played() {
        assert!(!is_completed_label("Lezione 2 0%"));
        assert!(!is_completed_label("37.5%"));
        assert!(!is_completed_label(""));
    }
}
