//! 完成轮询
//!
//! 盯着当前视频课的进度条，直到 100% 或者判定播放器卡死。
//! 进度条不暴露数值，每个轮询周期重新读一次元素的 style 再解析

use std::time::Instant;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::config::TimingSettings;
use crate::error::{AutomationError, Result};
use crate::models::RunState;
use crate::ports::{Notifier, PageAutomation};
use crate::services::extract_width_percentage;

/// 每推进这么多个百分点向操作者推一次进度，约等于每个四分位一条消息
const NOTIFY_STEP: f64 = 25.0;

/// 进度变化不超过该值视为没有前进
const PROGRESS_EPSILON: f64 = 0.01;

/// 等待单节视频课播放到 100%
///
/// 第一次就读不到进度时放弃监控但不报错（这节课没法盯，不值得中断整个运行）。
/// 进度停滞超过阈值按超时处理：通知、截图、返回停滞错误。
/// 每个轮询周期都检查取消标志
pub async fn wait_for_lesson_complete(
    page: &dyn PageAutomation,
    notifier: &dyn Notifier,
    state: &RunState,
    timing: &TimingSettings,
    selector: &str,
    label: &str,
) -> Result<()> {
    info!("开始监控课程进度...");

    let Some(style) = page.attribute(selector, 0, "style").await? else {
        warn!("读不到进度条的 style 属性，跳过本节课的监控");
        return Ok(());
    };
    let Some(first) = extract_width_percentage(&style) else {
        warn!("无法从 style 中解析进度百分比，跳过本节课的监控");
        return Ok(());
    };

    info!("课程进度: {}%", first);

    let mut percentage = first;
    let mut last_percentage = first;
    let mut last_progress_at = Instant::now();
    let mut last_notified: f64 = 0.0;

    while percentage < 100.0 {
        sleep(timing.poll_interval()).await;

        if state.cancel_requested() {
            return Err(AutomationError::Cancelled);
        }

        let style = page
            .attribute(selector, 0, "style")
            .await?
            .unwrap_or_default();

        // 偶发读不到时沿用上次的值，停滞计时照常走：
        // 进度条彻底坏掉最终会以停滞超时的形式暴露出来
        if let Some(current) = extract_width_percentage(&style) {
            percentage = current;
            info!("课程进度: {}%", percentage);
        }

        if (percentage - last_percentage).abs() > PROGRESS_EPSILON {
            last_percentage = percentage;
            last_progress_at = Instant::now();
        } else if last_progress_at.elapsed() >= timing.stall_timeout() {
            let minutes = timing.stall_timeout_minutes();
            let message = format!(
                "⏱️ 超时: 视频进度在 {}% 停滞超过 {} 分钟",
                percentage, minutes
            );
            error!("{}", message);
            notifier.send_text(&message).await;
            send_stall_screenshot(page, notifier, percentage).await;
            return Err(AutomationError::ProgressStalled {
                percentage,
                minutes,
            });
        }

        if percentage - last_notified >= NOTIFY_STEP {
            notifier.send_progress(label, percentage).await;
            last_notified = percentage;
        }
    }

    info!("✅ 课程进度达到 100%");
    Ok(())
}

/// 停滞时的现场截图，失败只记日志
async fn send_stall_screenshot(
    page: &dyn PageAutomation,
    notifier: &dyn Notifier,
    percentage: f64,
) {
    match page.screenshot().await {
        Ok(bytes) => {
            notifier
                .send_image(&bytes, &format!("视频卡在 {}%", percentage))
                .await;
        }
        Err(e) => error!("无法获取停滞截图: {}", e),
    }
}
