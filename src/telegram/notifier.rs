//! Telegram 通知
//!
//! 发送失败只记日志。通知是辅助通道，它的故障不能影响主流程

use async_trait::async_trait;
use teloxide::payloads::{SendMessageSetters, SendPhotoSetters};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode};
use tracing::error;

use crate::ports::Notifier;

/// 进度条分段数，段数少一些 emoji 渲染效果更好
const BAR_SEGMENTS: usize = 5;

/// 通过 Telegram 向操作者推送消息
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, message: &str) {
        if let Err(e) = self
            .bot
            .send_message(self.chat_id, message)
            .parse_mode(ParseMode::Markdown)
            .await
        {
            error!("发送 Telegram 消息失败: {}", e);
        }
    }

    async fn send_image(&self, image: &[u8], caption: &str) {
        let file = InputFile::memory(image.to_vec()).file_name("screenshot.png");
        if let Err(e) = self
            .bot
            .send_photo(self.chat_id, file)
            .caption(caption.to_string())
            .await
        {
            error!("发送 Telegram 图片失败: {}", e);
        }
    }

    async fn send_progress(&self, label: &str, percentage: f64) {
        let message = format!("*{}*\n{}", label, render_progress_bar(percentage));
        self.send_text(&message).await;
    }
}

/// 渲染 5 段圆点进度条，带百分比后缀
fn render_progress_bar(percentage: f64) -> String {
    let clamped = percentage.clamp(0.0, 100.0);

    let filled = (clamped / 100.0 * BAR_SEGMENTS as f64).round() as usize;
    let empty = BAR_SEGMENTS - filled;

    format!(
        "{}{} *{:.0}%*",
        "🟢".repeat(filled),
        "⚪".repeat(empty),
        clamped
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_rendering() {
        assert_eq!(render_progress_bar(0.0), "⚪⚪⚪⚪⚪ *0%*");
        assert_eq!(render_progress_bar(40.0), "🟢🟢⚪⚪⚪ *40%*");
        assert_eq!(render_progress_bar(100.0), "🟢🟢🟢🟢🟢 *100%*");
    }

    #[test]
    fn test_progress_bar_clamps_out_of_range() {
        assert_eq!(render_progress_bar(-20.0), "⚪⚪⚪⚪⚪ *0%*");
        assert_eq!(render_progress_bar(150.0), "🟢🟢🟢🟢🟢 *100%*");
    }
}
